mod client;
mod errors;
mod service;

pub use client::*;
pub use errors::*;
pub use service::*;

#[cfg(test)]
mod test_rpc;
