mod errors;
mod message;

pub use errors::*;
pub use message::*;

#[cfg(test)]
#[path = "./tests/message_tests.rs"]
mod tests;
