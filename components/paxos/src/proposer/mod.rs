mod errors;
mod proposer;
mod quorums;

pub use errors::*;
pub use proposer::*;
pub use quorums::*;

#[cfg(test)]
mod test_quorums;
