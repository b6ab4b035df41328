mod operation;
pub use operation::*;

#[cfg(test)]
#[path = "./tests/operation_tests.rs"]
mod tests;
