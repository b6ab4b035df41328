mod conf;
mod errors;

pub use self::conf::*;
pub use errors::*;

#[cfg(test)]
#[path = "./tests/conf_tests.rs"]
mod tests;
