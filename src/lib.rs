#[macro_use]
extern crate quick_error;

mod errors;
pub use errors::*;

pub mod server;
pub use server::*;

pub mod setup;
pub mod shell;
