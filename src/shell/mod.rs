mod shell;
pub use shell::*;
