mod replica;
pub use replica::*;
