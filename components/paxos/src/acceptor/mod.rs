mod acceptor_state;
pub use acceptor_state::*;
