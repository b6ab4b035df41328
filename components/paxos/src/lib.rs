#[macro_use]
extern crate quick_error;

pub mod acceptor;
pub mod ballot;
pub mod conf;
pub mod fault;
pub mod message;
pub mod node;
pub mod operation;
pub mod proposer;
pub mod replica;
pub mod rpc;
pub mod smr;
pub mod testutil;
pub mod topology;
pub mod traits;

pub use acceptor::*;
pub use ballot::*;
pub use node::*;
pub use operation::*;
pub use proposer::*;
pub use replica::*;
pub use topology::*;
pub use traits::*;

/// NodeIndex is the position of a node in the fixed cluster membership: `0..num_servers`.
pub type NodeIndex = usize;
