mod node;
pub use node::*;

#[cfg(test)]
mod test_node;
