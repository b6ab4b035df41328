mod proposal_id;
pub use proposal_id::*;

#[cfg(test)]
mod test_proposal_id;
