mod smr;
pub use smr::*;

#[cfg(test)]
mod test_smr;
