/// quorum is the minimal number of agreeing acceptors among `n`.
pub fn quorum(n: usize) -> usize {
    n / 2 + 1
}
