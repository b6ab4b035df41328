use crate::operation::Operation;

quick_error! {
    /// RoundError is why a round did not apply the proposed operation.
    /// None of them is fatal: the client may retry, which uses a new proposal id.
    #[derive(Debug, Eq, PartialEq)]
    pub enum RoundError {
        NotEnoughPromises(want: usize, got: usize) {
            display("not enough promises: want at least {} but got {}", want, got)
        }

        NotEnoughAccepts(want: usize, got: usize) {
            display("not enough accepts: want at least {} but got {}", want, got)
        }

        Stale {
            display("proposal is stale on every learner")
        }

        Superseded(op: Operation) {
            display("finished an earlier accepted operation '{}' instead, retry", op)
        }
    }
}
