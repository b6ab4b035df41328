use crate::ballot::ProposalId;
use crate::operation::Operation;

/// Vote is an operation an acceptor accepted or learned in some proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub id: ProposalId,
    pub op: Operation,
}

/// Promise is the answer to a prepare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promise {
    /// The acceptor promised `id`.
    ///
    /// `vote` is its latest accepted but not yet learned value, only reported when the node
    /// is configured to do so. `learned` is the last proposal it learned.
    Granted {
        id: ProposalId,
        vote: Option<Vote>,
        learned: Option<Vote>,
    },

    /// `highest` is the greatest id the acceptor has promised or learned, if any.
    Rejected { highest: Option<ProposalId> },
}

impl Promise {
    pub fn is_granted(&self) -> bool {
        matches!(self, Promise::Granted { .. })
    }
}

/// AcceptorState is the ballot bookkeeping of one node.
///
/// `highest_promised` never decreases. Unlike textbook Paxos, a promise also moves
/// `highest_accepted`, and `highest_accepted <= highest_promised` is not maintained.
///
/// With exclusive rounds a granted prepare makes the proposal the `owner` of the acceptor,
/// and no other proposal is promised until the owner is learned, released or expired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptorState {
    pub highest_promised: Option<ProposalId>,
    pub highest_accepted: Option<ProposalId>,
    pub accepted_operation: Option<Operation>,

    /// The last value accepted by `accept` that no learn has covered yet.
    pub vote: Option<Vote>,

    /// The last proposal applied by a learn.
    pub learned: Option<Vote>,

    pub owner: Option<ProposalId>,
}

impl AcceptorState {
    pub fn new() -> AcceptorState {
        Default::default()
    }

    fn not_below_promised(&self, id: ProposalId) -> bool {
        self.highest_promised.map_or(true, |p| id >= p)
    }

    fn learned_id(&self) -> Option<ProposalId> {
        self.learned.as_ref().map(|v| v.id)
    }

    fn rejected(&self) -> Promise {
        Promise::Rejected {
            highest: self.highest_promised.max(self.learned_id()),
        }
    }

    pub fn prepare(&mut self, id: ProposalId, report_vote: bool) -> Promise {
        if !self.not_below_promised(id) {
            return self.rejected();
        }

        self.highest_promised = Some(id);
        self.highest_accepted = Some(id);

        Promise::Granted {
            id,
            vote: if report_vote { self.vote.clone() } else { None },
            learned: self.learned.clone(),
        }
    }

    /// prepare_exclusive grants `id` only if no other proposal owns the acceptor and no
    /// proposal at or above `id` has been learned. A granted `id` becomes the owner.
    pub fn prepare_exclusive(&mut self, id: ProposalId, report_vote: bool) -> Promise {
        if self.owner.map_or(false, |o| o != id) {
            return self.rejected();
        }
        if self.learned_id().map_or(false, |l| l >= id) {
            return self.rejected();
        }

        let p = self.prepare(id, report_vote);
        if p.is_granted() {
            self.owner = Some(id);
        }
        p
    }

    pub fn accept(&mut self, id: ProposalId, op: &Operation) -> bool {
        if !self.not_below_promised(id) {
            return false;
        }

        self.highest_promised = Some(id);
        self.highest_accepted = Some(id);
        self.accepted_operation = Some(op.clone());
        self.vote = Some(Vote {
            id,
            op: op.clone(),
        });
        true
    }

    /// accept_exclusive refuses every proposal but the owner while the acceptor is owned.
    pub fn accept_exclusive(&mut self, id: ProposalId, op: &Operation) -> bool {
        if self.owner.map_or(false, |o| o != id) {
            return false;
        }
        self.accept(id, op)
    }

    /// learn returns true if a proposal `id` is not stale and its operation should be applied.
    /// A proposal is stale if a higher one has been promised or accepted.
    pub fn learn(&mut self, id: ProposalId, op: &Operation) -> bool {
        if let Some(a) = self.highest_accepted {
            if id < a {
                return false;
            }
        }

        self.highest_accepted = Some(id);
        self.record_learned(id, op);
        true
    }

    /// learn_in_order is learn for exclusive rounds: a proposal is stale only if it is not
    /// above the last learned one, so a chosen proposal is never dropped because a later
    /// prepare got here first.
    pub fn learn_in_order(&mut self, id: ProposalId, op: &Operation) -> bool {
        if self.learned_id().map_or(false, |l| id <= l) {
            return false;
        }

        self.highest_accepted = self.highest_accepted.max(Some(id));
        self.record_learned(id, op);
        true
    }

    fn record_learned(&mut self, id: ProposalId, op: &Operation) {
        self.accepted_operation = Some(op.clone());
        self.learned = Some(Vote {
            id,
            op: op.clone(),
        });

        if self.vote.as_ref().map_or(false, |v| v.id <= id) {
            self.vote = None;
        }
        if self.owner.map_or(false, |o| o <= id) {
            self.owner = None;
        }
    }

    /// release ends the ownership of `id`. It returns false if `id` is not the owner.
    pub fn release(&mut self, id: ProposalId) -> bool {
        if self.owner == Some(id) {
            self.owner = None;
            true
        } else {
            false
        }
    }
}
