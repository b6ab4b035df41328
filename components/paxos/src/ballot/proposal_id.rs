use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::NodeIndex;

/// Wire value of a rejected prepare, or of "no proposal".
pub const NO_PROPOSAL: i64 = -1;

/// ProposalId orders competing proposals across the whole cluster.
///
/// The low `node_bits` bits hold the index of the issuing node and the remaining high bits
/// hold that node's round counter. Two nodes never issue the same id, and ids issued by one
/// node are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId(u64);

impl ProposalId {
    pub fn new(round: u64, node: NodeIndex, node_bits: u32) -> ProposalId {
        ProposalId((round << node_bits) | node as u64)
    }

    pub fn round(&self, node_bits: u32) -> u64 {
        self.0 >> node_bits
    }

    pub fn node(&self, node_bits: u32) -> NodeIndex {
        (self.0 & ((1u64 << node_bits) - 1)) as NodeIndex
    }

    pub fn to_wire(&self) -> i64 {
        self.0 as i64
    }

    /// from_wire returns None for the `-1` sentinel or any other negative value.
    pub fn from_wire(v: i64) -> Option<ProposalId> {
        if v < 0 {
            None
        } else {
            Some(ProposalId(v as u64))
        }
    }
}

impl From<u64> for ProposalId {
    fn from(v: u64) -> Self {
        ProposalId(v)
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// node_bits returns the number of low bits needed to hold any index in `0..num_servers`.
pub fn node_bits(num_servers: usize) -> u32 {
    let max_index = num_servers.saturating_sub(1) as u64;
    u64::BITS - max_index.leading_zeros()
}

/// max_round is the first round a node can not step past: the id of the round after it
/// would not fit in a wire id.
pub fn max_round(node_bits: u32) -> u64 {
    u64::MAX >> (node_bits + 1)
}

/// ProposalIdGen issues proposal ids for one node.
#[derive(Debug)]
pub struct ProposalIdGen {
    node: NodeIndex,
    node_bits: u32,
    round: AtomicU64,
}

impl ProposalIdGen {
    pub fn new(node: NodeIndex, num_servers: usize) -> ProposalIdGen {
        ProposalIdGen {
            node,
            node_bits: node_bits(num_servers),
            round: AtomicU64::new(0),
        }
    }

    pub fn node_bits(&self) -> u32 {
        self.node_bits
    }

    /// next returns an id greater than every id this generator returned or observed before.
    pub fn next(&self) -> ProposalId {
        let round = self.round.fetch_add(1, Ordering::SeqCst) + 1;
        ProposalId::new(round, self.node, self.node_bits)
    }

    /// in_range tells whether a greater id can still be issued after `id`.
    pub fn in_range(&self, id: ProposalId) -> bool {
        id.round(self.node_bits) < max_round(self.node_bits)
    }

    /// observe records an id issued elsewhere so that the next local id is above it.
    /// An id that is not in range is ignored.
    pub fn observe(&self, id: ProposalId) {
        if !self.in_range(id) {
            return;
        }
        self.round
            .fetch_max(id.round(self.node_bits), Ordering::SeqCst);
    }
}
