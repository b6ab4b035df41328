use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use slog::{debug, info, warn, Logger};

use super::errors::RoundError;
use super::quorums::quorum;
use crate::acceptor::{Promise, Vote};
use crate::ballot::ProposalId;
use crate::operation::Operation;
use crate::replica::Replica;
use crate::rpc::RpcError;
use crate::topology::ClusterTopology;
use crate::NodeIndex;

/// Promises is what a prepare phase collected.
#[derive(Debug, Default)]
struct Promises {
    granted: usize,

    /// The highest unlearned vote reported.
    vote: Option<Vote>,

    /// The highest learned proposal reported.
    learned: Option<Vote>,
}

fn keep_highest(cur: &mut Option<Vote>, v: Option<Vote>) {
    if let Some(v) = v {
        if cur.as_ref().map_or(true, |c| v.id > c.id) {
            *cur = Some(v);
        }
    }
}

/// Proposer drives rounds of prepare, accept and learn for the operations of one node.
pub struct Proposer {
    replica: Arc<Replica>,
    topology: ClusterTopology,
    logger: Logger,
}

impl Proposer {
    pub fn new(replica: Arc<Replica>, topology: ClusterTopology) -> Proposer {
        let logger = replica.logger().clone();
        Proposer {
            replica,
            topology,
            logger,
        }
    }

    pub fn topology(&self) -> &ClusterTopology {
        &self.topology
    }

    /// propose runs one round for `op` with a fresh proposal id.
    ///
    /// On success it returns the result text of this node's own learner, or of the first
    /// learner that applied the operation if this node did not. With exclusive rounds a
    /// round that fails before learn releases the acceptors it holds.
    pub async fn propose(&self, op: Operation) -> Result<String, RoundError> {
        let id = self.replica.next_proposal_id();
        let q = quorum(self.topology.num_servers());
        let conf = self.replica.conf();

        let promises = self.bcast_prepare(id, q).await;
        if promises.granted < q {
            info!(self.logger, "prepare failed"; "id" => %id, "promised" => promises.granted, "quorum" => q);
            self.release_if_exclusive(id).await;
            return Err(RoundError::NotEnoughPromises(q, promises.granted));
        }

        let recovered = if conf.adopt_accepted {
            promises.vote
        } else {
            None
        };
        let value = match &recovered {
            Some(v) => {
                info!(self.logger, "adopt accepted vote"; "id" => %id, "vote_id" => %v.id, "op" => %v.op);
                v.op.clone()
            }
            None => op,
        };

        let accepted = self.bcast_accept(id, &value).await;
        if conf.tally_accepts && accepted < q {
            info!(self.logger, "accept failed"; "id" => %id, "accepted" => accepted, "quorum" => q);
            self.release_if_exclusive(id).await;
            return Err(RoundError::NotEnoughAccepts(q, accepted));
        }

        let prev = if conf.exclusive_rounds {
            promises.learned
        } else {
            None
        };
        let applied = self.bcast_learn(id, &value, prev).await;

        if let Some(v) = recovered {
            return Err(RoundError::Superseded(v.op));
        }

        applied.ok_or(RoundError::Stale)
    }

    /// bcast_prepare asks acceptors for promises until a quorum is reached.
    /// A rejection that reports a higher id moves the local id generator past it.
    async fn bcast_prepare(&self, id: ProposalId, quorum: usize) -> Promises {
        let timeout = self.replica.conf().rpc_timeout();

        let mut pending: FuturesUnordered<_> = self
            .topology
            .iter()
            .map(|(i, p)| {
                let acceptor = p.acceptor.clone();
                async move { (i, bounded(i, timeout, acceptor.prepare(id)).await) }
            })
            .collect();

        let mut promises = Promises::default();

        while let Some((i, res)) = pending.next().await {
            match res {
                Ok(Promise::Granted {
                    id: pid,
                    vote,
                    learned,
                }) if pid == id => {
                    promises.granted += 1;
                    keep_highest(&mut promises.vote, vote);
                    keep_highest(&mut promises.learned, learned);
                }
                Ok(Promise::Rejected { highest }) => {
                    debug!(self.logger, "prepare rejected"; "id" => %id, "peer" => i, "highest" => ?highest);
                    if let Some(h) = highest {
                        self.replica.observe(h);
                    }
                }
                Ok(p) => {
                    warn!(self.logger, "promise for another proposal"; "id" => %id, "peer" => i, "promise" => ?p);
                }
                Err(e) => {
                    warn!(self.logger, "prepare failed"; "id" => %id, "peer" => i, "err" => %e);
                }
            }

            if promises.granted >= quorum {
                break;
            }
        }

        promises
    }

    async fn release_if_exclusive(&self, id: ProposalId) {
        if !self.replica.conf().exclusive_rounds {
            return;
        }

        let timeout = self.replica.conf().rpc_timeout();

        let mut pending: FuturesUnordered<_> = self
            .topology
            .iter()
            .map(|(i, p)| {
                let acceptor = p.acceptor.clone();
                async move { (i, bounded(i, timeout, acceptor.release(id)).await) }
            })
            .collect();

        while let Some((i, res)) = pending.next().await {
            if let Err(e) = res {
                warn!(self.logger, "release failed"; "id" => %id, "peer" => i, "err" => %e);
            }
        }
    }

    async fn bcast_accept(&self, id: ProposalId, op: &Operation) -> usize {
        let timeout = self.replica.conf().rpc_timeout();

        let mut pending: FuturesUnordered<_> = self
            .topology
            .iter()
            .map(|(i, p)| {
                let acceptor = p.acceptor.clone();
                let op = op.clone();
                async move { (i, bounded(i, timeout, acceptor.accept(id, op)).await) }
            })
            .collect();

        let mut accepted = 0;
        while let Some((i, res)) = pending.next().await {
            match res {
                Ok(true) => accepted += 1,
                Ok(false) => {
                    debug!(self.logger, "accept rejected"; "id" => %id, "peer" => i);
                }
                Err(e) => {
                    warn!(self.logger, "accept failed"; "id" => %id, "peer" => i, "err" => %e);
                }
            }
        }
        accepted
    }

    async fn bcast_learn(
        &self,
        id: ProposalId,
        op: &Operation,
        prev: Option<Vote>,
    ) -> Option<String> {
        let timeout = self.replica.conf().rpc_timeout();
        let me = self.replica.index();

        let mut pending: FuturesUnordered<_> = self
            .topology
            .iter()
            .map(|(i, p)| {
                let learner = p.learner.clone();
                let op = op.clone();
                let prev = prev.clone();
                async move { (i, bounded(i, timeout, learner.learn(id, op, prev)).await) }
            })
            .collect();

        let mut mine = None;
        let mut first = None;

        while let Some((i, res)) = pending.next().await {
            match res {
                Ok(Some(txt)) => {
                    if i == me {
                        mine = Some(txt);
                    } else if first.is_none() {
                        first = Some(txt);
                    }
                }
                Ok(None) => {
                    debug!(self.logger, "learn ignored as stale"; "id" => %id, "peer" => i);
                }
                Err(e) => {
                    warn!(self.logger, "learn failed"; "id" => %id, "peer" => i, "err" => %e);
                }
            }
        }

        mine.or(first)
    }
}

/// bounded gives up on a peer call after `timeout`.
async fn bounded<T, F>(peer: NodeIndex, timeout: Duration, fut: F) -> Result<T, RpcError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(r) => r,
        Err(_) => Err(RpcError::Timeout(
            format!("node {}", peer),
            timeout.as_millis() as u64,
        )),
    }
}
