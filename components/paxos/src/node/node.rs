use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use slog::{debug, info, Logger};
use tokio::sync::Mutex;

use crate::acceptor::{Promise, Vote};
use crate::ballot::ProposalId;
use crate::operation::Operation;
use crate::proposer::Proposer;
use crate::replica::Replica;
use crate::rpc::RpcError;
use crate::topology::ClusterTopology;
use crate::traits::{Acceptor, KvStore, Learner};
use crate::NodeIndex;

/// ConsensusNode is one member of the cluster: proposer, acceptor, learner and the
/// client-facing key-value surface.
///
/// Exclusivity contract:
///
/// - Every acceptor and learner transition, and every application to the state machine, is
///   serialized by the lock inside `Replica`.
/// - Client requests (`get`, `put`, `delete`) are serialized by `rounds`: one round at a time
///   per node. A round calls this node's own acceptor and learner directly, not through this
///   type, so it never waits for `rounds` again.
/// - While a round of its own is running, the node rejects prepares and accepts from other
///   proposers instead of waiting. Learns and releases are always served: waiting for them
///   could stall the other round, and their order is kept by the replica.
pub struct ConsensusNode {
    replica: Arc<Replica>,
    proposer: Proposer,
    rounds: Mutex<()>,
    logger: Logger,
}

impl ConsensusNode {
    pub fn new(replica: Arc<Replica>, topology: ClusterTopology) -> ConsensusNode {
        let logger = replica.logger().clone();
        ConsensusNode {
            proposer: Proposer::new(replica.clone(), topology),
            replica,
            rounds: Mutex::new(()),
            logger,
        }
    }

    pub fn index(&self) -> NodeIndex {
        self.replica.index()
    }

    pub fn replica(&self) -> &Arc<Replica> {
        &self.replica
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn topology(&self) -> &ClusterTopology {
        self.proposer.topology()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.replica.snapshot()
    }

    /// submit runs one round for `op` and always answers with a text. A failed round is
    /// reported as "operation not applied: <reason>".
    pub async fn submit(&self, op: Operation) -> String {
        let _round = self.rounds.lock().await;

        info!(self.logger, "receiving proposing operation"; "op" => %op);

        match self.proposer.propose(op).await {
            Ok(txt) => txt,
            Err(e) => {
                info!(self.logger, "operation not applied"; "err" => %e);
                format!("operation not applied: {}", e)
            }
        }
    }
}

#[async_trait]
impl Acceptor for ConsensusNode {
    async fn prepare(&self, id: ProposalId) -> Result<Promise, RpcError> {
        let _idle = match self.rounds.try_lock() {
            Ok(g) => g,
            Err(_) => {
                self.replica.observe(id);
                debug!(self.logger, "busy with own round, reject prepare"; "id" => %id);
                return Ok(Promise::Rejected { highest: None });
            }
        };
        Ok(self.replica.handle_prepare(id))
    }

    async fn accept(&self, id: ProposalId, op: Operation) -> Result<bool, RpcError> {
        let _idle = match self.rounds.try_lock() {
            Ok(g) => g,
            Err(_) => {
                debug!(self.logger, "busy with own round, reject accept"; "id" => %id);
                return Ok(false);
            }
        };
        Ok(self.replica.handle_accept(id, &op))
    }

    async fn release(&self, id: ProposalId) -> Result<bool, RpcError> {
        Ok(self.replica.handle_release(id))
    }
}

#[async_trait]
impl Learner for ConsensusNode {
    async fn learn(
        &self,
        id: ProposalId,
        op: Operation,
        prev: Option<Vote>,
    ) -> Result<Option<String>, RpcError> {
        Ok(self.replica.handle_learn(id, &op, prev.as_ref()))
    }
}

#[async_trait]
impl KvStore for ConsensusNode {
    async fn get(&self, key: &str) -> Result<String, RpcError> {
        Ok(self.submit(Operation::get(key)).await)
    }

    async fn put(&self, key: &str, value: &str) -> Result<String, RpcError> {
        Ok(self.submit(Operation::put(key, value)).await)
    }

    async fn delete(&self, key: &str) -> Result<String, RpcError> {
        Ok(self.submit(Operation::delete(key)).await)
    }
}
