use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use slog::{debug, info, o, warn, Logger};

use crate::acceptor::{AcceptorState, Promise, Vote};
use crate::ballot::{ProposalId, ProposalIdGen};
use crate::conf::ConsensusConf;
use crate::fault::FaultInjector;
use crate::operation::Operation;
use crate::rpc::RpcError;
use crate::smr::KvStateMachine;
use crate::traits::{Acceptor, Learner};
use crate::NodeIndex;

struct ReplicaState {
    acceptor: AcceptorState,
    sm: KvStateMachine,

    /// When the current owner was granted.
    owned_since: Option<Instant>,
}

/// Replica is the acceptor and learner side of one node.
///
/// Every prepare, accept, learn and release on a node runs under the one `state` lock, so
/// the transitions of AcceptorState and the applications to the state machine are
/// serialized. The lock is never held across an await point.
pub struct Replica {
    index: NodeIndex,
    num_servers: usize,
    conf: ConsensusConf,
    ids: ProposalIdGen,
    faults: Arc<FaultInjector>,
    state: Mutex<ReplicaState>,
    logger: Logger,
}

impl Replica {
    pub fn new(
        index: NodeIndex,
        num_servers: usize,
        conf: ConsensusConf,
        faults: Arc<FaultInjector>,
        logger: Logger,
    ) -> Replica {
        Replica {
            index,
            num_servers,
            conf,
            ids: ProposalIdGen::new(index, num_servers),
            faults,
            state: Mutex::new(ReplicaState {
                acceptor: AcceptorState::new(),
                sm: KvStateMachine::new(index),
                owned_since: None,
            }),
            logger: logger.new(o!("node" => index)),
        }
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn num_servers(&self) -> usize {
        self.num_servers
    }

    pub fn conf(&self) -> &ConsensusConf {
        &self.conf
    }

    pub fn faults(&self) -> &Arc<FaultInjector> {
        &self.faults
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn next_proposal_id(&self) -> ProposalId {
        self.ids.next()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().sm.snapshot()
    }

    pub fn acceptor_state(&self) -> AcceptorState {
        self.lock().acceptor.clone()
    }

    /// observe makes the next local proposal id greater than `id`.
    pub fn observe(&self, id: ProposalId) {
        self.ids.observe(id);
    }

    /// in_range tells whether `id` leaves room for a greater local proposal id.
    pub fn in_range(&self, id: ProposalId) -> bool {
        self.ids.in_range(id)
    }

    pub fn handle_prepare(&self, id: ProposalId) -> Promise {
        self.ids.observe(id);

        let mut st = self.lock();
        let p = if self.conf.exclusive_rounds {
            self.expire_owner(&mut st);
            let p = st.acceptor.prepare_exclusive(id, self.conf.adopt_accepted);
            if p.is_granted() {
                st.owned_since = Some(Instant::now());
            }
            p
        } else {
            st.acceptor.prepare(id, self.conf.adopt_accepted)
        };

        debug!(self.logger, "prepare"; "id" => %id, "granted" => p.is_granted());
        p
    }

    pub fn handle_accept(&self, id: ProposalId, op: &Operation) -> bool {
        if self.faults.should_simulate_failure() {
            warn!(self.logger, "simulating acceptor failure"; "id" => %id);
            return false;
        }

        self.ids.observe(id);

        let mut st = self.lock();
        let ok = if self.conf.exclusive_rounds {
            self.expire_owner(&mut st);
            st.acceptor.accept_exclusive(id, op)
        } else {
            st.acceptor.accept(id, op)
        };
        debug!(self.logger, "accept"; "id" => %id, "op" => %op, "accepted" => ok);
        ok
    }

    /// handle_learn applies `op` unless proposal `id` is stale, and returns the result text.
    ///
    /// With exclusive rounds `prev` is the last proposal learned by the quorum that promised
    /// `id`. A learner that missed it applies it first, so every learner applies the same
    /// proposals in the same order.
    pub fn handle_learn(
        &self,
        id: ProposalId,
        op: &Operation,
        prev: Option<&Vote>,
    ) -> Option<String> {
        self.ids.observe(id);

        let mut st = self.lock();

        let fresh = if self.conf.exclusive_rounds {
            if let Some(v) = prev {
                if st.acceptor.learn_in_order(v.id, &v.op) {
                    let applied = st.sm.apply(&v.op).to_string();
                    info!(self.logger, "caught up"; "id" => %v.id, "op" => %v.op, "result" => &applied);
                }
            }
            st.acceptor.learn_in_order(id, op)
        } else {
            st.acceptor.learn(id, op)
        };

        if !fresh {
            debug!(self.logger, "ignore stale learn"; "id" => %id, "op" => %op);
            return None;
        }

        let applied = st.sm.apply(op).to_string();
        info!(self.logger, "applied"; "id" => %id, "op" => %op, "result" => &applied);
        Some(applied)
    }

    /// handle_release gives up the ownership a failed proposal `id` holds on this acceptor.
    pub fn handle_release(&self, id: ProposalId) -> bool {
        let mut st = self.lock();
        let released = st.acceptor.release(id);
        debug!(self.logger, "release"; "id" => %id, "released" => released);
        released
    }

    fn expire_owner(&self, st: &mut ReplicaState) {
        let expired = st
            .owned_since
            .map_or(true, |t| t.elapsed() >= self.conf.round_lease());

        if expired {
            if let Some(o) = st.acceptor.owner.take() {
                warn!(self.logger, "round lease expired"; "owner" => %o);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReplicaState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Acceptor for Replica {
    async fn prepare(&self, id: ProposalId) -> Result<Promise, RpcError> {
        Ok(self.handle_prepare(id))
    }

    async fn accept(&self, id: ProposalId, op: Operation) -> Result<bool, RpcError> {
        Ok(self.handle_accept(id, &op))
    }

    async fn release(&self, id: ProposalId) -> Result<bool, RpcError> {
        Ok(self.handle_release(id))
    }
}

#[async_trait]
impl Learner for Replica {
    async fn learn(
        &self,
        id: ProposalId,
        op: Operation,
        prev: Option<Vote>,
    ) -> Result<Option<String>, RpcError> {
        Ok(self.handle_learn(id, &op, prev.as_ref()))
    }
}
