//! The capability surfaces of a node. Local replicas and remote peers implement the same
//! traits, so a round does not care which of them it talks to.

use async_trait::async_trait;

use crate::acceptor::{Promise, Vote};
use crate::ballot::ProposalId;
use crate::operation::Operation;
use crate::rpc::RpcError;

#[async_trait]
pub trait Acceptor: Send + Sync {
    async fn prepare(&self, id: ProposalId) -> Result<Promise, RpcError>;

    /// accept returns false if the proposal is stale or the acceptor simulates a failure.
    async fn accept(&self, id: ProposalId, op: Operation) -> Result<bool, RpcError>;

    /// release ends the hold a failed proposal `id` has on the acceptor.
    async fn release(&self, id: ProposalId) -> Result<bool, RpcError>;
}

#[async_trait]
pub trait Learner: Send + Sync {
    /// learn returns the result text of applying `op`, or None if `id` is stale.
    /// `prev` is the proposal learned right before `id`, if the proposer knows it.
    async fn learn(
        &self,
        id: ProposalId,
        op: Operation,
        prev: Option<Vote>,
    ) -> Result<Option<String>, RpcError>;
}

/// KvStore is the client-facing surface. Every call runs one consensus round.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<String, RpcError>;
    async fn put(&self, key: &str, value: &str) -> Result<String, RpcError>;
    async fn delete(&self, key: &str) -> Result<String, RpcError>;
}
