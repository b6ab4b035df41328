//! Helpers to build small clusters in tests, in one process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slog::{o, Logger};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::sleep;

use crate::acceptor::{Promise, Vote};
use crate::ballot::ProposalId;
use crate::conf::{ClusterConf, ConsensusConf, FaultConf, Node};
use crate::fault::FaultInjector;
use crate::node::ConsensusNode;
use crate::operation::Operation;
use crate::replica::Replica;
use crate::rpc::{serve_with_shutdown, RpcError};
use crate::topology::{ClusterTopology, Peer};
use crate::traits::{Acceptor, Learner};
use crate::NodeIndex;

pub fn test_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

pub fn new_replica(index: NodeIndex, num_servers: usize) -> Arc<Replica> {
    Arc::new(Replica::new(
        index,
        num_servers,
        ConsensusConf::default(),
        Arc::new(FaultInjector::disabled()),
        test_logger(),
    ))
}

/// Unreachable is a peer every call to which fails at once.
pub struct Unreachable;

#[async_trait]
impl Acceptor for Unreachable {
    async fn prepare(&self, _id: ProposalId) -> Result<Promise, RpcError> {
        Err(RpcError::Unreachable)
    }

    async fn accept(&self, _id: ProposalId, _op: Operation) -> Result<bool, RpcError> {
        Err(RpcError::Unreachable)
    }

    async fn release(&self, _id: ProposalId) -> Result<bool, RpcError> {
        Err(RpcError::Unreachable)
    }
}

#[async_trait]
impl Learner for Unreachable {
    async fn learn(
        &self,
        _id: ProposalId,
        _op: Operation,
        _prev: Option<Vote>,
    ) -> Result<Option<String>, RpcError> {
        Err(RpcError::Unreachable)
    }
}

/// Hanging is a peer that never answers.
pub struct Hanging;

#[async_trait]
impl Acceptor for Hanging {
    async fn prepare(&self, _id: ProposalId) -> Result<Promise, RpcError> {
        futures::future::pending().await
    }

    async fn accept(&self, _id: ProposalId, _op: Operation) -> Result<bool, RpcError> {
        futures::future::pending().await
    }

    async fn release(&self, _id: ProposalId) -> Result<bool, RpcError> {
        futures::future::pending().await
    }
}

#[async_trait]
impl Learner for Hanging {
    async fn learn(
        &self,
        _id: ProposalId,
        _op: Operation,
        _prev: Option<Vote>,
    ) -> Result<Option<String>, RpcError> {
        futures::future::pending().await
    }
}

/// TestCluster is a cluster whose nodes call each other directly.
pub struct TestCluster {
    pub replicas: Vec<Arc<Replica>>,
    pub nodes: Vec<Arc<ConsensusNode>>,
}

impl TestCluster {
    pub fn new(n: usize) -> TestCluster {
        TestCluster::builder(n).build()
    }

    pub fn builder(n: usize) -> TestClusterBuilder {
        TestClusterBuilder {
            n,
            consensus: ConsensusConf::default(),
            fault: FaultConf::default(),
            down: vec![],
            hanging: vec![],
        }
    }

    /// values returns what every replica stores for `key`.
    pub fn values(&self, key: &str) -> Vec<Option<String>> {
        self.replicas
            .iter()
            .map(|r| r.snapshot().get(key).cloned())
            .collect()
    }
}

pub struct TestClusterBuilder {
    n: usize,
    consensus: ConsensusConf,
    fault: FaultConf,
    down: Vec<NodeIndex>,
    hanging: Vec<NodeIndex>,
}

impl TestClusterBuilder {
    pub fn consensus(mut self, c: ConsensusConf) -> Self {
        self.consensus = c;
        self
    }

    pub fn fault(mut self, f: FaultConf) -> Self {
        self.fault = f;
        self
    }

    /// down makes the given nodes unreachable from every other node.
    pub fn down(mut self, nodes: &[NodeIndex]) -> Self {
        self.down = nodes.to_vec();
        self
    }

    /// hanging makes the given nodes never answer other nodes.
    pub fn hanging(mut self, nodes: &[NodeIndex]) -> Self {
        self.hanging = nodes.to_vec();
        self
    }

    pub fn build(self) -> TestCluster {
        let logger = test_logger();

        let replicas: Vec<Arc<Replica>> = (0..self.n)
            .map(|i| {
                let faults = FaultInjector::new(self.fault.clone(), logger.clone());
                Arc::new(Replica::new(
                    i,
                    self.n,
                    self.consensus.clone(),
                    Arc::new(faults),
                    logger.clone(),
                ))
            })
            .collect();

        let nodes = (0..self.n)
            .map(|me| {
                let peers = (0..self.n)
                    .map(|j| {
                        let p = if j != me && self.down.contains(&j) {
                            Peer::of(Arc::new(Unreachable))
                        } else if j != me && self.hanging.contains(&j) {
                            Peer::of(Arc::new(Hanging))
                        } else {
                            Peer::of(replicas[j].clone())
                        };
                        Some(p)
                    })
                    .collect();

                Arc::new(ConsensusNode::new(
                    replicas[me].clone(),
                    ClusterTopology::new(peers),
                ))
            })
            .collect();

        TestCluster { replicas, nodes }
    }
}

/// TcpCluster runs every node behind its own rpc service on a loopback port.
pub struct TcpCluster {
    pub conf: ClusterConf,
    pub nodes: Vec<Arc<ConsensusNode>>,
    stop_txs: Vec<oneshot::Sender<()>>,
}

impl TcpCluster {
    pub async fn start(n: usize, consensus: ConsensusConf) -> TcpCluster {
        let mut listeners = Vec::with_capacity(n);
        for _ in 0..n {
            listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
        }

        let nodes = listeners
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let addr = l.local_addr().unwrap();
                (i, Node { index: i, addr })
            })
            .collect();

        let conf = ClusterConf {
            nodes,
            consensus,
            fault: FaultConf::default(),
        };

        let logger = test_logger();
        let mut tc = TcpCluster {
            conf: conf.clone(),
            nodes: vec![],
            stop_txs: vec![],
        };

        for (i, listener) in listeners.into_iter().enumerate() {
            let replica = Arc::new(Replica::new(
                i,
                n,
                conf.consensus.clone(),
                Arc::new(FaultInjector::disabled()),
                logger.clone(),
            ));
            let topology = ClusterTopology::from_conf(&conf, replica.clone(), &logger);
            let node = Arc::new(ConsensusNode::new(replica, topology));

            let (tx, rx) = oneshot::channel::<()>();
            let n2 = node.clone();
            tokio::spawn(async move {
                serve_with_shutdown(n2, listener, rx).await.unwrap();
            });

            tc.nodes.push(node);
            tc.stop_txs.push(tx);
        }

        tc
    }

    pub fn addr(&self, i: NodeIndex) -> SocketAddr {
        self.conf.nodes[&i].addr
    }
}

impl Drop for TcpCluster {
    fn drop(&mut self) {
        for tx in self.stop_txs.drain(..) {
            let _ = tx.send(());
        }
    }
}

/// wait_for_addr returns once something accepts connections at `addr`.
pub async fn wait_for_addr(addr: SocketAddr) {
    for _ in 0..500 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("nothing listening at {}", addr);
}
