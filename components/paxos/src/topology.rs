use std::sync::Arc;

use slog::Logger;

use crate::conf::ClusterConf;
use crate::replica::Replica;
use crate::rpc::RemotePeer;
use crate::traits::{Acceptor, Learner};
use crate::NodeIndex;

/// Peer is the set of handles a round needs to reach one node.
#[derive(Clone)]
pub struct Peer {
    pub acceptor: Arc<dyn Acceptor>,
    pub learner: Arc<dyn Learner>,
}

impl Peer {
    /// of wraps anything that is both an acceptor and a learner, such as a local Replica.
    pub fn of<T>(t: Arc<T>) -> Peer
    where
        T: Acceptor + Learner + 'static,
    {
        Peer {
            acceptor: t.clone(),
            learner: t,
        }
    }

    pub fn remote(p: Arc<RemotePeer>) -> Peer {
        Peer {
            acceptor: p.clone(),
            learner: p,
        }
    }
}

/// ClusterTopology maps every node index to its handles. It is built once, before the node
/// that uses it, and never changes. A `None` slot is a peer that is known to be absent;
/// rounds skip it and it never counts towards a quorum.
#[derive(Clone)]
pub struct ClusterTopology {
    peers: Vec<Option<Peer>>,
}

impl ClusterTopology {
    pub fn new(peers: Vec<Option<Peer>>) -> ClusterTopology {
        ClusterTopology { peers }
    }

    /// from_conf uses `local` for its own index and a RemotePeer for every other node.
    pub fn from_conf(conf: &ClusterConf, local: Arc<Replica>, logger: &Logger) -> ClusterTopology {
        let timeout = conf.consensus.rpc_timeout();
        let me = local.index();

        let peers = conf
            .nodes
            .values()
            .map(|n| {
                if n.index == me {
                    Some(Peer::of(local.clone()))
                } else {
                    Some(Peer::remote(Arc::new(RemotePeer::new(
                        n.addr,
                        timeout,
                        logger.clone(),
                    ))))
                }
            })
            .collect();

        ClusterTopology { peers }
    }

    pub fn num_servers(&self) -> usize {
        self.peers.len()
    }

    /// iter yields every present peer with its index.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Peer)> {
        self.peers
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
    }
}
