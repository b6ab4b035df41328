#![allow(dead_code)]

use std::net::TcpListener;
use std::time::Duration;

use paxos::conf::{ClusterConf, Node};
use paxos::rpc::RemotePeer;
use paxos::testutil::{test_logger, wait_for_addr};
use pkv::Server;

/// InProcCluster runs every node of a cluster as a `Server` in the test process.
pub struct InProcCluster {
    pub conf: ClusterConf,
    pub servers: Vec<Server>,
}

impl InProcCluster {
    /// start brings up `n` nodes on free loopback ports and waits until all of them listen.
    pub async fn start(n: usize) -> InProcCluster {
        let mut conf = ClusterConf::local(n, 1).unwrap();
        {
            let listeners: Vec<TcpListener> = (0..n)
                .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
                .collect();
            for (i, l) in listeners.iter().enumerate() {
                let addr = l.local_addr().unwrap();
                conf.nodes.insert(i, Node { index: i, addr });
            }
        }
        conf.consensus.rpc_timeout_ms = 1_000;

        let logger = test_logger();
        let mut servers = Vec::with_capacity(n);
        for i in 0..n {
            let mut s = Server::new(&conf, i, &logger).unwrap();
            s.start();
            servers.push(s);
        }

        for s in servers.iter() {
            wait_for_addr(s.addr()).await;
        }

        InProcCluster { conf, servers }
    }

    /// client returns a client connected to node `i`.
    pub fn client(&self, i: usize) -> RemotePeer {
        RemotePeer::new(self.conf.nodes[&i].addr, Duration::from_secs(10), test_logger())
    }

    /// stop_node shuts node `i` down and waits for its listener to close.
    pub async fn stop_node(&mut self, i: usize) {
        let s = &mut self.servers[i];
        s.stop().unwrap();
        s.join().await.unwrap();
    }
}
