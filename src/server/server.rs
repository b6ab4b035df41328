use std::net::SocketAddr;
use std::sync::Arc;

use futures::Future;
use slog::{error, info, o, Logger};
use tokio::sync::oneshot::{self, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use paxos::conf::ClusterConf;
use paxos::fault::FaultInjector;
use paxos::rpc::bind_and_serve;
use paxos::{ClusterTopology, ConsensusNode, NodeIndex, Replica};

use crate::ServerError;

/// Server runs one cluster node: the rpc service that answers peers and clients, and the
/// simulated outages of its acceptor when the cluster conf enables them.
pub struct Server {
    node: Arc<ConsensusNode>,
    addr: SocketAddr,
    stop_txs: Vec<(&'static str, Sender<()>)>,
    cancel: CancellationToken,
    join_handle: Option<JoinHandle<Result<(), ServerError>>>,
    logger: Logger,
}

impl Server {
    pub fn new(conf: &ClusterConf, index: NodeIndex, logger: &Logger) -> Result<Server, ServerError> {
        let me = conf.nodes.get(&index).ok_or(ServerError::NoSuchNode(index))?;

        let faults = FaultInjector::new(conf.fault.clone(), logger.new(o!("node" => index)));
        let replica = Arc::new(Replica::new(
            index,
            conf.num_servers(),
            conf.consensus.clone(),
            Arc::new(faults),
            logger.clone(),
        ));
        let topology = ClusterTopology::from_conf(conf, replica.clone(), logger);

        Ok(Server {
            node: Arc::new(ConsensusNode::new(replica, topology)),
            addr: me.addr,
            stop_txs: Vec::new(),
            cancel: CancellationToken::new(),
            join_handle: None,
            logger: logger.new(o!("node" => index)),
        })
    }

    pub fn node(&self) -> &Arc<ConsensusNode> {
        &self.node
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts the rpc service and the outage simulation.
    /// It must be called inside a tokio runtime.
    pub fn start(&mut self) {
        let (tx, rx) = oneshot::channel::<()>();

        let fut = Server::_start_servers(self.node.clone(), self.addr, rx, self.cancel.clone());
        let j = tokio::spawn(fut);

        self.join_handle = Some(j);
        self.stop_txs.push(("rpc", tx));
    }

    async fn _start_servers<F: Future + Send + 'static>(
        node: Arc<ConsensusNode>,
        addr: SocketAddr,
        sig_rpc: F,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let logger = node.logger().clone();

        let faults = node.replica().faults().clone();
        let outages = if faults.conf().enabled && faults.conf().outages {
            Some(faults.spawn_outages(cancel.clone()))
        } else {
            None
        };

        info!(logger, "serving"; "addr" => %addr);
        let rst = bind_and_serve(node, addr, sig_rpc).await;
        if let Err(ref e) = rst {
            error!(logger, "rpc service quit"; "addr" => %addr, "err" => %e);
        }

        cancel.cancel();
        if let Some(j) = outages {
            j.await?;
        }

        rst?;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ServerError> {
        self.cancel.cancel();

        while let Some((name, tx)) = self.stop_txs.pop() {
            tx.send(()).or(Err(ServerError::RxClosed))?;
            info!(self.logger, "stop signal sent"; "service" => name);
        }
        Ok(())
    }

    pub async fn join(&mut self) -> Result<(), ServerError> {
        let j = self.join_handle.take();
        j.ok_or(ServerError::NotStarted)?.await?
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
