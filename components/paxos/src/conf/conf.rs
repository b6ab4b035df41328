use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfError;
use crate::NodeIndex;

/// Node is one member of the fixed cluster.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Node {
    #[serde(default)]
    pub index: NodeIndex,
    pub addr: SocketAddr,
}

/// ConsensusConf tunes the proposer side of a round.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConsensusConf {
    /// Upper bound of every single peer call.
    pub rpc_timeout_ms: u64,

    /// Skip learn if fewer than a majority of acceptors accepted.
    pub tally_accepts: bool,

    /// Let promises carry unlearned votes, and finish the highest one before anything else.
    pub adopt_accepted: bool,

    /// A granted prepare locks the acceptor for that proposal until it is learned or
    /// released, or until the lease of `4 * rpc_timeout_ms` runs out. Learners then apply
    /// proposals in id order instead of dropping any one below the last promise.
    pub exclusive_rounds: bool,
}

impl Default for ConsensusConf {
    fn default() -> Self {
        ConsensusConf {
            rpc_timeout_ms: 2_000,
            tally_accepts: false,
            adopt_accepted: false,
            exclusive_rounds: true,
        }
    }
}

impl ConsensusConf {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// round_lease outlives the three phases of a round.
    pub fn round_lease(&self) -> Duration {
        self.rpc_timeout() * 4
    }
}

/// FaultConf configures simulated acceptor failures.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FaultConf {
    pub enabled: bool,

    /// Chance that a single accept call fails.
    pub probability: f64,

    /// Run the background task that opens outage windows.
    pub outages: bool,
    pub outage_interval_ms: u64,
    pub outage_min_ms: u64,
    pub outage_max_ms: u64,
}

impl Default for FaultConf {
    fn default() -> Self {
        FaultConf {
            enabled: false,
            probability: 0.1,
            outages: false,
            outage_interval_ms: 5_000,
            outage_min_ms: 2_000,
            outage_max_ms: 7_000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterConf {
    /// The key is the node index and must cover `0..n` without gaps.
    pub nodes: BTreeMap<NodeIndex, Node>,

    #[serde(default)]
    pub consensus: ConsensusConf,

    #[serde(default)]
    pub fault: FaultConf,
}

impl ClusterConf {
    /// from_file read cluster conf yaml from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClusterConf, ConfError> {
        let content = fs::read_to_string(path)?;
        ClusterConf::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<ClusterConf, ConfError> {
        let mut cluster: ClusterConf = serde_yaml::from_str(content)?;

        for (idx, node) in cluster.nodes.iter_mut() {
            node.index = *idx;
        }

        cluster.check()?;
        Ok(cluster)
    }

    /// local builds a cluster of `n` nodes on 127.0.0.1 with consecutive ports.
    pub fn local(n: usize, base_port: u16) -> Result<ClusterConf, ConfError> {
        let mut nodes = BTreeMap::new();
        for i in 0..n {
            let port = u16::try_from(i)
                .ok()
                .and_then(|i| base_port.checked_add(i))
                .ok_or(ConfError::PortOverflow(base_port, n))?;

            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            nodes.insert(i, Node { index: i, addr });
        }

        Ok(ClusterConf {
            nodes,
            consensus: ConsensusConf::default(),
            fault: FaultConf::default(),
        })
    }

    pub fn num_servers(&self) -> usize {
        self.nodes.len()
    }

    /// check validates node indexes and fault settings.
    pub fn check(&self) -> Result<(), ConfError> {
        if self.nodes.is_empty() {
            return Err(ConfError::Empty);
        }

        for (want, got) in self.nodes.keys().enumerate() {
            if want != *got {
                return Err(ConfError::NodeIndexGap(want, *got));
            }
        }

        let f = &self.fault;
        if !(0.0..=1.0).contains(&f.probability) {
            return Err(ConfError::BadProbability(f.probability));
        }
        if f.outage_min_ms > f.outage_max_ms {
            return Err(ConfError::BadOutageRange(f.outage_min_ms, f.outage_max_ms));
        }

        Ok(())
    }
}
