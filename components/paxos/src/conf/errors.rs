use crate::NodeIndex;

quick_error! {
    #[derive(Debug)]
    pub enum ConfError {
        IOError(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("read conf: {}", e)
        }

        BadYaml(e: serde_yaml::Error) {
            from(e: serde_yaml::Error) -> (e)
            display("bad yaml: {}", e)
        }

        Empty {
            display("cluster has no node")
        }

        NodeIndexGap(want: NodeIndex, got: NodeIndex) {
            display("node indexes must be 0..n: want {} but got {}", want, got)
        }

        BadProbability(p: f64) {
            display("fault probability must be in [0, 1]: {}", p)
        }

        BadOutageRange(min: u64, max: u64) {
            display("outage_min_ms {} > outage_max_ms {}", min, max)
        }

        PortOverflow(base: u16, n: usize) {
            display("{} nodes do not fit in ports from {}", n, base)
        }
    }
}

impl PartialEq<ConfError> for ConfError {
    fn eq(&self, other: &ConfError) -> bool {
        match (self, other) {
            (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
            (Self::BadYaml(_), Self::BadYaml(_)) => true,
            (Self::Empty, Self::Empty) => true,
            (Self::NodeIndexGap(a, b), Self::NodeIndexGap(x, y)) => a == x && b == y,
            (Self::BadProbability(a), Self::BadProbability(b)) => a == b,
            (Self::BadOutageRange(a, b), Self::BadOutageRange(x, y)) => a == x && b == y,
            (Self::PortOverflow(a, b), Self::PortOverflow(x, y)) => a == x && b == y,
            _ => false,
        }
    }
}
