use paxos::conf::ConfError;
use paxos::NodeIndex;
use tokio::task::JoinError;

quick_error! {
    #[derive(Debug)]
    pub enum ServerError {
        RxClosed {
            display("stop signal receiver is gone")
        }

        NotStarted {
            display("server is not started")
        }

        NoSuchNode(index: NodeIndex) {
            display("no node {} in cluster conf", index)
        }

        InvalidArg(name: &'static str, value: String) {
            display("invalid --{}: {:?}", name, value)
        }

        Conf(e: ConfError) {
            from(e: ConfError) -> (e)
            display("cluster conf: {}", e)
        }

        IOError(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("io: {}", e)
        }

        Join(e: JoinError) {
            from(e: JoinError) -> (e)
            display("server task: {}", e)
        }
    }
}
