use std::net::SocketAddr;

use crate::message::ProtocolError;

quick_error! {
    /// RpcError is a failed call to a peer. A round treats it as no response.
    #[derive(Debug)]
    pub enum RpcError {
        Io(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("io: {}", e)
        }

        Timeout(peer: String, ms: u64) {
            display("no reply from {} in {} ms", peer, ms)
        }

        Closed(addr: SocketAddr) {
            display("connection to {} closed before reply", addr)
        }

        Protocol(p: ProtocolError) {
            from(p: ProtocolError) -> (p)
            display("protocol: {}", p)
        }

        Remote(msg: String) {
            display("remote error: {}", msg)
        }

        Unreachable {
            display("peer unreachable")
        }
    }
}

impl From<prost::DecodeError> for RpcError {
    fn from(e: prost::DecodeError) -> Self {
        RpcError::Protocol(e.into())
    }
}
