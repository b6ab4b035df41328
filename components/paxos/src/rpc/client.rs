use std::convert::TryFrom;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use prost::Message;
use slog::{debug, Logger};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::errors::RpcError;
use crate::acceptor::{Promise, Vote};
use crate::ballot::ProposalId;
use crate::message::{reply, ProtocolError, Reply, Request};
use crate::operation::Operation;
use crate::traits::{Acceptor, KvStore, Learner};

/// RemotePeer reaches a node over TCP. Each call uses its own connection and gives up
/// after `timeout`.
pub struct RemotePeer {
    addr: SocketAddr,
    timeout: Duration,
    logger: Logger,
}

impl RemotePeer {
    pub fn new(addr: SocketAddr, timeout: Duration, logger: Logger) -> RemotePeer {
        RemotePeer {
            addr,
            timeout,
            logger,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn call(&self, req: Request) -> Result<reply::Body, RpcError> {
        match tokio::time::timeout(self.timeout, self.roundtrip(req)).await {
            Ok(r) => r,
            Err(_) => Err(RpcError::Timeout(
                self.addr.to_string(),
                self.timeout.as_millis() as u64,
            )),
        }
    }

    async fn roundtrip(&self, req: Request) -> Result<reply::Body, RpcError> {
        let sock = TcpStream::connect(self.addr).await?;
        let mut framed = Framed::new(sock, LengthDelimitedCodec::new());

        framed.send(Bytes::from(req.encode_to_vec())).await?;

        let frame = framed.next().await.ok_or(RpcError::Closed(self.addr))??;
        let reply = Reply::decode(frame.freeze())?;
        debug!(self.logger, "rpc reply"; "addr" => %self.addr, "reply" => ?reply);

        match reply.body {
            Some(reply::Body::Error(e)) => Err(RpcError::Remote(e.message)),
            Some(b) => Ok(b),
            None => Err(ProtocolError::LackOf("reply.body".into()).into()),
        }
    }

    async fn call_kv(&self, req: Request) -> Result<String, RpcError> {
        match self.call(req).await? {
            reply::Body::Kv(r) => Ok(r.result_text),
            _ => Err(ProtocolError::UnexpectedReply("kv").into()),
        }
    }
}

#[async_trait]
impl Acceptor for RemotePeer {
    async fn prepare(&self, id: ProposalId) -> Result<Promise, RpcError> {
        match self.call(Request::prepare(id)).await? {
            reply::Body::Prepare(r) => Ok(Promise::try_from(&r)?),
            _ => Err(ProtocolError::UnexpectedReply("prepare").into()),
        }
    }

    async fn accept(&self, id: ProposalId, op: Operation) -> Result<bool, RpcError> {
        match self.call(Request::accept(id, &op)).await? {
            reply::Body::Accept(r) => Ok(r.accepted),
            _ => Err(ProtocolError::UnexpectedReply("accept").into()),
        }
    }

    async fn release(&self, id: ProposalId) -> Result<bool, RpcError> {
        match self.call(Request::release(id)).await? {
            reply::Body::Release(r) => Ok(r.released),
            _ => Err(ProtocolError::UnexpectedReply("release").into()),
        }
    }
}

#[async_trait]
impl Learner for RemotePeer {
    async fn learn(
        &self,
        id: ProposalId,
        op: Operation,
        prev: Option<Vote>,
    ) -> Result<Option<String>, RpcError> {
        match self.call(Request::learn(id, &op, &prev)).await? {
            reply::Body::Learn(r) if r.result_text.is_empty() => Ok(None),
            reply::Body::Learn(r) => Ok(Some(r.result_text)),
            _ => Err(ProtocolError::UnexpectedReply("learn").into()),
        }
    }
}

#[async_trait]
impl KvStore for RemotePeer {
    async fn get(&self, key: &str) -> Result<String, RpcError> {
        self.call_kv(Request::get(key)).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<String, RpcError> {
        self.call_kv(Request::put(key, value)).await
    }

    async fn delete(&self, key: &str) -> Result<String, RpcError> {
        self.call_kv(Request::delete(key)).await
    }
}
