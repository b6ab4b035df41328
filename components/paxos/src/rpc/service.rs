use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::FutureExt;
use futures::{Future, SinkExt, StreamExt};
use prost::Message;
use slog::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::ballot::ProposalId;
use crate::message::{
    reply, request, required_op, vote_from_wire, AcceptReply, KvReply, LearnReply, PrepareReply,
    ReleaseReply, Reply, Request,
};
use crate::node::ConsensusNode;
use crate::operation::Operation;
use crate::traits::{Acceptor, Learner};

/// serve_with_shutdown answers requests for `node` on `listener` until `signal` resolves.
pub async fn serve_with_shutdown<F>(
    node: Arc<ConsensusNode>,
    listener: TcpListener,
    signal: F,
) -> Result<(), std::io::Error>
where
    F: Future + Send,
{
    // impl Unpin
    let mut sig = signal.boxed();

    info!(node.logger(), "rpc listened"; "addr" => %listener.local_addr()?);

    loop {
        tokio::select! {
            _v = (&mut sig) => {
                break;
            },
            inc = listener.accept() => {
                let (sock, cli_addr) = inc?;
                let node = node.clone();
                tokio::spawn(async move {
                    handle_new_conn(node, sock, cli_addr).await;
                });
            }
        }
    }

    info!(node.logger(), "rpc stopped");
    Ok(())
}

/// bind_and_serve binds `addr` and then behaves as serve_with_shutdown.
pub async fn bind_and_serve<F>(
    node: Arc<ConsensusNode>,
    addr: SocketAddr,
    signal: F,
) -> Result<(), std::io::Error>
where
    F: Future + Send,
{
    let listener = TcpListener::bind(addr).await?;
    serve_with_shutdown(node, listener, signal).await
}

async fn handle_new_conn(node: Arc<ConsensusNode>, sock: TcpStream, cli_addr: SocketAddr) {
    let logger = node.logger().clone();
    debug!(logger, "new connection"; "from" => %cli_addr);

    let mut framed = Framed::new(sock, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                warn!(logger, "read frame"; "from" => %cli_addr, "err" => %e);
                return;
            }
        };

        let reply = match Request::decode(frame.freeze()) {
            Ok(req) => dispatch(&node, req).await,
            Err(e) => Reply::error(format!("bad request: {}", e)),
        };

        if let Err(e) = framed.send(Bytes::from(reply.encode_to_vec())).await {
            warn!(logger, "write reply"; "to" => %cli_addr, "err" => %e);
            return;
        }
    }

    debug!(logger, "client closed"; "from" => %cli_addr);
}

/// proposal_id parses a wire id. Negative ids and ids too high to be outbid are refused.
fn proposal_id(node: &ConsensusNode, v: i64) -> Result<ProposalId, Reply> {
    match ProposalId::from_wire(v) {
        Some(id) if node.replica().in_range(id) => Ok(id),
        _ => Err(Reply::error(format!("bad proposal id: {}", v))),
    }
}

/// dispatch runs one request against the node and builds its reply.
pub async fn dispatch(node: &ConsensusNode, req: Request) -> Reply {
    let body = match req.body {
        Some(b) => b,
        None => return Reply::error("lack of required field:body"),
    };

    match body {
        request::Body::Prepare(r) => {
            let id = match proposal_id(node, r.proposal_id) {
                Ok(id) => id,
                Err(rep) => return rep,
            };
            match node.prepare(id).await {
                Ok(p) => Reply::of(reply::Body::Prepare(PrepareReply::from(&p))),
                Err(e) => Reply::error(e.to_string()),
            }
        }

        request::Body::Accept(r) => {
            let id = match proposal_id(node, r.proposal_id) {
                Ok(id) => id,
                Err(rep) => return rep,
            };
            let op = match required_op(&r.operation) {
                Ok(op) => op,
                Err(e) => return Reply::error(e.to_string()),
            };
            match node.accept(id, op).await {
                Ok(accepted) => Reply::of(reply::Body::Accept(AcceptReply { accepted })),
                Err(e) => Reply::error(e.to_string()),
            }
        }

        request::Body::Learn(r) => {
            let id = match proposal_id(node, r.proposal_id) {
                Ok(id) => id,
                Err(rep) => return rep,
            };

            let decoded = required_op(&r.operation)
                .and_then(|op| vote_from_wire(r.prev_id, &r.prev_op).map(|prev| (op, prev)));

            // A learn that cannot be applied only fails itself, the node keeps serving.
            let result_text = match decoded {
                Ok((op, prev)) => match node.learn(id, op, prev).await {
                    Ok(txt) => txt.unwrap_or_default(),
                    Err(e) => return Reply::error(e.to_string()),
                },
                Err(e) => {
                    error!(node.logger(), "can not apply learned operation"; "id" => %id, "err" => %e);
                    format!("internal error: {}", e)
                }
            };
            Reply::of(reply::Body::Learn(LearnReply { result_text }))
        }

        request::Body::Release(r) => {
            let id = match proposal_id(node, r.proposal_id) {
                Ok(id) => id,
                Err(rep) => return rep,
            };
            match node.release(id).await {
                Ok(released) => Reply::of(reply::Body::Release(ReleaseReply { released })),
                Err(e) => Reply::error(e.to_string()),
            }
        }

        request::Body::Get(r) => kv_reply(node.submit(Operation::get(r.key)).await),
        request::Body::Put(r) => kv_reply(node.submit(Operation::put(r.key, r.value)).await),
        request::Body::Delete(r) => kv_reply(node.submit(Operation::delete(r.key)).await),
    }
}

fn kv_reply(result_text: String) -> Reply {
    Reply::of(reply::Body::Kv(KvReply { result_text }))
}
