use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::net::TcpListener;

use super::*;
use crate::acceptor::{Promise, Vote};
use crate::ballot::{ProposalId, NO_PROPOSAL};
use crate::conf::ConsensusConf;
use crate::message::{reply, request, LearnRequest, OperationMsg, Request};
use crate::operation::Operation;
use crate::testutil::{test_logger, wait_for_addr, TcpCluster, TestCluster};
use crate::traits::{Acceptor, KvStore, Learner};

fn peer(addr: std::net::SocketAddr, ms: u64) -> RemotePeer {
    RemotePeer::new(addr, Duration::from_millis(ms), test_logger())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rpc_kv_over_tcp() {
    let tc = TcpCluster::start(3, ConsensusConf::default()).await;
    wait_for_addr(tc.addr(1)).await;

    let cli = peer(tc.addr(1), 2000);

    let r = cli.put("a", "b").await.unwrap();
    assert!(r.contains("OK saved operation"), "{}", r);
    assert!(r.contains("server 1"), "{}", r);

    for n in tc.nodes.iter() {
        assert_eq!(Some(&"b".to_string()), n.snapshot().get("a"));
    }

    let r = peer(tc.addr(2), 2000).get("a").await.unwrap();
    assert_eq!("Here is your value b", r);

    let r = cli.delete("a").await.unwrap();
    assert_eq!("Deleted key as requested. Operations left: {}", r);

    let r = cli.delete("a").await.unwrap();
    assert_eq!("Key does not exist. Operations left: {}", r);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rpc_prepare_over_tcp() {
    let tc = TcpCluster::start(3, ConsensusConf::default()).await;
    wait_for_addr(tc.addr(0)).await;

    let cli = peer(tc.addr(0), 2000);

    let high = ProposalId::new(5, 2, 2);
    let low = ProposalId::new(3, 1, 2);

    let p = cli.prepare(high).await.unwrap();
    assert_eq!(
        Promise::Granted {
            id: high,
            vote: None,
            learned: None
        },
        p
    );

    let p = cli.prepare(low).await.unwrap();
    assert_eq!(Promise::Rejected { highest: Some(high) }, p);

    let accepted = cli
        .accept(high, Operation::put("k", "v"))
        .await
        .unwrap();
    assert!(accepted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rpc_release_over_tcp() {
    let tc = TcpCluster::start(3, ConsensusConf::default()).await;
    wait_for_addr(tc.addr(1)).await;

    let cli = peer(tc.addr(1), 2000);

    let failed = ProposalId::new(5, 0, 2);
    let next = ProposalId::new(6, 2, 2);

    assert!(cli.prepare(failed).await.unwrap().is_granted());
    assert!(!cli.prepare(next).await.unwrap().is_granted());

    assert!(!cli.release(next).await.unwrap());
    assert!(cli.release(failed).await.unwrap());
    assert!(!cli.release(failed).await.unwrap());

    assert!(cli.prepare(next).await.unwrap().is_granted());
    assert_eq!(Some(next), tc.nodes[1].replica().acceptor_state().owner);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rpc_learn_prev_over_tcp() {
    let tc = TcpCluster::start(3, ConsensusConf::default()).await;
    wait_for_addr(tc.addr(0)).await;

    let cli = peer(tc.addr(0), 2000);
    let prev = Vote {
        id: ProposalId::new(1, 1, 2),
        op: Operation::put("a", "1"),
    };

    let txt = cli
        .learn(ProposalId::new(2, 1, 2), Operation::put("b", "2"), Some(prev))
        .await
        .unwrap()
        .unwrap();
    assert!(txt.contains("{a=1, b=2}"), "{}", txt);
}

#[tokio::test]
async fn test_rpc_timeout() {
    // accepts nothing but the kernel completes the handshake.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let cli = peer(addr, 50);
    let r = cli.get("a").await;
    match r {
        Err(RpcError::Timeout(p, ms)) => {
            assert_eq!(addr.to_string(), p);
            assert_eq!(50, ms);
        }
        _ => panic!("expect timeout but: {:?}", r),
    }

    drop(listener);
}

#[tokio::test]
async fn test_rpc_connection_refused() {
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };

    let r = peer(addr, 1000).prepare(ProposalId::new(1, 0, 1)).await;
    match r {
        Err(RpcError::Io(_)) => {}
        _ => panic!("expect io error but: {:?}", r),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rpc_learn_unknown_op() {
    let tc = TcpCluster::start(3, ConsensusConf::default()).await;
    wait_for_addr(tc.addr(2)).await;

    let req = Request {
        body: Some(request::Body::Learn(LearnRequest {
            proposal_id: ProposalId::new(1, 0, 2).to_wire(),
            operation: Some(OperationMsg {
                op: 7,
                key: "k".into(),
                value: None,
            }),
            prev_id: NO_PROPOSAL,
            prev_op: None,
        })),
    };

    let b = peer(tc.addr(2), 2000).call(req).await.unwrap();
    match b {
        reply::Body::Learn(r) => {
            assert!(r.result_text.starts_with("internal error"), "{}", r.result_text);
        }
        _ => panic!("expect learn reply but: {:?}", b),
    }

    // the node keeps serving
    let r = peer(tc.addr(2), 2000).put("k", "v").await.unwrap();
    assert!(r.contains("OK"), "{}", r);
}

#[tokio::test]
async fn test_rpc_dispatch_errors() {
    let tc = TestCluster::new(3);
    let node = &tc.nodes[0];

    let rep = dispatch(node, Request { body: None }).await;
    match rep.body {
        Some(reply::Body::Error(e)) => assert!(e.message.contains("body"), "{}", e.message),
        _ => panic!("expect error but: {:?}", rep),
    }

    let rep = dispatch(
        node,
        Request {
            body: Some(request::Body::Prepare(crate::message::PrepareRequest {
                proposal_id: -3,
            })),
        },
    )
    .await;
    match rep.body {
        Some(reply::Body::Error(e)) => assert_eq!("bad proposal id: -3", e.message),
        _ => panic!("expect error but: {:?}", rep),
    }

    // an id that leaves no room above it would wrap the id of the next round.
    let rep = dispatch(node, Request::prepare(ProposalId::from(i64::MAX as u64))).await;
    match rep.body {
        Some(reply::Body::Error(e)) => {
            assert_eq!(format!("bad proposal id: {}", i64::MAX), e.message)
        }
        _ => panic!("expect error but: {:?}", rep),
    }

    let rep = dispatch(
        node,
        Request::learn(
            ProposalId::from(i64::MAX as u64 - 1),
            &Operation::get("x"),
            &None,
        ),
    )
    .await;
    match rep.body {
        Some(reply::Body::Error(e)) => {
            assert!(e.message.starts_with("bad proposal id"), "{}", e.message)
        }
        _ => panic!("expect error but: {:?}", rep),
    }

    let next = node.replica().next_proposal_id();
    assert!(next.to_wire() > 0);
    assert_eq!(1, next.round(crate::ballot::node_bits(3)));

    let rep = dispatch(node, Request::put("x", "y")).await;
    match rep.body {
        Some(reply::Body::Kv(r)) => assert!(r.result_text.contains("OK"), "{}", r.result_text),
        _ => panic!("expect kv reply but: {:?}", rep),
    }
    assert_eq!(vec![Some("y".to_string()); 3], tc.values("x"));
}
