use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::Rng;
use tokio::time::sleep;

use super::*;
use crate::acceptor::Promise;
use crate::ballot::ProposalId;
use crate::conf::ConsensusConf;
use crate::operation::Operation;
use crate::testutil::{wait_for_addr, TcpCluster, TestCluster};
use crate::traits::{Acceptor, KvStore, Learner};

#[tokio::test]
async fn test_node_put_get_delete() {
    let tc = TestCluster::new(5);

    let r = tc.nodes[0].put("a", "b").await.unwrap();
    assert!(r.contains("OK"), "{}", r);

    for n in tc.nodes.iter() {
        let mut want = BTreeMap::new();
        want.insert("a".to_string(), "b".to_string());
        assert_eq!(want, n.snapshot());
    }

    let r = tc.nodes[2].get("a").await.unwrap();
    assert!(r.contains("b"), "{}", r);

    let r = tc.nodes[4].delete("a").await.unwrap();
    assert!(r.contains("Deleted"), "{}", r);

    let r = tc.nodes[1].get("a").await.unwrap();
    assert!(r.contains("does not exist"), "{}", r);

    for n in tc.nodes.iter() {
        assert!(n.snapshot().is_empty());
    }
}

#[tokio::test]
async fn test_node_put_insert_only() {
    let tc = TestCluster::new(3);

    tc.nodes[0].put("k", "v1").await.unwrap();
    let r = tc.nodes[1].put("k", "v2").await.unwrap();
    assert!(r.contains("already exists"), "{}", r);

    assert_eq!(vec![Some("v1".to_string()); 3], tc.values("k"));
}

#[tokio::test]
async fn test_node_no_quorum_is_not_an_error() {
    let tc = TestCluster::builder(5).down(&[1, 2, 3]).build();

    let r = tc.nodes[0].put("k", "v").await.unwrap();
    assert_eq!(
        "operation not applied: not enough promises: want at least 3 but got 2",
        r
    );
    assert_eq!(vec![None; 5], tc.values("k"));
}

/// put_until_decided retries a put the way a client does while rounds collide.
async fn put_until_decided(node: Arc<ConsensusNode>, key: String, value: &'static str) -> String {
    for _ in 0..200 {
        let r = node.put(&key, value).await.unwrap();
        if !r.starts_with("operation not applied") {
            return r;
        }

        let ms = rand::thread_rng().gen_range(1..20);
        sleep(Duration::from_millis(ms)).await;
    }
    panic!("put {}={} on node {} never got through", key, value, node.index());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_node_racing_puts() {
    let tc = TcpCluster::start(5, ConsensusConf::default()).await;
    for i in 0..5 {
        wait_for_addr(tc.addr(i)).await;
    }

    for k in 0..40 {
        let key = format!("k{}", k);

        let h0 = tokio::spawn(put_until_decided(tc.nodes[0].clone(), key.clone(), "0"));
        let h1 = tokio::spawn(put_until_decided(tc.nodes[1].clone(), key.clone(), "1"));
        let (r0, r1) = (h0.await.unwrap(), h1.await.unwrap());

        let oks = [&r0, &r1].iter().filter(|r| r.contains("OK")).count();
        let exists = [&r0, &r1]
            .iter()
            .filter(|r| r.contains("already exists"))
            .count();
        assert_eq!((1, 1), (oks, exists), "{}: {} / {}", key, r0, r1);

        let want = tc.nodes[0].snapshot();
        let v = want.get(&key).cloned();
        assert!(v == Some("0".into()) || v == Some("1".into()), "{}: {:?}", key, v);

        for n in tc.nodes.iter() {
            assert_eq!(want, n.snapshot(), "{} on node {}", key, n.index());
        }
    }
}

#[tokio::test]
async fn test_node_rejects_other_rounds_while_busy() {
    let tc = TestCluster::builder(3)
        .consensus(ConsensusConf {
            rpc_timeout_ms: 200,
            ..Default::default()
        })
        .hanging(&[2])
        .build();

    // the round of node 0 waits for node 2 until the rpc timeout.
    let n0 = tc.nodes[0].clone();
    let round = tokio::spawn(async move { n0.put("k", "v").await.unwrap() });
    sleep(Duration::from_millis(50)).await;

    let node = &tc.nodes[0];
    let other = ProposalId::new(100, 1, 2);

    assert_eq!(
        Promise::Rejected { highest: None },
        node.prepare(other).await.unwrap()
    );
    assert!(!node.accept(other, Operation::put("k", "x")).await.unwrap());
    assert!(!node.release(other).await.unwrap());

    // learns are served while busy.
    let txt = node
        .learn(ProposalId::new(0, 1, 2), Operation::get("k"), None)
        .await
        .unwrap();
    assert!(txt.is_some());

    let r = round.await.unwrap();
    assert!(r.contains("OK"), "{}", r);

    // the rejected id still moved the local generator past it.
    assert!(tc.replicas[0].next_proposal_id() > other);
    assert!(node.prepare(other).await.unwrap().is_granted());
}

#[tokio::test]
async fn test_node_serializes_own_rounds() {
    let tc = TestCluster::new(3);
    let n = tc.nodes[2].clone();

    let mut handles = vec![];
    for i in 0..10 {
        let n = n.clone();
        handles.push(tokio::spawn(async move {
            n.put(&format!("k{}", i), "v").await.unwrap()
        }));
    }

    for h in handles {
        let r = h.await.unwrap();
        assert!(r.contains("OK"), "{}", r);
    }

    for r in tc.replicas.iter() {
        assert_eq!(10, r.snapshot().len());
    }
}
