use pretty_assertions::assert_eq;

use super::*;
use crate::operation::Operation;

#[test]
fn test_smr_put_is_insert_only() {
    let mut sm = KvStateMachine::new(3);

    let r = sm.apply(&Operation::put("k", "v1"));
    assert_eq!(
        "OK saved operation: {key= k, value= v1}, current operations in server 3: {k=v1}",
        r.to_string()
    );

    let r = sm.apply(&Operation::put("k", "v2"));
    assert_eq!(Applied::AlreadyExists, r);
    assert!(r.to_string().contains("already exists"));

    assert_eq!(Some(&"v1".to_string()), sm.snapshot().get("k"));
}

#[test]
fn test_smr_get() {
    let mut sm = KvStateMachine::new(0);
    assert_eq!(Applied::NotFound, sm.apply(&Operation::get("a")));

    sm.apply(&Operation::put("a", "b"));
    let r = sm.apply(&Operation::get("a"));
    assert_eq!(Applied::Found("b".into()), r);
    assert_eq!("Here is your value b", r.to_string());

    // get never mutates.
    assert_eq!(1, sm.len());
}

#[test]
fn test_smr_delete() {
    let mut sm = KvStateMachine::new(0);
    sm.apply(&Operation::put("a", "1"));
    sm.apply(&Operation::put("b", "2"));

    let r = sm.apply(&Operation::delete("a"));
    assert_eq!(
        "Deleted key as requested. Operations left: {b=2}",
        r.to_string()
    );

    let r = sm.apply(&Operation::delete("a"));
    assert_eq!("Key does not exist. Operations left: {b=2}", r.to_string());

    let r = sm.apply(&Operation::get("a"));
    assert!(r.to_string().contains("does not exist"));
}

#[test]
fn test_smr_empty() {
    let mut sm = KvStateMachine::new(1);
    assert!(sm.is_empty());

    let r = sm.apply(&Operation::delete("nope"));
    assert_eq!("Key does not exist. Operations left: {}", r.to_string());
    assert!(sm.is_empty());
}
