//! Integration tests for promise settlement.
//!
//! These tests verify that:
//! - Fresh promises are eventual and reject synchronous calls
//! - Resolvers settle exactly once
//! - Forwarding through other promises is transparent
//! - Forwarding loops are caught without unbounded work
//! - Buffered sends reach the target once, in order

mod common;

use common::{init_tracing, Account};
use vatref::prelude::*;
use vatref::reference::FORWARDING_LOOP;

#[test]
fn test_fresh_pair_is_eventual() {
    init_tracing();
    let refs = RefFacade;
    let (p, _r) = refs.promise();
    let value = Value::from(p);
    assert_eq!(refs.state(&value), ResolutionState::Eventual);
    assert!(!refs.is_resolved(&value));
}

#[test]
fn test_resolve_to_value() {
    let vat = Vat::default();
    let refs = RefFacade;
    let (p, r) = refs.promise();
    let value = Value::from(p);

    assert!(r.resolve(&vat, Value::Int(42), true).unwrap());
    assert_eq!(refs.state(&value), ResolutionState::Near);
    assert_eq!(refs.fulfillment(&value).unwrap().as_int(), Some(42));

    assert!(matches!(
        r.resolve(&vat, Value::Int(7), true),
        Err(RefError::AlreadyResolved)
    ));
    assert!(matches!(
        r.resolve_strict(&vat, Value::Int(7)),
        Err(RefError::AlreadyResolved)
    ));
    assert!(!r.resolve(&vat, Value::Int(7), false).unwrap());
    assert_eq!(refs.fulfillment(&value).unwrap().as_int(), Some(42));
}

#[test]
fn test_resolve_to_broken() {
    let vat = Vat::default();
    let refs = RefFacade;
    let (p, r) = refs.promise();
    let value = Value::from(p);

    r.resolve_strict(&vat, Value::broken("timeout")).unwrap();
    assert_eq!(refs.state(&value), ResolutionState::Broken);
    assert!(refs.is_resolved(&value));
    match refs.fulfillment(&value) {
        Err(RefError::Problem(problem)) => assert_eq!(problem.as_str(), Some("timeout")),
        other => panic!("expected re-raised problem, got {:?}", other),
    }
}

#[test]
fn test_transitive_forwarding() {
    let vat = Vat::default();
    let refs = RefFacade;
    let (p1, r1) = refs.promise();
    let (p2, r2) = refs.promise();
    let v1 = Value::from(p1);

    r1.resolve_strict(&vat, p2.into()).unwrap();
    assert_eq!(refs.state(&v1), ResolutionState::Eventual);
    assert!(matches!(refs.fulfillment(&v1), Err(RefError::NotYetResolved(_))));

    r2.resolve_strict(&vat, Value::from("done")).unwrap();
    assert_eq!(refs.fulfillment(&v1).unwrap().as_str(), Some("done"));
}

#[test]
fn test_forwarding_to_broken_promise() {
    let vat = Vat::default();
    let refs = RefFacade;
    let (p1, r1) = refs.promise();
    let (p2, r2) = refs.promise();
    let v1 = Value::from(p1);

    r1.resolve_strict(&vat, p2.into()).unwrap();
    r2.smash(&vat, Value::from("disconnected")).unwrap();
    assert!(refs.is_broken(&v1));
    assert_eq!(refs.opt_problem(&v1).unwrap().as_str(), Some("disconnected"));
}

#[test]
fn test_direct_self_resolution_is_ref_loop() {
    let vat = Vat::default();
    let (p, r) = Promise::pair();
    assert!(matches!(
        r.resolve(&vat, p.clone().into(), true),
        Err(RefError::RefLoop)
    ));
    assert!(p.is_switchable());
}

#[test]
fn test_cycle_through_chain_is_ref_loop() {
    init_tracing();
    let vat = Vat::default();
    let refs = RefFacade;
    let (a, ra) = refs.promise();
    let (b, rb) = refs.promise();
    let (c, rc) = refs.promise();

    ra.resolve_strict(&vat, b.clone().into()).unwrap();
    rb.resolve_strict(&vat, c.clone().into()).unwrap();
    assert!(matches!(
        rc.resolve(&vat, a.clone().into(), true),
        Err(RefError::RefLoop)
    ));

    // The loop settles c to a broken reference; the others forward to it.
    let vc = Value::from(c);
    assert!(refs.is_broken(&vc));
    assert_eq!(refs.opt_problem(&vc).unwrap().as_str(), Some(FORWARDING_LOOP));
    assert!(refs.is_broken(&Value::from(a)));
    assert!(rc.is_done());
}

#[test]
fn test_two_promise_cycle() {
    let vat = Vat::default();
    let (a, ra) = Promise::pair();
    let (b, rb) = Promise::pair();

    ra.resolve_strict(&vat, b.clone().into()).unwrap();
    // b -> a -> b: a's single hop lands on b itself
    assert!(matches!(
        rb.resolve(&vat, a.into(), true),
        Err(RefError::RefLoop)
    ));
    assert!(b.is_switchable());
}

#[test]
fn test_buffered_sends_replay_in_order() {
    init_tracing();
    let vat = Vat::default();
    let refs = RefFacade;
    let (p, r) = refs.promise();
    let account = Account::new();
    let promise = Value::from(p.clone());

    let receipts: Vec<Value> = (1..=3)
        .map(|n| vat.send(promise.clone(), Selector::new("deposit", 1), vec![Value::Int(n)]))
        .collect();
    vat.run_until_idle();

    // Nothing reaches the account before resolution.
    assert_eq!(p.pending_len(), 3);
    assert!(account.deposits.borrow().is_empty());

    r.resolve_strict(&vat, Value::Object(account.clone())).unwrap();
    assert_eq!(p.pending_len(), 0);
    vat.run_until_idle();

    assert_eq!(*account.deposits.borrow(), vec![1, 2, 3]);
    let balances: Vec<i64> = receipts
        .iter()
        .map(|receipt| refs.fulfillment(receipt).unwrap().as_int().unwrap())
        .collect();
    assert_eq!(balances, vec![1, 3, 6]);
}

#[test]
fn test_sends_after_resolution_forward_directly() {
    let vat = Vat::default();
    let refs = RefFacade;
    let (p, r) = refs.promise();
    let account = Account::new();
    r.resolve_strict(&vat, Value::Object(account.clone())).unwrap();

    let promise = Value::from(p.clone());
    let balance = vat
        .call(&promise, &Selector::new("deposit", 1), &[Value::Int(10)])
        .unwrap();
    assert_eq!(balance.as_int(), Some(10));

    let receipt = vat.send(promise, Selector::new("deposit", 1), vec![Value::Int(5)]);
    vat.run_until_idle();
    assert_eq!(refs.fulfillment(&receipt).unwrap().as_int(), Some(15));
    assert_eq!(p.pending_len(), 0);
}

#[test]
fn test_buffered_send_to_broken_target_breaks_receipt() {
    let vat = Vat::default();
    let refs = RefFacade;
    let (p, r) = refs.promise();

    let receipt = vat.send(p.into(), Selector::new("deposit", 1), vec![Value::Int(1)]);
    vat.run_until_idle();
    r.smash(&vat, Value::from("account closed")).unwrap();
    vat.run_until_idle();

    assert!(refs.is_broken(&receipt));
    assert_eq!(refs.opt_problem(&receipt).unwrap().as_str(), Some("account closed"));
}

#[test]
fn test_sends_through_forwarding_chain() {
    let vat = Vat::default();
    let refs = RefFacade;
    let (p1, r1) = refs.promise();
    let (p2, r2) = refs.promise();
    let account = Account::new();

    let first = vat.send(p1.clone().into(), Selector::new("deposit", 1), vec![Value::Int(2)]);
    vat.run_until_idle();
    r1.resolve_strict(&vat, p2.clone().into()).unwrap();
    vat.run_until_idle();

    // Replayed onto p2, which buffers it in turn.
    assert_eq!(p2.pending_len(), 1);
    let second = vat.send(p1.into(), Selector::new("deposit", 1), vec![Value::Int(3)]);
    vat.run_until_idle();
    assert_eq!(p2.pending_len(), 2);

    r2.resolve_strict(&vat, Value::Object(account.clone())).unwrap();
    vat.run_until_idle();

    assert_eq!(*account.deposits.borrow(), vec![2, 3]);
    assert_eq!(refs.fulfillment(&first).unwrap().as_int(), Some(2));
    assert_eq!(refs.fulfillment(&second).unwrap().as_int(), Some(5));
}

const DEEP_CHAIN: usize = 200_000;

/// Build `head -> p1 -> ... -> tail -> 1`, keeping only the head alive.
fn deep_chain(vat: &Vat, hops: usize) -> Promise {
    let (head, mut resolver) = Promise::pair();
    for _ in 0..hops {
        let (next, next_resolver) = Promise::pair();
        resolver.resolve_strict(vat, next.into()).unwrap();
        resolver = next_resolver;
    }
    resolver.resolve_strict(vat, Value::Int(1)).unwrap();
    head
}

#[test]
fn test_long_chain_collapses() {
    let vat = Vat::default();
    let refs = RefFacade;
    let pairs: Vec<(Promise, Resolver)> = (0..200).map(|_| refs.promise()).collect();

    // Each promise forwards to the next one, resolved tail-first.
    for i in (0..pairs.len() - 1).rev() {
        pairs[i]
            .1
            .resolve_strict(&vat, pairs[i + 1].0.clone().into())
            .unwrap();
    }
    let (last, last_resolver) = pairs.last().unwrap();
    last_resolver.resolve_strict(&vat, Value::Int(1)).unwrap();
    assert!(last.target().is_some());

    let head = Value::from(pairs[0].0.clone());
    assert_eq!(refs.fulfillment(&head).unwrap().as_int(), Some(1));
}

#[test]
fn test_deep_chain_resolves_without_recursion() {
    let vat = Vat::default();
    let head = Value::from(deep_chain(&vat, DEEP_CHAIN));
    assert!(RefFacade.is_near(&head));
    assert_eq!(RefFacade.fulfillment(&head).unwrap().as_int(), Some(1));
    drop(head);
}

#[test]
fn test_deep_chain_drops_without_recursion() {
    let vat = Vat::default();
    let head = deep_chain(&vat, DEEP_CHAIN);
    // Never used, so nothing has been shortened.
    assert!(head.target().is_some_and(|t| t.is_reference()));
    drop(head);
    assert!(vat.is_idle());
}
