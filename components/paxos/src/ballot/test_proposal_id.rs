use std::collections::BTreeSet;

use super::*;

#[test]
fn test_node_bits() {
    let cases: Vec<(usize, u32)> = vec![(0, 0), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4)];

    for (n, want) in cases {
        assert_eq!(want, node_bits(n), "n={}", n);
    }
}

#[test]
fn test_proposal_id_layout() {
    let id = ProposalId::new(7, 3, 3);
    assert_eq!(7 * 8 + 3, id.to_wire());
    assert_eq!(7, id.round(3));
    assert_eq!(3, id.node(3));

    assert_eq!(Some(id), ProposalId::from_wire(id.to_wire()));
    assert_eq!(None, ProposalId::from_wire(NO_PROPOSAL));
}

#[test]
fn test_gen_strictly_increasing() {
    let g = ProposalIdGen::new(2, 5);
    let mut last = g.next();
    for _ in 0..100 {
        let id = g.next();
        assert!(id > last, "{} should be greater than {}", id, last);
        assert_eq!(2, id.node(g.node_bits()));
        last = id;
    }
}

#[test]
fn test_gen_unique_across_nodes() {
    let n = 5;
    let gens: Vec<_> = (0..n).map(|i| ProposalIdGen::new(i, n)).collect();

    let mut seen = BTreeSet::new();
    for _ in 0..50 {
        for g in gens.iter() {
            assert!(seen.insert(g.next()));
        }
    }
    assert_eq!(250, seen.len());
}

#[test]
fn test_gen_observe() {
    let a = ProposalIdGen::new(0, 5);
    let b = ProposalIdGen::new(4, 5);

    let high = (0..10).map(|_| b.next()).last().unwrap();

    // a has issued nothing yet, its first id would lose against b.
    a.observe(high);
    let id = a.next();
    assert!(id > high);

    // observing a lower id never moves the counter backwards.
    a.observe(ProposalId::new(1, 1, a.node_bits()));
    assert!(a.next() > id);
}

#[test]
fn test_gen_single_node() {
    let g = ProposalIdGen::new(0, 1);
    assert_eq!(ProposalId::from(1), g.next());
    assert_eq!(ProposalId::from(2), g.next());
}

#[test]
fn test_gen_in_range() {
    let g = ProposalIdGen::new(1, 5);
    let bits = g.node_bits();

    let last = ProposalId::new(max_round(bits) - 1, 4, bits);
    assert!(g.in_range(last));

    let huge = ProposalId::from_wire(i64::MAX).unwrap();
    assert_eq!(max_round(bits), huge.round(bits));
    assert!(!g.in_range(huge));

    g.observe(huge);
    let id = g.next();
    assert_eq!(1, id.round(bits));

    g.observe(last);
    let id = g.next();
    assert_eq!(max_round(bits), id.round(bits));
    assert!(id.to_wire() > 0);
    assert!(id > last);
}
