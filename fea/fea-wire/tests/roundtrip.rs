//! Round-trip regression tests for the wire protocol.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use approx::assert_relative_eq;
use fea_constraint::{
    Constraint, LargeDispMode, MpConstraint, MrmpConstraint, NodalState, RetainedBlock,
    RigidJoint2d, SpConstraint,
};
use fea_domain::{ConstraintDomain, LoadCase, LockCase, Node};
use fea_types::{CaseTag, ConstraintTag, NodeId};
use fea_wire::{apply_state, load_state_bytes, save_state_bytes, snapshot, CaseCatalog};
use nalgebra::DMatrix;

fn seeded_nodes(domain: &mut ConstraintDomain) {
    for (id, x, y) in [(1, 0.0, 0.0), (2, 3.0, 4.0), (3, 6.0, 0.0)] {
        domain.add_node(Node::planar(NodeId::new(id), x, y)).unwrap();
    }
}

fn shared_catalog() -> CaseCatalog {
    let mut catalog = CaseCatalog::new();

    let mut load = LoadCase::new(CaseTag::new(1)).with_name("service");
    load.add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(3), 0))
        .unwrap();
    catalog.add_load_case(load).unwrap();

    let mut lock = LockCase::new(CaseTag::new(2));
    lock.add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 1))
        .unwrap();
    catalog.add_lock_case(lock).unwrap();

    catalog
}

fn populated_sender() -> ConstraintDomain {
    let mut domain = ConstraintDomain::new();
    seeded_nodes(&mut domain);

    domain
        .add_sp(SpConstraint::new(ConstraintTag::new(1), NodeId::new(1), 0, 0.02))
        .unwrap();
    domain.attach_sp(ConstraintTag::new(1)).unwrap();

    domain
        .add_mp(RigidJoint2d::new(
            ConstraintTag::new(1),
            NodeId::new(1),
            NodeId::new(2),
            LargeDispMode::TimeVarying,
        ))
        .unwrap();
    domain.attach_mp(ConstraintTag::new(1)).unwrap();

    domain
        .add_mp(
            MpConstraint::new(
                ConstraintTag::new(2),
                NodeId::new(3),
                NodeId::new(1),
                vec![0],
                vec![0, 1],
                DMatrix::from_row_slice(1, 2, &[0.5, -0.5]),
            )
            .unwrap(),
        )
        .unwrap();
    domain.attach_mp(ConstraintTag::new(2)).unwrap();

    domain
        .add_mrmp(
            MrmpConstraint::new(
                ConstraintTag::new(1),
                NodeId::new(3),
                vec![0, 1],
                vec![
                    RetainedBlock::new(NodeId::new(1), vec![0, 1]),
                    RetainedBlock::new(NodeId::new(2), vec![0]),
                ],
                DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.5, 0.0, 1.0, -0.5]),
            )
            .unwrap(),
        )
        .unwrap();
    domain.attach_mrmp(ConstraintTag::new(1)).unwrap();

    let catalog = shared_catalog();
    domain
        .add_load_case(catalog.load_case(CaseTag::new(1)).unwrap().clone())
        .unwrap();
    domain
        .add_lock_case(catalog.lock_case(CaseTag::new(2)).unwrap().clone())
        .unwrap();

    domain
}

#[test]
fn roundtrip_preserves_stores_and_mounts() {
    let sender = populated_sender();
    let bytes = save_state_bytes(&snapshot(&sender)).unwrap();

    let mut receiver = ConstraintDomain::new();
    seeded_nodes(&mut receiver);
    apply_state(
        &mut receiver,
        &shared_catalog(),
        load_state_bytes(&bytes).unwrap(),
    );

    // Same tag sets
    assert_eq!(receiver.num_sps(), sender.num_sps());
    assert_eq!(receiver.num_mps(), sender.num_mps());
    assert_eq!(receiver.num_mrmps(), sender.num_mrmps());

    // Same per-constraint node references
    let sp = receiver.sp(ConstraintTag::new(1)).unwrap();
    assert_eq!(sp.node(), NodeId::new(1));
    assert_relative_eq!(sp.value(), 0.02, epsilon = 1e-15);
    assert!(sp.is_attached());

    let joint = receiver.mp(ConstraintTag::new(1)).unwrap();
    assert_eq!(joint.constrained_node(), NodeId::new(2));
    assert_eq!(joint.retained_node(), NodeId::new(1));

    // Same coefficient-matrix contents
    for tag in [ConstraintTag::new(1), ConstraintTag::new(2)] {
        assert_eq!(
            receiver.mp(tag).unwrap().matrix(),
            sender.mp(tag).unwrap().matrix()
        );
    }
    assert_eq!(
        receiver.mrmp(ConstraintTag::new(1)).unwrap().matrix(),
        sender.mrmp(ConstraintTag::new(1)).unwrap().matrix()
    );

    // Case registries re-mounted by tag from the receiver's catalog
    assert_eq!(receiver.num_load_cases(), 1);
    assert_eq!(receiver.num_lock_cases(), 1);
    assert_eq!(
        receiver.load_case(CaseTag::new(1)).unwrap().name(),
        Some("service")
    );
    assert_eq!(receiver.num_mounted_case_sps(), sender.num_mounted_case_sps());
}

#[test]
fn receiver_back_references_rebuilt() {
    let sender = populated_sender();
    let bytes = save_state_bytes(&snapshot(&sender)).unwrap();

    let mut receiver = ConstraintDomain::new();
    seeded_nodes(&mut receiver);
    apply_state(
        &mut receiver,
        &shared_catalog(),
        load_state_bytes(&bytes).unwrap(),
    );

    for node in [NodeId::new(1), NodeId::new(2), NodeId::new(3)] {
        assert_eq!(receiver.tags_for_node(node), sender.tags_for_node(node));
    }
}

#[test]
fn roundtrip_joint_still_updates() {
    let sender = populated_sender();
    let bytes = save_state_bytes(&snapshot(&sender)).unwrap();

    let mut receiver = ConstraintDomain::new();
    seeded_nodes(&mut receiver);
    apply_state(
        &mut receiver,
        &shared_catalog(),
        load_state_bytes(&bytes).unwrap(),
    );

    receiver
        .nodes_mut()
        .set_trial_displacement(NodeId::new(2), 1, 2.0)
        .unwrap();
    receiver.nodes_mut().commit_all();
    receiver.apply_load(1.0);

    let joint = receiver.mp(ConstraintTag::new(1)).unwrap();
    // Offset grew from (3, 4) to (3, 6)
    assert_relative_eq!(joint.matrix()[(0, 2)], -6.0, epsilon = 1e-12);
    assert_relative_eq!(joint.matrix()[(1, 2)], 3.0, epsilon = 1e-12);
}
