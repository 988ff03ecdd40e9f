//! Property tests for the hierarchy and membership invariants.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};

use ctrlmap_core::{
    ControllerId, CreateControllerRequest, CreateDeviceRequest, CreateGroupRequest, Declaration,
    Declarations, DeviceId, GroupId, Inventory, InventoryError, Mutation,
};
use ctrlmap_core::bulk::{ControllerDeclaration, DeviceDeclaration, GroupDeclaration};
use ctrlmap_core::Status;
use proptest::prelude::*;

// ── Fixtures ────────────────────────────────────────────────────────

const GROUPS: usize = 8;
const DEVICES: usize = 6;

/// Two controllers, four flat groups each, a handful of unplaced devices.
struct Fixture {
    inventory: Inventory,
    groups: Vec<GroupId>,
    devices: Vec<DeviceId>,
}

fn fixture() -> Fixture {
    let inventory = Inventory::default();
    let controllers: Vec<ControllerId> = ["east", "west"]
        .iter()
        .map(|n| inventory.create_controller(CreateControllerRequest::named(*n)).unwrap())
        .collect();
    let groups = (0..GROUPS)
        .map(|i| {
            let controller = controllers[i % controllers.len()];
            inventory
                .create_group(CreateGroupRequest::new(format!("g{i}"), controller))
                .unwrap()
        })
        .collect();
    let devices = (0..DEVICES)
        .map(|i| {
            inventory
                .create_device(CreateDeviceRequest::tagged(format!("T-{i}"), format!("dev{i}")))
                .unwrap()
        })
        .collect();
    Fixture {
        inventory,
        groups,
        devices,
    }
}

// ── Strategies ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum HierarchyOp {
    Attach(usize, usize),
    Detach(usize),
    Reorder(usize, i32),
}

fn hierarchy_op() -> impl Strategy<Value = HierarchyOp> {
    prop_oneof![
        3 => (0..GROUPS, 0..GROUPS).prop_map(|(p, c)| HierarchyOp::Attach(p, c)),
        1 => (0..GROUPS).prop_map(HierarchyOp::Detach),
        1 => (0..GROUPS, -5i32..5).prop_map(|(n, w)| HierarchyOp::Reorder(n, w)),
    ]
}

#[derive(Debug, Clone)]
enum MembershipOp {
    Assign(usize, usize),
    Move(usize, usize),
    Unassign(usize),
}

fn membership_op() -> impl Strategy<Value = MembershipOp> {
    prop_oneof![
        (0..DEVICES, 0..GROUPS).prop_map(|(d, g)| MembershipOp::Assign(d, g)),
        (0..DEVICES, 0..GROUPS).prop_map(|(d, g)| MembershipOp::Move(d, g)),
        (0..DEVICES).prop_map(MembershipOp::Unassign),
    ]
}

fn apply_hierarchy(f: &Fixture, op: &HierarchyOp) -> Result<(), InventoryError> {
    let mutation = match *op {
        HierarchyOp::Attach(p, c) => Mutation::AttachChild {
            parent: f.groups[p],
            child: f.groups[c],
        },
        HierarchyOp::Detach(n) => Mutation::DetachChild { node: f.groups[n] },
        HierarchyOp::Reorder(n, w) => Mutation::Reorder {
            node: f.groups[n],
            weight: w,
        },
    };
    f.inventory.apply(mutation).map(|_| ())
}

// ── Properties ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No sequence of attaches, detaches and reorders ever makes a group
    /// its own ancestor, and a rejected attach changes nothing.
    #[test]
    fn attach_never_creates_a_cycle(ops in prop::collection::vec(hierarchy_op(), 1..40)) {
        let f = fixture();
        for op in &ops {
            let before = f.inventory.snapshot();
            if let Err(err) = apply_hierarchy(&f, op) {
                prop_assert!(matches!(
                    err,
                    InventoryError::Cycle { .. } | InventoryError::CrossController { .. }
                ), "unexpected error: {:?}", err);
                prop_assert_eq!(f.inventory.snapshot().version(), before.version());
            }

            let snap = f.inventory.snapshot();
            prop_assert_eq!(snap.group_count(), GROUPS);
            for id in &f.groups {
                prop_assert!(snap.forest().ancestors(id).all(|a| a.id != *id));
                let controller = snap.group(id).unwrap().controller;
                prop_assert!(snap.forest().ancestors(id).all(|a| a.controller == controller));
            }
        }
    }

    /// `subtree` yields the same ordered sequence every time it is walked.
    #[test]
    fn subtree_is_restartable(ops in prop::collection::vec(hierarchy_op(), 0..30)) {
        let f = fixture();
        for op in &ops {
            let _ = apply_hierarchy(&f, op);
        }
        let snap = f.inventory.snapshot();
        for id in &f.groups {
            let first: Vec<GroupId> = snap.forest().subtree(id).map(|g| g.id).collect();
            let second: Vec<GroupId> = snap.forest().subtree(id).map(|g| g.id).collect();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.first(), Some(id));
        }
    }

    /// A device is never listed as a member of two groups.
    #[test]
    fn device_sits_in_at_most_one_group(ops in prop::collection::vec(membership_op(), 1..40)) {
        let f = fixture();
        for op in &ops {
            let mutation = match *op {
                MembershipOp::Assign(d, g) => Mutation::AssignDeviceGroup {
                    device: f.devices[d],
                    group: f.groups[g],
                },
                MembershipOp::Move(d, g) => Mutation::MoveDevice {
                    device: f.devices[d],
                    group: f.groups[g],
                },
                MembershipOp::Unassign(d) => Mutation::UnassignDeviceGroup { device: f.devices[d] },
            };
            if let Err(err) = f.inventory.apply(mutation) {
                let is_multi = matches!(err, InventoryError::MultiMembership { .. });
                prop_assert!(is_multi);
            }

            let snap = f.inventory.snapshot();
            for device in &f.devices {
                let holding: Vec<GroupId> = f
                    .groups
                    .iter()
                    .filter(|g| snap.group_members(g).iter().any(|d| d.id == *device))
                    .copied()
                    .collect();
                prop_assert!(holding.len() <= 1);
                prop_assert_eq!(holding.first().copied(), snap.group_of(device).unwrap());
            }
        }
    }

    /// Loading declared memberships and querying every controller gives
    /// back exactly what was declared.
    #[test]
    fn bulk_load_round_trips_membership(
        placement in prop::collection::vec(prop::option::of((0usize..2, 0usize..3)), 1..12)
    ) {
        let mut declarations = Declarations::default();
        for (i, _) in placement.iter().enumerate() {
            declarations.push(Declaration::Device(device_declaration(i)));
        }
        for c in 0..2 {
            declarations.push(Declaration::Controller(controller_declaration(c)));
            for g in 0..3 {
                let devices = placement
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| **p == Some((c, g)))
                    .map(|(i, _)| format!("dev{i}"))
                    .collect();
                declarations.push(Declaration::ControllerDeviceGroup(GroupDeclaration {
                    name: format!("c{c}-g{g}"),
                    controller: format!("c{c}"),
                    parent: None,
                    weight: 1000,
                    description: String::new(),
                    devices,
                }));
            }
        }

        let inventory = Inventory::default();
        inventory.load(&declarations).unwrap();
        let query = inventory.query();

        let mut declared: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        for (i, p) in placement.iter().enumerate() {
            if let Some((c, _)) = p {
                declared.entry(*c).or_default().insert(format!("dev{i}"));
            }
        }
        for c in 0..2 {
            let id = query.snapshot().controller_by_name(&format!("c{c}")).unwrap().id;
            let under = query.devices_under_controller(&id).unwrap();
            let found: BTreeSet<String> =
                under.managed_labels().into_iter().map(str::to_owned).collect();
            prop_assert_eq!(under.managed.len(), found.len());
            prop_assert_eq!(found, declared.remove(&c).unwrap_or_default());
        }
    }
}

fn device_declaration(i: usize) -> DeviceDeclaration {
    DeviceDeclaration {
        asset_tag: format!("T-{i}"),
        name: Some(format!("dev{i}")),
        status: Status::Active,
        device_type: None,
        role: None,
        tenant: None,
        platform: None,
        software_version: None,
        serial: None,
        location: None,
        primary_ip4: None,
        primary_ip6: None,
        controller_device_group: None,
        controller: None,
        redundancy_group: None,
        redundancy_group_priority: None,
    }
}

fn controller_declaration(c: usize) -> ControllerDeclaration {
    ControllerDeclaration {
        name: format!("c{c}"),
        status: Status::Active,
        role: None,
        tenant: None,
        description: String::new(),
        platform: None,
        external_integration: None,
        location: None,
        deployed_to: None,
    }
}
