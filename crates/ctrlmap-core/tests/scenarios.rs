//! End-to-end inventory scenarios over the public engine API.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use ctrlmap_core::{
    CreateControllerRequest, CreateDeviceRequest, CreateGroupRequest, CreateRedundancyGroupRequest,
    Declarations, DeletePolicy, DeploymentTarget, Inventory, InventoryError, Mutation,
    OwnershipPath, Policy,
};
use pretty_assertions::assert_eq;

const PANORAMA: &str = r"
- kind: device
  asset_tag: PA-0001
  name: dal-fw01
- kind: device
  asset_tag: PA-0002
  name: chi-fw01
- kind: device
  asset_tag: PA-0003
  name: nyc-fw99
- kind: device
  asset_tag: PA-0004
  name: jcy-fw99
- kind: controller
  name: Panorama1
  platform: paloalto-panorama
- kind: controller_device_group
  name: campus
  controller: Panorama1
  devices: [dal-fw01, chi-fw01]
- kind: controller_device_group
  name: dc
  controller: Panorama1
  devices: [nyc-fw99, jcy-fw99]
";

const APIC: &str = r"
- kind: device
  asset_tag: APIC-0001
  name: DC-East-APIC-1
- kind: controller
  name: Cisco ACI APIC - east
  platform: cisco-apic
  deployed_to:
    type: device
    name: DC-East-APIC-1
";

fn loaded(text: &str) -> Inventory {
    let inventory = Inventory::default();
    inventory
        .load(&Declarations::from_yaml(text).unwrap())
        .unwrap();
    inventory
}

#[test]
fn panorama_manages_both_device_groups() {
    let inventory = loaded(PANORAMA);
    let query = inventory.query();
    let snap = query.snapshot();
    let panorama = snap.controller_by_name("Panorama1").unwrap().id;

    let under = query.devices_under_controller(&panorama).unwrap();
    let labels: BTreeSet<&str> = under.managed_labels().into_iter().collect();
    assert_eq!(
        labels,
        BTreeSet::from(["chi-fw01", "dal-fw01", "jcy-fw99", "nyc-fw99"])
    );
    assert_eq!(under.managed.len(), 4);
    assert!(under.deployment.is_empty());

    let dal = snap.device_by_name("dal-fw01").unwrap().id;
    let ownership = query.controllers_managing_device(&dal).unwrap();
    assert_eq!(ownership.via_hierarchy, Some(panorama));
    assert!(ownership.via_deployment.is_empty());
    assert!(!ownership.is_ambiguous());
    assert_eq!(ownership.unique().unwrap(), Some(panorama));
}

#[test]
fn panorama_groups_list_in_name_order() {
    let inventory = loaded(PANORAMA);
    let query = inventory.query();
    let panorama = query.snapshot().controller_by_name("Panorama1").unwrap().id;

    let names: Vec<_> = query
        .groups_under_controller(&panorama)
        .unwrap()
        .map(|g| g.name.clone())
        .collect();
    assert_eq!(names, ["campus", "dc"]);

    let campus = query.snapshot().group_by_name("campus", None).unwrap().unwrap().id;
    assert_eq!(query.controller_managing_group(&campus).unwrap(), panorama);
}

#[test]
fn apic_reports_only_its_deployment_target() {
    let inventory = loaded(APIC);
    let query = inventory.query();
    let apic = query
        .snapshot()
        .controller_by_name("Cisco ACI APIC - east")
        .unwrap()
        .id;

    assert_eq!(query.groups_under_controller(&apic).unwrap().count(), 0);

    let under = query.devices_under_controller(&apic).unwrap();
    assert!(under.managed.is_empty());
    assert_eq!(under.deployment_labels(), ["DC-East-APIC-1"]);
    assert!(matches!(under.deployment_target, DeploymentTarget::Device(_)));

    let host = query.snapshot().device_by_name("DC-East-APIC-1").unwrap().id;
    let ownership = query.controllers_managing_device(&host).unwrap();
    assert_eq!(ownership.via_hierarchy, None);
    assert_eq!(ownership.via_deployment, vec![apic]);
}

#[test]
fn reparenting_under_a_descendant_is_a_cycle_and_changes_nothing() {
    let inventory = Inventory::default();
    let c = inventory
        .create_controller(CreateControllerRequest::named("Panorama1"))
        .unwrap();
    let root = inventory.create_group(CreateGroupRequest::new("root", c)).unwrap();
    let mid = inventory
        .create_group(CreateGroupRequest::new("mid", c).parent(root))
        .unwrap();
    let leaf = inventory
        .create_group(CreateGroupRequest::new("leaf", c).parent(mid))
        .unwrap();

    let before = inventory.snapshot();
    let err = inventory.attach_child(leaf, root).unwrap_err();
    assert_eq!(
        err,
        InventoryError::Cycle {
            parent: leaf.into(),
            child: root.into(),
        }
    );

    let after = inventory.snapshot();
    assert_eq!(after.version(), before.version());
    assert_eq!(after.hierarchy_version(), before.hierarchy_version());
    let walk = |s: &ctrlmap_core::Snapshot| -> Vec<_> { s.forest().subtree(&root).map(|g| g.id).collect() };
    assert_eq!(walk(&after), walk(&before));
    assert_eq!(walk(&after), vec![root, mid, leaf]);
}

#[test]
fn reparent_moves_a_whole_subtree() {
    let inventory = Inventory::default();
    let c = inventory
        .create_controller(CreateControllerRequest::named("c"))
        .unwrap();
    let east = inventory.create_group(CreateGroupRequest::new("east", c)).unwrap();
    let west = inventory.create_group(CreateGroupRequest::new("west", c)).unwrap();
    let branch = inventory
        .create_group(CreateGroupRequest::new("branch", c).parent(east))
        .unwrap();
    let store = inventory
        .create_group(CreateGroupRequest::new("store", c).parent(branch))
        .unwrap();

    inventory.attach_child(west, branch).unwrap();

    let snap = inventory.snapshot();
    let chain: Vec<_> = snap.forest().ancestors(&store).map(|g| g.id).collect();
    assert_eq!(chain, vec![branch, west]);
    assert_eq!(snap.forest().children(east).count(), 0);
}

#[test]
fn attaching_across_controllers_is_rejected() {
    let inventory = Inventory::default();
    let a = inventory
        .create_controller(CreateControllerRequest::named("a"))
        .unwrap();
    let b = inventory
        .create_controller(CreateControllerRequest::named("b"))
        .unwrap();
    let ga = inventory.create_group(CreateGroupRequest::new("ga", a)).unwrap();
    let gb = inventory.create_group(CreateGroupRequest::new("gb", b)).unwrap();

    let err = inventory.attach_child(ga, gb).unwrap_err();
    assert_eq!(
        err,
        InventoryError::CrossController {
            parent: ga.into(),
            parent_controller: a,
            child: gb.into(),
            child_controller: b,
        }
    );
}

#[test]
fn hierarchy_and_deployment_disagree() {
    let inventory = loaded(PANORAMA);
    let snap = inventory.snapshot();
    let panorama = snap.controller_by_name("Panorama1").unwrap().id;
    let dal = snap.device_by_name("dal-fw01").unwrap().id;

    let pair = inventory
        .create_redundancy_group(CreateRedundancyGroupRequest::named("dal-ha"))
        .unwrap();
    inventory
        .apply(Mutation::JoinRedundancyGroup {
            device: dal,
            group: pair,
            priority: Some(1),
        })
        .unwrap();
    let mut req = CreateControllerRequest::named("Panorama2");
    req.deployed_to = DeploymentTarget::RedundancyGroup(pair);
    let other = inventory.create_controller(req).unwrap();

    let ownership = inventory.query().controllers_managing_device(&dal).unwrap();
    assert!(ownership.is_ambiguous());
    assert_eq!(ownership.via(OwnershipPath::Hierarchy).unwrap(), Some(panorama));
    assert_eq!(ownership.via(OwnershipPath::Deployment).unwrap(), Some(other));
    assert_eq!(
        ownership.unique().unwrap_err(),
        InventoryError::AmbiguousOwnership {
            device: dal.into(),
            via_hierarchy: Some(panorama),
            via_deployment: vec![other],
        }
    );

    // The deployment relation never leaks into the managed set.
    let under = inventory.query().devices_under_controller(&other).unwrap();
    assert!(under.managed.is_empty());
    assert_eq!(under.deployment_labels(), ["dal-fw01"]);
}

#[test]
fn deleting_a_group_cascades_and_leaves_devices_unmanaged() {
    let inventory = Inventory::default();
    let c = inventory
        .create_controller(CreateControllerRequest::named("c"))
        .unwrap();
    let root = inventory.create_group(CreateGroupRequest::new("root", c)).unwrap();
    let child = inventory
        .create_group(CreateGroupRequest::new("child", c).parent(root))
        .unwrap();
    let mut req = CreateDeviceRequest::tagged("T-1", "fw");
    req.controller_group = Some(child);
    let device = inventory.create_device(req).unwrap();

    inventory.apply(Mutation::DeleteGroup { id: root }).unwrap();

    let snap = inventory.snapshot();
    assert_eq!(snap.group_count(), 0);
    assert_eq!(snap.group_of(&device).unwrap(), None);
    assert!(snap.device(&device).is_some());
}

#[test]
fn restricted_device_delete_names_deployed_controllers() {
    let mut policy = Policy::default();
    policy.references.device_deployments = DeletePolicy::Restrict;
    let inventory = Inventory::new(policy).unwrap();
    let host = inventory
        .create_device(CreateDeviceRequest::tagged("APIC-1", "DC-East-APIC-1"))
        .unwrap();
    let mut req = CreateControllerRequest::named("apic");
    req.deployed_to = DeploymentTarget::Device(host);
    let apic = inventory.create_controller(req).unwrap();

    let err = inventory.apply(Mutation::DeleteDevice { id: host }).unwrap_err();
    assert_eq!(
        err,
        InventoryError::DeleteRestricted {
            entity: host.into(),
            referenced_by: vec![apic.into()],
        }
    );
}

#[test]
fn failed_batch_leaves_inventory_untouched() {
    let inventory = loaded(APIC);
    let before = inventory.snapshot();

    let bad = Declarations::from_yaml(
        r"
- kind: controller
  name: Panorama1
- kind: controller_device_group
  name: campus
  controller: Panorama1
  devices: [no-such-device]
",
    )
    .unwrap();
    let err = inventory.load(&bad).unwrap_err();
    assert!(matches!(err, InventoryError::BulkLoad { position: 2, .. }));

    let after = inventory.snapshot();
    assert_eq!(after.version(), before.version());
    assert!(after.controller_by_name("Panorama1").is_none());
}
