// ── Controller device group forest ──
//
// Arena of group records keyed by `GroupId`, with parent/child links
// held as ids. Sibling lists are kept sorted by (weight, name, id) so
// traversal never sorts. Every structural change bumps `version`,
// which keys the query cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::error::InventoryError;
use crate::model::{ControllerDeviceGroup, ControllerId, EntityRef, GroupId};
use crate::store::collection::Collection;

/// Every controller's group tree, in one arena.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    pub(crate) groups: Collection<ControllerDeviceGroup>,

    /// Top-level groups per controller, sibling-ordered.
    roots: HashMap<ControllerId, Vec<GroupId>>,

    /// Child lists per group, sibling-ordered.
    children: HashMap<GroupId, Vec<GroupId>>,

    /// Hierarchy version, bumped on every structural change.
    version: u64,
}

impl Forest {
    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &GroupId) -> Option<&Arc<ControllerDeviceGroup>> {
        self.groups.get(id)
    }

    pub fn contains(&self, id: &GroupId) -> bool {
        self.groups.contains(id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Top-level groups of one controller in sibling order.
    pub fn roots(&self, controller: ControllerId) -> impl Iterator<Item = &Arc<ControllerDeviceGroup>> {
        self.resolve(self.roots.get(&controller))
    }

    /// Direct children of a group in sibling order.
    pub fn children(&self, node: GroupId) -> impl Iterator<Item = &Arc<ControllerDeviceGroup>> {
        self.resolve(self.children.get(&node))
    }

    pub fn has_children(&self, node: &GroupId) -> bool {
        self.children.get(node).is_some_and(|c| !c.is_empty())
    }

    /// Ancestors of `node`, nearest parent first. Excludes `node`.
    pub fn ancestors(&self, node: &GroupId) -> Ancestors<'_> {
        Ancestors {
            forest: self,
            next: self.groups.get(node).and_then(|g| g.parent),
            remaining: self.groups.len(),
        }
    }

    /// Depth of `node` below its root (roots are depth 0).
    pub fn depth(&self, node: &GroupId) -> usize {
        self.ancestors(node).count()
    }

    /// `node` and all of its descendants, depth-first in sibling order.
    ///
    /// Lazy and restartable: each call walks the arena afresh, and the
    /// returned iterator can be cloned and replayed.
    pub fn subtree(&self, node: &GroupId) -> Subtree<'_> {
        let stack = if self.groups.contains(node) {
            vec![*node]
        } else {
            Vec::new()
        };
        Subtree {
            forest: self,
            stack,
        }
    }

    /// Every group of one controller, depth-first from its roots.
    pub fn forest_of(&self, controller: &ControllerId) -> Subtree<'_> {
        let stack = self
            .roots
            .get(controller)
            .map(|r| r.iter().rev().copied().collect())
            .unwrap_or_default();
        Subtree {
            forest: self,
            stack,
        }
    }

    /// Whether `candidate` is `node` or lies below it.
    pub fn is_descendant_or_self(&self, candidate: &GroupId, node: &GroupId) -> bool {
        candidate == node || self.ancestors(candidate).any(|a| a.id == *node)
    }

    // ── Checks ───────────────────────────────────────────────────────

    /// Validate `attach(parent, child)` without applying it.
    pub(crate) fn check_attach(&self, parent: &GroupId, child: &GroupId) -> Result<(), InventoryError> {
        let child_group = self.groups.get(child).ok_or(InventoryError::NotFound {
            entity: EntityRef::ControllerDeviceGroup(*child),
        })?;
        let parent_group = self.groups.get(parent).ok_or(InventoryError::ReferentialIntegrity {
            entity: EntityRef::ControllerDeviceGroup(*child),
            target: EntityRef::ControllerDeviceGroup(*parent),
        })?;

        if self.is_descendant_or_self(parent, child) {
            return Err(InventoryError::Cycle {
                parent: EntityRef::ControllerDeviceGroup(*parent),
                child: EntityRef::ControllerDeviceGroup(*child),
            });
        }
        if parent_group.controller != child_group.controller {
            return Err(InventoryError::CrossController {
                parent: EntityRef::ControllerDeviceGroup(*parent),
                parent_controller: parent_group.controller,
                child: EntityRef::ControllerDeviceGroup(*child),
                child_controller: child_group.controller,
            });
        }
        Ok(())
    }

    // ── Writes (callers validate first) ──────────────────────────────

    /// Insert a new group, or replace an existing one and re-slot it.
    pub(crate) fn upsert(&mut self, key: Option<String>, group: ControllerDeviceGroup) {
        if let Some(existing) = self.groups.get(&group.id).cloned() {
            self.unlink(&existing);
        }
        self.link(&group);
        self.groups.upsert(key, group);
        self.version += 1;
    }

    /// Re-parent `child` under `parent`. Detach and attach happen as one step.
    pub(crate) fn attach(&mut self, parent: GroupId, child: &GroupId) {
        self.restructure(child, |g| g.parent = Some(parent));
    }

    /// Make `node` a root of its controller's forest.
    pub(crate) fn detach(&mut self, node: &GroupId) {
        self.restructure(node, |g| g.parent = None);
    }

    pub(crate) fn reorder(&mut self, node: &GroupId, weight: i32) {
        self.restructure(node, |g| g.weight = weight);
    }

    /// Remove `node` and everything below it. Returns the removed groups.
    pub(crate) fn remove_subtree(&mut self, node: &GroupId) -> Vec<Arc<ControllerDeviceGroup>> {
        let ids: Vec<GroupId> = self.subtree(node).map(|g| g.id).collect();
        if let Some(top) = self.groups.get(node).cloned() {
            self.unlink(&top);
        }
        let removed = ids
            .iter()
            .filter_map(|id| {
                self.children.remove(id);
                self.groups.remove(id)
            })
            .collect::<Vec<_>>();
        if !removed.is_empty() {
            self.version += 1;
        }
        removed
    }

    /// Remove every group owned by `controller`.
    pub(crate) fn remove_controller(&mut self, controller: &ControllerId) -> Vec<Arc<ControllerDeviceGroup>> {
        let roots = self.roots.get(controller).cloned().unwrap_or_default();
        roots.iter().flat_map(|root| self.remove_subtree(root)).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn resolve<'a>(
        &'a self,
        ids: Option<&'a Vec<GroupId>>,
    ) -> impl Iterator<Item = &'a Arc<ControllerDeviceGroup>> + 'a {
        ids.into_iter().flatten().filter_map(|id| self.groups.get(id))
    }

    fn restructure(&mut self, id: &GroupId, edit: impl FnOnce(&mut ControllerDeviceGroup)) {
        let Some(current) = self.groups.get(id) else {
            return;
        };
        let mut next = ControllerDeviceGroup::clone(current);
        edit(&mut next);
        next.last_updated = Utc::now();
        let key = self.groups.key_of(id);
        self.upsert(key, next);
    }

    fn link(&mut self, group: &ControllerDeviceGroup) {
        let key = group.sibling_key();
        let siblings = match group.parent {
            Some(parent) => self.children.entry(parent).or_default(),
            None => self.roots.entry(group.controller).or_default(),
        };
        let pos = siblings.partition_point(|id| {
            self.groups
                .get(id)
                .is_some_and(|sibling| sibling.sibling_key() < key)
        });
        siblings.insert(pos, group.id);
    }

    fn unlink(&mut self, group: &ControllerDeviceGroup) {
        match group.parent {
            Some(parent) => {
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.retain(|id| *id != group.id);
                    if siblings.is_empty() {
                        self.children.remove(&parent);
                    }
                }
            }
            None => {
                if let Some(siblings) = self.roots.get_mut(&group.controller) {
                    siblings.retain(|id| *id != group.id);
                    if siblings.is_empty() {
                        self.roots.remove(&group.controller);
                    }
                }
            }
        }
    }
}

// ── Iterators ───────────────────────────────────────────────────────

/// Walk from a group's parent up to its root.
///
/// Bounded by the arena size so a corrupted parent chain can never
/// loop forever.
#[derive(Clone)]
pub struct Ancestors<'a> {
    forest: &'a Forest,
    next: Option<GroupId>,
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Arc<ControllerDeviceGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let group = self.forest.groups.get(&self.next?)?;
        self.remaining -= 1;
        self.next = group.parent;
        Some(group)
    }
}

/// Depth-first pre-order walk in sibling order.
#[derive(Clone)]
pub struct Subtree<'a> {
    forest: &'a Forest,
    stack: Vec<GroupId>,
}

impl<'a> Iterator for Subtree<'a> {
    type Item = &'a Arc<ControllerDeviceGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            let Some(group) = self.forest.groups.get(&id) else {
                continue;
            };
            if let Some(children) = self.forest.children.get(&id) {
                self.stack.extend(children.iter().rev().copied());
            }
            return Some(group);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn group(controller: ControllerId, name: &str, parent: Option<GroupId>, weight: i32) -> ControllerDeviceGroup {
        let now = Utc::now();
        ControllerDeviceGroup {
            id: GroupId::generate(),
            name: name.into(),
            controller,
            parent,
            weight,
            description: String::new(),
            created: now,
            last_updated: now,
        }
    }

    fn add(forest: &mut Forest, g: ControllerDeviceGroup) -> GroupId {
        let id = g.id;
        let key = g.name.clone();
        forest.upsert(Some(key), g);
        id
    }

    fn names<'a>(it: impl Iterator<Item = &'a Arc<ControllerDeviceGroup>>) -> Vec<String> {
        it.map(|g| g.name.clone()).collect()
    }

    #[test]
    fn siblings_order_by_weight_then_name() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        add(&mut f, group(c, "zeta", None, 100));
        add(&mut f, group(c, "beta", None, 200));
        add(&mut f, group(c, "alpha", None, 200));

        assert_eq!(names(f.roots(c)), ["zeta", "alpha", "beta"]);
    }

    #[test]
    fn subtree_is_depth_first_preorder() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let root = add(&mut f, group(c, "root", None, 1000));
        let b = add(&mut f, group(c, "b", Some(root), 1000));
        add(&mut f, group(c, "a", Some(root), 1000));
        add(&mut f, group(c, "b1", Some(b), 1000));

        assert_eq!(names(f.subtree(&root)), ["root", "a", "b", "b1"]);
        assert_eq!(names(f.subtree(&b)), ["b", "b1"]);
    }

    #[test]
    fn subtree_is_restartable() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let root = add(&mut f, group(c, "root", None, 1000));
        add(&mut f, group(c, "x", Some(root), 1000));

        let walk = f.subtree(&root);
        let first: Vec<_> = walk.clone().map(|g| g.id).collect();
        let second: Vec<_> = walk.map(|g| g.id).collect();
        let third: Vec<_> = f.subtree(&root).map(|g| g.id).collect();
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn ancestors_walk_to_root() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let root = add(&mut f, group(c, "root", None, 1000));
        let mid = add(&mut f, group(c, "mid", Some(root), 1000));
        let leaf = add(&mut f, group(c, "leaf", Some(mid), 1000));

        assert_eq!(names(f.ancestors(&leaf)), ["mid", "root"]);
        assert_eq!(f.depth(&leaf), 2);
        assert_eq!(f.depth(&root), 0);
    }

    #[test]
    fn attach_rejects_self_and_descendants() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let root = add(&mut f, group(c, "root", None, 1000));
        let leaf = add(&mut f, group(c, "leaf", Some(root), 1000));

        assert!(matches!(f.check_attach(&root, &root), Err(InventoryError::Cycle { .. })));
        assert!(matches!(f.check_attach(&leaf, &root), Err(InventoryError::Cycle { .. })));
    }

    #[test]
    fn attach_rejects_cross_controller() {
        let mut f = Forest::default();
        let a = add(&mut f, group(ControllerId::generate(), "a", None, 1000));
        let b = add(&mut f, group(ControllerId::generate(), "b", None, 1000));

        assert!(matches!(
            f.check_attach(&a, &b),
            Err(InventoryError::CrossController { .. })
        ));
    }

    #[test]
    fn attach_moves_between_parents() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let left = add(&mut f, group(c, "left", None, 1000));
        let right = add(&mut f, group(c, "right", None, 1000));
        let node = add(&mut f, group(c, "node", Some(left), 1000));

        f.check_attach(&right, &node).unwrap();
        f.attach(right, &node);
        assert_eq!(f.children(left).count(), 0);
        assert_eq!(names(f.children(right)), ["node"]);
        assert_eq!(f.get(&node).unwrap().parent, Some(right));
    }

    #[test]
    fn detach_promotes_to_root() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let root = add(&mut f, group(c, "root", None, 1000));
        let node = add(&mut f, group(c, "node", Some(root), 10));

        f.detach(&node);
        assert_eq!(names(f.roots(c)), ["node", "root"]);
        assert!(!f.has_children(&root));
    }

    #[test]
    fn reorder_reslots_sibling() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let a = add(&mut f, group(c, "a", None, 1));
        add(&mut f, group(c, "b", None, 2));

        f.reorder(&a, 3);
        assert_eq!(names(f.roots(c)), ["b", "a"]);
    }

    #[test]
    fn remove_subtree_cascades() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let root = add(&mut f, group(c, "root", None, 1000));
        let mid = add(&mut f, group(c, "mid", Some(root), 1000));
        add(&mut f, group(c, "leaf", Some(mid), 1000));
        add(&mut f, group(c, "other", None, 1000));

        let removed = f.remove_subtree(&mid);
        assert_eq!(removed.len(), 2);
        assert_eq!(names(f.forest_of(&c)), ["other", "root"]);
        assert!(f.groups.get_by_key("leaf").is_none());
    }

    #[test]
    fn every_structural_change_bumps_version() {
        let c = ControllerId::generate();
        let mut f = Forest::default();
        let a = add(&mut f, group(c, "a", None, 1000));
        let v1 = f.version();
        f.reorder(&a, 5);
        let v2 = f.version();
        f.remove_controller(&c);
        assert!(v2 > v1);
        assert!(f.version() > v2);
        assert!(f.is_empty());
    }
}
