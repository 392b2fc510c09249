// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use serde::Serialize;
use snaps_types::{Device, SubvolId, Subvolume};

/// The subvolume forest of one device.
///
/// Subvolumes live in an arena; parent, child and origin references
/// are arena indices. The whole tree is rebuilt on every refresh, so
/// indices never outlive a rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceTree {
    pub device: Device,
    nodes: Vec<Subvolume>,
    /// Depth-0 subvolumes, ordered by the mount correlator.
    pub roots: Vec<SubvolId>,
    pub by_path: BTreeMap<String, SubvolId>,
    pub by_ident: BTreeMap<u64, SubvolId>,
}

impl DeviceTree {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            nodes: Vec::new(),
            roots: Vec::new(),
            by_path: BTreeMap::new(),
            by_ident: BTreeMap::new(),
        }
    }

    /// Insert a subvolume, linking it under its parent when the parent
    /// is already present; otherwise it becomes a depth-0 root.
    pub fn insert(&mut self, mut subvol: Subvolume) -> SubvolId {
        let id = SubvolId(self.nodes.len());
        if let Some(&parent) = self.by_ident.get(&subvol.parent_ident) {
            subvol.depth = self.nodes[parent.0].depth + 1;
            subvol.parent = Some(parent);
            self.nodes[parent.0].children.push(id);
        } else {
            self.roots.push(id);
        }
        self.by_ident.insert(subvol.ident, id);
        self.by_path.insert(subvol.path.clone(), id);
        self.nodes.push(subvol);
        id
    }

    pub fn get(&self, id: SubvolId) -> &Subvolume {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: SubvolId) -> &mut Subvolume {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SubvolId> + use<> {
        (0..self.nodes.len()).map(SubvolId)
    }

    /// Parents before children, siblings in child-list order.
    pub fn top_down(&self, root: SubvolId) -> Vec<SubvolId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.get(id).children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Children before parents, siblings in child-list order. This is
    /// the deletion order: the underlying primitive cannot delete a
    /// subvolume that still has children.
    pub fn bottom_up(&self, root: SubvolId) -> Vec<SubvolId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in &self.get(id).children {
                stack.push(*child);
            }
        }
        order.reverse();
        order
    }

    pub fn sort_roots_by<K: Ord>(&mut self, mut key: impl FnMut(&Subvolume) -> K) {
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by_key(|id| key(&self.nodes[id.0]));
        self.roots = roots;
    }
}
