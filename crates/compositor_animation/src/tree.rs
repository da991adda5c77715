// SPDX-License-Identifier: MIT OR Apache-2.0
//! Display tree shared by the tree view, the dope sheet and the curve editor.
//!
//! Every row of the tree is an arena entry pointing back at the animation
//! entry it shows, so resolving a row is a map lookup.

use crate::anim_item::{AnimatedItemType, ItemRef};
use compositor_graph::{DimSpec, ViewSetSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Handle of a display tree row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TreeNodeId(u64);

/// Animation entry shown by a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeOwner {
    /// Role of the row
    pub kind: AnimatedItemType,
    /// Entry shown by the row
    pub item: ItemRef,
    /// Views covered by the row
    pub view: ViewSetSpec,
    /// Dimensions covered by the row
    pub dim: DimSpec,
}

impl TreeOwner {
    /// Row covering every view and dimension of an entry
    pub fn whole(kind: AnimatedItemType, item: ItemRef) -> Self {
        Self {
            kind,
            item,
            view: ViewSetSpec::All,
            dim: DimSpec::All,
        }
    }
}

/// One display row
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Parent row, `None` for top-level rows
    pub parent: Option<TreeNodeId>,
    /// Child rows in display order
    pub children: Vec<TreeNodeId>,
    /// Displayed text
    pub label: String,
    /// Whether the row itself is shown
    pub visible: bool,
    /// Entry shown by the row
    pub owner: TreeOwner,
}

/// Arena of display rows
#[derive(Debug, Clone, Default)]
pub struct DisplayTree {
    entries: IndexMap<TreeNodeId, TreeEntry>,
    roots: Vec<TreeNodeId>,
    next_id: u64,
}

impl DisplayTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row under `parent`, or at the top level
    pub fn insert(&mut self, parent: Option<TreeNodeId>, label: impl Into<String>, owner: TreeOwner) -> TreeNodeId {
        let id = TreeNodeId(self.next_id);
        self.next_id += 1;
        let parent = parent.filter(|p| self.entries.contains_key(p));
        self.entries.insert(
            id,
            TreeEntry {
                parent,
                children: Vec::new(),
                label: label.into(),
                visible: true,
                owner,
            },
        );
        match parent.and_then(|p| self.entries.get_mut(&p)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Remove a row and its descendants, children first
    pub fn remove_subtree(&mut self, id: TreeNodeId) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        for child in entry.children.clone() {
            self.remove_subtree(child);
        }
        self.detach(id);
        self.entries.shift_remove(&id);
    }

    fn detach(&mut self, id: TreeNodeId) {
        let parent = self.entries.get(&id).and_then(|e| e.parent);
        match parent.and_then(|p| self.entries.get_mut(&p)) {
            Some(p) => p.children.retain(|c| *c != id),
            None => self.roots.retain(|c| *c != id),
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: TreeNodeId, id: TreeNodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.entries.get(&c).and_then(|e| e.parent);
        }
        false
    }

    /// Move a row under another parent. Returns false when the move would create a cycle.
    pub fn reparent(&mut self, id: TreeNodeId, parent: Option<TreeNodeId>) -> bool {
        if !self.entries.contains_key(&id) {
            return false;
        }
        if let Some(p) = parent {
            if !self.entries.contains_key(&p) || self.is_ancestor(id, p) {
                return false;
            }
        }
        if self.entries.get(&id).map(|e| e.parent) == Some(parent) {
            return true;
        }
        self.detach(id);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.parent = parent;
        }
        match parent.and_then(|p| self.entries.get_mut(&p)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        true
    }

    /// Get a row
    pub fn entry(&self, id: TreeNodeId) -> Option<&TreeEntry> {
        self.entries.get(&id)
    }

    /// Entry shown by a row
    pub fn find_item(&self, id: TreeNodeId) -> Option<TreeOwner> {
        self.entries.get(&id).map(|e| e.owner)
    }

    /// Parent of a row
    pub fn parent(&self, id: TreeNodeId) -> Option<TreeNodeId> {
        self.entries.get(&id)?.parent
    }

    /// Children of a row
    pub fn children(&self, id: TreeNodeId) -> &[TreeNodeId] {
        self.entries.get(&id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Top-level rows
    pub fn roots(&self) -> &[TreeNodeId] {
        &self.roots
    }

    /// Change the displayed text of a row
    pub fn set_label(&mut self, id: TreeNodeId, label: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.label = label.into();
        }
    }

    /// Set the visibility of a row
    pub fn set_visible(&mut self, id: TreeNodeId, visible: bool) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.visible = visible;
        }
    }

    /// Whether a row is shown
    pub fn is_visible(&self, id: TreeNodeId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.visible)
    }

    /// Whether a row and all its ancestors are shown
    pub fn is_item_visible_recursive(&self, id: TreeNodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.entries.get(&c) {
                Some(entry) if entry.visible => current = entry.parent,
                _ => return false,
            }
        }
        true
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no row
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim_item::NodeAnimId;

    fn owner() -> TreeOwner {
        TreeOwner::whole(AnimatedItemType::Common, ItemRef::Node(NodeAnimId::new()))
    }

    #[test]
    fn test_remove_subtree() {
        let mut tree = DisplayTree::new();
        let root = tree.insert(None, "root", owner());
        let child = tree.insert(Some(root), "child", owner());
        let leaf = tree.insert(Some(child), "leaf", owner());
        tree.remove_subtree(child);
        assert!(tree.entry(leaf).is_none());
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_reparent_refuses_cycles() {
        let mut tree = DisplayTree::new();
        let a = tree.insert(None, "a", owner());
        let b = tree.insert(Some(a), "b", owner());
        assert!(!tree.reparent(a, Some(b)));
        assert!(tree.reparent(b, None));
        assert_eq!(tree.roots(), &[a, b]);
        assert!(tree.reparent(a, Some(b)));
        assert_eq!(tree.parent(a), Some(b));
        assert_eq!(tree.roots(), &[b]);
    }

    #[test]
    fn test_visibility_is_inherited() {
        let mut tree = DisplayTree::new();
        let a = tree.insert(None, "a", owner());
        let b = tree.insert(Some(a), "b", owner());
        assert!(tree.is_item_visible_recursive(b));
        tree.set_visible(a, false);
        assert!(tree.is_visible(b));
        assert!(!tree.is_item_visible_recursive(b));
    }
}
