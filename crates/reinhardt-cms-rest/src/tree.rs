//! Arena-backed plugin forest
//!
//! Plugins arrive from storage as a flat list ordered by
//! (placeholder, tree path). [`PluginTree::build`] links them into a forest of
//! index-addressed nodes without touching the input rows, and
//! [`PluginTree::build_rooted`] does the same while forcing one node to be a
//! forest root, so a subtree can be rebuilt from `[root, descendants...]`
//! without the root surfacing as its own ancestor.

use crate::models::{BoundPlugin, PluginId};
use std::collections::HashMap;

#[derive(Debug)]
struct TreeNode {
	plugin: BoundPlugin,
	children: Vec<usize>,
}

/// Forest of plugins with parent/child edges stored as arena indices
#[derive(Debug, Default)]
pub struct PluginTree {
	nodes: Vec<TreeNode>,
	index: HashMap<PluginId, usize>,
	roots: Vec<usize>,
}

impl PluginTree {
	/// Build a forest from an ordered flat list
	///
	/// A node is a root when it has no parent or its parent is not part of the
	/// list. Sibling order follows input order. Rows repeating an id already
	/// seen are dropped.
	pub fn build(plugins: Vec<BoundPlugin>) -> Self {
		Self::link(plugins, None)
	}

	/// Build a forest in which `root` is always a forest root
	///
	/// This is the subtree view used when expanding one plugin: the root's
	/// stored parent is ignored, nothing is mutated.
	pub fn build_rooted(root: PluginId, plugins: Vec<BoundPlugin>) -> Self {
		Self::link(plugins, Some(root))
	}

	fn link(plugins: Vec<BoundPlugin>, forced_root: Option<PluginId>) -> Self {
		let mut tree = PluginTree {
			nodes: Vec::with_capacity(plugins.len()),
			index: HashMap::with_capacity(plugins.len()),
			roots: Vec::new(),
		};

		for plugin in plugins {
			let id = plugin.id();
			if tree.index.contains_key(&id) {
				tracing::warn!(plugin_id = id, "duplicate plugin row dropped from tree");
				continue;
			}
			tree.index.insert(id, tree.nodes.len());
			tree.nodes.push(TreeNode {
				plugin,
				children: Vec::new(),
			});
		}

		for idx in 0..tree.nodes.len() {
			let row = &tree.nodes[idx].plugin.row;
			let parent = match row.parent_id {
				_ if forced_root == Some(row.id) => None,
				Some(parent_id) if parent_id == row.id => {
					tracing::warn!(plugin_id = row.id, "plugin is its own parent, treating as root");
					None
				}
				Some(parent_id) => tree.index.get(&parent_id).copied(),
				None => None,
			};

			match parent {
				Some(parent_idx) => tree.nodes[parent_idx].children.push(idx),
				None => tree.roots.push(idx),
			}
		}

		tree
	}

	/// Number of nodes in the arena
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Whether the arena is empty
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Forest roots in input order
	pub fn roots(&self) -> impl Iterator<Item = PluginNode<'_>> {
		self.roots.iter().map(move |&idx| PluginNode { tree: self, idx })
	}

	/// Node for a plugin id
	pub fn get(&self, id: PluginId) -> Option<PluginNode<'_>> {
		self.index
			.get(&id)
			.map(|&idx| PluginNode { tree: self, idx })
	}

	/// Plugin ids in depth-first pre-order, starting from the roots
	///
	/// Nodes unreachable from any root (parent cycles) are not visited.
	pub fn depth_first_ids(&self) -> Vec<PluginId> {
		let mut ids = Vec::with_capacity(self.nodes.len());
		let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
		while let Some(idx) = stack.pop() {
			let node = &self.nodes[idx];
			ids.push(node.plugin.id());
			stack.extend(node.children.iter().rev().copied());
		}
		ids
	}
}

/// Borrowed view of one node in a [`PluginTree`]
#[derive(Debug, Clone, Copy)]
pub struct PluginNode<'a> {
	tree: &'a PluginTree,
	idx: usize,
}

impl<'a> PluginNode<'a> {
	/// The plugin stored at this node
	pub fn plugin(&self) -> &'a BoundPlugin {
		&self.tree.nodes[self.idx].plugin
	}

	/// Direct children in storage order
	pub fn children(&self) -> impl Iterator<Item = PluginNode<'a>> + use<'a> {
		let tree = self.tree;
		tree.nodes[self.idx]
			.children
			.iter()
			.map(move |&idx| PluginNode { tree, idx })
	}

	/// Number of direct children
	pub fn child_count(&self) -> usize {
		self.tree.nodes[self.idx].children.len()
	}
}
