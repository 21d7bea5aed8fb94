//! Pure builders for group trees and user lists
//!
//! Nothing here touches the database: callers pass the groups, the grants
//! of one context and the in-scope actions.

use super::{ActionSet, GroupNode, MAX_RECURSE_DEPTH, PermissionMap, UserPermissionList};
use crate::accounts::Group;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Labels granted to each subject (group or user) in one context
pub type Grants = BTreeMap<i64, BTreeSet<String>>;

/// Every in-scope label mapped to false
pub fn baseline(actions: &ActionSet) -> PermissionMap {
	actions.values().map(|label| (label.clone(), false)).collect()
}

/// Build the group forest for one context
///
/// Roots are groups without a parent. Each node's `inherit` starts from its
/// parent's and gains the node's own grants.
pub fn group_tree(groups: &[Group], grants: &Grants, actions: &ActionSet) -> Vec<GroupNode> {
	if actions.is_empty() {
		return Vec::new();
	}

	let mut children: HashMap<Option<i64>, Vec<&Group>> = HashMap::new();
	for group in groups {
		children.entry(group.inherits).or_default().push(group);
	}

	let base = baseline(actions);
	let mut path = Vec::new();
	branch(&children, grants, &base, None, &base, &mut path)
}

fn branch(
	children: &HashMap<Option<i64>, Vec<&Group>>,
	grants: &Grants,
	base: &PermissionMap,
	parent: Option<i64>,
	inherited: &PermissionMap,
	path: &mut Vec<i64>,
) -> Vec<GroupNode> {
	if path.len() > MAX_RECURSE_DEPTH {
		return Vec::new();
	}
	let Some(members) = children.get(&parent) else {
		return Vec::new();
	};

	let mut nodes = Vec::with_capacity(members.len());
	for group in members {
		if path.contains(&group.id) {
			tracing::warn!(group_id = group.id, "skipping group already on this branch");
			continue;
		}

		let mut perms = base.clone();
		let mut inherit = inherited.clone();
		if let Some(labels) = grants.get(&group.id) {
			for label in labels {
				if let Some(flag) = perms.get_mut(label) {
					*flag = true;
				}
				if let Some(flag) = inherit.get_mut(label) {
					*flag = true;
				}
			}
		}

		path.push(group.id);
		let kids = branch(children, grants, base, Some(group.id), &inherit, path);
		path.pop();

		nodes.push(GroupNode {
			group_id: group.id,
			name: group.name.clone(),
			superuser: group.superuser,
			perms,
			inherit,
			children: kids,
		});
	}
	nodes
}

/// AND-combine per-context trees
///
/// The first non-empty tree is the base. Nodes pair up by group id; a node
/// missing from a later tree counts as all-false, as do its children.
pub fn combine_trees(trees: Vec<Vec<GroupNode>>) -> Vec<GroupNode> {
	let mut iter = trees.into_iter();
	let mut combined = loop {
		match iter.next() {
			Some(tree) if !tree.is_empty() => break tree,
			Some(_) => continue,
			None => return Vec::new(),
		}
	};
	for other in iter {
		and_nodes(&mut combined, Some(&other));
	}
	combined
}

fn and_nodes(nodes: &mut [GroupNode], other: Option<&[GroupNode]>) {
	for node in nodes.iter_mut() {
		let peer = other.and_then(|o| o.iter().find(|n| n.group_id == node.group_id));
		and_map(&mut node.perms, peer.map(|p| &p.perms));
		and_map(&mut node.inherit, peer.map(|p| &p.inherit));
		and_nodes(&mut node.children, peer.map(|p| p.children.as_slice()));
	}
}

fn and_map(map: &mut PermissionMap, other: Option<&PermissionMap>) {
	for (label, flag) in map.iter_mut() {
		let theirs = other.and_then(|o| o.get(label)).copied().unwrap_or(false);
		*flag = *flag && theirs;
	}
}

/// Permission maps for every user holding a direct grant in one context
pub fn user_list(grants: &Grants, actions: &ActionSet) -> UserPermissionList {
	if actions.is_empty() {
		return UserPermissionList::new();
	}
	let base = baseline(actions);
	grants
		.iter()
		.map(|(user_id, labels)| {
			let mut perms = base.clone();
			for label in labels {
				if let Some(flag) = perms.get_mut(label) {
					*flag = true;
				}
			}
			(*user_id, perms)
		})
		.collect()
}

/// AND-combine per-context user lists
///
/// The first non-empty list is the base. Users missing from a later list
/// become all-false; users only present later are not added.
pub fn combine_user_lists(lists: Vec<UserPermissionList>) -> UserPermissionList {
	let mut iter = lists.into_iter();
	let mut combined = loop {
		match iter.next() {
			Some(list) if !list.is_empty() => break list,
			Some(_) => continue,
			None => return UserPermissionList::new(),
		}
	};
	for other in iter {
		for (user_id, perms) in combined.iter_mut() {
			and_map(perms, other.get(user_id));
		}
	}
	combined
}
