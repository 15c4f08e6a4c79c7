//! Tree flattening for templates, groups and anything else with children.
//!
//! [`resolve_tree`] walks a node's children depth-first and returns the
//! descendants before the node itself, so folding the result into a
//! name-keyed map (last write wins) gives the node precedence over
//! everything it builds upon.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::model::{Template, TemplateGroup};

/// A named node that exposes ordered children.
pub trait TreeNode: Clone {
    /// Identity used to detect a node revisiting itself.
    type Id: Eq + Hash;

    /// Kind reported in cycle errors.
    const KIND: &'static str;

    fn node_id(&self) -> Self::Id;

    fn node_name(&self) -> String;

    fn child_nodes(&self) -> TemplateResult<Vec<Self>>;
}

impl<'a> TreeNode for &'a Template {
    type Id = *const Template;

    const KIND: &'static str = "template";

    fn node_id(&self) -> Self::Id {
        *self as *const Template
    }

    fn node_name(&self) -> String {
        self.key()
    }

    fn child_nodes(&self) -> TemplateResult<Vec<Self>> {
        let template: &'a Template = *self;
        Ok(template.children().iter().collect())
    }
}

impl<'a> TreeNode for &'a TemplateGroup {
    type Id = *const TemplateGroup;

    const KIND: &'static str = "group";

    fn node_id(&self) -> Self::Id {
        *self as *const TemplateGroup
    }

    fn node_name(&self) -> String {
        self.key()
    }

    fn child_nodes(&self) -> TemplateResult<Vec<Self>> {
        let group: &'a TemplateGroup = *self;
        Ok(group.children().iter().collect())
    }
}

struct Frame<N> {
    node: N,
    children: std::vec::IntoIter<N>,
}

/// Flatten `root` and its descendants, descendants first and `root` last.
///
/// The walk keeps an explicit stack instead of recursing, and fails with
/// [`TemplateError::Cycle`] as soon as a node is reached again through its
/// own descendants. The same node reached through two separate branches is
/// not a cycle and appears twice.
pub fn resolve_tree<N: TreeNode>(root: N) -> TemplateResult<Vec<N>> {
    let mut ordered = Vec::new();
    let mut on_path: HashSet<N::Id> = HashSet::new();
    let mut stack: Vec<Frame<N>> = Vec::new();

    on_path.insert(root.node_id());
    let children = root.child_nodes()?;
    stack.push(Frame {
        node: root,
        children: children.into_iter(),
    });

    loop {
        let Some(frame) = stack.last_mut() else {
            break;
        };

        if let Some(child) = frame.children.next() {
            let id = child.node_id();
            if on_path.contains(&id) {
                let start = stack
                    .iter()
                    .position(|f| f.node.node_id() == id)
                    .unwrap_or(0);
                let mut chain: Vec<String> =
                    stack[start..].iter().map(|f| f.node.node_name()).collect();
                chain.push(child.node_name());
                return Err(TemplateError::Cycle {
                    kind: N::KIND,
                    chain,
                });
            }

            on_path.insert(id);
            let grandchildren = child.child_nodes()?;
            stack.push(Frame {
                node: child,
                children: grandchildren.into_iter(),
            });
        } else if let Some(done) = stack.pop() {
            on_path.remove(&done.node.node_id());
            ordered.push(done.node);
        }
    }

    debug!("Resolved {} tree with {} node(s)", N::KIND, ordered.len());
    Ok(ordered)
}

/// Flatten `root` and fold the result by name with [`fold_by_name`].
pub fn resolve_tree_map<N: TreeNode>(root: N) -> TemplateResult<IndexMap<String, N>> {
    let mut tree = IndexMap::new();
    for node in resolve_tree(root)? {
        fold_by_name(&mut tree, node.node_name(), node);
    }
    Ok(tree)
}

/// Insert `value` under `name`, moving an existing entry to the end.
///
/// The map stays ordered by precedence: the last entry is always the one
/// registered last. Returns `true` when an entry was replaced.
pub fn fold_by_name<V>(map: &mut IndexMap<String, V>, name: String, value: V) -> bool {
    let replaced = map.shift_remove(&name).is_some();
    map.insert(name, value);
    replaced
}
