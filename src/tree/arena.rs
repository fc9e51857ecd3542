//! Owned table of resources.

use super::{Property, ResourceId, ResourceKind, TreeEvent, TreeResult};
use crate::error::TreeError;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: ResourceKind,
    source: String,
    parent: Option<ResourceId>,
    children: Vec<ResourceId>,
    tags: BTreeSet<String>,
    destroyed: bool,
}

impl Node {
    fn new(name: String, kind: ResourceKind) -> Self {
        Self {
            name,
            kind,
            source: String::new(),
            parent: None,
            children: Vec::new(),
            tags: BTreeSet::new(),
            destroyed: false,
        }
    }
}

/// The resource table: identity, content and location of every resource.
///
/// Mutations return the [`TreeEvent`]s they raise; queueing and delivering
/// them is the [`Host`](super::Host)'s job.
///
/// # Examples
///
/// ```rust
/// use hot_reloader::tree::{ResourceKind, ResourceTree};
///
/// let mut tree = ResourceTree::new();
/// let root = tree.root();
/// let (folder, _) = tree.create("Shared", ResourceKind::Folder, Some(root)).unwrap();
/// let (module, _) = tree.create("Inventory", ResourceKind::Module, Some(folder)).unwrap();
///
/// assert!(tree.exists_in_tree(module));
/// assert_eq!(tree.full_name(module).unwrap(), "Shared.Inventory");
/// ```
#[derive(Debug, Clone)]
pub struct ResourceTree {
    nodes: HashMap<ResourceId, Node>,
    root: ResourceId,
    next_id: u64,
}

impl ResourceTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        let root = ResourceId::new(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new("game".to_string(), ResourceKind::Root));
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    /// The fixed root resource.
    pub fn root(&self) -> ResourceId {
        self.root
    }

    fn node(&self, id: ResourceId) -> TreeResult<&Node> {
        self.nodes.get(&id).ok_or(TreeError::UnknownResource(id))
    }

    fn live_node_mut(&mut self, id: ResourceId) -> TreeResult<&mut Node> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(TreeError::UnknownResource(id))?;
        if node.destroyed {
            return Err(TreeError::Destroyed(id));
        }
        Ok(node)
    }

    fn allocate(&mut self, node: Node) -> ResourceId {
        let id = ResourceId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Create a resource, optionally placing it under `parent`.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        kind: ResourceKind,
        parent: Option<ResourceId>,
    ) -> TreeResult<(ResourceId, Vec<TreeEvent>)> {
        if kind == ResourceKind::Root {
            return Err(TreeError::RootLocked);
        }
        if let Some(parent) = parent {
            self.live_node_mut(parent)?;
        }
        let id = self.allocate(Node::new(name.into(), kind));
        let events = match parent {
            Some(parent) => self.set_parent(id, Some(parent))?,
            None => Vec::new(),
        };
        Ok((id, events))
    }

    /// Whether `id` was issued by this tree and has not been destroyed.
    pub fn exists(&self, id: ResourceId) -> bool {
        self.nodes.get(&id).is_some_and(|node| !node.destroyed)
    }

    /// Whether `id` is reachable from the root.
    pub fn exists_in_tree(&self, id: ResourceId) -> bool {
        id == self.root || self.is_ancestor_of(self.root, id)
    }

    /// Whether `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: ResourceId, descendant: ResourceId) -> bool {
        let mut current = self.nodes.get(&descendant).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Name of a resource.
    pub fn name(&self, id: ResourceId) -> TreeResult<&str> {
        Ok(&self.node(id)?.name)
    }

    /// Kind of a resource.
    pub fn kind(&self, id: ResourceId) -> TreeResult<ResourceKind> {
        Ok(self.node(id)?.kind)
    }

    /// Content of a resource.
    pub fn source(&self, id: ResourceId) -> TreeResult<&str> {
        Ok(&self.node(id)?.source)
    }

    /// Current parent, `None` when detached or destroyed.
    pub fn parent(&self, id: ResourceId) -> TreeResult<Option<ResourceId>> {
        Ok(self.node(id)?.parent)
    }

    /// Direct children in insertion order.
    pub fn children(&self, id: ResourceId) -> TreeResult<&[ResourceId]> {
        Ok(&self.node(id)?.children)
    }

    /// All descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: ResourceId) -> TreeResult<Vec<ResourceId>> {
        let mut out = Vec::new();
        let mut stack: Vec<ResourceId> = self.node(id)?.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.nodes.get(&next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Dot-joined path of names from just below the root down to `id`.
    pub fn full_name(&self, id: ResourceId) -> TreeResult<String> {
        let mut names = vec![self.node(id)?.name.as_str()];
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            if parent == self.root {
                break;
            }
            let node = self.node(parent)?;
            names.push(&node.name);
            current = node.parent;
        }
        names.reverse();
        Ok(names.join("."))
    }

    /// Replace the content of a resource.
    pub fn set_source(
        &mut self,
        id: ResourceId,
        source: impl Into<String>,
    ) -> TreeResult<Vec<TreeEvent>> {
        self.live_node_mut(id)?.source = source.into();
        Ok(vec![TreeEvent::Changed {
            resource: id,
            property: Property::Source,
        }])
    }

    /// Rename a resource.
    pub fn rename(&mut self, id: ResourceId, name: impl Into<String>) -> TreeResult<Vec<TreeEvent>> {
        if id == self.root {
            return Err(TreeError::RootLocked);
        }
        self.live_node_mut(id)?.name = name.into();
        Ok(vec![TreeEvent::Changed {
            resource: id,
            property: Property::Name,
        }])
    }

    /// Move `id` under `parent`, or detach it when `parent` is `None`.
    ///
    /// Raises `Changed(Parent)` for `id` and, for every ancestor gained, one
    /// `DescendantAdded` per node of the moved subtree.
    pub fn set_parent(
        &mut self,
        id: ResourceId,
        parent: Option<ResourceId>,
    ) -> TreeResult<Vec<TreeEvent>> {
        if id == self.root {
            return Err(TreeError::RootLocked);
        }
        self.live_node_mut(id)?;
        if let Some(parent) = parent {
            self.live_node_mut(parent)?;
            if parent == id || self.is_ancestor_of(id, parent) {
                return Err(TreeError::WouldCycle {
                    resource: id,
                    parent,
                });
            }
        }

        let old_parent = self.node(id)?.parent;
        if let Some(old) = old_parent {
            if let Some(node) = self.nodes.get_mut(&old) {
                node.children.retain(|child| *child != id);
            }
        }
        self.live_node_mut(id)?.parent = parent;

        let mut events = vec![TreeEvent::Changed {
            resource: id,
            property: Property::Parent,
        }];

        if let Some(parent) = parent {
            self.live_node_mut(parent)?.children.push(id);

            let mut moved = vec![id];
            moved.extend(self.descendants(id)?);
            let mut ancestor = Some(parent);
            while let Some(current) = ancestor {
                events.extend(moved.iter().map(|descendant| TreeEvent::DescendantAdded {
                    ancestor: current,
                    descendant: *descendant,
                }));
                ancestor = self.node(current)?.parent;
            }
        }

        Ok(events)
    }

    /// Deep-copy `id` and its subtree under fresh handles.
    ///
    /// The copy has no parent. Content, names and tags are copied.
    pub fn clone_subtree(&mut self, id: ResourceId) -> TreeResult<ResourceId> {
        if id == self.root {
            return Err(TreeError::RootLocked);
        }
        let node = self.node(id)?;
        if node.destroyed {
            return Err(TreeError::Destroyed(id));
        }

        let mut copy = node.clone();
        copy.parent = None;
        copy.children.clear();
        let children = node.children.clone();

        let copy_id = self.allocate(copy);
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            if let Some(node) = self.nodes.get_mut(&child_copy) {
                node.parent = Some(copy_id);
            }
            if let Some(node) = self.nodes.get_mut(&copy_id) {
                node.children.push(child_copy);
            }
        }
        Ok(copy_id)
    }

    /// Destroy `id` and its subtree, detaching it from its parent.
    ///
    /// Destroyed resources keep only their name and kind; source and tags are
    /// released. Destroying an already destroyed resource is a no-op.
    pub fn destroy(&mut self, id: ResourceId) -> TreeResult<Vec<TreeEvent>> {
        if id == self.root {
            return Err(TreeError::RootLocked);
        }
        if self.node(id)?.destroyed {
            return Ok(Vec::new());
        }

        let mut doomed = vec![id];
        doomed.extend(self.descendants(id)?);

        if let Some(parent) = self.node(id)?.parent {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|child| *child != id);
            }
        }

        let mut events = Vec::with_capacity(doomed.len());
        for resource in doomed {
            if let Some(node) = self.nodes.get_mut(&resource) {
                node.destroyed = true;
                node.parent = None;
                node.children = Vec::new();
                node.source = String::new();
                node.tags = BTreeSet::new();
                events.push(TreeEvent::Changed {
                    resource,
                    property: Property::Parent,
                });
            }
        }
        Ok(events)
    }

    /// Mark a resource with a tag.
    pub fn add_tag(&mut self, id: ResourceId, tag: impl Into<String>) -> TreeResult<()> {
        self.live_node_mut(id)?.tags.insert(tag.into());
        Ok(())
    }

    /// Whether the resource carries `tag`.
    pub fn has_tag(&self, id: ResourceId, tag: &str) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.tags.contains(tag))
    }

    /// Whether `id` or any of its ancestors carries `tag`.
    pub fn has_tagged_ancestor(&self, id: ResourceId, tag: &str) -> bool {
        let mut current = Some(id);
        while let Some(next) = current {
            if self.has_tag(next, tag) {
                return true;
            }
            current = self.nodes.get(&next).and_then(|n| n.parent);
        }
        false
    }
}

impl Default for ResourceTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_under(tree: &mut ResourceTree, name: &str, parent: ResourceId) -> ResourceId {
        tree.create(name, ResourceKind::Module, Some(parent)).unwrap().0
    }

    #[test]
    fn test_create_and_full_name() {
        let mut tree = ResourceTree::new();
        let root = tree.root();
        let (folder, _) = tree.create("Shared", ResourceKind::Folder, Some(root)).unwrap();
        let module = module_under(&mut tree, "Weapons", folder);

        assert_eq!(tree.full_name(module).unwrap(), "Shared.Weapons");
        assert!(tree.is_ancestor_of(root, module));
        assert!(tree.exists_in_tree(module));
        assert_eq!(tree.children(folder).unwrap(), &[module]);
    }

    #[test]
    fn test_set_parent_raises_descendant_added_for_each_ancestor() {
        let mut tree = ResourceTree::new();
        let root = tree.root();
        let (folder, _) = tree.create("Shared", ResourceKind::Folder, Some(root)).unwrap();
        let (module, _) = tree.create("Weapons", ResourceKind::Module, None).unwrap();

        let events = tree.set_parent(module, Some(folder)).unwrap();
        assert_eq!(
            events,
            vec![
                TreeEvent::Changed {
                    resource: module,
                    property: Property::Parent
                },
                TreeEvent::DescendantAdded {
                    ancestor: folder,
                    descendant: module
                },
                TreeEvent::DescendantAdded {
                    ancestor: root,
                    descendant: module
                },
            ]
        );
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut tree = ResourceTree::new();
        let root = tree.root();
        let (outer, _) = tree.create("Outer", ResourceKind::Folder, Some(root)).unwrap();
        let (inner, _) = tree.create("Inner", ResourceKind::Folder, Some(outer)).unwrap();

        let err = tree.set_parent(outer, Some(inner)).unwrap_err();
        assert_eq!(
            err,
            TreeError::WouldCycle {
                resource: outer,
                parent: inner
            }
        );
        assert_eq!(tree.set_parent(root, None).unwrap_err(), TreeError::RootLocked);
    }

    #[test]
    fn test_clone_subtree_is_deep_and_detached() {
        let mut tree = ResourceTree::new();
        let root = tree.root();
        let module = module_under(&mut tree, "Weapons", root);
        let child = module_under(&mut tree, "Sword", module);
        tree.set_source(child, "return 1").unwrap();
        tree.add_tag(module, "Marked").unwrap();

        let copy = tree.clone_subtree(module).unwrap();
        assert_ne!(copy, module);
        assert_eq!(tree.parent(copy).unwrap(), None);
        assert!(tree.has_tag(copy, "Marked"));

        let copied_children = tree.children(copy).unwrap().to_vec();
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children[0], child);
        assert_eq!(tree.source(copied_children[0]).unwrap(), "return 1");
        assert_eq!(tree.parent(copied_children[0]).unwrap(), Some(copy));
    }

    #[test]
    fn test_destroy_tombstones_subtree() {
        let mut tree = ResourceTree::new();
        let root = tree.root();
        let module = module_under(&mut tree, "Weapons", root);
        let child = module_under(&mut tree, "Sword", module);

        let events = tree.destroy(module).unwrap();
        assert_eq!(events.len(), 2);
        assert!(!tree.exists(module));
        assert!(!tree.exists(child));
        assert!(!tree.exists_in_tree(module));
        assert!(tree.children(root).unwrap().is_empty());

        assert_eq!(tree.destroy(module).unwrap(), Vec::new());
        assert_eq!(tree.clone_subtree(module).unwrap_err(), TreeError::Destroyed(module));
        assert_eq!(
            tree.set_source(module, "x").unwrap_err(),
            TreeError::Destroyed(module)
        );
    }

    #[test]
    fn test_destroy_releases_content() {
        let mut tree = ResourceTree::new();
        let root = tree.root();
        let module = module_under(&mut tree, "Weapons", root);
        let child = module_under(&mut tree, "Sword", module);
        tree.set_source(module, "x".repeat(1 << 20)).unwrap();
        tree.set_source(child, "damage = 10").unwrap();
        tree.add_tag(module, "HotReloadTarget").unwrap();

        tree.destroy(module).unwrap();

        assert_eq!(tree.source(module).unwrap(), "");
        assert_eq!(tree.source(child).unwrap(), "");
        assert!(!tree.has_tag(module, "HotReloadTarget"));
        assert_eq!(tree.name(module).unwrap(), "Weapons");
        assert_eq!(tree.kind(child).unwrap(), ResourceKind::Module);
    }

    #[test]
    fn test_has_tagged_ancestor() {
        let mut tree = ResourceTree::new();
        let root = tree.root();
        let module = module_under(&mut tree, "Weapons", root);
        let child = module_under(&mut tree, "Sword", module);

        assert!(!tree.has_tagged_ancestor(child, "Marked"));
        tree.add_tag(module, "Marked").unwrap();
        assert!(tree.has_tagged_ancestor(child, "Marked"));
        assert!(!tree.has_tag(child, "Marked"));
    }

    #[test]
    fn test_unknown_resource() {
        let tree = ResourceTree::new();
        let bogus = ResourceId::new(999);
        assert_eq!(tree.name(bogus).unwrap_err(), TreeError::UnknownResource(bogus));
        assert!(!tree.exists(bogus));
    }
}
