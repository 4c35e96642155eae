//! Read-only view over a loaded skeletal hierarchy
//!
//! The scene graph that owns the rig lives elsewhere (Bevy entities on the
//! viewer side). This module captures just what anchor resolution needs:
//! node names, which nodes are skin joints, and parent/child order. Each node
//! carries an opaque key `K` that maps back to the live scene node.

/// Index of a node within a [`RigTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// A single node of the rig hierarchy
#[derive(Debug, Clone)]
pub struct RigNode<K> {
    pub name: String,
    /// True for skin joints; plain transform nodes are false
    pub is_bone: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub key: K,
}

/// Skeletal hierarchy rooted at node 0
#[derive(Debug, Clone)]
pub struct RigTree<K = ()> {
    nodes: Vec<RigNode<K>>,
}

impl<K> RigTree<K> {
    /// Create a tree containing only the root node
    pub fn new(root_name: impl Into<String>, root_key: K) -> Self {
        Self {
            nodes: vec![RigNode {
                name: root_name.into(),
                is_bone: false,
                parent: None,
                children: Vec::new(),
                key: root_key,
            }],
        }
    }

    /// Append a child under `parent`. Children keep insertion order.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        is_bone: bool,
        key: K,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RigNode {
            name: name.into(),
            is_bone,
            parent: Some(parent),
            children: Vec::new(),
            key,
        });
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&RigNode<K>> {
        self.nodes.get(id.0)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    /// Scene key of the root; the root exists from construction on
    pub fn root_key(&self) -> &K {
        &self.nodes[0].key
    }

    pub fn key(&self, id: NodeId) -> Option<&K> {
        self.node(id).map(|n| &n.key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in depth-first pre-order, starting at the root
    pub fn depth_first(&self) -> DepthFirst<'_, K> {
        DepthFirst {
            tree: self,
            stack: vec![self.root()],
        }
    }

    /// First node in depth-first order matching `pred`
    pub fn find_first<F>(&self, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(&RigNode<K>) -> bool,
    {
        self.depth_first()
            .find(|id| self.node(*id).map(&mut pred).unwrap_or(false))
    }

    /// Chain of node names from the root down to `id`, joined with '/'
    pub fn path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.node(node_id) {
                Some(node) => {
                    names.push(node.name.as_str());
                    current = node.parent;
                }
                None => break,
            }
        }
        names.reverse();
        names.join("/")
    }
}

/// Pre-order iterator returned by [`RigTree::depth_first`]
pub struct DepthFirst<'a, K> {
    tree: &'a RigTree<K>,
    stack: Vec<NodeId>,
}

impl<K> Iterator for DepthFirst<'_, K> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.tree.node(id) {
            // Reverse so the first child is visited first
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}
