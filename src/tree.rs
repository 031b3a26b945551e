//! In-memory asset tree: node model and mutation.
//!
//! An [`AssetTree`] mirrors one directory of static assets. Nodes live in an
//! arena owned by the tree and refer to each other through [`NodeId`]
//! handles: a parent owns its children via `first_child`, siblings form a
//! doubly-linked chain (`next` / `previous`), and every non-root node keeps a
//! back-reference to its parent. Handles are plain indices, so restructuring
//! the tree (sorted insertion, subtree detachment) never has to break an
//! ownership cycle.
//!
//! ## Invariants
//!
//! After every mutation:
//! - Siblings are sorted ascending by `name`.
//! - `parent.first_child == node` exactly when `node.previous` is `None`,
//!   and `node.next.previous == node` wherever a successor exists.
//! - Only [`NodeKind::Directory`] nodes have children.
//! - `logical_path == parent.logical_path + "/" + name` for every attached
//!   node; the root keeps the ingestion root path. Detached nodes have a
//!   blank `logical_path`.
//! - An [`NodeKind::Image`] node carries exactly one size variant flagged
//!   `original`, whose width is the image's natural pixel width.
//!
//! Violating a method's contract (e.g. overriding content on a directory) is
//! a programming error and panics; recoverable I/O failures are returned.

use std::fs;
use std::io;
use std::path::PathBuf;

/// Name given to every tree root, regardless of the directory it mirrors.
pub const ROOT_NAME: &str = "assets";

/// Handle to a node inside an [`AssetTree`] arena.
///
/// Valid only for the tree that produced it. Detaching a subtree does not
/// invalidate its handles; the nodes simply stay in the arena, off the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a tree node mirrors on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    /// A raster image file. Carries size variants and supports resizing;
    /// otherwise behaves like [`NodeKind::File`].
    Image,
}

/// One rendition of an image node, identified by pixel width.
///
/// Exactly one variant per image has `original == true`; its width is the
/// image's natural width. `materialized` flips once the variant's bytes have
/// been written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeVariant {
    pub width: u32,
    pub original: bool,
    pub materialized: bool,
}

impl SizeVariant {
    /// The variant recorded at ingestion time for the image's natural width.
    pub fn original(width: u32) -> Self {
        Self {
            width,
            original: true,
            materialized: false,
        }
    }
}

/// A node in an [`AssetTree`].
///
/// Fields are public for inspection; use the tree's methods to mutate
/// structure so the sibling-order and link invariants hold.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Leaf name. The root's name is [`ROOT_NAME`].
    pub name: String,
    /// Slash-joined path from, and including, the tree root's path,
    /// regardless of the host OS separator. Blank once detached.
    pub logical_path: String,
    /// Absolute filesystem path backing lazy content reads and, for images,
    /// resizing. `None` for synthetic nodes.
    pub source_path: Option<PathBuf>,
    /// Cached or overridden content. Private so reads go through
    /// [`AssetTree::content`].
    content: Option<Vec<u8>>,
    /// Size variants; non-empty only for [`NodeKind::Image`] nodes.
    pub sizes: Vec<SizeVariant>,
    /// Absolute output path, set by publishing.
    pub output_path: Option<PathBuf>,
    /// Output path relative to the publish directory, set by publishing.
    pub output_rel_path: Option<String>,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next: Option<NodeId>,
    pub previous: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            logical_path: String::new(),
            source_path: None,
            content: None,
            sizes: Vec::new(),
            output_path: None,
            output_rel_path: None,
            parent: None,
            first_child: None,
            next: None,
            previous: None,
        }
    }
}

/// A mutable tree of static assets, built once per ingestion root.
#[derive(Debug)]
pub struct AssetTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl AssetTree {
    /// Create a tree with a single directory root named [`ROOT_NAME`] whose
    /// logical path is `root_path` (the ingestion root, slash-joined).
    pub fn new(root_path: impl Into<String>) -> Self {
        let mut root = Node::new(NodeKind::Directory, ROOT_NAME);
        root.logical_path = root_path.into();
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Iterate a node's children left to right.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).first_child, move |&c| self.node(c).next)
    }

    /// Last child of a node, walking the sibling chain. O(children).
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last()
    }

    /// Insert a new child under `parent`, keeping siblings sorted ascending
    /// by name. The search stops at the first existing sibling whose name
    /// sorts after the new one; without such a sibling the child is appended.
    ///
    /// Panics if `parent` is not a directory.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind, name: &str) -> NodeId {
        assert!(
            self.node(parent).kind == NodeKind::Directory,
            "add_child on a non-directory node"
        );

        let mut node = Node::new(kind, name);
        node.parent = Some(parent);
        let child = self.alloc(node);

        let mut insert_before = None;
        let mut last = None;
        let mut cursor = self.node(parent).first_child;
        while let Some(sibling) = cursor {
            if self.node(sibling).name.as_str() > name {
                insert_before = Some(sibling);
                break;
            }
            last = Some(sibling);
            cursor = self.node(sibling).next;
        }

        match insert_before {
            Some(before) => {
                let prev = self.node(before).previous;
                self.node_mut(child).next = Some(before);
                self.node_mut(child).previous = prev;
                self.node_mut(before).previous = Some(child);
                match prev {
                    Some(p) => self.node_mut(p).next = Some(child),
                    None => self.node_mut(parent).first_child = Some(child),
                }
            }
            None => match last {
                Some(l) => {
                    self.node_mut(l).next = Some(child);
                    self.node_mut(child).previous = Some(l);
                }
                None => self.node_mut(parent).first_child = Some(child),
            },
        }

        self.refresh_paths(child);
        child
    }

    /// Unlink a node from its parent and siblings. Removing a directory
    /// blanks `logical_path` across its whole subtree; the subtree's internal
    /// parent/child/sibling links are left as-is. Detached subtrees are not
    /// reattached or traversed again. No-op on the root or a detached node.
    pub fn remove_from_tree(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let prev = self.node(id).previous;
        let next = self.node(id).next;

        match prev {
            None => {
                self.node_mut(parent).first_child = next;
                if let Some(n) = next {
                    self.node_mut(n).previous = None;
                }
            }
            Some(p) => {
                self.node_mut(p).next = next;
                if let Some(n) = next {
                    self.node_mut(n).previous = Some(p);
                }
            }
        }

        if self.node(id).kind == NodeKind::Directory {
            let mut stack = vec![id];
            while let Some(n) = stack.pop() {
                self.node_mut(n).logical_path.clear();
                let kids: Vec<NodeId> = self.children(n).collect();
                stack.extend(kids);
            }
        }

        let node = self.node_mut(id);
        node.parent = None;
        node.previous = None;
        node.next = None;
        node.logical_path.clear();
    }

    /// Node content. Reads from `source_path` on first access and caches;
    /// overridden content is returned as-is.
    ///
    /// Panics on a directory node.
    pub fn content(&mut self, id: NodeId) -> io::Result<&[u8]> {
        let node = &mut self.nodes[id.index()];
        assert!(
            node.kind != NodeKind::Directory,
            "content on a directory node"
        );
        if node.content.is_none() {
            let path = node
                .source_path
                .as_ref()
                .expect("node has neither in-memory content nor a source path");
            node.content = Some(fs::read(path)?);
        }
        Ok(node.content.as_deref().expect("content cached above"))
    }

    /// Override a node's content in memory, detaching it from any backing
    /// file. Only plain file nodes may be overridden.
    ///
    /// Panics on a directory or image node.
    pub fn set_content(&mut self, id: NodeId, bytes: Vec<u8>) {
        let node = self.node_mut(id);
        assert!(node.kind == NodeKind::File, "set_content on a non-file node");
        node.content = Some(bytes);
    }

    /// Natural pixel width of an image node.
    ///
    /// Panics on a non-image node or one missing its original variant.
    pub fn original_width(&self, id: NodeId) -> u32 {
        let node = self.node(id);
        assert!(
            node.kind == NodeKind::Image,
            "original_width on a non-image node"
        );
        node.sizes
            .iter()
            .find(|s| s.original)
            .expect("image node has no original size variant")
            .width
    }

    /// The size variant of an image node with exactly this width, if any.
    pub fn find_size(&self, id: NodeId, width: u32) -> Option<&SizeVariant> {
        self.node(id).sizes.iter().find(|s| s.width == width)
    }

    /// Register candidate widths as unmaterialized variants. The first
    /// candidate that is already present, or at or beyond the original
    /// width, aborts the whole batch — the remaining candidates are dropped
    /// too, not just the offending one. Long-standing behavior that callers
    /// rely on, pinned in tests.
    ///
    /// Panics on a non-image node.
    pub fn add_sizes(&mut self, id: NodeId, widths: &[u32]) {
        let original = self.original_width(id);
        for &width in widths {
            if width >= original {
                return;
            }
            let node = self.node_mut(id);
            if node.sizes.iter().any(|s| s.width == width) {
                return;
            }
            node.sizes.push(SizeVariant {
                width,
                original: false,
                materialized: false,
            });
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("asset tree arena overflow"));
        self.nodes.push(node);
        id
    }

    /// Recompute `logical_path` for a node and its descendants from the
    /// parent chain. New children have no descendants yet; the subtree walk
    /// keeps the paths right even if a populated node is ever reattached.
    pub(crate) fn refresh_paths(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(parent) = self.node(n).parent {
                let path = format!("{}/{}", self.node(parent).logical_path, self.node(n).name);
                self.node_mut(n).logical_path = path;
            }
            let kids: Vec<NodeId> = self.children(n).collect();
            stack.extend(kids);
        }
    }
}
