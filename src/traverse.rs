//! Depth-first pre-order traversal with three-way control flow.
//!
//! The visitor runs for every node reached, starting node included, and
//! steers the walk through [`Flow`]. An error from the visitor behaves like
//! [`Flow::Terminate`] and is handed back to the caller of
//! [`AssetTree::traverse`].
//!
//! The propagation of [`Flow::SkipChildren`] is deliberately asymmetric and
//! must stay that way — template-facing code depends on it:
//!
//! - Issued while visiting a **directory**, it prunes that directory's
//!   subtree only; the directory's own siblings are still visited, because
//!   the enclosing loop ignores everything a recursive call returns except
//!   `Terminate` and errors.
//! - Issued while visiting a **file or image**, it cuts off the rest of that
//!   node's sibling list and surfaces one level up, where the first
//!   directory ancestor absorbs it.

use crate::tree::{AssetTree, NodeId, NodeKind};

/// Control signal returned by a traversal visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed normally.
    Continue,
    /// Do not descend into this node's children. See the module docs for
    /// what this means on a leaf.
    SkipChildren,
    /// Stop the entire walk immediately.
    Terminate,
}

impl AssetTree {
    /// Depth-first pre-order walk of the subtree rooted at `start`.
    ///
    /// The visitor receives the tree mutably and may restructure it; the
    /// walk captures each sibling's successor before visiting, so detaching
    /// the node under visit is safe.
    pub fn traverse<E, F>(&mut self, start: NodeId, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut AssetTree, NodeId) -> Result<Flow, E>,
    {
        walk(self, start, visit)?;
        Ok(())
    }

    /// Infallible traversal visiting every node under `start`.
    pub fn for_each(&mut self, start: NodeId, mut f: impl FnMut(&mut AssetTree, NodeId)) {
        let result: Result<(), std::convert::Infallible> = self.traverse(start, &mut |tree, id| {
            f(tree, id);
            Ok(Flow::Continue)
        });
        if let Err(e) = result {
            match e {}
        }
    }
}

fn walk<E, F>(tree: &mut AssetTree, id: NodeId, visit: &mut F) -> Result<Flow, E>
where
    F: FnMut(&mut AssetTree, NodeId) -> Result<Flow, E>,
{
    match visit(tree, id)? {
        Flow::Terminate => return Ok(Flow::Terminate),
        Flow::SkipChildren => return Ok(Flow::SkipChildren),
        Flow::Continue => {}
    }

    let mut child = tree.node(id).first_child;
    while let Some(c) = child {
        // Captured before the visit so the visitor may detach `c`.
        let next = tree.node(c).next;

        match tree.node(c).kind {
            NodeKind::Directory => {
                if walk(tree, c, visit)? == Flow::Terminate {
                    return Ok(Flow::Terminate);
                }
                // SkipChildren from the recursion pruned that subtree only;
                // this level keeps going.
            }
            NodeKind::File | NodeKind::Image => match visit(tree, c)? {
                // A leaf's SkipChildren truncates the rest of this sibling
                // list and surfaces one level up.
                Flow::SkipChildren => return Ok(Flow::SkipChildren),
                Flow::Terminate => return Ok(Flow::Terminate),
                Flow::Continue => {}
            },
        }

        child = next;
    }

    Ok(Flow::Continue)
}
