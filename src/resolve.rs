//! Reference resolution and link rendering.
//!
//! Templates refer to assets through two namespaces. A reference starting
//! with `/` names an asset in the site-wide (global) tree; anything else is
//! looked up in the local tree of the content being rendered, typically the
//! assets living next to one post. There is no fallback from one namespace
//! to the other: a local reference that only exists globally stays
//! unresolved, which keeps a post's asset names from silently shadowing or
//! leaking into site-wide ones.

use crate::publish::split_ext;
use crate::tree::{AssetTree, NodeId, NodeKind};

/// URL prefix all published asset links live under.
pub const PUBLISHED_ROOT: &str = "/assets";

/// Which tree a reference addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Site-wide assets; referenced with a leading `/`.
    Global,
    /// Assets local to the content being rendered.
    Local,
}

/// A raw asset reference as written in content, e.g. `/imgs/logo.png`
/// (global) or `diagram.png` (local).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetRef<'a> {
    raw: &'a str,
}

impl<'a> AssetRef<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    pub fn namespace(&self) -> Namespace {
        if self.raw.starts_with('/') {
            Namespace::Global
        } else {
            Namespace::Local
        }
    }

    /// The reference as a root-relative path, leading `/` stripped.
    pub fn rel_path(&self) -> &'a str {
        self.raw.trim_start_matches('/')
    }
}

impl<'a> From<&'a str> for AssetRef<'a> {
    fn from(raw: &'a str) -> Self {
        Self::new(raw)
    }
}

/// Walk `rel` segment by segment from the tree root. A reference with no
/// segments finds nothing; the root itself is not addressable.
pub fn find_by_rel_path(tree: &AssetTree, rel: &str) -> Option<NodeId> {
    let mut current = None;
    for segment in rel.split('/').filter(|s| !s.is_empty()) {
        let level = current.unwrap_or_else(|| tree.root());
        current = Some(
            tree.children(level)
                .find(|&c| tree.node(c).name == segment)?,
        );
    }
    current
}

/// Resolve a reference against its namespace's tree. The namespace that was
/// consulted comes back even on a miss, so callers can report which tree
/// lacked the asset.
pub fn resolve<'a>(
    reference: impl Into<AssetRef<'a>>,
    global: &AssetTree,
    local: &AssetTree,
) -> (Namespace, Option<NodeId>) {
    let reference = reference.into();
    let namespace = reference.namespace();
    let tree = match namespace {
        Namespace::Global => global,
        Namespace::Local => local,
    };
    (namespace, find_by_rel_path(tree, reference.rel_path()))
}

/// Public URL of a published node, rooted at [`PUBLISHED_ROOT`]. Local
/// assets pass the slug of their owning content so their links stay
/// disjoint from the global ones. For an image, `width` selects a size
/// variant file inside the node's published directory; without one the
/// link addresses the original-width variant, so an image link is always
/// a servable file, never the bare digest directory.
///
/// Panics if the node has not been published, or if `width` names a size
/// that was never registered.
pub fn asset_link(
    tree: &AssetTree,
    id: NodeId,
    post_slug: Option<&str>,
    width: Option<u32>,
) -> String {
    let node = tree.node(id);
    let rel = node
        .output_rel_path
        .as_deref()
        .expect("asset_link before the node was published");

    let mut link = String::from(PUBLISHED_ROOT);
    if let Some(slug) = post_slug {
        link.push('/');
        link.push_str(slug);
    }
    link.push('/');
    link.push_str(rel);

    if node.kind == NodeKind::Image {
        let width = width.unwrap_or_else(|| tree.original_width(id));
        assert!(
            tree.find_size(id, width).is_some(),
            "size variant link for an unregistered width"
        );
        let (_, ext) = split_ext(&node.name);
        link.push('/');
        link.push_str(&format!("{width}{ext}"));
    } else {
        assert!(
            width.is_none(),
            "size variant link for a non-image node"
        );
    }

    link
}

/// `srcset` attribute value for an image node: one `<url> <width>w` entry
/// per materialized size variant, ascending by width. Variants that have
/// not been written to disk yet are left out, so the value is empty before
/// the node's sizes are processed.
pub fn srcset(tree: &AssetTree, id: NodeId, post_slug: Option<&str>) -> String {
    let mut widths: Vec<u32> = tree
        .node(id)
        .sizes
        .iter()
        .filter(|s| s.materialized)
        .map(|s| s.width)
        .collect();
    widths.sort_unstable();

    let entries: Vec<String> = widths
        .into_iter()
        .map(|w| format!("{} {w}w", asset_link(tree, id, post_slug, Some(w))))
        .collect();
    entries.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{AssetTree, NodeKind, SizeVariant};

    fn published_tree() -> AssetTree {
        let mut tree = AssetTree::new("assets");
        let root = tree.root();
        let imgs = tree.add_child(root, NodeKind::Directory, "imgs");
        let logo = tree.add_child(imgs, NodeKind::Image, "logo.png");
        tree.node_mut(logo).sizes.push(SizeVariant::original(1280));
        tree.node_mut(logo).output_rel_path = Some("imgs/abc123".to_string());
        let notes = tree.add_child(root, NodeKind::File, "notes.txt");
        tree.node_mut(notes).output_rel_path = Some("notes-def456.txt".to_string());
        tree
    }

    #[test]
    fn find_by_rel_path_walks_segments() {
        let tree = published_tree();

        let imgs = find_by_rel_path(&tree, "imgs").unwrap();
        assert_eq!(tree.node(imgs).name, "imgs");

        let logo = find_by_rel_path(&tree, "imgs/logo.png").unwrap();
        assert_eq!(tree.node(logo).name, "logo.png");

        assert_eq!(find_by_rel_path(&tree, "imgs/nope.png"), None);
        assert_eq!(find_by_rel_path(&tree, "notes.txt/deeper"), None);
    }

    #[test]
    fn empty_reference_finds_nothing() {
        let tree = published_tree();
        assert_eq!(find_by_rel_path(&tree, ""), None);

        let local = AssetTree::new("post/assets");
        assert_eq!(resolve("/", &tree, &local), (Namespace::Global, None));
        assert_eq!(resolve("", &tree, &local), (Namespace::Local, None));
    }

    #[test]
    fn leading_slash_selects_the_global_tree() {
        let global = published_tree();
        let local = AssetTree::new("post/assets");

        let (ns, id) = resolve("/imgs/logo.png", &global, &local);
        assert_eq!(ns, Namespace::Global);
        assert_eq!(global.node(id.unwrap()).name, "logo.png");
    }

    #[test]
    fn bare_reference_selects_the_local_tree() {
        let global = AssetTree::new("assets");
        let mut local = AssetTree::new("post/assets");
        let root = local.root();
        local.add_child(root, NodeKind::File, "diagram.png");

        let (ns, id) = resolve("diagram.png", &global, &local);
        assert_eq!(ns, Namespace::Local);
        assert_eq!(local.node(id.unwrap()).name, "diagram.png");
    }

    #[test]
    fn namespaces_do_not_fall_back() {
        let global = published_tree();
        let local = AssetTree::new("post/assets");

        // Exists globally, referenced locally: unresolved, and the miss
        // names the tree that was consulted.
        assert_eq!(resolve("imgs/logo.png", &global, &local), (Namespace::Local, None));
        // And the reverse.
        let mut local = local;
        let root = local.root();
        local.add_child(root, NodeKind::File, "only-local.txt");
        assert_eq!(
            resolve("/only-local.txt", &global, &local),
            (Namespace::Global, None)
        );
    }

    #[test]
    fn file_links_use_the_published_path() {
        let tree = published_tree();
        let notes = find_by_rel_path(&tree, "notes.txt").unwrap();
        assert_eq!(
            asset_link(&tree, notes, None, None),
            "/assets/notes-def456.txt"
        );
        assert_eq!(
            asset_link(&tree, notes, Some("my-post"), None),
            "/assets/my-post/notes-def456.txt"
        );
    }

    #[test]
    fn image_links_default_to_the_original_width() {
        let tree = published_tree();
        let logo = find_by_rel_path(&tree, "imgs/logo.png").unwrap();

        // No width requested: still a servable file, not the bare digest
        // directory.
        assert_eq!(
            asset_link(&tree, logo, None, None),
            "/assets/imgs/abc123/1280.png"
        );
    }

    #[test]
    fn image_links_can_address_a_size_variant() {
        let mut tree = published_tree();
        let logo = find_by_rel_path(&tree, "imgs/logo.png").unwrap();
        tree.add_sizes(logo, &[640]);

        assert_eq!(
            asset_link(&tree, logo, None, Some(640)),
            "/assets/imgs/abc123/640.png"
        );
    }

    #[test]
    #[should_panic(expected = "unregistered width")]
    fn size_link_for_unknown_width_panics() {
        let tree = published_tree();
        let logo = find_by_rel_path(&tree, "imgs/logo.png").unwrap();
        asset_link(&tree, logo, None, Some(999));
    }

    #[test]
    #[should_panic(expected = "before the node was published")]
    fn link_for_unpublished_node_panics() {
        let tree = published_tree();
        let imgs = find_by_rel_path(&tree, "imgs").unwrap();
        asset_link(&tree, imgs, None, None);
    }

    #[test]
    fn srcset_skips_unmaterialized_variants() {
        let mut tree = published_tree();
        let logo = find_by_rel_path(&tree, "imgs/logo.png").unwrap();
        tree.add_sizes(logo, &[640, 425]);

        // Nothing written to disk yet.
        assert_eq!(srcset(&tree, logo, None), "");
    }

    #[test]
    fn srcset_lists_materialized_widths_ascending() {
        let mut tree = published_tree();
        let logo = find_by_rel_path(&tree, "imgs/logo.png").unwrap();
        tree.add_sizes(logo, &[640, 425]);
        for s in &mut tree.node_mut(logo).sizes {
            s.materialized = true;
        }

        assert_eq!(
            srcset(&tree, logo, None),
            "/assets/imgs/abc123/425.png 425w, \
             /assets/imgs/abc123/640.png 640w, \
             /assets/imgs/abc123/1280.png 1280w"
        );
    }
}
