//! Content-addressed publishing: hashed output names, on-demand image size
//! variants, and stylesheet bundling.
//!
//! Publishing mirrors a tree into an output directory where every file name
//! embeds a SHA-256 content digest, so clients can cache published assets
//! forever and still pick up changes:
//!
//! ```text
//! dist/assets/
//! ├── css/
//! ├── notes-4f2a…c9.txt                # <stem>-<hexdigest><ext>
//! └── imgs/
//!     └── 9b01…e4/                     # digest of the original image bytes
//!         ├── 640.jpg                  # requested size variant
//!         └── 1280.jpg                 # original width
//! ```
//!
//! Image variants are materialized incrementally: [`process_sizes`] runs
//! during the initial publish and again whenever template execution requests
//! new widths, and it never rewrites a width that is already on disk.

use crate::imaging::{self, ImagingError};
use crate::traverse::Flow;
use crate::tree::{AssetTree, NodeId, NodeKind};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the synthetic stylesheet node added by [`bundle_stylesheets`].
pub const BUNDLE_NAME: &str = "style.css";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("creating directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("reading content of {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("writing {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("resizing {path}: {source}")]
    Resize {
        path: String,
        source: ImagingError,
    },
}

/// Publish every node of the tree into `out_dir`, which must exist and is
/// assumed empty (pre-existing contents are not merged). The starting root
/// is skipped unless `include_root`. Each published node gets its
/// `output_path` and `output_rel_path` recorded. The first failure aborts
/// the remaining walk; partially written output stays on disk for the
/// caller to discard.
pub fn publish(
    tree: &mut AssetTree,
    out_dir: &Path,
    include_root: bool,
) -> Result<(), PublishError> {
    let root = tree.root();
    let prefix = format!("{}/", tree.node(root).logical_path);

    tree.traverse(root, &mut |tree, id| {
        if id == root && !include_root {
            return Ok(Flow::Continue);
        }
        let rel = tree
            .node(id)
            .logical_path
            .strip_prefix(&prefix)
            .unwrap_or_default()
            .to_string();
        publish_node(tree, id, out_dir, &rel)?;
        Ok(Flow::Continue)
    })
}

fn publish_node(
    tree: &mut AssetTree,
    id: NodeId,
    out_dir: &Path,
    rel: &str,
) -> Result<(), PublishError> {
    match tree.node(id).kind {
        NodeKind::Directory => {
            let out_path = out_dir.join(rel);
            // rel is empty only for an included root, which maps onto
            // out_dir itself.
            let created = if rel.is_empty() {
                fs::create_dir_all(&out_path)
            } else {
                fs::create_dir(&out_path)
            };
            created.map_err(|source| PublishError::CreateDir {
                path: out_path.clone(),
                source,
            })?;
            record_output(tree, id, out_path, rel.to_string());
        }
        NodeKind::File => {
            let bytes = node_content(tree, id)?;
            let digest = content_hash(&bytes);
            let (stem, ext) = split_ext(rel);
            let hashed_rel = format!("{stem}-{digest}{ext}");
            let out_path = out_dir.join(&hashed_rel);
            fs::write(&out_path, &bytes).map_err(|source| PublishError::Write {
                path: out_path.clone(),
                source,
            })?;
            record_output(tree, id, out_path, hashed_rel);
        }
        NodeKind::Image => {
            // The digest of the original bytes names a directory that
            // replaces the image's own name in the mirrored layout; size
            // variants land inside it.
            let bytes = node_content(tree, id)?;
            let digest = content_hash(&bytes);
            let hashed_rel = match rel.rsplit_once('/') {
                Some((parent, _name)) => format!("{parent}/{digest}"),
                None => digest,
            };
            let out_path = out_dir.join(&hashed_rel);
            fs::create_dir(&out_path).map_err(|source| PublishError::CreateDir {
                path: out_path.clone(),
                source,
            })?;
            record_output(tree, id, out_path, hashed_rel);
            process_sizes(tree, id)?;
        }
    }
    Ok(())
}

/// Write every not-yet-materialized size variant of an image node into its
/// published directory as `<width><ext>`. The original variant writes the
/// original bytes; other widths are resized from the source image.
/// Idempotent and incremental — safe to call again after new widths are
/// requested via [`AssetTree::add_sizes`].
///
/// Panics if the node is not an image or has not been published yet.
pub fn process_sizes(tree: &mut AssetTree, id: NodeId) -> Result<(), PublishError> {
    let node = tree.node(id);
    assert!(
        node.kind == NodeKind::Image,
        "process_sizes on a non-image node"
    );
    let out_dir = node
        .output_path
        .clone()
        .expect("process_sizes before the node was published");
    let (_, ext) = split_ext(&node.name);
    let ext = ext.to_string();
    let logical = node.logical_path.clone();
    let source = node.source_path.clone();

    let original = node_content(tree, id)?;

    for i in 0..tree.node(id).sizes.len() {
        let variant = tree.node(id).sizes[i].clone();
        if variant.materialized {
            continue;
        }

        let target = out_dir.join(format!("{}{ext}", variant.width));
        let bytes = if variant.original {
            original.clone()
        } else {
            let src = source
                .as_ref()
                .expect("resizable image node has no source path");
            imaging::resize_to_width(src, variant.width).map_err(|source| {
                PublishError::Resize {
                    path: logical.clone(),
                    source,
                }
            })?
        };

        fs::write(&target, &bytes).map_err(|source| PublishError::Write {
            path: target.clone(),
            source,
        })?;
        tree.node_mut(id).sizes[i].materialized = true;
    }

    Ok(())
}

/// Collect every depth-1 stylesheet of the tree into one minified bundle:
/// their contents are concatenated in sibling (alphabetical) order, the
/// source nodes are removed, and a synthetic [`BUNDLE_NAME`] file node with
/// in-memory content is added under the root.
pub fn bundle_stylesheets(tree: &mut AssetTree) -> Result<(), PublishError> {
    let root = tree.root();
    let mut css = Vec::new();

    tree.traverse(root, &mut |tree, id| {
        if id == root {
            return Ok(Flow::Continue);
        }
        // Depth 1 only: directories are opaque.
        if tree.node(id).kind == NodeKind::Directory {
            return Ok(Flow::SkipChildren);
        }
        if tree.node(id).name.ends_with(".css") {
            let bytes = node_content(tree, id)?;
            css.extend_from_slice(&bytes);
            tree.remove_from_tree(id);
        }
        Ok(Flow::Continue)
    })?;

    let minified = minify_css(&css);
    let bundle = tree.add_child(root, NodeKind::File, BUNDLE_NAME);
    tree.set_content(bundle, minified);
    Ok(())
}

/// Mapping from logical asset paths (relative to the tree root) to their
/// published output-relative paths. The CLI serializes this next to the
/// published files so downstream HTML generation can rewrite references.
#[derive(Debug, Serialize)]
pub struct PublishManifest {
    pub assets: BTreeMap<String, String>,
}

pub fn manifest(tree: &AssetTree) -> PublishManifest {
    let root = tree.root();
    let prefix = format!("{}/", tree.node(root).logical_path);
    let mut assets = BTreeMap::new();

    let mut stack: Vec<NodeId> = tree.children(root).collect();
    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        if node.kind == NodeKind::Directory {
            stack.extend(tree.children(id));
        } else if let Some(rel) = &node.output_rel_path {
            let logical = node
                .logical_path
                .strip_prefix(&prefix)
                .unwrap_or(&node.logical_path);
            assets.insert(logical.to_string(), rel.clone());
        }
    }

    PublishManifest { assets }
}

fn node_content(tree: &mut AssetTree, id: NodeId) -> Result<Vec<u8>, PublishError> {
    let logical = tree.node(id).logical_path.clone();
    Ok(tree
        .content(id)
        .map_err(|source| PublishError::Read {
            path: logical,
            source,
        })?
        .to_vec())
}

fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Split a path at the final segment's extension dot: `"css/site.css"` →
/// `("css/site", ".css")`. Paths without a dot get an empty extension.
pub(crate) fn split_ext(rel: &str) -> (&str, &str) {
    let base = rel.rfind('/').map_or(0, |i| i + 1);
    match rel[base..].rfind('.') {
        Some(i) => rel.split_at(base + i),
        None => (rel, ""),
    }
}

fn record_output(tree: &mut AssetTree, id: NodeId, out_path: PathBuf, rel: String) {
    let node = tree.node_mut(id);
    node.output_path = Some(out_path);
    node.output_rel_path = Some(rel);
}

/// Good-enough CSS minifier for bundling: strips comments, collapses
/// whitespace runs, and drops spaces around punctuation. Quoted strings are
/// passed through untouched. Not a full tokenizer.
fn minify_css(input: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(input);
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                while let Some(c2) = chars.next() {
                    if c2 == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {
                while chars.peek().is_some_and(|n| n.is_whitespace()) {
                    chars.next();
                }
                let boundary =
                    |ch: Option<char>| ch.is_none_or(|ch| "{}:;,>".contains(ch));
                if !boundary(out.chars().last()) && !boundary(chars.peek().copied()) {
                    out.push(' ');
                }
            }
            _ => out.push(c),
        }
    }

    out.replace(";}", "}").into_bytes()
}
