//! Directory ingestion: mirrors a filesystem tree into an [`AssetTree`].
//!
//! Entries are read per directory, sorted by name, and matched against the
//! ignore rules before a node is created. An entry's match name carries a
//! trailing `/` when it is a directory, so rules can target directories
//! specifically; once a directory is ignored, its whole subtree is ignored
//! without consulting the rules again. Files with a raster-image extension
//! become [`NodeKind::Image`] nodes and have their natural width probed from
//! the image header at ingestion time.
//!
//! A missing ingestion root is tolerated and yields an empty tree — sites
//! without a shared assets directory are fine. Everything else is fatal.

use crate::imaging::{self, ImagingError};
use crate::tree::{AssetTree, NodeId, NodeKind, SizeVariant};
use regex::Regex;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::{fs, vec};
use thiserror::Error;

/// Extensions ingested as [`NodeKind::Image`] nodes (case-insensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Rules applied to every ingestion, on top of caller-supplied ones.
/// `.gitkeep` markers exist only to keep otherwise-empty directories in
/// version control.
static DEFAULT_IGNORES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| vec![Regex::new(r"\.gitkeep").unwrap()]);

/// A set of name patterns excluding entries from ingestion.
#[derive(Debug, Default)]
pub struct IgnoreRules {
    patterns: Vec<Regex>,
}

impl IgnoreRules {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// `name` must end with `/` when it names a directory.
    fn matches(&self, name: &str) -> bool {
        DEFAULT_IGNORES
            .iter()
            .chain(&self.patterns)
            .any(|rx| rx.is_match(name))
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("reading directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("probing image {path}: {source}")]
    Probe {
        path: PathBuf,
        source: ImagingError,
    },
}

/// Build an asset tree mirroring `assets_path`, minus ignored entries.
/// Siblings come out sorted ascending by name. A missing `assets_path`
/// produces an empty tree rather than an error.
pub fn ingest_tree(assets_path: &Path, ignores: &IgnoreRules) -> Result<AssetTree, IngestError> {
    let mut tree = AssetTree::new(clean_path(assets_path));
    let root = tree.root();
    tree.node_mut(root).source_path = Some(assets_path.to_path_buf());

    match ingest_dir(&mut tree, root, assets_path, ignores) {
        Ok(()) => Ok(tree),
        Err(IngestError::ReadDir { ref path, ref source })
            if path == assets_path && source.kind() == io::ErrorKind::NotFound =>
        {
            Ok(tree)
        }
        Err(e) => Err(e),
    }
}

fn ingest_dir(
    tree: &mut AssetTree,
    dir: NodeId,
    dir_path: &Path,
    ignores: &IgnoreRules,
) -> Result<(), IngestError> {
    for entry in read_sorted(dir_path)? {
        let mut match_name = entry.name.clone();
        if entry.is_dir {
            match_name.push('/');
        }
        if ignores.matches(&match_name) {
            continue;
        }

        if entry.is_dir {
            let id = tree.add_child(dir, NodeKind::Directory, &entry.name);
            tree.node_mut(id).source_path = Some(entry.path.clone());
            ingest_dir(tree, id, &entry.path, ignores)?;
        } else if is_image_name(&entry.name) {
            let (width, _) =
                imaging::dimensions(&entry.path).map_err(|source| IngestError::Probe {
                    path: entry.path.clone(),
                    source,
                })?;
            let id = tree.add_child(dir, NodeKind::Image, &entry.name);
            let node = tree.node_mut(id);
            node.source_path = Some(entry.path);
            node.sizes.push(SizeVariant::original(width));
        } else {
            let id = tree.add_child(dir, NodeKind::File, &entry.name);
            tree.node_mut(id).source_path = Some(entry.path);
        }
    }
    Ok(())
}

struct DirEntry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

fn read_sorted(dir_path: &Path) -> Result<vec::IntoIter<DirEntry>, IngestError> {
    let read_dir_err = |source| IngestError::ReadDir {
        path: dir_path.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir_path).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let file_type = entry.file_type().map_err(read_dir_err)?;
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
            is_dir: file_type.is_dir(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries.into_iter())
}

fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Slash-join a host path's components, dropping `.` segments, so logical
/// paths read the same on every OS.
pub(crate) fn clean_path(path: &Path) -> String {
    let mut out = String::new();
    for comp in path.components() {
        match comp {
            Component::RootDir => out.push('/'),
            Component::CurDir => {}
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_png;
    use std::fs;
    use tempfile::TempDir;

    fn child_names(tree: &AssetTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .map(|c| tree.node(c).name.clone())
            .collect()
    }

    #[test]
    fn mirrors_the_directory_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("zeta.txt"), "z").unwrap();
        fs::write(tmp.path().join("alpha.txt"), "a").unwrap();
        fs::create_dir(tmp.path().join("imgs")).unwrap();
        write_png(&tmp.path().join("imgs/red.png"), 6, 4);

        let tree = ingest_tree(tmp.path(), &IgnoreRules::default()).unwrap();
        let root = tree.root();

        assert_eq!(
            child_names(&tree, root),
            vec!["alpha.txt", "imgs", "zeta.txt"]
        );

        let imgs = tree
            .children(root)
            .find(|&c| tree.node(c).name == "imgs")
            .unwrap();
        assert_eq!(tree.node(imgs).kind, NodeKind::Directory);
        let red = tree.children(imgs).next().unwrap();
        assert_eq!(tree.node(red).kind, NodeKind::Image);
        assert_eq!(tree.original_width(red), 6);
        assert!(tree.node(red).sizes[0].original);
        assert!(!tree.node(red).sizes[0].materialized);
    }

    #[test]
    fn logical_paths_start_at_the_ingestion_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("css")).unwrap();
        fs::write(tmp.path().join("css/site.css"), "a{}").unwrap();

        let tree = ingest_tree(tmp.path(), &IgnoreRules::default()).unwrap();
        let root = tree.root();
        let root_path = tree.node(root).logical_path.clone();
        assert!(!root_path.is_empty());

        let css = tree.children(root).next().unwrap();
        let site = tree.children(css).next().unwrap();
        assert_eq!(tree.node(css).logical_path, format!("{root_path}/css"));
        assert_eq!(
            tree.node(site).logical_path,
            format!("{root_path}/css/site.css")
        );
    }

    #[test]
    fn gitkeep_is_always_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".gitkeep"), "").unwrap();
        fs::write(tmp.path().join("kept.txt"), "x").unwrap();

        let tree = ingest_tree(tmp.path(), &IgnoreRules::default()).unwrap();
        assert_eq!(child_names(&tree, tree.root()), vec!["kept.txt"]);
    }

    #[test]
    fn ignoring_a_directory_prunes_its_subtree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("drafts/kept-name.txt"), "x").unwrap();
        fs::write(tmp.path().join("notes.txt"), "y").unwrap();

        let ignores = IgnoreRules::new(vec![Regex::new("^drafts/$").unwrap()]);
        let tree = ingest_tree(tmp.path(), &ignores).unwrap();
        assert_eq!(child_names(&tree, tree.root()), vec!["notes.txt"]);
    }

    #[test]
    fn directory_rules_do_not_hit_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("drafts"), "a plain file").unwrap();

        let ignores = IgnoreRules::new(vec![Regex::new("^drafts/$").unwrap()]);
        let tree = ingest_tree(tmp.path(), &ignores).unwrap();
        assert_eq!(child_names(&tree, tree.root()), vec!["drafts"]);
    }

    #[test]
    fn missing_root_yields_an_empty_tree() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        let tree = ingest_tree(&missing, &IgnoreRules::default()).unwrap();
        assert_eq!(tree.children(tree.root()).count(), 0);
    }

    #[test]
    fn unreadable_image_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("broken.png"), b"not a png").unwrap();

        let result = ingest_tree(tmp.path(), &IgnoreRules::default());
        assert!(matches!(result, Err(IngestError::Probe { .. })));
    }

    #[test]
    fn uppercase_image_extensions_are_recognized() {
        assert!(is_image_name("photo.JPG"));
        assert!(is_image_name("photo.Jpeg"));
        assert!(is_image_name("photo.png"));
        assert!(!is_image_name("photo.gif"));
        assert!(!is_image_name("photo"));
    }

    #[test]
    fn clean_path_slash_joins_components() {
        assert_eq!(clean_path(Path::new("./testdata/tree")), "testdata/tree");
        assert_eq!(clean_path(Path::new("a/b/")), "a/b");
        assert_eq!(clean_path(Path::new("/abs/path")), "/abs/path");
        assert_eq!(clean_path(Path::new(".")), ".");
    }
}
