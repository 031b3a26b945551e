//! Shared fixtures for unit tests.

use crate::tree::{AssetTree, NodeKind};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

/// A small fixed tree used across traversal tests:
///
/// ```text
/// dir1
/// ├── dir2
/// │   └── file1
/// ├── dir3
/// │   └── file2
/// └── dir4
///     └── file3
/// ```
pub(crate) fn sample_tree() -> AssetTree {
    let mut tree = AssetTree::new("dir1");
    let root = tree.root();
    tree.node_mut(root).name = "dir1".to_string();

    let dir2 = tree.add_child(root, NodeKind::Directory, "dir2");
    tree.add_child(dir2, NodeKind::File, "file1");
    let dir3 = tree.add_child(root, NodeKind::Directory, "dir3");
    tree.add_child(dir3, NodeKind::File, "file2");
    let dir4 = tree.add_child(root, NodeKind::Directory, "dir4");
    tree.add_child(dir4, NodeKind::File, "file3");

    tree
}

/// Write a solid-color PNG of the given dimensions.
pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([180, 40, 40, 255]))
        .save(path)
        .unwrap();
}

/// Write a solid-color JPEG of the given dimensions.
pub(crate) fn write_jpeg(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([40, 40, 180]))
        .save(path)
        .unwrap();
}
