//! # sitetree
//!
//! A content-addressed asset tree engine for static-site builds. Your
//! filesystem is the data source: an assets directory is mirrored into an
//! in-memory tree, stylesheets are bundled, and every file is published
//! under a name that embeds a digest of its content, so the output can be
//! served with immutable cache headers.
//!
//! # Architecture: Ingest, Rework, Publish
//!
//! ```text
//! 1. Ingest    assets/   →  AssetTree       (filesystem → sorted tree)
//! 2. Rework    AssetTree →  AssetTree       (CSS bundling, size requests)
//! 3. Publish   AssetTree →  dist/assets/    (hashed names, image variants)
//! ```
//!
//! The tree stays alive after publishing: templates resolve references
//! against it ([`resolve`]) and may request additional image widths, which
//! are materialized incrementally without re-publishing anything else.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tree`] | Arena-backed asset tree: sorted insertion, detachment, lazy content |
//! | [`traverse`] | Pre-order traversal with three-way visitor control flow |
//! | [`ingest`] | Filesystem mirroring with regex ignore rules and image probing |
//! | [`imaging`] | Pure-Rust dimension probe and Lanczos3 resize (JPEG/PNG) |
//! | [`publish`] | Content-addressed output, size variants, stylesheet bundling |
//! | [`resolve`] | Global/local reference resolution, asset links, `srcset` values |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Names
//!
//! A published file is named `<stem>-<sha256><ext>`; a published image
//! becomes a directory named by the digest of its original bytes, holding
//! one file per requested width. Changed content changes the URL, so both
//! layouts are safe to cache forever.
//!
//! ## Two Namespaces, No Fallback
//!
//! References starting with `/` address the site-wide tree; bare references
//! address the tree local to the content being rendered. Lookups never fall
//! through from one namespace to the other, which keeps a post's asset
//! names independent of the site's.
//!
//! ## Pure-Rust Imaging
//!
//! Resizing uses the `image` crate with Lanczos3 resampling — no
//! ImageMagick, no system dependencies, a single self-contained binary.

pub mod imaging;
pub mod ingest;
pub mod publish;
pub mod resolve;
pub mod traverse;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
