//! Image collaborators: header-only dimension probe and aspect-preserving
//! resize, built on the `image` crate's pure-Rust JPEG/PNG codecs.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("decoding {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("encoding resized {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("no known image format for {path}")]
    UnknownFormat { path: PathBuf },
}

/// Width and height from the image header, without decoding pixel data.
pub fn dimensions(path: &Path) -> Result<(u32, u32), ImagingError> {
    image::image_dimensions(path).map_err(|source| ImagingError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode the image at `path`, scale it to `width` preserving aspect ratio
/// (height rounded), and re-encode it in its own format.
pub fn resize_to_width(path: &Path, width: u32) -> Result<Vec<u8>, ImagingError> {
    let reader = ImageReader::open(path).map_err(|source| ImagingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = reader
        .format()
        .or_else(|| ImageFormat::from_path(path).ok())
        .ok_or_else(|| ImagingError::UnknownFormat {
            path: path.to_path_buf(),
        })?;
    let img = reader.decode().map_err(|source| ImagingError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let (w, h) = (img.width(), img.height());
    let height = ((h as u64 * width as u64 + w as u64 / 2) / w as u64).max(1) as u32;
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    // JPEG has no alpha channel; flatten before encoding.
    let resized = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    };

    let mut buf = Cursor::new(Vec::new());
    resized
        .write_to(&mut buf, format)
        .map_err(|source| ImagingError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{write_jpeg, write_png};
    use tempfile::TempDir;

    #[test]
    fn dimensions_probes_the_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.png");
        write_png(&path, 12, 7);
        assert_eq!(dimensions(&path).unwrap(), (12, 7));
    }

    #[test]
    fn dimensions_fails_on_non_image_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fake.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(
            dimensions(&path),
            Err(ImagingError::Decode { .. })
        ));
    }

    #[test]
    fn resize_preserves_aspect_ratio() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.png");
        write_png(&path, 8, 6);

        let bytes = resize_to_width(&path, 4).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn resize_keeps_the_source_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        write_jpeg(&path, 10, 10);

        let bytes = resize_to_width(&path, 5).unwrap();
        let format = image::guess_format(&bytes).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
    }
}
