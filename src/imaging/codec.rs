//! Decoding and encoding through the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, BMP, TIFF) | `ImageReader` with content sniffing |
//! | Encode → JPEG | `JpegEncoder::new_with_quality`, alpha flattened onto white |
//! | Encode → PNG, BMP, TIFF | `DynamicImage::write_to` |
//!
//! Saving never leaves a half-written target behind: the file is encoded in
//! memory, written to `<name>.partial` next to the target and renamed into
//! place. Any failure before the rename leaves the target untouched.

use super::compositor::blend_over;
use super::params::{ExportFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, Rgb, RgbImage, Rgba};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode {format}: {source}")]
    Encode {
        format: ExportFormat,
        #[source]
        source: image::ImageError,
    },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("Cannot write {requested} to {path}: extension does not match")]
    FormatMismatch {
        path: PathBuf,
        requested: ExportFormat,
    },
}

pub type Result<T> = std::result::Result<T, ImagingError>;

/// Extensions [`load_image`] can decode.
const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
}

/// Whether `path` has one of the [`supported_input_extensions`].
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            INPUT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Load and decode an image from disk.
///
/// The format is sniffed from the file contents, so a PNG saved as `.jpg`
/// still loads.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let io_error = |source| ImagingError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path)
        .map_err(io_error)?
        .with_guessed_format()
        .map_err(io_error)?;
    let image = reader.decode().map_err(|source| ImagingError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded image"
    );
    Ok(image)
}

/// Composite `image` over opaque white and drop the alpha channel.
///
/// Each pixel moves toward white by `1 - alpha / 255`. Images without an
/// alpha channel are converted as-is.
pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let white = Rgba([255, 255, 255, 255]);
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, _] = blend_over(white, *rgba.get_pixel(x, y)).0;
        Rgb([r, g, b])
    })
}

/// Encode `image` into an in-memory file of the given format.
///
/// `quality` is only read for JPEG.
pub fn encode(image: &DynamicImage, format: ExportFormat, quality: Quality) -> Result<Vec<u8>> {
    let encode_error = |source| ImagingError::Encode { format, source };
    let mut bytes = Vec::new();

    match format {
        ExportFormat::Jpeg => {
            let flat = DynamicImage::ImageRgb8(flatten_onto_white(image));
            let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value());
            flat.write_with_encoder(encoder).map_err(encode_error)?;
        }
        _ => {
            // 8-bit only: BMP has no 16-bit layouts and keeping every
            // format on the same depth keeps output sizes predictable.
            let normalized = if format.supports_alpha() && image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            };
            normalized
                .write_to(&mut Cursor::new(&mut bytes), format.image_format())
                .map_err(encode_error)?;
        }
    }

    Ok(bytes)
}

/// Encode `image` as `format` and write it to `path`.
///
/// The path's extension must name the same format (`.jpg`/`.jpeg` for JPEG,
/// `.tif`/`.tiff` for TIFF, case-insensitive); otherwise nothing is written
/// and [`ImagingError::FormatMismatch`] is returned.
pub fn save_image(
    image: &DynamicImage,
    path: &Path,
    format: ExportFormat,
    quality: Quality,
) -> Result<()> {
    if ExportFormat::from_path(path) != Some(format) {
        return Err(ImagingError::FormatMismatch {
            path: path.to_path_buf(),
            requested: format,
        });
    }

    let bytes = encode(image, format, quality)?;
    write_atomically(path, &bytes)?;
    tracing::debug!(
        path = %path.display(),
        format = %format,
        width = image.width(),
        height = image.height(),
        bytes = bytes.len(),
        "saved image"
    );
    Ok(())
}

/// [`save_image`] with the format taken from the path's extension.
pub fn save_image_inferred(image: &DynamicImage, path: &Path, quality: Quality) -> Result<()> {
    let format = ExportFormat::from_path(path)
        .ok_or_else(|| ImagingError::UnsupportedFormat(path.to_path_buf()))?;
    save_image(image, path, format, quality)
}

/// `photo.jpg` → `photo.jpg.partial`, in the same directory.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    let result = std::fs::write(&partial, bytes).and_then(|()| std::fs::rename(&partial, path));
    if let Err(source) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(ImagingError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
