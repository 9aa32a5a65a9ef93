use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::Path;

use crate::store::write_atomically;

/// Lossy WebP quality for every derivative.
pub const WEBP_QUALITY: f32 = 75.0;

/// Decodes `original`, fits it into `bounds` and writes it to `target` as
/// WebP. `None` keeps the native dimensions.
pub(crate) fn render(original: &Path, target: &Path, bounds: Option<(u32, u32)>) -> Result<(u32, u32), String> {
    let decoded = ImageReader::open(original)
        .map_err(|e| format!("open: {e}"))?
        .with_guessed_format()
        .map_err(|e| format!("read: {e}"))?
        .decode()
        .map_err(|e| format!("decode: {e}"))?;

    let resized = fit(decoded, bounds);
    let rgba = resized.to_rgba8();
    let (width, height) = rgba.dimensions();

    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height)
        .encode_simple(false, WEBP_QUALITY)
        .map_err(|e| format!("encode: {e:?}"))?;

    write_atomically(target, &encoded).map_err(|e| format!("write: {e}"))?;
    Ok((width, height))
}

/// Lanczos fit preserving aspect ratio. Images already inside the box are
/// left alone rather than upscaled.
fn fit(image: DynamicImage, bounds: Option<(u32, u32)>) -> DynamicImage {
    match bounds {
        Some((max_w, max_h)) if image.width() > max_w || image.height() > max_h => {
            image.resize(max_w, max_h, FilterType::Lanczos3)
        }
        _ => image,
    }
}
