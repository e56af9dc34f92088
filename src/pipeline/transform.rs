/// Applies edit actions to working images
///
/// Each committed action produces a new rendered image from the one
/// currently on screen:
/// - geometry: rotate, flip, crop
/// - one-click filters
/// - tone/colour adjustments from `EditParams`
/// - AI results, which simply replace the image

use image::{DynamicImage, Rgba, RgbaImage};

use super::encode;
use crate::config::OutputFormat;
use crate::error::{Result, ValidationError};
use crate::state::data::ImagePayload;
use crate::state::edit::{EditAction, EditParams, FilterKind, FlipAxis, Rotation};

/// Render `action` on top of `current`, returning the encoded result
pub fn render(current: &ImagePayload, action: &EditAction, format: OutputFormat) -> Result<ImagePayload> {
    match action {
        EditAction::Initial => Ok(current.clone()),
        EditAction::AiResult { image, .. } => Ok(image.clone()),
        _ => {
            let img = encode::decode(current)?;
            let out = apply(&img, action)?;
            encode::encode(&out, format)
        }
    }
}

/// Async wrapper: decoding and pixel work run on the blocking pool
pub async fn render_async(
    current: ImagePayload,
    action: EditAction,
    format: OutputFormat,
) -> Result<ImagePayload> {
    tokio::task::spawn_blocking(move || render(&current, &action, format))
        .await
        .map_err(|e| std::io::Error::other(format!("render task failed: {}", e)))?
}

/// Apply one action to a decoded image
pub fn apply(img: &DynamicImage, action: &EditAction) -> Result<DynamicImage> {
    let out = match action {
        EditAction::Initial => img.clone(),
        EditAction::Rotate { rotation } => match rotation {
            Rotation::Cw90 => img.rotate90(),
            Rotation::Cw180 => img.rotate180(),
            Rotation::Cw270 => img.rotate270(),
        },
        EditAction::Flip { axis } => match axis {
            FlipAxis::Horizontal => img.fliph(),
            FlipAxis::Vertical => img.flipv(),
        },
        EditAction::Filter { filter } => apply_filter(img, *filter)?,
        EditAction::Crop { x, y, width, height } => crop(img, *x, *y, *width, *height)?,
        EditAction::Adjust { params } => adjust(img, params),
        EditAction::AiResult { image, .. } => encode::decode(image)?,
    };
    Ok(out)
}

fn crop(img: &DynamicImage, x: u32, y: u32, width: u32, height: u32) -> Result<DynamicImage> {
    let fits = width > 0
        && height > 0
        && x.checked_add(width).is_some_and(|right| right <= img.width())
        && y.checked_add(height).is_some_and(|bottom| bottom <= img.height());
    if !fits {
        return Err(ValidationError::CropOutOfBounds { x, y, width, height }.into());
    }
    Ok(img.crop_imm(x, y, width, height))
}

fn apply_filter(img: &DynamicImage, filter: FilterKind) -> Result<DynamicImage> {
    let out = match filter.validate()? {
        FilterKind::Grayscale => DynamicImage::ImageRgba8(img.grayscale().to_rgba8()),
        FilterKind::Invert => {
            let mut out = img.clone();
            out.invert();
            out
        }
        FilterKind::Blur(sigma) => img.blur(sigma),
        FilterKind::Sharpen => img.unsharpen(1.0, 2),
        FilterKind::Sepia => map_pixels(img, |[r, g, b]| {
            [
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ]
        }),
    };
    Ok(out)
}

/// Apply tone and colour adjustments
///
/// Order: exposure, white balance, levels (blacks/whites),
/// highlights/shadows, contrast, saturation, vibrance.
pub fn adjust(img: &DynamicImage, params: &EditParams) -> DynamicImage {
    if params.is_unedited() {
        return img.clone();
    }
    let p = params.clamped();

    let gain = 2f32.powf(p.exposure);
    let temp = p.temperature as f32 / 100.0;
    let tint = p.tint as f32 / 100.0;
    let black_point = -p.blacks * 0.001;
    let white_point = 1.0 - p.whites * 0.001;
    let contrast = 1.0 + p.contrast / 100.0;
    let saturation = 1.0 + p.saturation / 100.0;
    let vibrance = p.vibrance / 100.0;

    map_pixels(img, |[r, g, b]| {
        // Exposure
        let mut c = [r * gain, g * gain, b * gain];

        // White balance
        c[0] *= 1.0 + 0.1 * temp;
        c[2] *= 1.0 - 0.1 * temp;
        c[1] *= 1.0 - 0.1 * tint;

        // Levels
        for v in c.iter_mut() {
            *v = (*v - black_point) / (white_point - black_point);
        }

        // Highlights and shadows, weighted by luminance
        let l = luminance(c);
        let delta = p.highlights / 100.0 * 0.25 * smoothstep(0.5, 1.0, l)
            + p.shadows / 100.0 * 0.25 * (1.0 - smoothstep(0.0, 0.5, l));
        for v in c.iter_mut() {
            *v += delta;
        }

        // Contrast around mid grey
        for v in c.iter_mut() {
            *v = (*v - 0.5) * contrast + 0.5;
        }

        // Saturation
        let gray = luminance(c);
        for v in c.iter_mut() {
            *v = gray + (*v - gray) * saturation;
        }

        // Vibrance: boost muted colours more than saturated ones
        if vibrance != 0.0 {
            let max = c[0].max(c[1]).max(c[2]);
            let min = c[0].min(c[1]).min(c[2]);
            let factor = 1.0 + vibrance * (1.0 - (max - min).clamp(0.0, 1.0));
            let gray = luminance(c);
            for v in c.iter_mut() {
                *v = gray + (*v - gray) * factor;
            }
        }

        c
    })
}

/// Run `f` over every pixel in normalized RGB, keeping alpha
fn map_pixels(img: &DynamicImage, f: impl Fn([f32; 3]) -> [f32; 3]) -> DynamicImage {
    let src = img.to_rgba8();
    let mut out = RgbaImage::new(src.width(), src.height());
    for (dst, px) in out.pixels_mut().zip(src.pixels()) {
        let [r, g, b, a] = px.0;
        let [r, g, b] = f([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
        *dst = Rgba([to_u8(r), to_u8(g), to_u8(b), a]);
    }
    DynamicImage::ImageRgba8(out)
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn luminance([r, g, b]: [f32; 3]) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
