/// Decoding and encoding between payloads and working images

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::state::data::ImagePayload;

/// Identify the MIME type of an encoded image from its magic bytes
///
/// Returns `None` when the bytes are not a format the image crate knows.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}

/// Decode a payload into a working image
pub fn decode(payload: &ImagePayload) -> Result<DynamicImage> {
    Ok(image::load_from_memory(&payload.bytes)?)
}

/// Encode a working image into a payload
pub fn encode(img: &DynamicImage, format: OutputFormat) -> Result<ImagePayload> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => img.write_to(&mut buffer, ImageFormat::Png)?,
        // JPEG has no alpha channel
        OutputFormat::Jpeg => {
            DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut buffer, ImageFormat::Jpeg)?
        }
    }
    Ok(ImagePayload::new(format.mime(), buffer.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255])))
    }

    #[test]
    fn test_png_encode_is_lossless() {
        let payload = encode(&sample(), OutputFormat::Png).unwrap();
        assert_eq!(payload.mime, "image/png");
        assert_eq!(sniff_mime(&payload.bytes), Some("image/png"));

        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded.to_rgba8(), sample().to_rgba8());
    }

    #[test]
    fn test_jpeg_encode_drops_alpha() {
        let payload = encode(&sample(), OutputFormat::Jpeg).unwrap();
        assert_eq!(payload.mime, "image/jpeg");
        assert_eq!(sniff_mime(&payload.bytes), Some("image/jpeg"));

        let decoded = decode(&payload).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_sniff_unknown_bytes() {
        assert_eq!(sniff_mime(b"hello world"), None);
        assert_eq!(sniff_mime(&[]), None);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let payload = ImagePayload::new("image/png", vec![1, 2, 3]);
        assert!(decode(&payload).is_err());
    }
}
