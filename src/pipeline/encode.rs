//! Image encoding: `DynamicImage` → base64 JPEG payload.
//!
//! Local vision models accept images as base64 data-URIs embedded in the
//! JSON request body. A rendered administrative page is mostly flat white
//! with dark type, which JPEG compresses to a fraction of the PNG size, and
//! request size dominates latency on a local Ollama.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type of every encoded page.
pub const JPEG_MIME: &str = "image/jpeg";

/// A base64-encoded image ready to embed in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Base64 (standard alphabet, padded) without any `data:` prefix.
    pub data: String,
    pub mime_type: String,
}

impl EncodedImage {
    /// `data:<mime>;base64,<data>` form used by OpenAI-style `image_url` parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// The same payload as an `edgequake-llm` attachment.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.data.clone(), self.mime_type.clone())
    }
}

/// Encode a rendered page as base64 JPEG.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_page(img: &DynamicImage) -> Result<EncodedImage, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} page → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(EncodedImage {
        data: b64,
        mime_type: JPEG_MIME.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let encoded = encode_page(&img).expect("encode should succeed");
        assert_eq!(encoded.mime_type, "image/jpeg");

        let decoded = STANDARD.decode(&encoded.data).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);

        let round = image::load_from_memory(&decoded).expect("decodable JPEG");
        assert_eq!((round.width(), round.height()), (10, 10));
    }

    #[test]
    fn data_url_has_prefix() {
        let e = EncodedImage {
            data: "QUJD".into(),
            mime_type: JPEG_MIME.into(),
        };
        assert_eq!(e.data_url(), "data:image/jpeg;base64,QUJD");
        assert_eq!(e.to_image_data().mime_type, "image/jpeg");
    }
}
