//! Club logo encoding and size reduction.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};
use thiserror::Error;

/// Failure while reading or re-encoding a logo.
#[derive(Debug, Error)]
pub enum LogoError {
    /// Input is not a base64 data URL.
    #[error("Logo ist keine gültige Data-URL")]
    NotADataUrl,
    /// Payload is not valid base64.
    #[error("Logo ist nicht korrekt Base64-kodiert: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Payload is not a decodable image, or encoding failed.
    #[error("Logo konnte nicht verarbeitet werden: {0}")]
    Image(#[from] image::ImageError),
}

/// Re-encodes a logo data URL into a smaller one.
///
/// The store only keeps the output when it is strictly shorter than the input.
pub trait LogoCompressor: Send + Sync {
    /// Returns the re-encoded logo as a data URL.
    fn compress(&self, data_url: &str) -> Result<String, LogoError>;
}

/// Downsamples into a square bounding box and re-encodes as JPEG.
#[derive(Debug, Clone)]
pub struct JpegLogoCompressor {
    /// Longest allowed edge, in pixels.
    pub max_dimension: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}

impl Default for JpegLogoCompressor {
    fn default() -> Self {
        Self {
            max_dimension: 300,
            quality: 70,
        }
    }
}

impl LogoCompressor for JpegLogoCompressor {
    fn compress(&self, data_url: &str) -> Result<String, LogoError> {
        let (_, payload) = parse_data_url(data_url).ok_or(LogoError::NotADataUrl)?;
        let bytes = STANDARD.decode(payload.trim())?;
        let mut img = image::load_from_memory(&bytes)?;

        if img.width() > self.max_dimension || img.height() > self.max_dimension {
            img = img.resize(self.max_dimension, self.max_dimension, FilterType::Triangle);
        }

        let rgb = img.to_rgb8();
        let mut out = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.quality))?;
        Ok(to_data_url(&out, "image/jpeg"))
    }
}

/// Wraps raw image bytes in a base64 data URL.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Splits a base64 data URL into its mime type and payload.
pub fn parse_data_url(data_url: &str) -> Option<(&str, &str)> {
    let rest = data_url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Size in bytes of the image a data URL carries.
pub fn decoded_len(data_url: &str) -> usize {
    let payload = parse_data_url(data_url).map(|(_, p)| p).unwrap_or(data_url);
    let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
    (payload.len() / 4 * 3).saturating_sub(padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        to_data_url(&buf.into_inner(), "image/png")
    }

    #[test]
    fn data_url_parts() {
        assert_eq!(parse_data_url("data:image/png;base64,AAAA"), Some(("image/png", "AAAA")));
        assert_eq!(parse_data_url("image/png;base64,AAAA"), None);
        assert_eq!(parse_data_url("data:image/png,AAAA"), None);
    }

    #[test]
    fn decoded_len_matches_input() {
        for n in [0usize, 1, 2, 3, 10, 1000] {
            let url = to_data_url(&vec![7u8; n], "image/png");
            assert_eq!(decoded_len(&url), n);
        }
    }

    #[test]
    fn compress_fits_bounding_box() {
        let out = JpegLogoCompressor::default().compress(&png_data_url(900, 450)).unwrap();
        let (mime, payload) = parse_data_url(&out).unwrap();
        assert_eq!(mime, "image/jpeg");
        let img = image::load_from_memory(&STANDARD.decode(payload).unwrap()).unwrap();
        assert_eq!((img.width(), img.height()), (300, 150));
    }

    #[test]
    fn small_images_keep_dimensions() {
        let out = JpegLogoCompressor::default().compress(&png_data_url(40, 20)).unwrap();
        let (_, payload) = parse_data_url(&out).unwrap();
        let img = image::load_from_memory(&STANDARD.decode(payload).unwrap()).unwrap();
        assert_eq!((img.width(), img.height()), (40, 20));
    }

    #[test]
    fn garbage_is_rejected() {
        let c = JpegLogoCompressor::default();
        assert!(matches!(c.compress("not a url"), Err(LogoError::NotADataUrl)));
        assert!(matches!(c.compress("data:image/png;base64,@@@"), Err(LogoError::Base64(_))));
        assert!(matches!(
            c.compress(&to_data_url(b"nope", "image/png")),
            Err(LogoError::Image(_))
        ));
    }
}
