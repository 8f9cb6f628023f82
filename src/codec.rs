use std::io::Cursor;

use image::ImageFormat;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("decode page blob: {0}")]
    Decode(String),

    #[error("transcode page image: {0}")]
    Transcode(String),
}

/// Turns a vendor page blob into an encoded raster image.
pub trait Decoder: Send + Sync {
    /// Extension of the intermediate file holding the decoded image.
    fn extension(&self) -> &str;

    fn decode(&self, blob: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Re-encodes an intermediate raster image into the persisted format.
pub trait Transcoder: Send + Sync {
    /// Extension of the final page artifact.
    fn extension(&self) -> &str;

    fn convert(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError>;
}

const MRI_XOR_KEY: u8 = 101;
const WEBP_PREFIX_AFTER_SIZE: &[u8] = b"WEBPVP8";

/// MangaRock `.mri` blobs: a WebP stream without its leading
/// `RIFF<size>WEBPVP8` bytes, every remaining byte XOR-ed with 101.
#[derive(Debug, Clone, Copy, Default)]
pub struct MriDecoder;

impl Decoder for MriDecoder {
    fn extension(&self) -> &str {
        "webp"
    }

    fn decode(&self, blob: &[u8]) -> Result<Vec<u8>, CodecError> {
        if blob.is_empty() {
            return Err(CodecError::Decode("empty blob".to_owned()));
        }
        let riff_size = u32::try_from(blob.len() + WEBP_PREFIX_AFTER_SIZE.len())
            .map_err(|_| CodecError::Decode(format!("blob too large: {} bytes", blob.len())))?;

        let mut out = Vec::with_capacity(blob.len() + 15);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&riff_size.to_le_bytes());
        out.extend_from_slice(WEBP_PREFIX_AFTER_SIZE);
        out.extend(blob.iter().map(|byte| byte ^ MRI_XOR_KEY));
        Ok(out)
    }
}

/// Loads any raster format `image` recognises, drops alpha, writes PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngTranscoder;

impl Transcoder for PngTranscoder {
    fn extension(&self) -> &str {
        "png"
    }

    fn convert(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        let image = image::load_from_memory(encoded)
            .map_err(|err| CodecError::Transcode(format!("load image: {err}")))?;
        let rgb = image::DynamicImage::ImageRgb8(image.to_rgb8());

        let mut out = Cursor::new(Vec::new());
        rgb.write_to(&mut out, ImageFormat::Png)
            .map_err(|err| CodecError::Transcode(format!("encode png: {err}")))?;
        Ok(out.into_inner())
    }
}

/// Inverse of [`MriDecoder`], used to build fixtures from real WebP data.
pub fn encode_mri(webp: &[u8]) -> Option<Vec<u8>> {
    if webp.len() <= 15 || &webp[..4] != b"RIFF" || &webp[8..15] != WEBP_PREFIX_AFTER_SIZE {
        return None;
    }
    Some(webp[15..].iter().map(|byte| byte ^ MRI_XOR_KEY).collect())
}
