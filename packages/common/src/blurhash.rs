//! Blurhash codec.
//!
//! Thin wrapper around the `blurhash` crate that adds component validation,
//! size-header parsing and byte-level image decoding. Encoding always runs on
//! the full decoded raster so the result is a pure function of
//! `(image bytes, components)`.

use std::fmt;
use std::io::Cursor;

use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use thiserror::Error;

/// Characters of the base-83 alphabet used by blurhash, in digit order.
const BASE83_ALPHABET: &[u8; 83] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz#$%*+,-.:;=?@[]^_{|}~";

/// Largest component count the format can express on either axis.
pub const MAX_COMPONENTS: u32 = 9;

#[derive(Debug, Error)]
pub enum BlurhashError {
    #[error("components must be within 1..={MAX_COMPONENTS}, got {x}x{y}")]
    InvalidComponents { x: u32, y: u32 },

    #[error("malformed blurhash: {0}")]
    MalformedHash(String),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("unsupported image format")]
    UnsupportedImageFormat,

    #[error("image of {width}x{height} exceeds the limit of {limit} pixels")]
    ImageTooLarge { width: u32, height: u32, limit: u64 },

    #[error("failed to decode image: {0}")]
    ImageDecode(ImageError),

    #[error("blurhash encoding failed: {0}")]
    Encode(String),
}

impl From<ImageError> for BlurhashError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported(_) => Self::UnsupportedImageFormat,
            other => Self::ImageDecode(other),
        }
    }
}

/// Number of DCT components along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Components {
    pub x: u32,
    pub y: u32,
}

impl Components {
    pub fn new(x: u32, y: u32) -> Result<Self, BlurhashError> {
        let in_range = |n: u32| (1..=MAX_COMPONENTS).contains(&n);
        if in_range(x) && in_range(y) {
            Ok(Self { x, y })
        } else {
            Err(BlurhashError::InvalidComponents { x, y })
        }
    }

    /// Length of a hash string produced with these components.
    pub fn hash_len(&self) -> usize {
        4 + 2 * (self.x * self.y) as usize
    }
}

impl Default for Components {
    fn default() -> Self {
        Self { x: 4, y: 3 }
    }
}

impl fmt::Display for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Encode a decoded image.
pub fn encode(image: &DynamicImage, components: Components) -> Result<String, BlurhashError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(BlurhashError::EmptyImage);
    }

    let rgba = image.to_rgba8();
    ::blurhash::encode(components.x, components.y, width, height, rgba.as_raw())
        .map_err(|e| BlurhashError::Encode(e.to_string()))
}

/// Read the component counts declared in a hash's size header.
///
/// Validates the alphabet and that the total length matches the header.
pub fn decode_components(hash: &str) -> Result<Components, BlurhashError> {
    let mut digits = Vec::with_capacity(hash.len());
    for (pos, c) in hash.chars().enumerate() {
        let digit = base83_digit(c).ok_or_else(|| {
            BlurhashError::MalformedHash(format!("invalid character {c:?} at position {pos}"))
        })?;
        digits.push(digit);
    }

    if digits.len() < 6 {
        return Err(BlurhashError::MalformedHash(format!(
            "expected at least 6 characters, got {}",
            digits.len()
        )));
    }

    let size_flag = digits[0];
    if size_flag >= MAX_COMPONENTS * MAX_COMPONENTS {
        return Err(BlurhashError::MalformedHash(format!(
            "invalid size header {size_flag}"
        )));
    }

    let components = Components {
        x: size_flag % MAX_COMPONENTS + 1,
        y: size_flag / MAX_COMPONENTS + 1,
    };

    if digits.len() != components.hash_len() {
        return Err(BlurhashError::MalformedHash(format!(
            "expected {} characters for {components} components, got {}",
            components.hash_len(),
            digits.len()
        )));
    }

    Ok(components)
}

/// Decode raw upload bytes and encode them.
///
/// The format is sniffed from the bytes first and falls back to the MIME
/// hint. Dimensions are checked against `max_pixels` before the full decode.
pub fn encode_bytes(
    data: &[u8],
    content_type: Option<&str>,
    components: Components,
    max_pixels: u64,
) -> Result<String, BlurhashError> {
    let (width, height) = image_reader(data, content_type)?.into_dimensions()?;
    if u64::from(width) * u64::from(height) > max_pixels {
        return Err(BlurhashError::ImageTooLarge {
            width,
            height,
            limit: max_pixels,
        });
    }

    let image = image_reader(data, content_type)?.decode()?;
    encode(&image, components)
}

fn image_reader<'a>(
    data: &'a [u8],
    content_type: Option<&str>,
) -> Result<ImageReader<Cursor<&'a [u8]>>, BlurhashError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BlurhashError::ImageDecode(ImageError::IoError(e)))?;

    let format = match reader.format() {
        Some(format) => format,
        None => {
            let format = content_type
                .and_then(ImageFormat::from_mime_type)
                .ok_or(BlurhashError::UnsupportedImageFormat)?;
            reader.set_format(format);
            format
        }
    };

    if !format.reading_enabled() {
        return Err(BlurhashError::UnsupportedImageFormat);
    }

    Ok(reader)
}

fn base83_digit(c: char) -> Option<u32> {
    if !c.is_ascii() {
        return None;
    }
    BASE83_ALPHABET
        .iter()
        .position(|&b| b == c as u8)
        .map(|pos| pos as u32)
}
