//! Mask codec: bitmap and alpha-mask payloads.
//!
//! A mask payload is `{"data": <base64>, "origin": [x, y]}` where `data`
//! is base64 around a zlib stream around a PNG image. Images with an
//! alpha channel contribute that channel; single-channel images
//! contribute their gray values. Any nonzero value is foreground.
//!
//! Clients may store a mask with empty rows or columns around the
//! foreground. Decoding always trims to the tight box and reports whether
//! the declared box (origin + raw size) differed from the trimmed one.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Pixel};
use serde_json::Value;

use crate::bbox::BoundingBox;
use crate::error::{DecodeError, EncodeError};
use crate::types::Point;

/// Largest absolute coordinate accepted in a payload.
///
/// Keeps box arithmetic (`bottom - top + 1`, areas) far from overflow.
pub const MAX_COORDINATE: i64 = i32::MAX as i64;

/// The two shape tags sharing this codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    /// Binary mask. Foreground pixels are stored as 255.
    Bitmap,
    /// Mask with 8-bit alpha values, kept as decoded.
    AlphaMask,
}

impl MaskKind {
    /// Payload key holding the mask body, which is also the shape tag.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Bitmap => "bitmap",
            Self::AlphaMask => "alpha_mask",
        }
    }
}

/// A mask trimmed to its foreground, anchored at an absolute origin.
///
/// The pixel buffer never has an empty border row or column.
#[derive(Debug, Clone)]
pub struct Mask {
    origin: Point,
    pixels: GrayImage,
}

impl Mask {
    /// Build a mask from raw pixels placed at `origin`, trimming empty
    /// rows and columns from every side.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::EmptyMask`] if no pixel is nonzero.
    pub fn from_pixels(pixels: &GrayImage, origin: Point) -> Result<Self, DecodeError> {
        let (top, left, bottom, right) =
            foreground_bounds(pixels).ok_or(DecodeError::EmptyMask)?;
        let cropped = GrayImage::from_fn(right - left + 1, bottom - top + 1, |x, y| {
            *pixels.get_pixel(x + left, y + top)
        });
        Ok(Self {
            origin: origin.translate(i64::from(top), i64::from(left)),
            pixels: cropped,
        })
    }

    /// Position of the top-left pixel of the buffer.
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// The trimmed pixel buffer.
    #[must_use]
    pub const fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    /// Tight box around the foreground, in canvas coordinates.
    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        declared_bbox(&self.pixels, self.origin)
    }

    /// Number of foreground pixels.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn area(&self) -> f64 {
        self.pixels.pixels().filter(|p| p[0] > 0).count() as f64
    }
}

impl PartialEq for Mask {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.pixels.dimensions() == other.pixels.dimensions()
            && self.pixels.as_raw() == other.pixels.as_raw()
    }
}

/// Result of decoding a mask payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMask {
    /// The trimmed mask.
    pub mask: Mask,
    /// Box spanned by the origin and the raw (untrimmed) mask size.
    pub declared: BoundingBox,
}

impl DecodedMask {
    /// Tight box around the foreground.
    #[must_use]
    pub fn trimmed(&self) -> BoundingBox {
        self.mask.bbox()
    }

    /// Whether trimming moved any corner of the declared box.
    #[must_use]
    pub fn geometry_changed(&self) -> bool {
        self.declared.corners() != self.trimmed().corners()
    }
}

/// Decode the mask stored under `kind.field()` in `payload`.
///
/// # Errors
///
/// Returns [`DecodeError`] if the body, `data` or `origin` is missing,
/// `data` is null or undecodable, `origin` is not two integers, or the
/// mask has no foreground.
pub fn decode_mask(payload: &Value, kind: MaskKind) -> Result<DecodedMask, DecodeError> {
    let body = payload
        .get(kind.field())
        .ok_or(DecodeError::MissingField(kind.field()))?;
    let data = match body.get("data") {
        None => return Err(DecodeError::MissingField("data")),
        Some(Value::Null) => return Err(DecodeError::invalid("data", "must not be null")),
        Some(Value::String(s)) => s,
        Some(_) => return Err(DecodeError::invalid("data", "expected a base64 string")),
    };
    let origin = parse_origin(body.get("origin").ok_or(DecodeError::MissingField("origin"))?)?;

    let mut pixels = decode_pixels(data)?;
    if kind == MaskKind::Bitmap {
        for p in pixels.pixels_mut() {
            if p[0] > 0 {
                p[0] = u8::MAX;
            }
        }
    }

    let declared = declared_bbox(&pixels, origin);
    let mask = Mask::from_pixels(&pixels, origin)?;
    Ok(DecodedMask { mask, declared })
}

/// Decode a base64(zlib(PNG)) string into a single-channel mask buffer.
///
/// # Errors
///
/// Returns [`DecodeError::MaskData`] if any layer fails to decode or the
/// PNG is neither single-channel nor carries an alpha channel.
///
/// 16-bit samples are narrowed to 8 bits without dropping any nonzero
/// value to zero.
pub fn decode_pixels(data: &str) -> Result<GrayImage, DecodeError> {
    let compressed = STANDARD
        .decode(data.trim())
        .map_err(|e| DecodeError::MaskData(format!("invalid base64: {e}")))?;
    let png = miniz_oxide::inflate::decompress_to_vec_zlib(&compressed)
        .map_err(|e| DecodeError::MaskData(format!("invalid zlib stream: {:?}", e.status)))?;
    let img = image::load_from_memory_with_format(&png, ImageFormat::Png)
        .map_err(|e| DecodeError::MaskData(format!("invalid PNG: {e}")))?;

    match img {
        DynamicImage::ImageLuma8(gray) => Ok(gray),
        DynamicImage::ImageLumaA8(la) => Ok(channel(&la, 1, |v| v)),
        DynamicImage::ImageRgba8(rgba) => Ok(channel(&rgba, 3, |v| v)),
        DynamicImage::ImageLuma16(gray) => Ok(channel(&gray, 0, narrow)),
        DynamicImage::ImageLumaA16(la) => Ok(channel(&la, 1, narrow)),
        DynamicImage::ImageRgba16(rgba) => Ok(channel(&rgba, 3, narrow)),
        other => Err(DecodeError::MaskData(format!(
            "wrong internal mask format: {:?}",
            other.color()
        ))),
    }
}

/// Extract one channel of `img` as an 8-bit buffer.
fn channel<P: Pixel>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    index: usize,
    to_u8: impl Fn(P::Subpixel) -> u8,
) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([to_u8(img.get_pixel(x, y).channels()[index])])
    })
}

/// Reduce a 16-bit sample to 8 bits, keeping every nonzero sample nonzero.
fn narrow(v: u16) -> u8 {
    match v {
        0 => 0,
        _ => u8::try_from(v >> 8).unwrap_or(u8::MAX).max(1),
    }
}

/// Encode a mask buffer as base64(zlib(8-bit gray PNG)).
///
/// # Errors
///
/// Returns [`EncodeError::MaskImage`] if PNG encoding fails.
pub fn encode_pixels(pixels: &GrayImage) -> Result<String, EncodeError> {
    let mut png = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png);
    image::ImageEncoder::write_image(
        encoder,
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        image::ExtendedColorType::L8,
    )?;
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&png, 6);
    Ok(STANDARD.encode(compressed))
}

fn parse_origin(value: &Value) -> Result<Point, DecodeError> {
    let coords: Vec<i64> = value
        .as_array()
        .ok_or_else(|| DecodeError::invalid("origin", "expected [x, y]"))?
        .iter()
        .map(Value::as_i64)
        .collect::<Option<_>>()
        .ok_or_else(|| DecodeError::invalid("origin", "coordinates must be integers"))?;
    match coords.as_slice() {
        &[x, y]
            if x.unsigned_abs() <= MAX_COORDINATE.unsigned_abs()
                && y.unsigned_abs() <= MAX_COORDINATE.unsigned_abs() =>
        {
            Ok(Point::new(y, x))
        }
        &[_, _] => Err(DecodeError::invalid("origin", "coordinate out of range")),
        _ => Err(DecodeError::invalid("origin", "expected [x, y]")),
    }
}

fn declared_bbox(pixels: &GrayImage, origin: Point) -> BoundingBox {
    BoundingBox::from_size(i64::from(pixels.height()), i64::from(pixels.width()))
        .translate(origin.row, origin.col)
}

/// `(top, left, bottom, right)` of the nonzero pixels, buffer-relative.
fn foreground_bounds(pixels: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    pixels
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .fold(None, |acc, (x, y, _)| match acc {
            None => Some((y, x, y, x)),
            Some((top, left, bottom, right)) => {
                Some((top.min(y), left.min(x), bottom.max(y), right.max(x)))
            }
        })
}
