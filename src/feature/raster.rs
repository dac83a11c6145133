//! Raster buffers and the codec boundary.
//!
//! A [`Raster`] is an opaque RGBA8 pixel buffer. Decoding from files or
//! encoded bytes is delegated to a [`RasterCodec`] supplied by the host; the
//! core only performs the buffer operations maps need (crop, resize, blur).

use std::path::Path;

/// Bytes per pixel (RGBA8).
pub const CHANNELS: usize = 4;

/// Errors from raster construction and manipulation.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("crop {width}x{height} at ({x}, {y}) exceeds raster of {raster_width}x{raster_height}")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        raster_width: u32,
        raster_height: u32,
    },
    #[error("failed to read raster source: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(String),
}

// ---------------------------------------------------------------------------
// Raster
// ---------------------------------------------------------------------------

/// An RGBA8 pixel buffer, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap a raw RGBA buffer.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(RasterError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// A raster filled with a single colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat(width as usize * height as usize);
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The pixel at `(x, y)`, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Copy out a sub-rectangle.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Raster, RasterError> {
        let fits_x = x.checked_add(width).is_some_and(|r| r <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|b| b <= self.height);
        if !fits_x || !fits_y {
            return Err(RasterError::CropOutOfBounds {
                x,
                y,
                width,
                height,
                raster_width: self.width,
                raster_height: self.height,
            });
        }

        let row_bytes = width as usize * CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y + height {
            let start = self.index(x, row);
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Ok(Raster { width, height, data })
    }

    /// Nearest-neighbour resample to `width` x `height`.
    pub fn resize(&self, width: u32, height: u32) -> Raster {
        if self.width == 0 || self.height == 0 {
            return Raster::filled(width, height, [0, 0, 0, 0]);
        }
        let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            let sy = (u64::from(y) * u64::from(self.height) / u64::from(height.max(1))) as u32;
            for x in 0..width {
                let sx = (u64::from(x) * u64::from(self.width) / u64::from(width.max(1))) as u32;
                let i = self.index(sx, sy);
                data.extend_from_slice(&self.data[i..i + CHANNELS]);
            }
        }
        Raster { width, height, data }
    }

    /// Separable box blur with the given radius in pixels.
    ///
    /// Edge pixels are clamped. A radius of zero returns an identical copy.
    pub fn blur(&self, radius: u32) -> Raster {
        if radius == 0 || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let horizontal = self.box_pass(radius, true);
        horizontal.box_pass(radius, false)
    }

    /// One blur direction. Each line keeps running sums, so the cost per
    /// pixel does not depend on the radius; clamped edges are counted in bulk.
    fn box_pass(&self, radius: u32, horizontal: bool) -> Raster {
        let (lines, len) = if horizontal {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        let r = i64::from(radius);
        let last = i64::from(len) - 1;
        let window = 2 * u64::from(radius) + 1;
        let mut out = vec![0u8; self.data.len()];
        let mut prefix = vec![[0u64; CHANNELS]; len as usize + 1];

        for line in 0..lines {
            let at = |i: u32| if horizontal { self.index(i, line) } else { self.index(line, i) };
            for i in 0..len as usize {
                let p = at(i as u32);
                for c in 0..CHANNELS {
                    prefix[i + 1][c] = prefix[i][c] + u64::from(self.data[p + c]);
                }
            }
            let (head, tail) = (at(0), at(len - 1));
            for i in 0..len {
                let centre = i64::from(i);
                let lo = (centre - r).max(0) as usize;
                let hi = (centre + r).min(last) as usize;
                let before = (r - centre).max(0) as u64;
                let after = (centre + r - last).max(0) as u64;
                let o = at(i);
                for c in 0..CHANNELS {
                    let sum = prefix[hi + 1][c] - prefix[lo][c]
                        + before * u64::from(self.data[head + c])
                        + after * u64::from(self.data[tail + c]);
                    out[o + c] = ((sum + window / 2) / window) as u8;
                }
            }
        }
        Raster { width: self.width, height: self.height, data: out }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

// ---------------------------------------------------------------------------
// RasterCodec
// ---------------------------------------------------------------------------

/// Decodes encoded image bytes into a [`Raster`].
///
/// Hosts plug in whatever image library they ship; the core stays agnostic.
pub trait RasterCodec {
    /// Decode an in-memory encoded image.
    fn decode(&self, bytes: &[u8]) -> Result<Raster, RasterError>;

    /// Read a file and decode it.
    fn load(&self, path: &Path) -> Result<Raster, RasterError> {
        let bytes = std::fs::read(path)?;
        self.decode(&bytes)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
