//! Raster frame type.
//!
//! A `Frame` is one captured camera image: height x width x 3 bytes in BGR
//! order. Frames are produced by the capture layer, consumed by exactly one
//! pipeline pass, and dropped. There is no retention or cross-frame state.

use anyhow::{anyhow, Result};

/// Rotation applied to a frame at capture time, in 90-degree steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Parse a rotation from degrees. Angles are normalized modulo 360;
    /// anything that is not a multiple of 90 is rejected.
    pub fn from_degrees(deg: u32) -> Result<Self> {
        match deg % 360 {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            other => Err(anyhow!("rotate_deg must be a multiple of 90, got {}", other)),
        }
    }
}

/// One captured frame. Pixel data is BGR, row-major, 3 bytes per pixel.
///
/// Dimensions are carried per-frame: capture devices deliver best-effort
/// resolutions and 90/270-degree rotation swaps width and height, so
/// downstream code must never assume fixed dimensions.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap raw BGR bytes. The buffer length must be exactly
    /// `width * height * 3`.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "BGR frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw BGR bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Rotate the frame clockwise in 90-degree steps. 90 and 270 swap the
    /// frame's width and height.
    pub fn rotated(self, rotation: Rotation) -> Frame {
        let (w, h) = (self.width as usize, self.height as usize);
        match rotation {
            Rotation::None => self,
            Rotation::Cw90 => {
                let mut out = vec![0u8; self.data.len()];
                for y in 0..h {
                    for x in 0..w {
                        let src = (y * w + x) * 3;
                        let dst = (x * h + (h - 1 - y)) * 3;
                        out[dst..dst + 3].copy_from_slice(&self.data[src..src + 3]);
                    }
                }
                Frame {
                    data: out,
                    width: self.height,
                    height: self.width,
                }
            }
            Rotation::Cw180 => {
                let mut out = vec![0u8; self.data.len()];
                for y in 0..h {
                    for x in 0..w {
                        let src = (y * w + x) * 3;
                        let dst = ((h - 1 - y) * w + (w - 1 - x)) * 3;
                        out[dst..dst + 3].copy_from_slice(&self.data[src..src + 3]);
                    }
                }
                Frame {
                    data: out,
                    width: self.width,
                    height: self.height,
                }
            }
            Rotation::Cw270 => {
                let mut out = vec![0u8; self.data.len()];
                for y in 0..h {
                    for x in 0..w {
                        let src = (y * w + x) * 3;
                        let dst = ((w - 1 - x) * h + y) * 3;
                        out[dst..dst + 3].copy_from_slice(&self.data[src..src + 3]);
                    }
                }
                Frame {
                    data: out,
                    width: self.height,
                    height: self.width,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgr(pixels: &[[u8; 3]], width: u32, height: u32) -> Frame {
        let data: Vec<u8> = pixels.iter().flatten().copied().collect();
        Frame::from_bgr(data, width, height).unwrap()
    }

    #[test]
    fn from_bgr_validates_length() {
        assert!(Frame::from_bgr(vec![0u8; 11], 2, 2).is_err());
        assert!(Frame::from_bgr(vec![0u8; 12], 2, 2).is_ok());
    }

    #[test]
    fn rotation_90_swaps_dimensions() {
        // Row [A B] rotated 90 CW becomes a column with A on top.
        let frame = bgr(&[[1, 1, 1], [2, 2, 2]], 2, 1);
        let rotated = frame.rotated(Rotation::Cw90);
        assert_eq!(rotated.width(), 1);
        assert_eq!(rotated.height(), 2);
        assert_eq!(rotated.pixels(), &[1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn rotation_180_preserves_dimensions() {
        let frame = bgr(&[[1, 1, 1], [2, 2, 2]], 2, 1);
        let rotated = frame.rotated(Rotation::Cw180);
        assert_eq!(rotated.width(), 2);
        assert_eq!(rotated.height(), 1);
        assert_eq!(rotated.pixels(), &[2, 2, 2, 1, 1, 1]);
    }

    #[test]
    fn rotation_270_swaps_dimensions() {
        // Row [A B] rotated 270 CW (90 CCW) becomes a column with B on top.
        let frame = bgr(&[[1, 1, 1], [2, 2, 2]], 2, 1);
        let rotated = frame.rotated(Rotation::Cw270);
        assert_eq!(rotated.width(), 1);
        assert_eq!(rotated.height(), 2);
        assert_eq!(rotated.pixels(), &[2, 2, 2, 1, 1, 1]);
    }

    #[test]
    fn rotation_round_trip() {
        let frame = bgr(
            &[
                [1, 0, 0],
                [2, 0, 0],
                [3, 0, 0],
                [4, 0, 0],
                [5, 0, 0],
                [6, 0, 0],
            ],
            3,
            2,
        );
        let original = frame.pixels().to_vec();
        let back = frame
            .rotated(Rotation::Cw90)
            .rotated(Rotation::Cw90)
            .rotated(Rotation::Cw180);
        assert_eq!(back.width(), 3);
        assert_eq!(back.height(), 2);
        assert_eq!(back.pixels(), original.as_slice());
    }

    #[test]
    fn degrees_parse_and_normalize() {
        assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::None);
        assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Cw90);
        assert!(Rotation::from_degrees(45).is_err());
    }
}
