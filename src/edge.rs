//! Edge-density blockage heuristic.
//!
//! Fallback used when object detection finds nothing: convert the frame to
//! grayscale, mark edge pixels with a fixed-threshold Sobel operator, and
//! measure the fraction of edge pixels inside a centered crop. A dense
//! center is a proxy for "something textured and close fills the view".

use crate::frame::Frame;

/// Fixed magnitude threshold for the Sobel operator (|gx| + |gy| scale).
const EDGE_MAGNITUDE_THRESHOLD: i32 = 400;

#[derive(Clone, Copy, Debug)]
pub struct EdgeBlockageHeuristic {
    center_ratio: f64,
    density_threshold: f64,
}

impl EdgeBlockageHeuristic {
    pub fn new(center_ratio: f64, density_threshold: f64) -> Self {
        Self {
            center_ratio,
            density_threshold,
        }
    }

    /// True iff the edge-pixel density of the centered crop meets the
    /// configured threshold. A zero-area crop (pathological dimensions)
    /// is never blocking.
    pub fn is_blocking(&self, frame: &Frame) -> bool {
        let w = frame.width() as usize;
        let h = frame.height() as usize;
        if w == 0 || h == 0 {
            return false;
        }

        let gray = grayscale(frame);
        let edges = sobel_edges(&gray, w, h);

        // Centered crop, at least one pixel per side for sane inputs.
        let ch = ((h as f64 * self.center_ratio) as usize).max(1).min(h);
        let cw = ((w as f64 * self.center_ratio) as usize).max(1).min(w);
        let r1 = (h - ch) / 2;
        let c1 = (w - cw) / 2;

        let area = ch * cw;
        if area == 0 {
            return false;
        }

        let mut edge_pixels = 0usize;
        for row in r1..r1 + ch {
            for col in c1..c1 + cw {
                if edges[row * w + col] {
                    edge_pixels += 1;
                }
            }
        }

        let density = edge_pixels as f64 / area as f64;
        log::debug!(
            "edge fallback: crop {}x{} density {:.3} (threshold {:.3})",
            cw,
            ch,
            density,
            self.density_threshold
        );
        density >= self.density_threshold
    }
}

/// Integer BGR -> luma conversion (ITU-R 601 weights).
fn grayscale(frame: &Frame) -> Vec<u8> {
    frame
        .pixels()
        .chunks_exact(3)
        .map(|bgr| {
            let b = bgr[0] as u32;
            let g = bgr[1] as u32;
            let r = bgr[2] as u32;
            ((299 * r + 587 * g + 114 * b) / 1000) as u8
        })
        .collect()
}

/// 3x3 Sobel edge map with a fixed magnitude threshold. Border pixels have
/// no full neighborhood and are never edges.
fn sobel_edges(gray: &[u8], w: usize, h: usize) -> Vec<bool> {
    let mut edges = vec![false; w * h];
    if w < 3 || h < 3 {
        return edges;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let px = |dx: isize, dy: isize| -> i32 {
                let xx = (x as isize + dx) as usize;
                let yy = (y as isize + dy) as usize;
                gray[yy * w + xx] as i32
            };
            let gx = px(1, -1) + 2 * px(1, 0) + px(1, 1) - px(-1, -1) - 2 * px(-1, 0) - px(-1, 1);
            let gy = px(-1, 1) + 2 * px(0, 1) + px(1, 1) - px(-1, -1) - 2 * px(0, -1) - px(1, -1);
            edges[y * w + x] = gx.abs() + gy.abs() >= EDGE_MAGNITUDE_THRESHOLD;
        }
    }
    edges
}
