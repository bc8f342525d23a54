//! Camera frame sources.
//!
//! `FrameSource` produces one BGR [`Frame`] per `read()` call. The real
//! device backend uses V4L2 behind the `capture-v4l2` feature; without it a
//! synthetic in-memory source stands in so the pipeline stays runnable on
//! any machine. A scripted source exists for tests.
//!
//! Capture failures are transient by contract: `read()` returns `None` and
//! the caller retries after a short backoff. Requested resolution is
//! best-effort; delivered dimensions are carried on each frame.

#[cfg(feature = "capture-v4l2")]
mod v4l2;

use std::collections::VecDeque;

use anyhow::Result;

use crate::frame::{Frame, Rotation};

/// Capture device selection and geometry.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device index; maps to `/dev/video<index>` on the V4L2 backend.
    pub index: u32,
    /// Requested frame width (best-effort).
    pub width: u32,
    /// Requested frame height (best-effort).
    pub height: u32,
    /// Rotation applied to every frame before it leaves the source.
    pub rotation: Rotation,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 416,
            height: 312,
            rotation: Rotation::None,
        }
    }
}

pub struct FrameSource {
    backend: Backend,
    rotation: Rotation,
}

enum Backend {
    Synthetic(SyntheticSource),
    Scripted(VecDeque<Option<Frame>>),
    #[cfg(feature = "capture-v4l2")]
    Device(v4l2::DeviceSource),
}

impl FrameSource {
    /// Construct a source for the configured camera. With `capture-v4l2`
    /// this is a real device; otherwise a synthetic source stands in.
    pub fn new(config: CameraConfig) -> Self {
        let rotation = config.rotation;
        #[cfg(feature = "capture-v4l2")]
        let backend = Backend::Device(v4l2::DeviceSource::new(config));
        #[cfg(not(feature = "capture-v4l2"))]
        let backend = {
            log::warn!(
                "built without capture-v4l2; camera index {} replaced by a synthetic source",
                config.index
            );
            Backend::Synthetic(SyntheticSource::new(config.width, config.height))
        };
        Self { backend, rotation }
    }

    /// A source that replays the given frames in order; `None` entries
    /// simulate transient capture gaps. Used by tests.
    pub fn scripted(frames: Vec<Option<Frame>>, rotation: Rotation) -> Self {
        Self {
            backend: Backend::Scripted(frames.into()),
            rotation,
        }
    }

    /// Acquire the capture device. Synthetic and scripted sources are
    /// always "open".
    pub fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            Backend::Synthetic(source) => {
                log::info!(
                    "synthetic camera open ({}x{})",
                    source.width,
                    source.height
                );
                Ok(())
            }
            Backend::Scripted(_) => Ok(()),
            #[cfg(feature = "capture-v4l2")]
            Backend::Device(source) => source.open(),
        }
    }

    /// Read one frame, rotated per configuration. `None` means no frame is
    /// available right now; the caller should back off briefly and retry.
    pub fn read(&mut self) -> Option<Frame> {
        let frame = match &mut self.backend {
            Backend::Synthetic(source) => Some(source.next_frame()),
            Backend::Scripted(frames) => frames.pop_front().flatten(),
            #[cfg(feature = "capture-v4l2")]
            Backend::Device(source) => source.read(),
        }?;
        Some(frame.rotated(self.rotation))
    }

    /// Release the capture device. Safe to call when never opened or
    /// already closed.
    pub fn close(&mut self) {
        #[cfg(feature = "capture-v4l2")]
        if let Backend::Device(source) = &mut self.backend {
            source.close();
        }
    }
}

/// In-memory frame generator: a flat background with a bright block that
/// drifts across the view, enough texture to exercise the pipeline.
struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticSource {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Frame {
        self.frame_count += 1;
        let w = self.width as usize;
        let h = self.height as usize;
        let mut data = vec![64u8; w * h * 3];

        let block = (w / 8).max(1);
        let bx = (self.frame_count as usize * 2) % w.saturating_sub(block).max(1);
        let by = h / 3;
        for y in by..(by + block).min(h) {
            for x in bx..(bx + block).min(w) {
                let i = (y * w + x) * 3;
                data[i..i + 3].copy_from_slice(&[230, 230, 230]);
            }
        }

        // Length is exact by construction.
        Frame::from_bgr(data, self.width, self.height).expect("synthetic frame dimensions")
    }
}
