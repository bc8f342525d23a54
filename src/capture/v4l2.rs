#![cfg(feature = "capture-v4l2")]

//! V4L2 device backend.
//!
//! Opens `/dev/video<index>`, requests a BGR24 format at the configured
//! resolution (best-effort; the delivered format wins), and memory-maps a
//! small buffer stream. Capture errors surface as `None` from `read()` so
//! the main loop treats them as transient.

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use super::CameraConfig;
use crate::frame::Frame;

pub(super) struct DeviceSource {
    config: CameraConfig,
    state: Option<DeviceState>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceSource {
    pub(super) fn new(config: CameraConfig) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
        }
    }

    fn device_path(&self) -> String {
        format!("/dev/video{}", self.config.index)
    }

    pub(super) fn open(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let path = self.device_path();
        let mut device =
            v4l::Device::with_path(&path).with_context(|| format!("open v4l2 device {}", path))?;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"BGR3");

        // Best-effort: keep whatever the device actually delivers.
        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("failed to set format on {}: {}", path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        self.active_width = format.width;
        self.active_height = format.height;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "camera open: {} ({}x{})",
            path,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    pub(super) fn read(&mut self) -> Option<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut()?;
        let bytes = match state.with_mut(|fields| fields.stream.next().map(|(buf, _)| buf.to_vec()))
        {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("v4l2 capture failed: {}", err);
                return None;
            }
        };

        match Frame::from_bgr(bytes, self.active_width, self.active_height) {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!("discarding malformed v4l2 buffer: {}", err);
                None
            }
        }
    }

    pub(super) fn close(&mut self) {
        if self.state.take().is_some() {
            log::info!("camera closed: {}", self.device_path());
        }
    }
}
