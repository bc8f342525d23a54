//! Configuration loading.
//!
//! One YAML document read once at startup; every key is optional and has a
//! fixed default, so an absent file yields a fully usable configuration.
//! The resolved [`AppConfig`] is immutable for the process lifetime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::capture::CameraConfig;
use crate::frame::Rotation;

const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_CONF_THRESHOLD: f32 = 0.35;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_CENTER_REGION_RATIO: f64 = 0.35;
const DEFAULT_EDGE_DENSITY_THRESHOLD: f64 = 0.08;
const DEFAULT_FOCAL_LENGTH: f64 = 700.0;
const DEFAULT_KNOWN_OBJECT_WIDTH: f64 = 0.5;
const DEFAULT_TTS_RATE: u32 = 150;
const DEFAULT_FPS_TARGET: u32 = 10;
const DEFAULT_MIN_DISTANCE_M: f64 = 2.1;
const DEFAULT_AVOID_REPEAT_SECONDS: f64 = 3.0;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    camera: Option<CameraSection>,
    detector: Option<DetectorSection>,
    edge_fallback: Option<EdgeSection>,
    distance: Option<DistanceSection>,
    general: Option<GeneralSection>,
    announce: Option<AnnounceSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CameraSection {
    index: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    rotate_deg: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectorSection {
    model_path: Option<PathBuf>,
    conf_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    labels_map: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EdgeSection {
    center_region_ratio: Option<f64>,
    edge_density_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DistanceSection {
    focal_length: Option<f64>,
    known_object_width: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneralSection {
    tts_rate: Option<u32>,
    fps_target: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnnounceSection {
    min_distance_m: Option<f64>,
    avoid_repeat_seconds: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub detector: DetectorSettings,
    pub edge: EdgeSettings,
    pub distance: DistanceSettings,
    pub general: GeneralSettings,
    pub announce: AnnounceSettings,
}

#[derive(Clone, Debug)]
pub struct DetectorSettings {
    pub model_path: PathBuf,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub labels_map: HashMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct EdgeSettings {
    pub center_region_ratio: f64,
    pub edge_density_threshold: f64,
}

#[derive(Clone, Debug)]
pub struct DistanceSettings {
    pub focal_length: f64,
    pub known_object_width: f64,
}

#[derive(Clone, Debug)]
pub struct GeneralSettings {
    pub tts_rate: u32,
    pub fps_target: u32,
}

#[derive(Clone, Debug)]
pub struct AnnounceSettings {
    pub min_distance_m: f64,
    pub avoid_repeat_seconds: f64,
}

impl AnnounceSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.avoid_repeat_seconds)
    }
}

impl AppConfig {
    /// Load configuration from `path`. A missing file is not an error:
    /// built-in defaults apply, matching the all-keys-optional contract.
    pub fn load(path: &Path) -> Result<Self> {
        let file_cfg = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            log::info!(
                "config file {} not found; using built-in defaults",
                path.display()
            );
            ConfigFile::default()
        };
        let cfg = Self::from_file(file_cfg)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let camera = file.camera.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let edge = file.edge_fallback.unwrap_or_default();
        let distance = file.distance.unwrap_or_default();
        let general = file.general.unwrap_or_default();
        let announce = file.announce.unwrap_or_default();

        Ok(Self {
            camera: CameraConfig {
                index: camera.index.unwrap_or(0),
                width: camera.width.unwrap_or(416),
                height: camera.height.unwrap_or(312),
                rotation: Rotation::from_degrees(camera.rotate_deg.unwrap_or(0))?,
            },
            detector: DetectorSettings {
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                conf_threshold: detector.conf_threshold.unwrap_or(DEFAULT_CONF_THRESHOLD),
                iou_threshold: detector.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
                labels_map: detector.labels_map.unwrap_or_default(),
            },
            edge: EdgeSettings {
                center_region_ratio: edge
                    .center_region_ratio
                    .unwrap_or(DEFAULT_CENTER_REGION_RATIO),
                edge_density_threshold: edge
                    .edge_density_threshold
                    .unwrap_or(DEFAULT_EDGE_DENSITY_THRESHOLD),
            },
            distance: DistanceSettings {
                focal_length: distance.focal_length.unwrap_or(DEFAULT_FOCAL_LENGTH),
                known_object_width: distance
                    .known_object_width
                    .unwrap_or(DEFAULT_KNOWN_OBJECT_WIDTH),
            },
            general: GeneralSettings {
                tts_rate: general.tts_rate.unwrap_or(DEFAULT_TTS_RATE),
                fps_target: general.fps_target.unwrap_or(DEFAULT_FPS_TARGET),
            },
            announce: AnnounceSettings {
                min_distance_m: announce.min_distance_m.unwrap_or(DEFAULT_MIN_DISTANCE_M),
                avoid_repeat_seconds: announce
                    .avoid_repeat_seconds
                    .unwrap_or(DEFAULT_AVOID_REPEAT_SECONDS),
            },
        })
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detector.conf_threshold) {
            return Err(anyhow!("detector.conf_threshold must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return Err(anyhow!("detector.iou_threshold must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.edge.center_region_ratio)
            || self.edge.center_region_ratio == 0.0
        {
            return Err(anyhow!(
                "edge_fallback.center_region_ratio must be within (0, 1]"
            ));
        }
        if !(0.0..=1.0).contains(&self.edge.edge_density_threshold) {
            return Err(anyhow!(
                "edge_fallback.edge_density_threshold must be within [0, 1]"
            ));
        }
        if self.distance.focal_length <= 0.0 {
            return Err(anyhow!("distance.focal_length must be positive"));
        }
        if self.distance.known_object_width <= 0.0 {
            return Err(anyhow!("distance.known_object_width must be positive"));
        }
        if self.announce.avoid_repeat_seconds < 0.0
            || !self.announce.avoid_repeat_seconds.is_finite()
        {
            return Err(anyhow!(
                "announce.avoid_repeat_seconds must be a non-negative number"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/wayfinder.yaml")).unwrap();
        assert_eq!(cfg.camera.index, 0);
        assert_eq!(cfg.camera.width, 416);
        assert_eq!(cfg.camera.height, 312);
        assert_eq!(cfg.camera.rotation, Rotation::None);
        assert_eq!(cfg.detector.model_path, PathBuf::from("yolov8n.onnx"));
        assert_eq!(cfg.detector.conf_threshold, 0.35);
        assert_eq!(cfg.detector.iou_threshold, 0.45);
        assert!(cfg.detector.labels_map.is_empty());
        assert_eq!(cfg.edge.center_region_ratio, 0.35);
        assert_eq!(cfg.edge.edge_density_threshold, 0.08);
        assert_eq!(cfg.distance.focal_length, 700.0);
        assert_eq!(cfg.distance.known_object_width, 0.5);
        assert_eq!(cfg.general.tts_rate, 150);
        assert_eq!(cfg.general.fps_target, 10);
        assert_eq!(cfg.announce.min_distance_m, 2.1);
        assert_eq!(cfg.announce.avoid_repeat_seconds, 3.0);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = NamedTempFile::new().expect("temp config");
        let yaml = r#"
camera:
  index: 2
  width: 640
  height: 480
  rotate_deg: 90
detector:
  model_path: models/custom.onnx
  conf_threshold: 0.5
  labels_map:
    person: pedestrian
announce:
  min_distance_m: 3.0
  avoid_repeat_seconds: 5
"#;
        file.write_all(yaml.as_bytes()).expect("write config");

        let cfg = AppConfig::load(file.path()).unwrap();
        assert_eq!(cfg.camera.index, 2);
        assert_eq!(cfg.camera.rotation, Rotation::Cw90);
        assert_eq!(cfg.detector.model_path, PathBuf::from("models/custom.onnx"));
        assert_eq!(cfg.detector.conf_threshold, 0.5);
        // untouched keys keep defaults
        assert_eq!(cfg.detector.iou_threshold, 0.45);
        assert_eq!(
            cfg.detector.labels_map.get("person").map(String::as_str),
            Some("pedestrian")
        );
        assert_eq!(cfg.announce.min_distance_m, 3.0);
        assert_eq!(cfg.announce.cooldown(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_rotation_is_rejected() {
        let mut file = NamedTempFile::new().expect("temp config");
        file.write_all(b"camera:\n  rotate_deg: 45\n")
            .expect("write config");
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut file = NamedTempFile::new().expect("temp config");
        file.write_all(b"detector:\n  conf_threshold: 1.5\n")
            .expect("write config");
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().expect("temp config");
        file.write_all(b"camera:\n  indx: 1\n").expect("write config");
        assert!(AppConfig::load(file.path()).is_err());
    }
}
