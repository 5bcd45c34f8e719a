use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::StepPolicy;

pub const CONFIG_URL: &str = "/assets/config.json";
/// Upper bound on starfield points.
pub const MAX_STAR_COUNT: usize = 200_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            position: [0.0, 40.0, 50.0],
            target: [0.0, 0.0, 0.0],
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            min_distance: 5.0,
            max_distance: 200.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Fixes the initial planet phases and the starfield. `None` draws from entropy.
    pub seed: Option<u64>,
    pub step_policy: StepPolicy,
    pub camera: CameraConfig,
    pub star_count: usize,
    pub starfield_extent: f32,
    pub clear_color: [f32; 3],
    pub canvas_id: String,
    pub log_level: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            seed: None,
            step_policy: StepPolicy::PerFrame,
            camera: CameraConfig::default(),
            star_count: 3000,
            starfield_extent: 1000.0,
            clear_color: [0.0, 0.0, 17.0 / 255.0],
            canvas_id: "canvas".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ExplorerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ExplorerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        let camera = &self.camera;

        if !(camera.fov_y_degrees > 0.0 && camera.fov_y_degrees < 180.0) {
            return invalid("camera.fov_y_degrees must be in (0, 180)");
        }
        if !(camera.near > 0.0) || !(camera.far > camera.near) {
            return invalid("camera clip planes must satisfy 0 < near < far");
        }
        if !(camera.min_distance > 0.0) || camera.min_distance > camera.max_distance {
            return invalid("camera distance limits must satisfy 0 < min <= max");
        }
        if camera.position == camera.target {
            return invalid("camera.position must differ from camera.target");
        }
        if let StepPolicy::ElapsedTime { reference_fps, max_frame_seconds } = self.step_policy {
            if !(reference_fps > 0.0) || !(max_frame_seconds > 0.0) {
                return invalid("elapsed_time policy needs positive reference_fps and max_frame_seconds");
            }
        }
        if self.star_count > MAX_STAR_COUNT {
            return Err(ConfigError::Invalid(format!(
                "star_count {} exceeds the maximum of {MAX_STAR_COUNT}",
                self.star_count
            )));
        }
        if !(self.starfield_extent > 0.0) {
            return invalid("starfield_extent must be positive");
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = ExplorerConfig::from_json("{}").unwrap();
        assert_eq!(config, ExplorerConfig::default());
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_partial_override() {
        let config = ExplorerConfig::from_json(
            r#"{
                "seed": 42,
                "camera": { "fov_y_degrees": 60.0 },
                "step_policy": { "elapsed_time": { "reference_fps": 60.0, "max_frame_seconds": 0.1 } },
                "log_level": "debug"
            }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.camera.fov_y_degrees, 60.0);
        assert_eq!(config.camera.position, [0.0, 40.0, 50.0]);
        assert_eq!(
            config.step_policy,
            StepPolicy::ElapsedTime { reference_fps: 60.0, max_frame_seconds: 0.1 }
        );
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_per_frame_policy_as_string() {
        let config = ExplorerConfig::from_json(r#"{ "step_policy": "per_frame" }"#).unwrap();
        assert_eq!(config.step_policy, StepPolicy::PerFrame);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ExplorerConfig::from_json(r#"{ "camera": { "near": 10.0, "far": 1.0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ExplorerConfig::from_json(r#"{ "log_level": "loud" }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ExplorerConfig::from_json(r#"{ "camera": { "position": [0.0, 0.0, 0.0] } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(ExplorerConfig::from_json("not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_star_count_is_bounded() {
        assert!(matches!(
            ExplorerConfig::from_json(r#"{ "star_count": 18446744073709551615 }"#),
            Err(ConfigError::Invalid(_))
        ));
        let at_limit = format!(r#"{{ "star_count": {MAX_STAR_COUNT} }}"#);
        assert_eq!(ExplorerConfig::from_json(&at_limit).unwrap().star_count, MAX_STAR_COUNT);
        assert_eq!(ExplorerConfig::from_json(r#"{ "star_count": 0 }"#).unwrap().star_count, 0);
    }
}
