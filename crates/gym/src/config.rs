//! Environment configuration, loadable from JSON.
//!
//! Every field has a default matching the stock sword-fight scene, so an
//! empty object `{}` is a valid config.

use crate::joints::{JointLimits, Pose, JOINTS};
use crate::reward::HitCooldown;
use crate::EnvError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SCENE: &str = "scenes/poppy_ergo_jr_fight_sword1.ttt";

/// Integer degrees added to the opponent's rest pose at reset, `low..high`.
pub const DEFAULT_OPPONENT_NOISE: [(i32, i32); JOINTS] =
    [(-90, 90), (-30, 30), (-30, 30), (-45, 45), (-30, 30), (-30, 30)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FightConfig {
    /// Scene file, as the simulator resolves it.
    pub scene: PathBuf,
    pub joint_limits: JointLimits,
    /// Native pose both arms start from.
    pub rest_pose: Pose,
    pub opponent_noise: [(i32, i32); JOINTS],
    /// Frames stepped after a reset before the first observation.
    pub settle_steps: u32,
    pub invulnerability_window: u32,
    pub sword_collision: String,
    pub camera: String,
    pub image_width: u32,
    pub image_height: u32,
    pub seed: Option<u64>,
}

impl Default for FightConfig {
    fn default() -> Self {
        Self {
            scene: PathBuf::from(DEFAULT_SCENE),
            joint_limits: JointLimits::ERGO_JR,
            rest_pose: [0.0; JOINTS],
            opponent_noise: DEFAULT_OPPONENT_NOISE,
            settle_steps: 15,
            invulnerability_window: HitCooldown::DEFAULT_WINDOW,
            sword_collision: "sword_hit".to_string(),
            camera: "cam".to_string(),
            image_width: 256,
            image_height: 256,
            seed: None,
        }
    }
}

impl FightConfig {
    /// Parses a JSON config and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Rejects configurations the environment cannot run with.
    pub fn validate(&self) -> Result<(), EnvError> {
        if let Some(i) = self.joint_limits.first_invalid() {
            return Err(EnvError::InvalidConfig(format!(
                "joint {i} has an empty or non-finite range {:?}",
                self.joint_limits.range(i)
            )));
        }
        if !self.joint_limits.contains(&self.rest_pose) {
            return Err(EnvError::InvalidConfig(format!(
                "rest pose {:?} lies outside the joint limits",
                self.rest_pose
            )));
        }
        if let Some(i) = self.opponent_noise.iter().position(|&(lo, hi)| lo >= hi) {
            return Err(EnvError::InvalidConfig(format!(
                "opponent noise range for joint {i} is empty: {:?}",
                self.opponent_noise[i]
            )));
        }
        if self.invulnerability_window == 0 {
            return Err(EnvError::InvalidConfig(
                "invulnerability window must be at least one step".into(),
            ));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(EnvError::InvalidConfig("image size must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = FightConfig::from_json("{}").unwrap();
        assert_eq!(config, FightConfig::default());
        assert_eq!(config.settle_steps, 15);
        assert_eq!(config.invulnerability_window, 3);
    }

    #[test]
    fn partial_override() {
        let json = r#"{
            "settle_steps": 30,
            "seed": 11,
            "joint_limits": [[-10, 10], [-20, 20], [-30, 30], [-40, 40], [-50, 50], [-60, 60]]
        }"#;
        let config = FightConfig::from_json(json).unwrap();
        assert_eq!(config.settle_steps, 30);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.joint_limits.range(5), (-60.0, 60.0));
        assert_eq!(config.camera, "cam");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(FightConfig::from_json(r#"{"setle_steps": 3}"#).is_err());
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = FightConfig::from_json(r#"{"invulnerability_window": 0}"#).unwrap_err();
        assert!(err.to_string().contains("invulnerability window"), "{err}");
    }

    #[test]
    fn empty_noise_range_is_rejected() {
        let mut config = FightConfig::default();
        config.opponent_noise[2] = (5, 5);
        assert!(matches!(config.validate(), Err(EnvError::InvalidConfig(_))));
    }

    #[test]
    fn rest_pose_outside_limits_is_rejected() {
        let mut config = FightConfig::default();
        config.rest_pose[0] = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_mentions_path() {
        let err = FightConfig::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
