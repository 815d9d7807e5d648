#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! # Sword-fight Gym
//!
//! Reinforcement learning environments on top of the [`sim`] binding.
//!
//! -   [`Env`]: the reset/step/close interface training loops consume.
//! -   [`FightEnv`]: two robot arms with swords; the agent drives one arm and
//!     is rewarded for fresh hits on the other.
//! -   [`joints`] and [`reward`]: the pure pieces of the environment (joint
//!     normalization and the hit cooldown), usable without a simulator.

use thiserror::Error;

pub mod config;
pub mod env;
pub mod fight;
pub mod joints;
pub mod reward;
pub mod spaces;

pub use config::FightConfig;
pub use env::{Env, Info, RenderMode, StepResult};
pub use fight::{FightEnv, Observation};
pub use joints::{JointLimits, JointSpace, Pose, JOINTS};
pub use reward::{HitCooldown, HitState};
pub use spaces::BoxSpace;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error(transparent)]
    Sim(#[from] sim::SimError),
    #[error("expected {expected} action values, got {got}")]
    ActionSize { expected: usize, got: usize },
    #[error("camera returned a {got_width}x{got_height} frame, expected {width}x{height}")]
    FrameSize { width: u32, height: u32, got_width: u32, got_height: u32 },
    #[error("invalid environment config: {0}")]
    InvalidConfig(String),
}
