#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! # Simulator Binding
//!
//! A narrow capability layer over an external physics simulator. The
//! simulator owns everything physical (stepping, collision detection, scene
//! assets, motors, cameras); this crate only describes the calls the fight
//! environment needs and ships two implementations of them:
//!
//! -   [`RemoteSim`]: talks to a simulator process over TCP, one JSON object
//!     per line, strictly request then reply. See [`protocol`].
//! -   `MockSim` (feature `mock`): an in-process stand-in that tracks joint
//!     targets and replays scripted collisions, used by tests and dry runs.
//!
//! All angles crossing this boundary are in degrees.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod protocol;
pub mod remote;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockSim, PositionCommand};
pub use remote::{
    LaunchConfig, RemoteSim, SimulatorConfig, DEFAULT_ADDR, DEFAULT_CONNECT_TIMEOUT_MS,
};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("simulator i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed simulator message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("simulator has no object named `{0}`")]
    UnknownObject(String),
    #[error("simulator rejected `{command}`: {message}")]
    Remote { command: &'static str, message: String },
    #[error("simulator closed the connection")]
    Disconnected,
    #[error("simulator session already ended")]
    Closed,
    #[error("failed to launch simulator `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("simulator at {addr} did not accept a connection within {waited_ms} ms")]
    ConnectTimeout { addr: String, waited_ms: u64 },
}

/// Handle of a joint motor inside the loaded scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointHandle(pub i32);

/// Handle of a collision object (a named pair of geometries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollisionHandle(pub i32);

/// Handle of any other scene object, e.g. a vision sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(pub i32);

/// How the simulator advances once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// The simulator waits for an explicit [`Simulator::step_blocking`] per frame.
    Synchronous,
    /// The simulator free-runs.
    Realtime,
}

/// An RGB camera image, row-major, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Black frame of the given size.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; width as usize * height as usize * 3] }
    }

    /// `true` when the pixel buffer matches the declared dimensions.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * 3
    }

    /// `[height, width, 3]`, the layout training code expects.
    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        [self.height as usize, self.width as usize, 3]
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.pixels.get(i..i + 3).map(|p| [p[0], p[1], p[2]])
    }
}

/// Capabilities the environment needs from a physics simulator.
///
/// Every call blocks until the simulator answers. Implementations are owned
/// by exactly one environment and are never shared between threads.
pub trait Simulator {
    /// Loads a scene file known to the simulator.
    fn load_scene(&mut self, path: &Path) -> Result<(), SimError>;

    /// Resolves a joint motor by name.
    fn joint(&mut self, name: &str) -> Result<JointHandle, SimError>;

    /// Resolves a collision object by name.
    fn collision(&mut self, name: &str) -> Result<CollisionHandle, SimError>;

    /// Resolves a generic scene object (camera, dummy, ...) by name.
    fn object(&mut self, name: &str) -> Result<ObjectHandle, SimError>;

    /// Sets the position target of a joint motor, in degrees.
    fn set_position_target(&mut self, joint: JointHandle, degrees: f32) -> Result<(), SimError>;

    /// Current joint angle in degrees.
    fn joint_angle(&mut self, joint: JointHandle) -> Result<f32, SimError>;

    /// Current joint velocity as reported by the simulator.
    fn joint_velocity(&mut self, joint: JointHandle) -> Result<f32, SimError>;

    /// Captures an image from a vision sensor.
    fn image(&mut self, camera: ObjectHandle) -> Result<Frame, SimError>;

    /// Whether the collision object currently registers contact.
    fn is_colliding(&mut self, collision: CollisionHandle) -> Result<bool, SimError>;

    fn start_simulation(&mut self, mode: StepMode) -> Result<(), SimError>;

    fn stop_simulation(&mut self) -> Result<(), SimError>;

    /// Advances exactly one frame; only meaningful in [`StepMode::Synchronous`].
    fn step_blocking(&mut self) -> Result<(), SimError>;

    /// Ends the session and releases the simulator. Calling it twice is a no-op.
    fn end(&mut self) -> Result<(), SimError>;
}
