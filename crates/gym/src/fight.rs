//! # Sword-fight Environment
//!
//! Two 6-joint arms face each other in the simulator. Arm A (`r1m*`) holds
//! the sword and is driven by the agent; arm B (`r2m*`) takes a random stance
//! at every reset and then stays put as the target. The agent is rewarded
//! for each fresh sword contact, see [`crate::reward`].
//!
//! Actions are six normalized joint targets in `[-1, 1]`. Observations pair
//! the camera image with arm A's six normalized joint positions followed by
//! its six raw joint velocities.

use crate::config::FightConfig;
use crate::env::{Env, Info, RenderMode, StepResult};
use crate::joints::{clamp_action, JointSpace, Pose, JOINTS};
use crate::reward::{HitCooldown, HitState};
use crate::spaces::BoxSpace;
use crate::EnvError;
use sim::{
    CollisionHandle, Frame, JointHandle, ObjectHandle, RemoteSim, Simulator, SimulatorConfig,
    StepMode,
};
use tracing::{debug, info};

/// Arms in the scene.
pub const ARMS: usize = 2;
/// Index of the agent-controlled arm.
pub const AGENT: usize = 0;
/// Index of the static opponent.
pub const OPPONENT: usize = 1;
/// Positions then velocities.
pub const JOINT_OBS_SIZE: usize = 2 * JOINTS;

/// Scene name of a motor: arms and motors are numbered from one.
#[must_use]
pub fn motor_name(arm: usize, motor: usize) -> String {
    format!("r{}m{}", arm + 1, motor + 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub image: Frame,
    pub joints: [f32; JOINT_OBS_SIZE],
}

impl Observation {
    /// Normalized joint positions.
    #[must_use]
    pub fn positions(&self) -> &[f32] {
        &self.joints[..JOINTS]
    }

    /// Joint velocities as the simulator reports them.
    #[must_use]
    pub fn velocities(&self) -> &[f32] {
        &self.joints[JOINTS..]
    }
}

pub struct FightEnv<S: Simulator> {
    sim: S,
    config: FightConfig,
    space: JointSpace,
    motors: [[JointHandle; JOINTS]; ARMS],
    sword: CollisionHandle,
    camera: ObjectHandle,
    cooldown: HitCooldown,
    rng: fastrand::Rng,
    opponent_pose: Pose,
    closed: bool,
}

impl FightEnv<RemoteSim> {
    /// Connects to a simulator on the default address with the stock scene.
    ///
    /// # Errors
    ///
    /// Propagates connection, scene loading and handle resolution failures.
    pub fn launch(headless: bool) -> Result<Self, EnvError> {
        Self::connect(&SimulatorConfig::headless(headless), FightConfig::default())
    }

    /// # Errors
    ///
    /// Propagates connection, scene loading and handle resolution failures.
    pub fn connect(sim_config: &SimulatorConfig, config: FightConfig) -> Result<Self, EnvError> {
        let sim = RemoteSim::connect(sim_config)?;
        Self::new(sim, config)
    }
}

impl<S: Simulator> FightEnv<S> {
    /// Loads the scene and resolves every named object the environment uses.
    ///
    /// # Errors
    ///
    /// Fails on an invalid config or when the simulator cannot load the scene
    /// or does not know one of the names.
    pub fn new(mut sim: S, config: FightConfig) -> Result<Self, EnvError> {
        config.validate()?;
        sim.load_scene(&config.scene)?;

        let mut motors = [[JointHandle(0); JOINTS]; ARMS];
        for (arm, handles) in motors.iter_mut().enumerate() {
            for (motor, handle) in handles.iter_mut().enumerate() {
                *handle = sim.joint(&motor_name(arm, motor))?;
            }
        }
        let sword = sim.collision(&config.sword_collision)?;
        let camera = sim.object(&config.camera)?;
        info!(
            scene = %config.scene.display(),
            sword = %config.sword_collision,
            camera = %config.camera,
            "fight scene ready"
        );

        let rng = config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Ok(Self {
            space: JointSpace::new(&config.joint_limits),
            cooldown: HitCooldown::new(config.invulnerability_window),
            opponent_pose: config.rest_pose,
            sim,
            config,
            motors,
            sword,
            camera,
            rng,
            closed: false,
        })
    }

    /// Reseeds the generator behind the opponent's random stance.
    pub fn seed(&mut self, seed: u64) {
        self.rng.seed(seed);
    }

    #[must_use]
    pub fn action_space(&self) -> BoxSpace {
        BoxSpace::new(-1.0, 1.0, vec![self.action_size()])
    }

    /// `(camera image, joint state)`.
    #[must_use]
    pub fn observation_space(&self) -> (BoxSpace, BoxSpace) {
        let image = BoxSpace::new(
            0.0,
            255.0,
            vec![self.config.image_height as usize, self.config.image_width as usize, 3],
        );
        (image, BoxSpace::new(-1.0, 1.0, vec![JOINT_OBS_SIZE]))
    }

    #[must_use]
    pub fn render_modes() -> &'static [RenderMode] {
        &[RenderMode::Human, RenderMode::RgbArray]
    }

    #[must_use]
    pub fn config(&self) -> &FightConfig {
        &self.config
    }

    #[must_use]
    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    #[must_use]
    pub fn motors(&self, arm: usize) -> &[JointHandle; JOINTS] {
        &self.motors[arm]
    }

    #[must_use]
    pub fn hit_state(&self) -> HitState {
        self.cooldown.state()
    }

    /// Native stance the opponent was sent to at the last reset.
    #[must_use]
    pub fn opponent_pose(&self) -> &Pose {
        &self.opponent_pose
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn command_arm(&mut self, arm: usize, pose: &Pose) -> Result<(), EnvError> {
        for (&motor, &degrees) in self.motors[arm].iter().zip(pose) {
            self.sim.set_position_target(motor, degrees)?;
        }
        Ok(())
    }

    fn random_stance(&mut self) -> Pose {
        let mut pose = self.config.rest_pose;
        for (angle, &(low, high)) in pose.iter_mut().zip(&self.config.opponent_noise) {
            #[allow(clippy::cast_precision_loss)]
            let noise = self.rng.i32(low..high) as f32;
            *angle += noise;
        }
        pose
    }

    fn observe(&mut self) -> Result<Observation, EnvError> {
        let mut native = [0.0; JOINTS];
        let mut joints = [0.0; JOINT_OBS_SIZE];
        for (i, &motor) in self.motors[AGENT].iter().enumerate() {
            native[i] = self.sim.joint_angle(motor)?;
            joints[JOINTS + i] = self.sim.joint_velocity(motor)?;
        }
        joints[..JOINTS].copy_from_slice(&self.space.normalize(&native));

        let image = self.sim.image(self.camera)?;
        if image.width != self.config.image_width || image.height != self.config.image_height {
            return Err(EnvError::FrameSize {
                width: self.config.image_width,
                height: self.config.image_height,
                got_width: image.width,
                got_height: image.height,
            });
        }
        Ok(Observation { image, joints })
    }
}

impl<S: Simulator> Env for FightEnv<S> {
    type Obs = Observation;
    type Error = EnvError;

    /// Restarts the simulation, puts arm A at rest and arm B in a random
    /// stance, and lets both settle for a fixed number of frames. The settle
    /// count is not a convergence check: slow motors may still be moving
    /// when the first observation is taken.
    fn reset(&mut self) -> Result<Observation, EnvError> {
        self.sim.stop_simulation()?;
        self.sim.start_simulation(StepMode::Synchronous)?;

        let rest = self.config.rest_pose;
        self.command_arm(AGENT, &rest)?;
        self.opponent_pose = self.random_stance();
        let stance = self.opponent_pose;
        self.command_arm(OPPONENT, &stance)?;

        for _ in 0..self.config.settle_steps {
            self.sim.step_blocking()?;
        }

        self.cooldown.reset();
        let obs = self.observe()?;
        debug!(opponent = ?self.opponent_pose, "episode reset");
        Ok(obs)
    }

    fn step(&mut self, action: &[f32]) -> Result<StepResult<Observation>, EnvError> {
        if action.len() != JOINTS {
            return Err(EnvError::ActionSize { expected: JOINTS, got: action.len() });
        }
        let targets = self.space.denormalize(&clamp_action(action));
        self.command_arm(AGENT, &targets)?;
        self.sim.step_blocking()?;

        let obs = self.observe()?;
        let colliding = self.sim.is_colliding(self.sword)?;
        let reward = self.cooldown.observe(colliding);
        if reward > 0.0 {
            debug!("sword hit scored");
        }
        Ok((obs, reward, false, Info::new()))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let stopped = self.sim.stop_simulation();
        self.sim.end()?;
        stopped?;
        info!("fight environment closed");
        Ok(())
    }

    fn obs_size(&self) -> usize {
        JOINT_OBS_SIZE
    }

    fn action_size(&self) -> usize {
        JOINTS
    }
}
