//! In-process simulator for tests and dry runs.
//!
//! Joints reach their position target in a single step. Collisions come from
//! a script consumed one entry per step; once the script runs out the sword
//! is considered clear.

use crate::{CollisionHandle, Frame, JointHandle, ObjectHandle, SimError, Simulator, StepMode};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
struct MockJoint {
    target: f32,
    angle: f32,
    velocity: f32,
}

/// One recorded position command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionCommand {
    pub joint: JointHandle,
    pub degrees: f32,
    /// Number of steps taken before the command was issued.
    pub at_step: u64,
}

#[derive(Debug, Clone)]
pub struct MockSim {
    handles: HashMap<String, i32>,
    missing: HashSet<String>,
    joints: HashMap<JointHandle, MockJoint>,
    collisions: VecDeque<bool>,
    colliding: bool,
    frame: Frame,
    pub scene: Option<PathBuf>,
    pub commands: Vec<PositionCommand>,
    pub steps: u64,
    pub running: Option<StepMode>,
    pub starts: u32,
    pub stops: u32,
    pub ended: bool,
}

impl Default for MockSim {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSim {
    /// A simulator that knows the two-arm fight scene: motors `r1m1..r2m6`,
    /// the `sword_hit` collision object and the `cam` vision sensor, with a
    /// 256x256 camera.
    #[must_use]
    pub fn new() -> Self {
        let mut handles = HashMap::new();
        let mut next = 1;
        for robot in 1..=2 {
            for motor in 1..=6 {
                handles.insert(format!("r{robot}m{motor}"), next);
                next += 1;
            }
        }
        handles.insert("sword_hit".to_string(), next);
        handles.insert("cam".to_string(), next + 1);

        Self {
            handles,
            missing: HashSet::new(),
            joints: HashMap::new(),
            collisions: VecDeque::new(),
            colliding: false,
            frame: Frame::blank(256, 256),
            scene: None,
            commands: Vec::new(),
            steps: 0,
            running: None,
            starts: 0,
            stops: 0,
            ended: false,
        }
    }

    /// Makes handle resolution fail for `name`.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.missing.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    /// Queues collision states, one per upcoming step.
    pub fn script_collisions(&mut self, states: impl IntoIterator<Item = bool>) {
        self.collisions.extend(states);
    }

    /// Handle the mock hands out for `name`, if it knows it.
    #[must_use]
    pub fn handle_of(&self, name: &str) -> Option<i32> {
        self.handles.get(name).copied()
    }

    /// Latest commanded target for a joint.
    #[must_use]
    pub fn target(&self, joint: JointHandle) -> Option<f32> {
        self.joints.get(&joint).map(|j| j.target)
    }

    /// Commands issued to `joint`, oldest first.
    pub fn commands_for(&self, joint: JointHandle) -> impl Iterator<Item = &PositionCommand> {
        self.commands.iter().filter(move |c| c.joint == joint)
    }

    fn resolve(&self, name: &str) -> Result<i32, SimError> {
        self.check_open()?;
        if self.missing.contains(name) {
            return Err(SimError::UnknownObject(name.to_string()));
        }
        self.handles
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownObject(name.to_string()))
    }

    fn check_open(&self) -> Result<(), SimError> {
        if self.ended {
            Err(SimError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Simulator for MockSim {
    fn load_scene(&mut self, path: &Path) -> Result<(), SimError> {
        self.check_open()?;
        self.scene = Some(path.to_path_buf());
        Ok(())
    }

    fn joint(&mut self, name: &str) -> Result<JointHandle, SimError> {
        self.resolve(name).map(JointHandle)
    }

    fn collision(&mut self, name: &str) -> Result<CollisionHandle, SimError> {
        self.resolve(name).map(CollisionHandle)
    }

    fn object(&mut self, name: &str) -> Result<ObjectHandle, SimError> {
        self.resolve(name).map(ObjectHandle)
    }

    fn set_position_target(&mut self, joint: JointHandle, degrees: f32) -> Result<(), SimError> {
        self.check_open()?;
        self.joints.entry(joint).or_default().target = degrees;
        self.commands.push(PositionCommand { joint, degrees, at_step: self.steps });
        Ok(())
    }

    fn joint_angle(&mut self, joint: JointHandle) -> Result<f32, SimError> {
        self.check_open()?;
        Ok(self.joints.get(&joint).map_or(0.0, |j| j.angle))
    }

    fn joint_velocity(&mut self, joint: JointHandle) -> Result<f32, SimError> {
        self.check_open()?;
        Ok(self.joints.get(&joint).map_or(0.0, |j| j.velocity))
    }

    fn image(&mut self, _camera: ObjectHandle) -> Result<Frame, SimError> {
        self.check_open()?;
        Ok(self.frame.clone())
    }

    fn is_colliding(&mut self, _collision: CollisionHandle) -> Result<bool, SimError> {
        self.check_open()?;
        Ok(self.colliding)
    }

    fn start_simulation(&mut self, mode: StepMode) -> Result<(), SimError> {
        self.check_open()?;
        self.running = Some(mode);
        self.starts += 1;
        Ok(())
    }

    fn stop_simulation(&mut self) -> Result<(), SimError> {
        self.check_open()?;
        self.running = None;
        self.stops += 1;
        Ok(())
    }

    fn step_blocking(&mut self) -> Result<(), SimError> {
        self.check_open()?;
        for joint in self.joints.values_mut() {
            joint.velocity = joint.target - joint.angle;
            joint.angle = joint.target;
        }
        self.colliding = self.collisions.pop_front().unwrap_or(false);
        self.steps += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<(), SimError> {
        self.running = None;
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joints_reach_target_after_one_step() {
        let mut sim = MockSim::new();
        let j = sim.joint("r1m3").unwrap();
        sim.set_position_target(j, 30.0).unwrap();
        assert_eq!(sim.joint_angle(j).unwrap(), 0.0);
        sim.step_blocking().unwrap();
        assert_eq!(sim.joint_angle(j).unwrap(), 30.0);
        assert_eq!(sim.joint_velocity(j).unwrap(), 30.0);
        sim.step_blocking().unwrap();
        assert_eq!(sim.joint_velocity(j).unwrap(), 0.0);
    }

    #[test]
    fn collision_script_is_consumed_per_step() {
        let mut sim = MockSim::new();
        let c = sim.collision("sword_hit").unwrap();
        sim.script_collisions([true, false]);
        assert!(!sim.is_colliding(c).unwrap());
        sim.step_blocking().unwrap();
        assert!(sim.is_colliding(c).unwrap());
        assert!(sim.is_colliding(c).unwrap());
        sim.step_blocking().unwrap();
        assert!(!sim.is_colliding(c).unwrap());
        sim.step_blocking().unwrap();
        assert!(!sim.is_colliding(c).unwrap());
    }

    #[test]
    fn missing_names_fail_to_resolve() {
        let mut sim = MockSim::new().without("cam");
        assert!(matches!(sim.object("cam"), Err(SimError::UnknownObject(n)) if n == "cam"));
        assert!(matches!(sim.joint("r9m9"), Err(SimError::UnknownObject(_))));
    }

    #[test]
    fn calls_after_end_are_rejected() {
        let mut sim = MockSim::new();
        sim.end().unwrap();
        sim.end().unwrap();
        assert!(matches!(sim.step_blocking(), Err(SimError::Closed)));
    }
}
