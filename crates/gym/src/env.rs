use std::collections::HashMap;

/// Auxiliary per-step information.
pub type Info = HashMap<String, String>;

/// `(observation, reward, done, info)`.
pub type StepResult<O> = (O, f32, bool, Info);

/// Display modes an environment advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Human,
    RgbArray,
}

impl RenderMode {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RenderMode::Human => "human",
            RenderMode::RgbArray => "rgb_array",
        }
    }
}

/// Reinforcement learning environment trait.
///
/// Inspired by classic frameworks like OpenAI Gym: [`reset`] starts an
/// episode, each call to [`step`] applies one action and returns the new
/// observation, a reward signal, and whether the episode has terminated.
///
/// [`reset`]: Env::reset
/// [`step`]: Env::step
pub trait Env {
    type Obs;
    type Error;

    /// Reset the environment to its starting state and return the initial
    /// observation.
    fn reset(&mut self) -> Result<Self::Obs, Self::Error>;

    /// Advance the environment by one action.
    fn step(&mut self, action: &[f32]) -> Result<StepResult<Self::Obs>, Self::Error>;

    /// Release whatever the environment holds. Safe to call more than once.
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Draw the current state. Environments that already ship images in
    /// their observations leave this empty.
    fn render(&mut self, _mode: RenderMode) {}

    /// Number of scalar observation values (images excluded).
    fn obs_size(&self) -> usize;

    /// Size of the action vector.
    fn action_size(&self) -> usize;
}
