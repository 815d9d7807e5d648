//! Hit reward with an invulnerability window.
//!
//! A hit only scores when the opponent is not invulnerable. After a scoring
//! hit the opponent stays invulnerable until the sword has been clear of it
//! for `window` steps. Steps spent in contact do not count towards the
//! window, so holding the sword against the opponent never scores twice:
//! the agent has to hit, release, and hit again.

/// Cooldown state between hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitState {
    /// The next contact scores.
    #[default]
    Eligible,
    /// Clear steps counted since the last scoring hit.
    Cooling(u32),
}

impl HitState {
    /// Pure transition: `(reward, next state)` for one step.
    #[must_use]
    pub fn advance(self, colliding: bool, window: u32) -> (f32, HitState) {
        match (self, colliding) {
            (HitState::Eligible, true) => (1.0, HitState::Cooling(0)),
            (HitState::Eligible, false) => (0.0, HitState::Eligible),
            (HitState::Cooling(n), true) => (0.0, HitState::Cooling(n)),
            (HitState::Cooling(n), false) => {
                let n = n + 1;
                if n >= window {
                    (0.0, HitState::Eligible)
                } else {
                    (0.0, HitState::Cooling(n))
                }
            }
        }
    }

    /// Counter form: `-1` when eligible, the number of clear steps otherwise.
    #[must_use]
    pub fn counter(self) -> i64 {
        match self {
            HitState::Eligible => -1,
            HitState::Cooling(n) => i64::from(n),
        }
    }
}

/// [`HitState`] bound to a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitCooldown {
    state: HitState,
    window: u32,
}

impl HitCooldown {
    pub const DEFAULT_WINDOW: u32 = 3;

    /// # Panics
    ///
    /// Panics if `window` is zero.
    #[must_use]
    pub fn new(window: u32) -> Self {
        assert!(window > 0, "invulnerability window must be at least one step");
        Self { state: HitState::Eligible, window }
    }

    /// Feeds one step's collision reading and returns its reward.
    pub fn observe(&mut self, colliding: bool) -> f32 {
        let (reward, next) = self.state.advance(colliding, self.window);
        self.state = next;
        reward
    }

    pub fn reset(&mut self) {
        self.state = HitState::Eligible;
    }

    #[must_use]
    pub fn state(&self) -> HitState {
        self.state
    }

    #[must_use]
    pub fn window(&self) -> u32 {
        self.window
    }
}

impl Default for HitCooldown {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
