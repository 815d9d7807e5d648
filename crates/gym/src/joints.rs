//! Joint limits and the affine map between native joint angles (degrees)
//! and the normalized `[-1, 1]` space the agent sees.

use serde::{Deserialize, Serialize};

/// Motors per arm.
pub const JOINTS: usize = 6;

/// One angle per joint. Whether it is native or normalized is up to the holder.
pub type Pose = [f32; JOINTS];

/// Per-joint `(min, max)` angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointLimits(pub [(f32, f32); JOINTS]);

impl JointLimits {
    /// Poppy Ergo Jr motor ranges.
    pub const ERGO_JR: JointLimits = JointLimits([
        (-150.0, 150.0),
        (-90.0, 125.0),
        (-90.0, 90.0),
        (-90.0, 90.0),
        (-90.0, 90.0),
        (-90.0, 90.0),
    ]);

    #[must_use]
    pub fn range(&self, joint: usize) -> (f32, f32) {
        self.0[joint]
    }

    /// Index of the first joint whose range is empty, inverted or not finite.
    #[must_use]
    pub fn first_invalid(&self) -> Option<usize> {
        self.0
            .iter()
            .position(|&(min, max)| !(min.is_finite() && max.is_finite() && min < max))
    }

    #[must_use]
    pub fn contains(&self, pose: &Pose) -> bool {
        pose.iter().zip(&self.0).all(|(&a, &(min, max))| a >= min && a <= max)
    }
}

impl Default for JointLimits {
    fn default() -> Self {
        Self::ERGO_JR
    }
}

/// Normalization derived once from a [`JointLimits`] table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSpace {
    min: Pose,
    width: Pose,
}

impl JointSpace {
    #[must_use]
    pub fn new(limits: &JointLimits) -> Self {
        let mut min = [0.0; JOINTS];
        let mut width = [0.0; JOINTS];
        for (i, &(lo, hi)) in limits.0.iter().enumerate() {
            min[i] = lo;
            width[i] = hi - lo;
        }
        Self { min, width }
    }

    #[must_use]
    pub fn widths(&self) -> &Pose {
        &self.width
    }

    /// Native degrees to `[-1, 1]`. Angles outside the limits map outside
    /// the unit range; nothing is clamped here.
    #[must_use]
    pub fn normalize(&self, native: &Pose) -> Pose {
        let mut out = [0.0; JOINTS];
        for i in 0..JOINTS {
            let shifted = (native[i] - self.min[i]) / self.width[i];
            out[i] = shifted * 2.0 - 1.0;
        }
        out
    }

    /// `[-1, 1]` to native degrees.
    #[must_use]
    pub fn denormalize(&self, normalized: &Pose) -> Pose {
        let mut out = [0.0; JOINTS];
        for i in 0..JOINTS {
            let shifted = (normalized[i] + 1.0) / 2.0;
            out[i] = shifted * self.width[i] + self.min[i];
        }
        out
    }
}

/// Clamps an action into `[-1, 1]`. NaN components become `0.0`.
///
/// # Panics
///
/// Panics if `action` has fewer than [`JOINTS`] elements; callers check the
/// length first.
#[must_use]
pub fn clamp_action(action: &[f32]) -> Pose {
    let mut out = [0.0; JOINTS];
    for (o, &a) in out.iter_mut().zip(&action[..JOINTS]) {
        *o = if a.is_nan() { 0.0 } else { a.clamp(-1.0, 1.0) };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn round_trip_inside_limits() {
        let limits = JointLimits::ERGO_JR;
        let space = JointSpace::new(&limits);
        for step in 0..=20 {
            let t = step as f32 / 20.0;
            let mut native = [0.0; JOINTS];
            for (i, n) in native.iter_mut().enumerate() {
                let (lo, hi) = limits.range(i);
                *n = lo + t * (hi - lo);
            }
            let norm = space.normalize(&native);
            assert!(norm.iter().all(|v| (-1.0 - EPS..=1.0 + EPS).contains(v)), "{norm:?}");
            let back = space.denormalize(&norm);
            for i in 0..JOINTS {
                assert!((back[i] - native[i]).abs() < EPS, "joint {i}: {} vs {}", back[i], native[i]);
            }
        }
    }

    #[test]
    fn extremes_map_to_unit_bounds() {
        let space = JointSpace::new(&JointLimits::ERGO_JR);
        let lows = space.normalize(&[-150.0, -90.0, -90.0, -90.0, -90.0, -90.0]);
        let highs = space.normalize(&[150.0, 125.0, 90.0, 90.0, 90.0, 90.0]);
        assert!(lows.iter().all(|v| (v + 1.0).abs() < EPS));
        assert!(highs.iter().all(|v| (v - 1.0).abs() < EPS));
        // Asymmetric range: zero degrees is not the midpoint of joint 2.
        let mid = space.normalize(&[0.0; JOINTS]);
        assert!((mid[1] - (90.0 / 215.0 * 2.0 - 1.0)).abs() < EPS);
    }

    #[test]
    fn angles_past_the_limits_are_not_clamped() {
        let space = JointSpace::new(&JointLimits::ERGO_JR);
        let norm = space.normalize(&[180.0, -120.0, 0.0, 0.0, 0.0, 0.0]);
        assert!((norm[0] - 1.2).abs() < EPS, "{}", norm[0]);
        assert!(norm[1] < -1.0, "{}", norm[1]);
    }

    #[test]
    fn widths_are_derived_from_limits() {
        let space = JointSpace::new(&JointLimits::ERGO_JR);
        assert_eq!(space.widths(), &[300.0, 215.0, 180.0, 180.0, 180.0, 180.0]);
    }

    #[test]
    fn clamped_actions_stay_within_limits() {
        let limits = JointLimits::ERGO_JR;
        let space = JointSpace::new(&limits);
        let wild = [5.0, -7.5, f32::INFINITY, f32::NEG_INFINITY, f32::NAN, 0.3];
        let clamped = clamp_action(&wild);
        assert_eq!(clamped, [1.0, -1.0, 1.0, -1.0, 0.0, 0.3]);
        let native = space.denormalize(&clamped);
        assert!(limits.contains(&native), "{native:?}");
    }

    #[test]
    fn invalid_ranges_are_reported() {
        let mut limits = JointLimits::ERGO_JR;
        assert_eq!(limits.first_invalid(), None);
        limits.0[3] = (10.0, 10.0);
        assert_eq!(limits.first_invalid(), Some(3));
        limits.0[1] = (f32::NAN, 1.0);
        assert_eq!(limits.first_invalid(), Some(1));
    }
}
