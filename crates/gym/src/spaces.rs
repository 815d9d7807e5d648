/// A bounded box of real values with a fixed shape, the same bound on every
/// element.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    pub low: f32,
    pub high: f32,
    pub shape: Vec<usize>,
}

impl BoxSpace {
    #[must_use]
    pub fn new(low: f32, high: f32, shape: Vec<usize>) -> Self {
        Self { low, high, shape }
    }

    /// Number of scalar elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    #[must_use]
    pub fn contains(&self, values: &[f32]) -> bool {
        values.len() == self.size() && values.iter().all(|v| (self.low..=self.high).contains(v))
    }

    /// Uniform sample over the box.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Vec<f32> {
        (0..self.size())
            .map(|_| self.low + rng.f32() * (self.high - self.low))
            .collect()
    }
}
