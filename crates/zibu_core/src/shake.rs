//! Shake detection: a rate-limited edge trigger over accelerometer samples

use serde::{Deserialize, Serialize};

/// One 3-axis acceleration reading (in g).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Pull-style sensor. `read` returns the latest sample, or `None` if the
/// device has nothing (or no sensor exists, which is not an error).
pub trait Accelerometer: Send {
    fn read(&mut self) -> Option<AccelSample>;
}

#[derive(Debug, Clone)]
pub struct ShakeDetector {
    threshold: f32,
    refractory_ms: i64,
    last_accepted_ms: Option<i64>,
}

impl Default for ShakeDetector {
    fn default() -> Self {
        Self::new(2.0, 500)
    }
}

impl ShakeDetector {
    pub fn new(threshold: f32, refractory_ms: i64) -> Self {
        Self {
            threshold,
            refractory_ms,
            last_accepted_ms: None,
        }
    }

    /// Accept the sample as a shake if it is strong enough and the refractory
    /// window since the last accepted shake has passed.
    pub fn accept(&mut self, sample: AccelSample, now_ms: i64) -> bool {
        if sample.magnitude() <= self.threshold {
            return false;
        }
        if let Some(last) = self.last_accepted_ms {
            if now_ms.saturating_sub(last) < self.refractory_ms {
                tracing::trace!("Shake ignored inside refractory window");
                return false;
            }
        }
        self.last_accepted_ms = Some(now_ms);
        true
    }

    /// Forget the last accepted shake (e.g. when play is disarmed).
    pub fn reset(&mut self) {
        self.last_accepted_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        assert!((AccelSample::new(3.0, 4.0, 0.0).magnitude() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_below_threshold_ignored() {
        let mut d = ShakeDetector::default();
        // Resting phone reads ~1g
        assert!(!d.accept(AccelSample::new(0.0, 0.0, 1.0), 0));
        assert!(!d.accept(AccelSample::new(0.0, 0.0, 2.0), 0));
    }

    #[test]
    fn test_refractory_window() {
        let mut d = ShakeDetector::default();
        let hard = AccelSample::new(2.0, 2.0, 1.0);
        assert!(d.accept(hard, 1_000));
        assert!(!d.accept(hard, 1_200));
        assert!(!d.accept(hard, 1_499));
        assert!(d.accept(hard, 1_500));
    }

    #[test]
    fn test_rejected_sample_does_not_reset_window() {
        let mut d = ShakeDetector::default();
        let hard = AccelSample::new(0.0, 3.0, 0.0);
        assert!(d.accept(hard, 0));
        assert!(!d.accept(hard, 400));
        // Window is measured from the last *accepted* shake.
        assert!(d.accept(hard, 500));
    }

    #[test]
    fn test_reset() {
        let mut d = ShakeDetector::default();
        let hard = AccelSample::new(0.0, 3.0, 0.0);
        assert!(d.accept(hard, 0));
        d.reset();
        assert!(d.accept(hard, 10));
    }
}
