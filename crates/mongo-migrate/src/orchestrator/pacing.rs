//! Pause policy between applied migrations.

use std::time::Duration;

/// How long to wait after the `applied`-th migration of a run.
pub trait Pacing: Send + Sync {
    fn delay(&self, applied: usize) -> Duration;
}

/// Same pause after every migration.
#[derive(Debug, Clone, Copy)]
pub struct FixedPacing(pub Duration);

impl Default for FixedPacing {
    fn default() -> Self {
        Self(Duration::from_secs(2))
    }
}

impl Pacing for FixedPacing {
    fn delay(&self, _applied: usize) -> Duration {
        self.0
    }
}

/// No pause.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacing for NoPacing {
    fn delay(&self, _applied: usize) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_default_is_two_seconds() {
        let pacing = FixedPacing::default();
        assert_eq!(pacing.delay(1), Duration::from_secs(2));
        assert_eq!(pacing.delay(50), Duration::from_secs(2));
    }

    #[test]
    fn test_no_pacing() {
        assert_eq!(NoPacing.delay(3), Duration::ZERO);
    }
}
