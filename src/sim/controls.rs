pub const SPEED_MIN: f64 = 0.1;
pub const SPEED_MAX: f64 = 5.0;
pub const SPEED_DEFAULT: f64 = 1.0;

/// Pause flag and global speed multiplier set from the view.
#[derive(Clone, Debug, PartialEq)]
pub struct Controls {
    paused: bool,
    speed: f64,
}

impl Default for Controls {
    fn default() -> Self {
        Controls { paused: false, speed: SPEED_DEFAULT }
    }
}

impl Controls {
    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_paused(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Clamps into [SPEED_MIN, SPEED_MAX]. Non-finite input is ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            log::warn!("Ignoring non-finite speed {speed}");
            return;
        }
        let clamped = speed.clamp(SPEED_MIN, SPEED_MAX);
        if clamped != speed {
            log::warn!("Speed {speed} out of range, clamped to {clamped}");
        }
        self.speed = clamped;
    }

    pub fn reset(&mut self) {
        *self = Controls::default();
    }

    pub fn label(&self) -> String {
        format!("Orbit Speed: {}x", self.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let controls = Controls::default();
        assert!(!controls.paused());
        assert_eq!(controls.speed(), 1.0);
        assert_eq!(controls.label(), "Orbit Speed: 1x");
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut controls = Controls::default();
        controls.set_speed(3.5);
        assert_eq!(controls.speed(), 3.5);
        controls.set_speed(12.0);
        assert_eq!(controls.speed(), SPEED_MAX);
        controls.set_speed(0.0);
        assert_eq!(controls.speed(), SPEED_MIN);
        controls.set_speed(f64::NAN);
        assert_eq!(controls.speed(), SPEED_MIN);
    }

    #[test]
    fn test_toggle_and_reset() {
        let mut controls = Controls::default();
        assert!(controls.toggle_paused());
        assert!(!controls.toggle_paused());
        controls.set_paused(true);
        controls.set_speed(2.5);
        controls.reset();
        assert_eq!(controls, Controls::default());
    }
}
