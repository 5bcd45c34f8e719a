use nalgebra::Point3;
use rand::Rng;

use crate::sim::catalog::BodyDescriptor;

/// Mutable per-planet simulation state. Angles are unbounded radians; the
/// projection to a position handles periodicity.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitalState {
    /// Catalog index of the body this state belongs to.
    pub body: usize,
    pub current_angle: f64,
    pub spin_angle: f64,
}

impl OrbitalState {
    pub fn new(body: usize, initial_angle: f64) -> Self {
        OrbitalState { body, current_angle: initial_angle, spin_angle: 0.0 }
    }

    /// Starts at a random phase in [0, 2π) so the planets don't line up.
    pub fn with_random_phase<R: Rng + ?Sized>(body: usize, rng: &mut R) -> Self {
        OrbitalState::new(body, rng.gen_range(0.0..std::f64::consts::TAU))
    }

    /// Advance by one (possibly scaled) tick.
    pub fn advance(&mut self, descriptor: &BodyDescriptor, orbit_step: f64, spin_step: f64) {
        self.current_angle += orbit_step / descriptor.angular_rate as f64;
        self.spin_angle += spin_step;
    }

    /// World position on the ecliptic (y = 0).
    pub fn position(&self, descriptor: &BodyDescriptor) -> Point3<f32> {
        let distance = descriptor.orbital_distance as f64;
        Point3::new(
            (self.current_angle.cos() * distance) as f32,
            0.0,
            (self.current_angle.sin() * distance) as f32,
        )
    }
}

/// The star does not orbit; it only spins in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StarState {
    pub spin_angle: f64,
}
