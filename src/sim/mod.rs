//! The orbital simulation: per-frame state update, pause/speed controls,
//! selection and the hand-off to whatever draws the scene.

pub mod catalog;
pub mod controls;
pub mod orbit;
pub mod picking;
pub mod selection;

use nalgebra::Point3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::camera::Camera;
use catalog::{BodyDescriptor, BodyKind, Catalog};
use controls::Controls;
use orbit::{OrbitalState, StarState};
use picking::PickHit;
use selection::{Selection, SelectionChange};

/// Orbital step per tick before the speed multiplier and angular rate apply.
pub const BASE_STEP: f64 = 0.001;
/// Planet self-rotation per tick. Not affected by the speed multiplier.
pub const PLANET_SPIN_STEP: f64 = 0.01;
pub const STAR_SPIN_STEP: f64 = 0.001;
/// Floor for elapsed-time scales. An unpaused frame always advances, even on
/// a repeated or out-of-order timestamp.
pub const MIN_STEP_SCALE: f64 = 1e-3;

/// How a rendered frame maps onto simulation ticks.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// One tick per frame; motion speed follows the display refresh rate.
    PerFrame,
    /// Ticks proportional to wall-clock time, `reference_fps` ticks per second.
    /// Gaps longer than `max_frame_seconds` (hidden tabs) are truncated.
    ElapsedTime { reference_fps: f64, max_frame_seconds: f64 },
}

/// Turns frame timestamps into tick scales according to a [`StepPolicy`].
#[derive(Clone, Debug)]
pub struct FrameClock {
    policy: StepPolicy,
    last_timestamp: Option<f64>,
}

impl FrameClock {
    pub fn new(policy: StepPolicy) -> Self {
        FrameClock { policy, last_timestamp: None }
    }

    /// Forget the previous timestamp; the next frame counts as a single tick.
    pub fn restart(&mut self) {
        self.last_timestamp = None;
    }

    /// `timestamp_ms` is the frame time in milliseconds.
    pub fn step_scale(&mut self, timestamp_ms: f64) -> f64 {
        match self.policy {
            StepPolicy::PerFrame => 1.0,
            StepPolicy::ElapsedTime { reference_fps, max_frame_seconds } => {
                let scale = match self.last_timestamp {
                    Some(previous) => {
                        let dt = ((timestamp_ms - previous) / 1000.0).clamp(0.0, max_frame_seconds);
                        (dt * reference_fps).max(MIN_STEP_SCALE)
                    }
                    None => 1.0,
                };
                self.last_timestamp = Some(timestamp_ms);
                scale
            }
        }
    }
}

/// Read-only view of one body for the current frame.
#[derive(Clone, Copy, Debug)]
pub struct BodyPose<'a> {
    pub index: usize,
    pub descriptor: &'a BodyDescriptor,
    pub position: Point3<f32>,
    pub spin: f64,
}

/// Everything a frame needs: the catalog, the orbital state derived from it,
/// and the camera. Owned by [`Simulation`]; renderers and the picker only
/// borrow it.
#[derive(Clone, Debug)]
pub struct SimulationContext {
    catalog: Catalog,
    orbits: Vec<OrbitalState>,
    star: StarState,
    camera: Camera,
}

impl SimulationContext {
    pub fn new<R: Rng + ?Sized>(catalog: Catalog, camera: Camera, rng: &mut R) -> Self {
        let orbits = catalog
            .planets()
            .map(|(index, _)| OrbitalState::with_random_phase(index, rng))
            .collect();
        SimulationContext { catalog, orbits, star: StarState::default(), camera }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn orbits(&self) -> &[OrbitalState] {
        &self.orbits
    }

    pub fn star_state(&self) -> &StarState {
        &self.star
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The star first, then the planets in catalog order.
    pub fn poses(&self) -> impl Iterator<Item = BodyPose<'_>> {
        let star_index = self.catalog.star_index();
        let star = BodyPose {
            index: star_index,
            descriptor: self.catalog.star(),
            position: Point3::origin(),
            spin: self.star.spin_angle,
        };
        let planets = self.orbits.iter().filter_map(move |state| {
            let descriptor = self.catalog.body(state.body)?;
            Some(BodyPose {
                index: state.body,
                descriptor,
                position: state.position(descriptor),
                spin: state.spin_angle,
            })
        });
        std::iter::once(star).chain(planets)
    }

    pub fn pose(&self, index: usize) -> Option<BodyPose<'_>> {
        self.poses().find(|pose| pose.index == index)
    }

    fn advance(&mut self, speed: f64, scale: f64) {
        let orbit_step = BASE_STEP * speed * scale;
        let spin_step = PLANET_SPIN_STEP * scale;
        for state in &mut self.orbits {
            if let Some(descriptor) = self.catalog.body(state.body) {
                state.advance(descriptor, orbit_step, spin_step);
            }
        }
        self.star.spin_angle += STAR_SPIN_STEP * scale;
    }
}

/// Draws a [`SimulationContext`]. Implemented by the WebGL backend; the
/// simulation only ever hands it read-only state.
pub trait FrameRenderer {
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, scene: &SimulationContext);
}

pub type SelectionListener = Box<dyn FnMut(Option<&BodyDescriptor>, Option<BodyKind>)>;

/// Seeded when a seed is given, otherwise from OS entropy.
pub fn phase_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// The simulation loop: one call to [`Simulation::frame`] per presented frame.
pub struct Simulation<R: FrameRenderer> {
    context: SimulationContext,
    controls: Controls,
    selection: Selection,
    clock: FrameClock,
    renderer: R,
    listeners: Vec<SelectionListener>,
}

impl<R: FrameRenderer> Simulation<R> {
    pub fn new(context: SimulationContext, renderer: R, policy: StepPolicy) -> Self {
        Simulation {
            context,
            controls: Controls::default(),
            selection: Selection::default(),
            clock: FrameClock::new(policy),
            renderer,
            listeners: Vec::new(),
        }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Advance unless paused, then draw. The draw happens even while paused.
    pub fn frame(&mut self, timestamp_ms: f64) {
        let scale = self.clock.step_scale(timestamp_ms);
        if !self.controls.paused() {
            self.context.advance(self.controls.speed(), scale);
        }
        self.renderer.draw(&self.context);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.controls.set_paused(paused);
    }

    pub fn toggle_paused(&mut self) -> bool {
        self.controls.toggle_paused()
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.controls.set_speed(speed);
    }

    /// Unpause, restore the default speed and drop the selection.
    pub fn reset(&mut self) {
        self.controls.reset();
        self.clock.restart();
        let change = self.selection.clear();
        self.notify(change);
    }

    pub fn close_selection(&mut self) {
        let change = self.selection.clear();
        self.notify(change);
    }

    /// Pick at the pointer and update the selection. A miss changes nothing.
    pub fn pointer_click(&mut self, x: f32, y: f32, width: f32, height: f32) -> Option<PickHit> {
        let hit = picking::pick(&self.context, x, y, width, height);
        let change = self.selection.pick(hit.map(|h| h.body));
        self.notify(change);
        hit
    }

    pub fn viewport_resize(&mut self, width: u32, height: u32) {
        log::debug!("Viewport resized to {width}x{height}");
        self.context.camera.set_viewport(width, height);
        self.renderer.resize(width, height);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.context.camera.zoom(delta);
    }

    pub fn on_body_selected(&mut self, listener: SelectionListener) {
        self.listeners.push(listener);
    }

    fn notify(&mut self, change: Option<SelectionChange>) {
        let Some(change) = change else {
            return;
        };
        let body = change.current.and_then(|index| self.context.catalog.body(index));
        log::debug!(
            "Selection changed: {:?} -> {:?}",
            change.previous,
            body.map(|b| b.id.as_str())
        );
        for listener in &mut self.listeners {
            listener(body, body.map(BodyDescriptor::kind));
        }
    }
}
