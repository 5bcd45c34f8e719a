use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3, Vector4};

use solar_explorer::config::CameraConfig;
use solar_explorer::engine::camera::Camera;
use solar_explorer::sim::catalog::{BodyDescriptor, BodyKind, Catalog, CatalogError};
use solar_explorer::sim::controls::SPEED_DEFAULT;
use solar_explorer::sim::picking::{pointer_to_ndc, ray_sphere_intersect};
use solar_explorer::sim::selection::Selection;
use solar_explorer::sim::{phase_rng, FrameRenderer, Simulation, SimulationContext, StepPolicy, BASE_STEP};

const WIDTH: f32 = 1280.0;
const HEIGHT: f32 = 720.0;

/// Records every body position it is asked to draw.
#[derive(Default)]
struct RecordingRenderer {
    frames: Vec<Vec<(usize, Point3<f32>)>>,
}

impl FrameRenderer for RecordingRenderer {
    fn resize(&mut self, _width: u32, _height: u32) {}

    fn draw(&mut self, scene: &SimulationContext) {
        self.frames.push(scene.poses().map(|pose| (pose.index, pose.position)).collect());
    }
}

/// A small system whose planets all sit well inside the default view.
fn compact_catalog() -> Catalog {
    Catalog::new(vec![
        BodyDescriptor::star("sun", "Sun", 1.0, 0xFDB813, "star"),
        BodyDescriptor::planet("earth", "Earth", 0.5, 0x4A90E2, "home", 6.0, 1.0),
        BodyDescriptor::planet("mars", "Mars", 0.8, 0xE27B58, "red", 10.0, 2.0),
    ])
    .unwrap()
}

/// The built-in Sun and Saturn, pulled in close enough to click its ring.
fn ringed_catalog() -> Catalog {
    let solar = Catalog::solar_system().unwrap();
    let mut saturn = solar.get("saturn").unwrap().clone();
    saturn.orbital_distance = 14.0;
    Catalog::new(vec![solar.star().clone(), saturn]).unwrap()
}

fn simulation_with(catalog: Catalog, seed: u64) -> Simulation<RecordingRenderer> {
    let mut camera = Camera::new(&CameraConfig::default());
    camera.set_viewport(WIDTH as u32, HEIGHT as u32);
    let context = SimulationContext::new(catalog, camera, &mut phase_rng(Some(seed)));
    Simulation::new(context, RecordingRenderer::default(), StepPolicy::PerFrame)
}

fn solar_system(seed: u64) -> Simulation<RecordingRenderer> {
    simulation_with(Catalog::solar_system().unwrap(), seed)
}

fn angles<R: FrameRenderer>(sim: &Simulation<R>) -> Vec<f64> {
    sim.context().orbits().iter().map(|s| s.current_angle).collect()
}

/// Pixel coordinates of a world point on the current viewport.
fn project(camera: &Camera, point: Point3<f32>) -> (f32, f32) {
    let clip = camera.view_projection() * Vector4::new(point.x, point.y, point.z, 1.0);
    let (ndc_x, ndc_y) = (clip.x / clip.w, clip.y / clip.w);
    ((ndc_x + 1.0) * 0.5 * WIDTH, (1.0 - ndc_y) * 0.5 * HEIGHT)
}

fn click_body<R: FrameRenderer>(sim: &mut Simulation<R>, id: &str) -> Option<usize> {
    let index = sim.context().catalog().index_of(id)?;
    let position = sim.context().pose(index)?.position;
    let (x, y) = project(sim.context().camera(), position);
    sim.pointer_click(x, y, WIDTH, HEIGHT).map(|hit| hit.body)
}

#[test]
fn test_unpaused_frames_strictly_advance_every_planet() {
    let mut sim = solar_system(7);
    let mut previous = angles(&sim);
    for frame in 0..120 {
        sim.frame(frame as f64 * 16.7);
        let current = angles(&sim);
        for (before, after) in previous.iter().zip(&current) {
            assert!(after > before);
        }
        previous = current;
    }
}

#[test]
fn test_paused_frames_leave_state_identical() {
    let mut sim = solar_system(7);
    for frame in 0..10 {
        sim.frame(frame as f64);
    }
    sim.set_paused(true);
    let frozen = sim.context().orbits().to_vec();
    let star = sim.context().star_state().clone();

    for frame in 10..200 {
        sim.frame(frame as f64);
    }
    assert_eq!(sim.context().orbits(), &frozen[..]);
    assert_eq!(sim.context().star_state(), &star);
    assert_eq!(sim.renderer().frames.len(), 200);

    sim.set_paused(false);
    sim.frame(200.0);
    assert_ne!(sim.context().orbits(), &frozen[..]);
}

#[test]
fn test_doubling_speed_doubles_angular_displacement() {
    let mut slow = solar_system(11);
    let mut fast = solar_system(11);
    fast.set_speed(2.0);
    let start = angles(&slow);
    assert_eq!(start, angles(&fast));

    for frame in 0..50 {
        slow.frame(frame as f64);
        fast.frame(frame as f64);
    }

    let catalog = slow.context().catalog();
    for (i, state) in slow.context().orbits().iter().enumerate() {
        let rate = catalog.body(state.body).unwrap().angular_rate as f64;
        let slow_delta = state.current_angle - start[i];
        let fast_delta = fast.context().orbits()[i].current_angle - start[i];
        assert_relative_eq!(slow_delta, 50.0 * BASE_STEP / rate, max_relative = 1e-9);
        assert_relative_eq!(fast_delta / slow_delta, 2.0, max_relative = 1e-9);
    }
}

#[test]
fn test_planets_stay_on_their_orbits() {
    let mut sim = solar_system(3);
    sim.set_speed(5.0);
    for frame in 0..500 {
        sim.frame(frame as f64);
    }
    let catalog = sim.context().catalog().clone();
    for frame in &sim.renderer().frames {
        for &(index, position) in frame {
            let body = catalog.body(index).unwrap();
            assert_eq!(position.y, 0.0);
            let radius = (position.x * position.x + position.z * position.z).sqrt();
            assert_relative_eq!(radius, body.orbital_distance, max_relative = 1e-5);
        }
    }
}

#[test]
fn test_picking_is_deterministic() {
    let first = solar_system(42);
    let second = solar_system(42);
    let mut hits = 0;
    for row in 0..12 {
        for col in 0..20 {
            let (x, y) = (col as f32 * WIDTH / 20.0, row as f32 * HEIGHT / 12.0);
            let a = solar_explorer::sim::picking::pick(first.context(), x, y, WIDTH, HEIGHT);
            let b = solar_explorer::sim::picking::pick(second.context(), x, y, WIDTH, HEIGHT);
            let again = solar_explorer::sim::picking::pick(first.context(), x, y, WIDTH, HEIGHT);
            assert_eq!(a, b);
            assert_eq!(a, again);
            hits += a.is_some() as usize;
        }
    }
    assert!(hits > 0);
}

#[test]
fn test_clicking_a_planet_selects_it() {
    let mut sim = simulation_with(compact_catalog(), 5);
    sim.frame(0.0);
    let mars = sim.context().catalog().index_of("mars").unwrap();
    assert_eq!(click_body(&mut sim, "mars"), Some(mars));
    assert_eq!(sim.selection(), Selection::Selected(mars));

    let earth = sim.context().catalog().index_of("earth").unwrap();
    assert_eq!(click_body(&mut sim, "earth"), Some(earth));
    assert_eq!(sim.selection(), Selection::Selected(earth));
}

#[test]
fn test_empty_click_changes_nothing() {
    let mut sim = simulation_with(compact_catalog(), 5);
    let seen = Rc::new(RefCell::new(0));
    let sink = seen.clone();
    sim.on_body_selected(Box::new(move |_, _| *sink.borrow_mut() += 1));

    click_body(&mut sim, "mars").unwrap();
    assert_eq!(*seen.borrow(), 1);

    // Top-left corner looks out past the system.
    assert!(sim.pointer_click(1.0, 1.0, WIDTH, HEIGHT).is_none());
    assert_eq!(sim.selection(), Selection::Selected(sim.context().catalog().index_of("mars").unwrap()));
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn test_reset_restores_defaults_and_deselects() {
    let mut sim = simulation_with(compact_catalog(), 9);
    let seen: Rc<RefCell<Vec<Option<(String, BodyKind)>>>> = Rc::default();
    let sink = seen.clone();
    sim.on_body_selected(Box::new(move |body, kind| {
        sink.borrow_mut().push(body.map(|b| b.id.clone()).zip(kind));
    }));

    sim.set_paused(true);
    sim.set_speed(3.5);
    click_body(&mut sim, "mars").unwrap();
    assert!(sim.controls().paused());
    assert_eq!(sim.controls().speed(), 3.5);

    sim.reset();
    assert!(!sim.controls().paused());
    assert_eq!(sim.controls().speed(), SPEED_DEFAULT);
    assert_eq!(sim.selection(), Selection::Idle);
    assert_eq!(*seen.borrow(), vec![Some(("mars".to_string(), BodyKind::Planet)), None]);

    // Reset while idle has nothing to announce.
    sim.reset();
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn test_zero_angular_rate_is_rejected() {
    let result = Catalog::new(vec![
        BodyDescriptor::star("sun", "Sun", 3.0, 0xFDB813, "star"),
        BodyDescriptor::planet("stuck", "Stuck", 1.0, 0xFFFFFF, "never moves", 5.0, 0.0),
    ]);
    assert_eq!(
        result.unwrap_err(),
        CatalogError::NonPositiveAngularRate { id: "stuck".to_string() }
    );
}

#[test]
fn test_clicking_a_ring_selects_its_planet() {
    let mut sim = simulation_with(ringed_catalog(), 13);
    sim.frame(0.0);
    let saturn = sim.context().catalog().index_of("saturn").unwrap();
    let pose = sim.context().pose(saturn).unwrap();
    let (center, radius) = (pose.position, pose.descriptor.radius);
    let camera = sim.context().camera().clone();

    // Halfway across the ring band, beside the planet as seen from the eye.
    let eye = camera.position();
    let toward = Vector3::new(center.x - eye.x, 0.0, center.z - eye.z).normalize();
    let side = Vector3::new(-toward.z, 0.0, toward.x);
    let (x, y) = project(&camera, center + side * (2.0 * radius));

    let ray = camera.ray_through(pointer_to_ndc(x, y, WIDTH, HEIGHT).unwrap()).unwrap();
    assert_eq!(ray_sphere_intersect(&ray, center, radius), None);

    let hit = sim.pointer_click(x, y, WIDTH, HEIGHT).unwrap();
    assert_eq!(hit.body, saturn);
    assert_eq!(hit.kind, BodyKind::Planet);
    assert_eq!(sim.selection(), Selection::Selected(saturn));
}
