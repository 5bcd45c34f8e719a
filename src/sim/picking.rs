use nalgebra::{Point3, Vector2};

use crate::engine::camera::Ray;
use crate::sim::catalog::{BodyKind, RING_INNER_RADIUS, RING_OUTER_RADIUS};
use crate::sim::SimulationContext;

/// The nearest body under the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    pub body: usize,
    pub kind: BodyKind,
    /// Ray parameter of the sphere entry or ring crossing, i.e. the distance from the eye.
    pub distance: f32,
}

/// Pixel coordinates (origin top-left) to normalized device coordinates
/// in [-1, 1]² with Y pointing up.
pub fn pointer_to_ndc(x: f32, y: f32, width: f32, height: f32) -> Option<Vector2<f32>> {
    if !(width > 0.0 && height > 0.0) || !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some(Vector2::new((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0))
}

/// Smallest non-negative ray parameter at which `ray` meets the sphere, if any.
/// A ray starting inside the sphere reports its exit point.
pub fn ray_sphere_intersect(ray: &Ray, center: Point3<f32>, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(&ray.direction);
    let c = oc.dot(&oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let (t_near, t_far) = (-b - sqrt_disc, -b + sqrt_disc);
    if t_near >= 0.0 {
        Some(t_near)
    } else if t_far >= 0.0 {
        Some(t_far)
    } else {
        None
    }
}

/// Ray parameter at which `ray` crosses the horizontal annulus around `center`
/// with the given radii, if it does.
pub fn ray_ring_intersect(ray: &Ray, center: Point3<f32>, inner_radius: f32, outer_radius: f32) -> Option<f32> {
    if ray.direction.y.abs() < f32::EPSILON {
        return None;
    }
    let t = (center.y - ray.origin.y) / ray.direction.y;
    if t < 0.0 {
        return None;
    }
    let distance = (ray.at(t) - center).norm();
    (inner_radius..=outer_radius).contains(&distance).then_some(t)
}

/// Test the ray against every body's bounding sphere, and the ring plane of
/// ringed bodies, and keep the closest hit. A ring hit selects its planet.
pub fn pick_ray(context: &SimulationContext, ray: &Ray) -> Option<PickHit> {
    context
        .poses()
        .filter_map(|pose| {
            let radius = pose.descriptor.radius;
            let sphere = ray_sphere_intersect(ray, pose.position, radius);
            let ring = pose
                .descriptor
                .has_ring_system
                .then(|| {
                    ray_ring_intersect(ray, pose.position, RING_INNER_RADIUS * radius, RING_OUTER_RADIUS * radius)
                })
                .flatten();
            let distance = match (sphere, ring) {
                (Some(a), Some(b)) => a.min(b),
                (hit, None) | (None, hit) => hit?,
            };
            Some(PickHit { body: pose.index, kind: pose.descriptor.kind(), distance })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Resolve a click at pixel (x, y) in a `width` × `height` viewport.
pub fn pick(context: &SimulationContext, x: f32, y: f32, width: f32, height: f32) -> Option<PickHit> {
    let ndc = pointer_to_ndc(x, y, width, height)?;
    let ray = context.camera().ray_through(ndc)?;
    pick_ray(context, &ray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use crate::config::CameraConfig;
    use crate::engine::camera::Camera;
    use crate::sim::catalog::Catalog;
    use crate::sim::phase_rng;

    fn ray(origin: [f32; 3], direction: [f32; 3]) -> Ray {
        Ray {
            origin: Point3::from(origin),
            direction: Vector3::from(direction).normalize(),
        }
    }

    #[test]
    fn test_pointer_to_ndc() {
        assert_eq!(pointer_to_ndc(0.0, 0.0, 800.0, 600.0), Some(Vector2::new(-1.0, 1.0)));
        assert_eq!(pointer_to_ndc(400.0, 300.0, 800.0, 600.0), Some(Vector2::new(0.0, 0.0)));
        assert_eq!(pointer_to_ndc(800.0, 600.0, 800.0, 600.0), Some(Vector2::new(1.0, -1.0)));
        assert_eq!(pointer_to_ndc(10.0, 10.0, 0.0, 600.0), None);
    }

    #[test]
    fn test_ray_sphere_hit_and_miss() {
        let r = ray([0.0, 0.0, -10.0], [0.0, 0.0, 1.0]);
        let t = ray_sphere_intersect(&r, Point3::origin(), 2.0).unwrap();
        assert_relative_eq!(t, 8.0);

        let miss = ray([0.0, 5.0, -10.0], [0.0, 0.0, 1.0]);
        assert_eq!(ray_sphere_intersect(&miss, Point3::origin(), 2.0), None);

        let behind = ray([0.0, 0.0, 10.0], [0.0, 0.0, 1.0]);
        assert_eq!(ray_sphere_intersect(&behind, Point3::origin(), 2.0), None);

        let inside = ray([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        assert_relative_eq!(ray_sphere_intersect(&inside, Point3::origin(), 2.0).unwrap(), 2.0);
    }

    #[test]
    fn test_ray_ring_hits_only_the_band() {
        let center = Point3::new(10.0, 0.0, 0.0);
        let down = |x: f32| ray([x, 5.0, 0.0], [0.0, -1.0, 0.0]);

        assert_relative_eq!(ray_ring_intersect(&down(12.0), center, 1.5, 2.5).unwrap(), 5.0);
        assert_eq!(ray_ring_intersect(&down(11.0), center, 1.5, 2.5), None);
        assert_eq!(ray_ring_intersect(&down(13.0), center, 1.5, 2.5), None);

        let flat = ray([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(ray_ring_intersect(&flat, center, 1.5, 2.5), None);
        let away = ray([12.0, 5.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(ray_ring_intersect(&away, center, 1.5, 2.5), None);
    }

    #[test]
    fn test_ring_click_beside_saturn_selects_saturn() {
        let solar = Catalog::solar_system().unwrap();
        let catalog = Catalog::new(vec![solar.star().clone(), solar.get("saturn").unwrap().clone()]).unwrap();
        let saturn = catalog.index_of("saturn").unwrap();
        let context = SimulationContext::new(
            catalog,
            Camera::new(&CameraConfig::default()),
            &mut phase_rng(Some(4)),
        );
        let pose = context.pose(saturn).unwrap();
        let eye = context.camera().position();

        // A point on the ring, off to the side as seen from the eye.
        let toward = Vector3::new(pose.position.x - eye.x, 0.0, pose.position.z - eye.z).normalize();
        let side = Vector3::new(-toward.z, 0.0, toward.x);
        let on_ring = pose.position + side * (2.0 * pose.descriptor.radius);
        let aimed = Ray { origin: eye, direction: (on_ring - eye).normalize() };

        assert_eq!(ray_sphere_intersect(&aimed, pose.position, pose.descriptor.radius), None);
        let hit = pick_ray(&context, &aimed).unwrap();
        assert_eq!(hit.body, saturn);
        assert_eq!(hit.kind, BodyKind::Planet);
    }
}
