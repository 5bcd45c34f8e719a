use nalgebra::{Matrix4, Perspective3, Point3, Vector2, Vector3, Vector4};

use crate::config::CameraConfig;

/// Half-line from `origin` along unit `direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}

/// Fixed-target perspective camera. Zooming dollies the eye toward or away
/// from the target along the current view direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    position: Point3<f32>,
    target: Point3<f32>,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    distance_limits: (f32, f32),
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        let [px, py, pz] = config.position;
        let [tx, ty, tz] = config.target;
        Camera {
            position: Point3::new(px, py, pz),
            target: Point3::new(tx, ty, tz),
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: 1.0,
            near: config.near,
            far: config.far,
            distance_limits: (config.min_distance, config.max_distance),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Zero-sized viewports (minimized windows) keep the previous aspect.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn zoom(&mut self, delta: f32) {
        let offset = self.position - self.target;
        let distance = offset.norm();
        if distance == 0.0 || !delta.is_finite() {
            return;
        }
        let wanted = (distance + delta * 0.05).clamp(self.distance_limits.0, self.distance_limits.1);
        self.position = self.target + offset * (wanted / distance);
    }

    pub fn projection(&self) -> Matrix4<f32> {
        Perspective3::new(self.aspect, self.fov_y, self.near, self.far).to_homogeneous()
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &Vector3::y())
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }

    /// Ray from the eye through a point in normalized device coordinates.
    pub fn ray_through(&self, ndc: Vector2<f32>) -> Option<Ray> {
        let inverse = self.view_projection().try_inverse()?;
        let clip = inverse * Vector4::new(ndc.x, ndc.y, 0.5, 1.0);
        if clip.w == 0.0 {
            return None;
        }
        let through = Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w);
        let direction = (through - self.position).try_normalize(f32::EPSILON)?;
        Some(Ray { origin: self.position, direction })
    }
}
