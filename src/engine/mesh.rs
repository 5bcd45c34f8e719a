use rand::Rng;

/// Interleaved floats per vertex: position (3), normal (3), uv (2).
pub const FLOATS_PER_VERTEX: usize = 8;

pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    /// UV sphere centered on the origin.
    pub fn sphere(radius: f32, lat_segments: u16, lon_segments: u16) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for lat in 0..=lat_segments {
            let v = lat as f32 / lat_segments as f32;
            let theta = v * std::f32::consts::PI;
            for lon in 0..=lon_segments {
                let u = lon as f32 / lon_segments as f32;
                let phi = u * std::f32::consts::TAU;
                let nx = theta.sin() * phi.cos();
                let ny = theta.cos();
                let nz = theta.sin() * phi.sin();
                vertices.extend_from_slice(&[
                    nx * radius, ny * radius, nz * radius,
                    nx, ny, nz,
                    u, v,
                ]);
            }
        }

        let stride = lon_segments + 1;
        for lat in 0..lat_segments {
            for lon in 0..lon_segments {
                let a = lat * stride + lon;
                let b = a + stride;
                indices.extend_from_slice(&[
                    a, b, a + 1,
                    b, b + 1, a + 1,
                ]);
            }
        }

        Mesh { vertices, indices }
    }

    /// Flat annulus in the XZ plane, facing +Y. Drawn double-sided.
    pub fn ring(inner_radius: f32, outer_radius: f32, segments: u16) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for i in 0..=segments {
            let u = i as f32 / segments as f32;
            let angle = u * std::f32::consts::TAU;
            let (sin, cos) = angle.sin_cos();
            vertices.extend_from_slice(&[
                cos * inner_radius, 0.0, sin * inner_radius,
                0.0, 1.0, 0.0,
                u, 0.0,
            ]);
            vertices.extend_from_slice(&[
                cos * outer_radius, 0.0, sin * outer_radius,
                0.0, 1.0, 0.0,
                u, 1.0,
            ]);
        }

        for i in 0..segments {
            let inner = i * 2;
            let outer = inner + 1;
            let next_inner = inner + 2;
            let next_outer = inner + 3;
            indices.extend_from_slice(&[
                inner, outer, next_inner,
                outer, next_outer, next_inner,
            ]);
        }

        Mesh { vertices, indices }
    }
}

/// Random points inside an axis-aligned cube of the given half-extent,
/// as a flat xyz list.
pub fn starfield<R: Rng + ?Sized>(count: usize, half_extent: f32, rng: &mut R) -> Vec<f32> {
    let mut points = Vec::with_capacity(count * 3);
    for _ in 0..count * 3 {
        points.push(rng.gen_range(-half_extent..half_extent));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = Mesh::sphere(2.0, 16, 16);
        assert_eq!(mesh.vertex_count(), 17 * 17);
        assert_eq!(mesh.indices.len(), 16 * 16 * 6);
        for v in mesh.vertices.chunks(FLOATS_PER_VERTEX) {
            let r = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            assert_relative_eq!(r, 2.0, epsilon = 1e-5);
        }
        let max_index = *mesh.indices.iter().max().unwrap() as usize;
        assert!(max_index < mesh.vertex_count());
    }

    #[test]
    fn test_ring_bounds() {
        let mesh = Mesh::ring(2.7, 4.5, 32);
        assert_eq!(mesh.vertex_count(), 66);
        assert_eq!(mesh.indices.len(), 32 * 6);
        for v in mesh.vertices.chunks(FLOATS_PER_VERTEX) {
            let r = (v[0] * v[0] + v[2] * v[2]).sqrt();
            assert!(r > 2.69 && r < 4.51, "radius {r}");
            assert_eq!(v[1], 0.0);
        }
    }

    #[test]
    fn test_starfield_is_seeded_and_bounded() {
        let a = starfield(100, 1000.0, &mut SmallRng::seed_from_u64(3));
        let b = starfield(100, 1000.0, &mut SmallRng::seed_from_u64(3));
        assert_eq!(a.len(), 300);
        assert_eq!(a, b);
        assert!(a.iter().all(|c| c.abs() <= 1000.0));
    }
}
