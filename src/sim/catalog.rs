use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

/// Ring system extent, as multiples of the parent body's radius.
pub const RING_INNER_RADIUS: f32 = 1.5;
pub const RING_OUTER_RADIUS: f32 = 2.5;

/// Whether a body sits at the center of the system or orbits it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Star,
    Planet,
}

impl BodyKind {
    pub fn label(self) -> &'static str {
        match self {
            BodyKind::Star => "Star",
            BodyKind::Planet => "Planet",
        }
    }
}

/// A labelled line of trivia shown next to a body's description.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Fact {
    pub label: String,
    pub value: String,
}

impl Fact {
    pub fn new(label: &str, value: &str) -> Self {
        Fact { label: label.to_string(), value: value.to_string() }
    }
}

/// Immutable description of one catalog entry.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDescriptor {
    pub id: String,
    pub display_name: String,
    pub radius: f32,
    /// 0xRRGGBB
    pub color: u32,
    pub description: String,
    /// Zero marks the central star.
    pub orbital_distance: f32,
    /// Divisor on the per-tick angular step; larger is slower.
    pub angular_rate: f32,
    pub has_ring_system: bool,
    pub extra_facts: Vec<Fact>,
}

impl BodyDescriptor {
    pub fn star(id: &str, display_name: &str, radius: f32, color: u32, description: &str) -> Self {
        BodyDescriptor {
            id: id.to_string(),
            display_name: display_name.to_string(),
            radius,
            color,
            description: description.to_string(),
            orbital_distance: 0.0,
            angular_rate: 0.0,
            has_ring_system: false,
            extra_facts: Vec::new(),
        }
    }

    pub fn planet(
        id: &str,
        display_name: &str,
        radius: f32,
        color: u32,
        description: &str,
        orbital_distance: f32,
        angular_rate: f32,
    ) -> Self {
        BodyDescriptor {
            id: id.to_string(),
            display_name: display_name.to_string(),
            radius,
            color,
            description: description.to_string(),
            orbital_distance,
            angular_rate,
            has_ring_system: false,
            extra_facts: Vec::new(),
        }
    }

    pub fn with_rings(mut self) -> Self {
        self.has_ring_system = true;
        self
    }

    pub fn with_fact(mut self, label: &str, value: &str) -> Self {
        self.extra_facts.push(Fact::new(label, value));
        self
    }

    pub fn kind(&self) -> BodyKind {
        if self.orbital_distance == 0.0 {
            BodyKind::Star
        } else {
            BodyKind::Planet
        }
    }

    pub fn is_star(&self) -> bool {
        self.kind() == BodyKind::Star
    }

    /// Color as normalized (r, g, b).
    pub fn rgb(&self) -> (f32, f32, f32) {
        hex_to_rgb(self.color)
    }

    /// Color as a CSS hex string, e.g. `#fdb813`.
    pub fn css_color(&self) -> String {
        format!("#{:06x}", self.color & 0xFF_FFFF)
    }

    /// The rows of the info panel: orbit figures for planets, then any extra facts.
    pub fn facts(&self) -> Vec<Fact> {
        let mut facts = Vec::new();
        if self.orbital_distance > 0.0 {
            facts.push(Fact {
                label: "Distance from Sun".to_string(),
                value: format!("{} AU", self.orbital_distance),
            });
            facts.push(Fact {
                label: "Orbital Speed".to_string(),
                value: format!("{} km/s", self.angular_rate),
            });
        }
        facts.extend(self.extra_facts.iter().cloned());
        facts
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let id = || self.id.clone();
        for (field, value) in [
            ("radius", self.radius),
            ("orbital_distance", self.orbital_distance),
            ("angular_rate", self.angular_rate),
        ] {
            if !value.is_finite() {
                return Err(CatalogError::NonFinite { id: id(), field });
            }
        }
        if self.radius <= 0.0 {
            return Err(CatalogError::NonPositiveRadius { id: id() });
        }
        if self.orbital_distance < 0.0 {
            return Err(CatalogError::NegativeDistance { id: id() });
        }
        if self.orbital_distance > 0.0 && self.angular_rate <= 0.0 {
            return Err(CatalogError::NonPositiveAngularRate { id: id() });
        }
        Ok(())
    }
}

pub fn hex_to_rgb(color: u32) -> (f32, f32, f32) {
    (
        ((color >> 16) & 0xFF) as f32 / 255.0,
        ((color >> 8) & 0xFF) as f32 / 255.0,
        (color & 0xFF) as f32 / 255.0,
    )
}

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog has no bodies")]
    Empty,

    #[error("catalog has no star (a body with orbital distance 0)")]
    NoStar,

    #[error("catalog has two stars: {first} and {second}")]
    MultipleStars { first: String, second: String },

    #[error("duplicate body id: {0}")]
    DuplicateId(String),

    #[error("body {id}: radius must be positive")]
    NonPositiveRadius { id: String },

    #[error("body {id}: orbital distance must not be negative")]
    NegativeDistance { id: String },

    #[error("body {id}: angular rate must be positive for an orbiting body")]
    NonPositiveAngularRate { id: String },

    #[error("body {id}: {field} is not finite")]
    NonFinite { id: String, field: &'static str },

    #[error("bodies {first} and {second} share an orbit")]
    SharedOrbit { first: String, second: String },
}

/// Validated, ordered, read-only set of bodies. Exactly one entry is the star.
#[derive(Clone, Debug)]
pub struct Catalog {
    bodies: Vec<BodyDescriptor>,
    by_id: HashMap<String, usize>,
    star: usize,
}

impl Catalog {
    pub fn new(bodies: Vec<BodyDescriptor>) -> Result<Self, CatalogError> {
        if bodies.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::with_capacity(bodies.len());
        let mut star: Option<usize> = None;

        for (index, body) in bodies.iter().enumerate() {
            body.validate()?;
            if by_id.insert(body.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(body.id.clone()));
            }
            if body.is_star() {
                if let Some(first) = star {
                    return Err(CatalogError::MultipleStars {
                        first: bodies[first].id.clone(),
                        second: body.id.clone(),
                    });
                }
                star = Some(index);
            }
        }
        let star = star.ok_or(CatalogError::NoStar)?;

        let mut orbiting: Vec<&BodyDescriptor> = bodies.iter().filter(|b| !b.is_star()).collect();
        orbiting.sort_by(|a, b| a.orbital_distance.total_cmp(&b.orbital_distance));
        for pair in orbiting.windows(2) {
            if pair[0].orbital_distance == pair[1].orbital_distance {
                return Err(CatalogError::SharedOrbit {
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                });
            }
        }

        log::info!("Catalog built with {} bodies (star: {})", bodies.len(), bodies[star].id);
        Ok(Catalog { bodies, by_id, star })
    }

    /// The Sun and the eight planets.
    pub fn solar_system() -> Result<Self, CatalogError> {
        Catalog::new(vec![
            BodyDescriptor::star("sun", "Sun", 3.0, 0xFDB813, "The star at the center of our solar system")
                .with_fact("Type", "G-type Star")
                .with_fact("Age", "4.6 billion years"),
            BodyDescriptor::planet("mercury", "Mercury", 0.4, 0x8C7853, "Smallest planet, closest to the Sun", 8.0, 4.74),
            BodyDescriptor::planet("venus", "Venus", 0.9, 0xFFC649, "Hottest planet with thick atmosphere", 12.0, 3.50),
            BodyDescriptor::planet("earth", "Earth", 1.0, 0x4A90E2, "Our home planet, the only known world with life", 16.0, 2.98),
            BodyDescriptor::planet("mars", "Mars", 0.5, 0xE27B58, "The Red Planet with polar ice caps", 20.0, 2.41),
            BodyDescriptor::planet("jupiter", "Jupiter", 2.2, 0xC88B3A, "Largest planet with a giant storm", 28.0, 1.31),
            BodyDescriptor::planet("saturn", "Saturn", 1.8, 0xFAD5A5, "Famous for its spectacular ring system", 38.0, 0.97)
                .with_rings(),
            BodyDescriptor::planet("uranus", "Uranus", 1.3, 0x4FD0E7, "Ice giant that rotates on its side", 48.0, 0.68),
            BodyDescriptor::planet("neptune", "Neptune", 1.2, 0x4166F5, "Farthest planet with supersonic winds", 58.0, 0.54),
        ])
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BodyDescriptor> {
        self.bodies.iter()
    }

    pub fn body(&self, index: usize) -> Option<&BodyDescriptor> {
        self.bodies.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&BodyDescriptor> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    pub fn star_index(&self) -> usize {
        self.star
    }

    pub fn star(&self) -> &BodyDescriptor {
        &self.bodies[self.star]
    }

    /// Orbiting bodies in catalog order, with their catalog indices.
    pub fn planets(&self) -> impl Iterator<Item = (usize, &BodyDescriptor)> {
        self.bodies.iter().enumerate().filter(|(_, b)| !b.is_star())
    }
}
