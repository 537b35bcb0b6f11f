//! Element identity and hit testing.
//!
//! The host's component tree lives outside this crate. The core only needs
//! element identity (for `target`/`currentTarget`) and a way to find the
//! element under a point when a contact starts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an interactive element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned rectangle in viewport (client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if a point lies within this rectangle (edges inclusive).
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Finds the interactive element under a point.
pub trait HitTest {
    /// Return the topmost interactive element at the given client coordinates.
    fn element_at(&self, x: f32, y: f32) -> Option<ElementId>;
}

/// A flat list of interactive hit regions.
///
/// Stands in for the host's component tree where only geometry and identity
/// matter.
#[derive(Debug, Clone, Default)]
pub struct HitRegions {
    regions: Vec<HitRegion>,
}

#[derive(Debug, Clone)]
struct HitRegion {
    id: ElementId,
    bounds: Rect,
    z_index: i32,
}

impl HitRegions {
    /// Create an empty region list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an element, replacing any earlier bounds for the same id.
    pub fn attach(&mut self, id: ElementId, bounds: Rect, z_index: i32) {
        self.detach(id);
        self.regions.push(HitRegion {
            id,
            bounds,
            z_index,
        });
    }

    /// Detach an element. Returns whether it was attached.
    pub fn detach(&mut self, id: ElementId) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r.id != id);
        self.regions.len() != before
    }

    /// Number of attached elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Check if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl HitTest for HitRegions {
    fn element_at(&self, x: f32, y: f32) -> Option<ElementId> {
        // Later attachments win ties so the most recently added element is on top.
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.bounds.contains_point(x, y))
            .max_by_key(|(idx, r)| (r.z_index, *idx))
            .map(|(_, r)| r.id)
    }
}
