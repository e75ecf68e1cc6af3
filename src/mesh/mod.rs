//! Mesh segment composition, placement and bending.
//!
//! The composer decides how many meshes fit on a spline and where each one
//! starts and ends. The placer applies the resolved rotation to each segment.
//! [`bend`] deforms the source mesh of a placed instance along its segment.

pub mod bend;
mod composer;
mod placer;

pub use composer::*;
pub use placer::*;

use std::collections::HashMap;
use std::hash::Hash;

use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;

/// How meshes are chosen to cover the spline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Default)]
pub enum CompositionMethod {
    /// Repeat a single mesh until the spline is full.
    #[default]
    Fill,
    /// Use each listed mesh once, in order.
    Usual,
    /// Draw listed meshes at random until the spline is full.
    Random,
}

impl CompositionMethod {
    /// Get the display name for this composition method.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fill => "Fill",
            Self::Usual => "Usual",
            Self::Random => "Random",
        }
    }
}

/// How composed meshes are laid out on the spline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Default)]
pub enum PlacementMethod {
    /// Place meshes end to end at their own length, separated by the gap.
    #[default]
    Duplicate,
    /// Stretch one mesh between each pair of consecutive control points.
    Extend,
}

/// A mesh together with how it is scaled on the spline.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshComposition<M> {
    /// The mesh. `None` entries are skipped.
    pub mesh: Option<M>,
    /// Uniform scale applied to the mesh, in `0..=10000`.
    pub scale_factor: f32,
    /// Whether `scale_factor` is user-editable.
    /// Cleared under [`PlacementMethod::Extend`], which derives its own scale.
    pub use_scale_factor: bool,
}

impl<M> Default for MeshComposition<M> {
    fn default() -> Self {
        Self {
            mesh: None,
            scale_factor: 1.0,
            use_scale_factor: true,
        }
    }
}

impl<M> MeshComposition<M> {
    /// Create a composition for `mesh` at unit scale.
    pub fn new(mesh: M) -> Self {
        Self {
            mesh: Some(mesh),
            ..default()
        }
    }

    /// Set the scale factor, clamped to `0..=10000`.
    pub fn with_scale(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor.clamp(0.0, 10_000.0);
        self
    }

    /// Bounding box size of the mesh if it is set and has a positive forward extent.
    pub fn valid_size<B: MeshBounds<M> + ?Sized>(&self, bounds: &B) -> Option<Vec3> {
        let size = bounds.bounding_box_size(self.mesh.as_ref()?)?;
        (size.x > 0.0).then_some(size)
    }
}

/// Geometry of one mesh segment along the spline, in the spline's local space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SplineMeshValues {
    pub start: Vec3,
    pub start_tangent: Vec3,
    pub end: Vec3,
    pub end_tangent: Vec3,
    /// Cross-section scale at the start (right, up).
    pub start_scale: Vec2,
    /// Cross-section scale at the end (right, up).
    pub end_scale: Vec2,
}

impl SplineMeshValues {
    /// Segment with a uniform cross-section scale.
    pub fn new(start: Vec3, start_tangent: Vec3, end: Vec3, end_tangent: Vec3, scale: f32) -> Self {
        Self {
            start,
            start_tangent,
            end,
            end_tangent,
            start_scale: Vec2::splat(scale),
            end_scale: Vec2::splat(scale),
        }
    }

    /// Move both ends by `offset`.
    pub fn translated(mut self, offset: Vec3) -> Self {
        self.start += offset;
        self.end += offset;
        self
    }

    /// Straight-line distance between both ends.
    pub fn chord_length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// Source of mesh bounding boxes.
pub trait MeshBounds<M> {
    /// Size of the mesh's axis-aligned bounding box, or `None` if unknown.
    fn bounding_box_size(&self, mesh: &M) -> Option<Vec3>;
}

impl<M: Eq + Hash> MeshBounds<M> for HashMap<M, Vec3> {
    fn bounding_box_size(&self, mesh: &M) -> Option<Vec3> {
        self.get(mesh).copied()
    }
}

impl MeshBounds<Handle<Mesh>> for Assets<Mesh> {
    fn bounding_box_size(&self, mesh: &Handle<Mesh>) -> Option<Vec3> {
        let (min, max) = vertex_bounds(self.get(mesh)?)?;
        Some(max - min)
    }
}

/// Minimum and maximum corner of a mesh's vertex positions.
pub fn vertex_bounds(mesh: &Mesh) -> Option<(Vec3, Vec3)> {
    let VertexAttributeValues::Float32x3(positions) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)?
    else {
        return None;
    };

    positions.iter().map(|p| Vec3::from_array(*p)).fold(None, |bounds, p| {
        Some(match bounds {
            None => (p, p),
            Some((min, max)) => (min.min(p), max.max(p)),
        })
    })
}
