use std::collections::HashMap;

use bevy::prelude::*;

use crate::ground::GroundState;
use crate::mesh::{CompositionSettings, MeshComposition, PlacedFrame};
use crate::spline::SplinePoint;

use super::engine::{SplineMeshEngine, SplineMeshSettings, RESET_LENGTH};
use super::schedule::RecomputeSchedule;

/// Fills a spline entity with mesh segments.
///
/// Configuration commands are reached through `Deref` to
/// [`SplineMeshSettings`]. Mutating the component recomputes immediately,
/// editing the spline recomputes after the update interval.
#[derive(Component, Debug, Clone, Deref, DerefMut)]
pub struct DynamicSplineMesh {
    /// The spline entity to fill.
    pub spline: Entity,
    #[deref]
    pub settings: SplineMeshSettings<Handle<Mesh>>,
    /// Material given to every placed instance.
    pub material: Option<Handle<StandardMaterial>>,
    /// Straight length the spline is reset to on the next recompute.
    pub(crate) length_request: Option<f32>,
}

impl Default for DynamicSplineMesh {
    fn default() -> Self {
        Self {
            spline: Entity::PLACEHOLDER,
            settings: SplineMeshSettings::default(),
            material: None,
            length_request: None,
        }
    }
}

impl DynamicSplineMesh {
    /// Fill `spline` with a single repeated mesh.
    pub fn new(spline: Entity, mesh: Handle<Mesh>) -> Self {
        Self {
            spline,
            settings: SplineMeshSettings::new(CompositionSettings::fill(MeshComposition::new(
                mesh,
            ))),
            ..default()
        }
    }

    pub fn with_settings(mut self, settings: SplineMeshSettings<Handle<Mesh>>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_material(mut self, material: Handle<StandardMaterial>) -> Self {
        self.material = Some(material);
        self
    }

    /// Replace the spline by a straight line of `length` along its local X axis.
    pub fn set_length(&mut self, length: f32) {
        self.length_request = Some(length.max(0.0));
    }

    /// Restore a straight spline of the default length and clear rotations,
    /// ground snapping and bridge mode.
    pub fn reset(&mut self) {
        self.settings.reset();
        self.set_length(RESET_LENGTH);
    }
}

/// A placed mesh segment, spawned as a child of the spline.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct SplineMeshInstance {
    /// The [`DynamicSplineMesh`] entity that placed this instance.
    pub owner: Entity,
    /// Segment index along the spline.
    pub index: usize,
    /// The undeformed mesh.
    pub source: Handle<Mesh>,
    pub frame: PlacedFrame,
}

/// Marker for instances whose bent mesh has not been built yet.
/// Removed once the source mesh is loaded and deformed.
#[derive(Component, Debug, Clone, Copy)]
pub struct NeedsDeformation;

/// Internal component tracking instances and synthesized points.
#[derive(Component, Debug, Default)]
pub(crate) struct SplineMeshState {
    pub engine: SplineMeshEngine<Entity>,
    pub schedule: RecomputeSchedule,
    /// Recompute on the next frame regardless of the timer.
    pub pending: bool,
    /// Control points as the last recompute left them.
    pub snapshot: Vec<SplinePoint>,
}

/// Control points synthesized on a spline, by owning spline mesh.
///
/// Lives on the spline entity so the points can still be flushed after the
/// owner is despawned.
#[derive(Component, Debug, Default)]
pub(crate) struct SynthesizedPoints {
    owners: HashMap<Entity, GroundState>,
}

impl SynthesizedPoints {
    pub fn record(&mut self, owner: Entity, ground: &GroundState) {
        self.owners.insert(owner, ground.clone());
    }

    pub fn take(&mut self, owner: Entity) -> Option<GroundState> {
        self.owners.remove(&owner)
    }
}
