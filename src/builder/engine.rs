use bevy::prelude::*;

use crate::ground::{BridgeSettings, GroundReport, GroundSnapSettings, GroundState};
use crate::mesh::{
    place_segment, ComposeError, CompositionMethod, CompositionSettings, MeshBounds,
    MeshComposition, PlacedFrame, PlacementMethod,
};
use crate::rotation::{RotationMethod, RotationRegistry};
use crate::spline::SplinePath;
use crate::terrain::TerrainProbe;

use super::schedule::DEFAULT_UPDATE_INTERVAL;

/// Spline length restored by [`SplineMeshSettings::reset`].
pub const RESET_LENGTH: f32 = 150.0;

/// Creates and destroys the placed mesh instances.
pub trait InstanceFactory<M> {
    /// Handle to a created instance.
    type Instance;

    /// Create an instance of `mesh` for the segment at `index`.
    fn create_instance(&mut self, mesh: &M, index: usize) -> Self::Instance;

    fn destroy_instance(&mut self, instance: Self::Instance);

    /// Place an instance on its segment, including its roll.
    fn set_instance_frame(&mut self, instance: &Self::Instance, frame: &PlacedFrame);
}

/// Everything that drives a recompute.
#[derive(Debug, Clone)]
pub struct SplineMeshSettings<M> {
    pub composition: CompositionSettings<M>,
    pub rotations: RotationRegistry,
    pub ground: GroundSnapSettings,
    pub bridge: BridgeSettings,
    /// Delay between the last spline edit and the recompute, in seconds.
    pub update_interval: f32,
}

impl<M> Default for SplineMeshSettings<M> {
    fn default() -> Self {
        Self {
            composition: CompositionSettings::default(),
            rotations: RotationRegistry::default(),
            ground: GroundSnapSettings::default(),
            bridge: BridgeSettings::default(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl<M: Clone> SplineMeshSettings<M> {
    pub fn new(composition: CompositionSettings<M>) -> Self {
        Self {
            composition,
            ..default()
        }
    }

    pub fn with_rotations(mut self, rotations: RotationRegistry) -> Self {
        self.rotations = rotations;
        self
    }

    pub fn with_ground(mut self, ground: GroundSnapSettings) -> Self {
        self.ground = ground;
        self
    }

    pub fn with_bridge(mut self, bridge: BridgeSettings) -> Self {
        self.bridge = bridge;
        self
    }

    /// Switch the rotation method. Every rotation value is cleared.
    pub fn set_rotation_method(&mut self, method: RotationMethod) {
        self.rotations.set_method(method);
    }

    pub fn set_composition_method(&mut self, method: CompositionMethod) {
        self.composition.composition_method = method;
    }

    /// Switch the placement method.
    ///
    /// Scale factors are only editable for [`PlacementMethod::Duplicate`].
    pub fn set_placement_method(&mut self, method: PlacementMethod) {
        let use_scale_factor = method != PlacementMethod::Extend;
        self.composition.placement_method = method;
        self.composition.fill.use_scale_factor = use_scale_factor;
        for composition in &mut self.composition.compositions {
            composition.use_scale_factor = use_scale_factor;
        }
    }

    /// Set the gap between duplicated meshes, clamped to be non-negative.
    pub fn set_gap(&mut self, gap: f32) {
        self.composition.gap = gap.max(0.0);
    }

    pub fn set_fill(&mut self, composition: MeshComposition<M>) {
        self.composition.fill = composition;
    }

    pub fn set_compositions(&mut self, compositions: Vec<MeshComposition<M>>) {
        self.composition.compositions = compositions;
    }

    /// Set the debounce delay, clamped to `0.01..=10` seconds.
    pub fn set_update_interval(&mut self, seconds: f32) {
        self.update_interval = seconds.clamp(0.01, 10.0);
    }

    /// Pick a new seed for random composition.
    pub fn randomize(&mut self) {
        self.composition.seed = rand::random();
    }

    /// Clear rotations and turn off ground snapping and bridge mode.
    pub fn reset(&mut self) {
        self.rotations.set_method(self.rotations.method);
        self.ground.enabled = false;
        self.bridge.enabled = false;
    }
}

/// Outcome of one recompute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecomputeReport {
    /// Synthesized points removed before rebuilding.
    pub flushed_points: usize,
    pub ground: GroundReport,
    /// Points inserted by bridge mode.
    pub bridge_points: usize,
    /// Number of placed instances.
    pub instances: usize,
    /// Why composition failed, if it did.
    pub error: Option<ComposeError>,
}

/// The instances and synthesized points owned by one spline.
///
/// A recompute always rebuilds from scratch: previous instances are destroyed
/// and previously synthesized points removed before anything else happens.
#[derive(Debug)]
pub struct SplineMeshEngine<I> {
    instances: Vec<I>,
    ground: GroundState,
}

impl<I> Default for SplineMeshEngine<I> {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            ground: GroundState::default(),
        }
    }
}

impl<I> SplineMeshEngine<I> {
    pub fn instances(&self) -> &[I] {
        &self.instances
    }

    pub fn ground_state(&self) -> &GroundState {
        &self.ground
    }

    /// Swap the synthesized point tracking, returning the previous one.
    pub fn replace_ground_state(&mut self, ground: GroundState) -> GroundState {
        std::mem::replace(&mut self.ground, ground)
    }

    /// Destroy every instance.
    pub fn clear<M, F>(&mut self, factory: &mut F)
    where
        F: InstanceFactory<M, Instance = I>,
    {
        for instance in self.instances.drain(..) {
            factory.destroy_instance(instance);
        }
    }

    /// Remove every synthesized point from `spline`.
    pub fn flush<S: SplinePath + ?Sized>(&mut self, spline: &mut S) -> usize {
        self.ground.flush(spline)
    }

    /// Rebuild every instance on `spline`.
    pub fn recompute<M, S, T, B, F>(
        &mut self,
        settings: &SplineMeshSettings<M>,
        spline: &mut S,
        terrain: &T,
        bounds: &B,
        factory: &mut F,
    ) -> RecomputeReport
    where
        M: Clone,
        S: SplinePath + ?Sized,
        T: TerrainProbe + ?Sized,
        B: MeshBounds<M> + ?Sized,
        F: InstanceFactory<M, Instance = I>,
    {
        self.clear::<M, F>(factory);

        let mut report = RecomputeReport {
            flushed_points: self.flush(spline),
            ..default()
        };

        if settings.ground.enabled {
            report.ground = self.ground.adapt(spline, terrain, &settings.ground);
        }
        if settings.bridge.enabled {
            report.bridge_points = self.ground.build_bridges(
                spline,
                terrain,
                settings.ground.origin_offset,
                &settings.bridge,
            );
        }

        let segments = match settings.composition.layout(spline, bounds, settings.ground.enabled) {
            Ok(segments) => segments,
            Err(error) => {
                warn!("Spline mesh recompute failed: {error}");
                report.error = Some(error);
                return report;
            }
        };

        let rotations = settings.rotations.table(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let frame = place_segment(&segment.values, &rotations, index);
            let instance = factory.create_instance(&segment.mesh, index);
            factory.set_instance_frame(&instance, &frame);
            self.instances.push(instance);
        }

        report.instances = self.instances.len();
        debug!(
            "Recomputed spline mesh: {} instances, {} control points",
            report.instances,
            spline.point_count()
        );
        report
    }
}
