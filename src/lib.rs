//! # bevy_dynamic_spline_mesh
//!
//! A Bevy plugin that fills splines with mesh segments and adapts them to terrain.
//!
//! ## Features
//!
//! - Composition: fill with one mesh, use a list once, or draw from it at random
//! - Placement: duplicate meshes at their own length, or stretch one between control points
//! - Per-segment rotation: regular, per index, by index range or by index list
//! - Ground snapping: control points follow the terrain, with steps synthesized at height changes
//! - Bridge mode: lift the spline over ravines with a tensioned middle point
//! - Debounced recompute while the spline is being edited
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_dynamic_spline_mesh::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(DynamicSplineMeshPlugin)
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
//!     let spline = commands
//!         .spawn((
//!             Spline::new(vec![
//!                 Vec3::ZERO,
//!                 Vec3::new(200.0, 0.0, 50.0),
//!                 Vec3::new(400.0, 0.0, 0.0),
//!             ]),
//!             Transform::default(),
//!             Visibility::default(),
//!         ))
//!         .id();
//!
//!     let mut fence = DynamicSplineMesh::new(spline, meshes.add(Cuboid::new(20.0, 10.0, 1.0)));
//!     fence.set_gap(5.0);
//!     commands.spawn(fence);
//! }
//! ```
//!
//! ## Plugins
//!
//! - [`SplinePlugin`]: Spline type registration (required, added automatically)
//! - [`DynamicSplineMeshPlugin`]: Composition, placement and ground adaptation
//!
//! ## Without Bevy systems
//!
//! [`SplineMeshEngine`](builder::SplineMeshEngine) runs a full recompute over
//! the [`SplinePath`](spline::SplinePath), [`TerrainProbe`](terrain::TerrainProbe),
//! [`MeshBounds`](mesh::MeshBounds) and [`InstanceFactory`](builder::InstanceFactory)
//! traits, so any spline, terrain or instance representation can be plugged in.

pub mod builder;
pub mod geometry;
pub mod ground;
pub mod mesh;
pub mod rotation;
pub mod spline;
pub mod terrain;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::DynamicSplineMeshPlugin;
pub use spline::SplinePlugin;

/// Convenient re-exports of commonly used types.
pub mod prelude {
    pub use crate::builder::{
        DynamicSplineMesh, DynamicSplineMeshPlugin, InstanceFactory, RecomputeReport,
        SplineMeshEngine, SplineMeshInstance, SplineMeshSettings,
    };
    pub use crate::ground::{BridgeSettings, CheckGroundMethod, GroundSnapSettings};
    pub use crate::mesh::{
        ComposeError, CompositionMethod, CompositionSettings, MeshBounds, MeshComposition,
        PlacedFrame, PlacementMethod,
    };
    pub use crate::rotation::{
        AngleMeshRotation, GroupMeshRotation, MeshRotation, RotationAxis, RotationMethod,
        RotationRegistry,
    };
    pub use crate::spline::{Spline, SplinePath, SplinePlugin, SplinePoint, SplinePointType};
    pub use crate::terrain::{NoTerrain, TerrainProbe};
}
