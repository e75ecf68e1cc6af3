mod components;
mod engine;
mod schedule;
mod systems;

pub use components::*;
pub use engine::*;
pub use schedule::{RecomputeSchedule, DEFAULT_UPDATE_INTERVAL};
pub use systems::{physics_available, CommandsInstanceFactory};

use bevy::prelude::*;

use crate::ground::{BridgeSettings, CheckGroundMethod, GroundSnapSettings};
use crate::mesh::{CompositionMethod, PlacedFrame, PlacementMethod};
use crate::rotation::{
    AngleMeshRotation, GroupMeshRotation, MeshRotation, RotationAxis, RotationMethod,
    RotationRegistry,
};
use crate::spline::SplinePlugin;

/// Plugin for filling splines with mesh segments.
///
/// Spawn a [`DynamicSplineMesh`] referencing a spline entity. Every placed
/// segment is spawned as a child of the spline with a [`SplineMeshInstance`]
/// and its own bent copy of the source mesh.
///
/// # Usage
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_dynamic_spline_mesh::prelude::*;
///
/// fn setup(
///     mut commands: Commands,
///     mut meshes: ResMut<Assets<Mesh>>,
///     mut materials: ResMut<Assets<StandardMaterial>>,
/// ) {
///     let spline = commands
///         .spawn((
///             Spline::straight(Vec3::ZERO, Vec3::X, 500.0),
///             Transform::default(),
///             Visibility::default(),
///         ))
///         .id();
///
///     let plank = meshes.add(Cuboid::new(40.0, 2.0, 8.0));
///     let mut spline_mesh = DynamicSplineMesh::new(spline, plank)
///         .with_material(materials.add(Color::srgb(0.6, 0.4, 0.2)));
///     spline_mesh.set_gap(2.0);
///     spline_mesh.ground = GroundSnapSettings::new().with_depth(400.0);
///
///     commands.spawn(spline_mesh);
/// }
/// ```
///
/// # Triggers
///
/// - Changing the [`DynamicSplineMesh`] component recomputes on the next frame.
/// - Editing or moving the spline arms a debounced timer
///   ([`SplineMeshSettings::update_interval`]).
///
/// Ground snapping and bridge mode probe terrain through avian3d when
/// `PhysicsPlugins` is added, and find nothing otherwise.
pub struct DynamicSplineMeshPlugin;

impl Plugin for DynamicSplineMeshPlugin {
    fn build(&self, app: &mut App) {
        // Ensure SplinePlugin is added
        if !app.is_plugin_added::<SplinePlugin>() {
            app.add_plugins(SplinePlugin);
        }

        app.register_type::<SplineMeshInstance>()
            .register_type::<PlacedFrame>()
            .register_type::<CompositionMethod>()
            .register_type::<PlacementMethod>()
            .register_type::<RotationMethod>()
            .register_type::<RotationAxis>()
            .register_type::<MeshRotation>()
            .register_type::<GroupMeshRotation>()
            .register_type::<AngleMeshRotation>()
            .register_type::<RotationRegistry>()
            .register_type::<CheckGroundMethod>()
            .register_type::<GroundSnapSettings>()
            .register_type::<BridgeSettings>()
            .add_systems(
                Update,
                (
                    systems::init_spline_mesh_state,
                    systems::arm_recompute_on_spline_edit,
                    systems::tick_recompute_schedules,
                    systems::recompute_spline_meshes.run_if(physics_available),
                    systems::recompute_spline_meshes_without_terrain.run_if(not(physics_available)),
                    systems::deform_spline_mesh_instances,
                    systems::cleanup_spline_meshes,
                )
                    .chain(),
            );
    }
}
