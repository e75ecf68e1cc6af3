use std::collections::HashMap;

use avian3d::prelude::*;
use bevy::asset::LoadState;
use bevy::prelude::*;

use crate::mesh::{
    bend::bend_mesh, CompositionMethod, MeshComposition, PlacedFrame, PlacementMethod,
};
use crate::spline::Spline;
use crate::terrain::{NoTerrain, PhysicsTerrain, TerrainProbe};

use super::engine::InstanceFactory;
use super::schedule::RecomputeSchedule;
use super::{
    DynamicSplineMesh, NeedsDeformation, SplineMeshInstance, SplineMeshState, SynthesizedPoints,
};

/// Run condition that checks if avian3d physics is available.
/// We check for the Gravity resource which is always present when PhysicsPlugins is added.
pub fn physics_available(gravity: Option<Res<Gravity>>) -> bool {
    gravity.is_some()
}

/// Spawns placed instances as children of the spline entity.
pub struct CommandsInstanceFactory<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    owner: Entity,
    spline: Entity,
    material: Option<Handle<StandardMaterial>>,
    spawned: HashMap<Entity, SplineMeshInstance>,
}

impl<'a, 'w, 's> CommandsInstanceFactory<'a, 'w, 's> {
    pub fn new(
        commands: &'a mut Commands<'w, 's>,
        owner: Entity,
        spline: Entity,
        material: Option<Handle<StandardMaterial>>,
    ) -> Self {
        Self {
            commands,
            owner,
            spline,
            material,
            spawned: HashMap::new(),
        }
    }
}

impl InstanceFactory<Handle<Mesh>> for CommandsInstanceFactory<'_, '_, '_> {
    type Instance = Entity;

    fn create_instance(&mut self, mesh: &Handle<Mesh>, index: usize) -> Entity {
        let instance = SplineMeshInstance {
            owner: self.owner,
            index,
            source: mesh.clone(),
            frame: PlacedFrame::default(),
        };

        let mut entity_commands = self.commands.spawn((
            instance.clone(),
            NeedsDeformation,
            Transform::default(),
            Visibility::default(),
        ));
        if let Some(material) = &self.material {
            entity_commands.insert(MeshMaterial3d(material.clone()));
        }

        let entity = entity_commands.id();
        self.commands.entity(self.spline).add_child(entity);
        self.spawned.insert(entity, instance);
        entity
    }

    fn destroy_instance(&mut self, instance: Entity) {
        if let Ok(mut entity_commands) = self.commands.get_entity(instance) {
            entity_commands.despawn();
        }
    }

    fn set_instance_frame(&mut self, instance: &Entity, frame: &PlacedFrame) {
        let Some(placed) = self.spawned.get_mut(instance) else {
            return;
        };
        placed.frame = *frame;
        self.commands
            .entity(*instance)
            .insert((placed.clone(), NeedsDeformation));
    }
}

/// Attach internal state to new spline meshes, and a point record to their splines.
pub fn init_spline_mesh_state(
    mut commands: Commands,
    meshes: Query<(Entity, &DynamicSplineMesh), Without<SplineMeshState>>,
) {
    for (entity, mesh) in &meshes {
        commands.entity(entity).insert(SplineMeshState {
            schedule: RecomputeSchedule::new(mesh.update_interval),
            pending: true,
            ..default()
        });
        if let Ok(mut spline_commands) = commands.get_entity(mesh.spline) {
            spline_commands.insert_if_new(SynthesizedPoints::default());
        }
    }
}

/// Schedule recomputes for configuration edits and spline edits.
///
/// Configuration edits recompute on the next run. Spline edits and moves arm
/// the debounce timer, except edits made by the recompute itself.
pub fn arm_recompute_on_spline_edit(
    mut meshes: Query<(Ref<DynamicSplineMesh>, &mut SplineMeshState)>,
    splines: Query<(Ref<Spline>, Ref<Transform>)>,
) {
    for (mesh, mut state) in &mut meshes {
        state.schedule.set_interval(mesh.update_interval);

        if mesh.is_changed() {
            state.pending = true;
        }

        let Ok((spline, transform)) = splines.get(mesh.spline) else {
            continue;
        };

        let edited = spline.is_changed() && spline.points() != state.snapshot.as_slice();
        if edited || transform.is_changed() {
            trace!("Spline {} edited, arming recompute", mesh.spline);
            state.schedule.arm(*transform);
        }
    }
}

/// Advance the debounce timers.
pub fn tick_recompute_schedules(
    time: Res<Time>,
    mut meshes: Query<(&DynamicSplineMesh, &mut SplineMeshState)>,
    splines: Query<&Transform, With<Spline>>,
) {
    for (mesh, mut state) in &mut meshes {
        let transform = splines.get(mesh.spline).copied().unwrap_or_default();
        if state.schedule.tick(time.delta_secs(), transform) {
            state.pending = true;
        }
    }
}

/// Recompute pending spline meshes, probing terrain with avian3d.
pub fn recompute_spline_meshes(
    mut commands: Commands,
    spatial_query: SpatialQuery,
    assets: Res<Assets<Mesh>>,
    asset_server: Option<Res<AssetServer>>,
    mut meshes: Query<(Entity, &mut DynamicSplineMesh, &mut SplineMeshState)>,
    mut splines: Query<(&mut Spline, Option<&mut SynthesizedPoints>, &GlobalTransform)>,
) {
    for (entity, mut mesh, mut state) in &mut meshes {
        if !state.pending {
            continue;
        }
        if meshes_loading(&mesh, &assets, asset_server.as_deref()) {
            trace!("Spline mesh {entity} waiting for its meshes to load");
            continue;
        }
        let Ok((mut spline, points, global)) = splines.get_mut(mesh.spline) else {
            continue;
        };
        let terrain = PhysicsTerrain::new(&spatial_query, mesh.ground.layers, *global);
        run_recompute(
            &mut commands,
            entity,
            &mut mesh,
            &mut state,
            (&mut *spline, points),
            &terrain,
            &assets,
        );
    }
}

/// Recompute pending spline meshes when physics is not available.
/// Ground snapping and bridge mode never find terrain.
pub fn recompute_spline_meshes_without_terrain(
    mut commands: Commands,
    assets: Res<Assets<Mesh>>,
    asset_server: Option<Res<AssetServer>>,
    mut meshes: Query<(Entity, &mut DynamicSplineMesh, &mut SplineMeshState)>,
    mut splines: Query<(&mut Spline, Option<&mut SynthesizedPoints>)>,
) {
    for (entity, mut mesh, mut state) in &mut meshes {
        if !state.pending {
            continue;
        }
        if meshes_loading(&mesh, &assets, asset_server.as_deref()) {
            trace!("Spline mesh {entity} waiting for its meshes to load");
            continue;
        }
        let Ok((mut spline, points)) = splines.get_mut(mesh.spline) else {
            continue;
        };
        run_recompute(
            &mut commands,
            entity,
            &mut mesh,
            &mut state,
            (&mut *spline, points),
            &NoTerrain,
            &assets,
        );
    }
}

/// Whether a mesh the current composition can use is still being loaded.
///
/// Meshes that failed to load, or that no load was started for, are not
/// waited on: the composition skips them as invalid.
fn meshes_loading(
    mesh: &DynamicSplineMesh,
    assets: &Assets<Mesh>,
    asset_server: Option<&AssetServer>,
) -> bool {
    let Some(asset_server) = asset_server else {
        return false;
    };

    let composition = &mesh.composition;
    let fill_only = composition.composition_method == CompositionMethod::Fill
        || (composition.placement_method == PlacementMethod::Extend
            && composition.compositions.is_empty());

    let selected: Vec<&MeshComposition<Handle<Mesh>>> = if fill_only {
        vec![&composition.fill]
    } else {
        composition.compositions.iter().collect()
    };

    selected
        .iter()
        .filter_map(|c| c.mesh.as_ref())
        .filter(|handle| assets.get(*handle).is_none())
        .any(|handle| {
            matches!(
                asset_server.get_load_state(handle.id()),
                Some(LoadState::Loading)
            )
        })
}

fn run_recompute<T: TerrainProbe + ?Sized>(
    commands: &mut Commands,
    entity: Entity,
    mesh: &mut Mut<DynamicSplineMesh>,
    state: &mut SplineMeshState,
    (spline, mut points): (&mut Spline, Option<Mut<SynthesizedPoints>>),
    terrain: &T,
    assets: &Assets<Mesh>,
) {
    state.pending = false;
    state.schedule.disarm();

    // Track the points this owner synthesized on this particular spline
    if let Some(points) = points.as_deref_mut() {
        state
            .engine
            .replace_ground_state(points.take(entity).unwrap_or_default());
    }

    if let Some(length) = mesh.bypass_change_detection().length_request.take() {
        state.engine.flush(spline);
        spline.reset_straight(Vec3::ZERO, Vec3::X, length);
        info!("Spline {} reset to a straight length of {length}", mesh.spline);
    }

    let mut factory =
        CommandsInstanceFactory::new(commands, entity, mesh.spline, mesh.material.clone());
    let report = state
        .engine
        .recompute(&mesh.settings, spline, terrain, assets, &mut factory);

    match points {
        Some(mut points) => points.record(entity, state.engine.ground_state()),
        None => {
            let mut points = SynthesizedPoints::default();
            points.record(entity, state.engine.ground_state());
            commands.entity(mesh.spline).insert(points);
        }
    }

    state.snapshot = spline.points().to_vec();
    debug!("Spline mesh {entity} recomputed: {report:?}");
}

/// Build the bent mesh of each placed instance once its source mesh is loaded.
pub fn deform_spline_mesh_instances(
    mut commands: Commands,
    mut assets: ResMut<Assets<Mesh>>,
    instances: Query<(Entity, &SplineMeshInstance), With<NeedsDeformation>>,
) {
    for (entity, instance) in &instances {
        let Some(source) = assets.get(&instance.source) else {
            continue;
        };

        let Some(bent) = bend_mesh(source, &instance.frame) else {
            warn!("Spline mesh instance {entity} has a mesh without forward extent");
            commands.entity(entity).remove::<NeedsDeformation>();
            continue;
        };

        let handle = assets.add(bent);
        commands
            .entity(entity)
            .insert(Mesh3d(handle))
            .remove::<NeedsDeformation>();
    }
}

/// Despawn instances and remove synthesized points when a spline mesh is
/// removed or despawned.
pub fn cleanup_spline_meshes(
    mut commands: Commands,
    mut removed: RemovedComponents<DynamicSplineMesh>,
    states: Query<(), With<SplineMeshState>>,
    mut splines: Query<(&mut Spline, &mut SynthesizedPoints)>,
    instances: Query<(Entity, &SplineMeshInstance)>,
) {
    for removed_mesh in removed.read() {
        for (mut spline, mut points) in &mut splines {
            if let Some(mut ground) = points.take(removed_mesh) {
                let flushed = ground.flush(&mut *spline);
                debug!("Flushed {flushed} points synthesized by spline mesh {removed_mesh}");
            }
        }

        if states.contains(removed_mesh) {
            commands.entity(removed_mesh).remove::<SplineMeshState>();
        }

        for (entity, instance) in &instances {
            if instance.owner == removed_mesh {
                commands.entity(entity).despawn();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::builder::DynamicSplineMeshPlugin;
    use crate::spline::{SplinePath, SplinePointType};

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, DynamicSplineMeshPlugin))
            .init_resource::<Assets<Mesh>>()
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
        app
    }

    /// Fill a straight 100 unit spline with 30 unit planks and run the first update.
    fn spawn_fence(app: &mut App) -> (Entity, Entity) {
        let plank = app
            .world_mut()
            .resource_mut::<Assets<Mesh>>()
            .add(Cuboid::new(30.0, 4.0, 2.0));
        let spline = app
            .world_mut()
            .spawn((Spline::straight(Vec3::ZERO, Vec3::X, 100.0), Transform::default()))
            .id();

        let mut fence = DynamicSplineMesh::new(spline, plank);
        fence.set_update_interval(0.25);
        let owner = app.world_mut().spawn(fence).id();

        app.update();
        (spline, owner)
    }

    fn instances(app: &mut App, owner: Entity) -> Vec<Entity> {
        let mut query = app.world_mut().query::<(Entity, &SplineMeshInstance)>();
        let mut found: Vec<Entity> = query
            .iter(app.world())
            .filter(|(_, instance)| instance.owner == owner)
            .map(|(entity, _)| entity)
            .collect();
        found.sort();
        found
    }

    fn state(app: &App, owner: Entity) -> &SplineMeshState {
        app.world().get::<SplineMeshState>(owner).unwrap()
    }

    #[test]
    fn test_first_update_places_instances() {
        let mut app = app();
        let (_, owner) = spawn_fence(&mut app);

        let placed = instances(&mut app, owner);
        assert_eq!(placed.len(), 3);
        assert!(app.world().get::<Mesh3d>(placed[0]).is_some());
        assert!(app.world().get::<NeedsDeformation>(placed[0]).is_none());
        assert!(!state(&app, owner).pending);
    }

    #[test]
    fn test_settings_change_recomputes_next_update() {
        let mut app = app();
        let (_, owner) = spawn_fence(&mut app);
        let before = instances(&mut app, owner);

        app.world_mut()
            .get_mut::<DynamicSplineMesh>(owner)
            .unwrap()
            .set_gap(15.0);
        app.update();

        let after = instances(&mut app, owner);
        assert_eq!(after.len(), 2);
        assert!(after.iter().all(|entity| !before.contains(entity)));
    }

    #[test]
    fn test_own_spline_writes_do_not_rearm() {
        let mut app = app();
        let (spline, owner) = spawn_fence(&mut app);

        app.world_mut()
            .get_mut::<DynamicSplineMesh>(owner)
            .unwrap()
            .set_length(200.0);
        app.update();

        let length = app.world().get::<Spline>(spline).unwrap().length();
        assert!((length - 200.0).abs() < 0.1);
        let placed = instances(&mut app, owner);
        assert_eq!(placed.len(), 6);

        for _ in 0..5 {
            app.update();
            assert!(!state(&app, owner).schedule.is_armed());
        }
        assert_eq!(instances(&mut app, owner), placed);
    }

    #[test]
    fn test_spline_edit_recomputes_after_interval() {
        let mut app = app();
        let (spline, owner) = spawn_fence(&mut app);
        let before = instances(&mut app, owner);

        app.world_mut()
            .get_mut::<Spline>(spline)
            .unwrap()
            .points_mut()[1]
            .position = Vec3::new(200.0, 0.0, 0.0);
        app.update();

        assert!(state(&app, owner).schedule.is_armed());
        assert_eq!(instances(&mut app, owner), before);

        for _ in 0..4 {
            app.update();
        }
        assert!(!state(&app, owner).schedule.is_armed());
        assert_eq!(instances(&mut app, owner).len(), 6);
    }

    #[test]
    fn test_moving_spline_waits_until_it_settles() {
        let mut app = app();
        let (spline, owner) = spawn_fence(&mut app);
        let before = instances(&mut app, owner);

        // Longer than the update interval in total
        for _ in 0..6 {
            app.world_mut()
                .get_mut::<Transform>(spline)
                .unwrap()
                .translation
                .x += 10.0;
            app.update();
            assert!(state(&app, owner).schedule.is_armed());
        }
        assert_eq!(instances(&mut app, owner), before);

        for _ in 0..4 {
            app.update();
        }
        assert!(!state(&app, owner).schedule.is_armed());
        let after = instances(&mut app, owner);
        assert_eq!(after.len(), 3);
        assert_ne!(after, before);
    }

    #[test]
    fn test_unloadable_mesh_does_not_stall_recompute() {
        let mut app = app();
        let (_, owner) = spawn_fence(&mut app);

        app.world_mut()
            .get_mut::<DynamicSplineMesh>(owner)
            .unwrap()
            .set_fill(MeshComposition::new(Handle::default()));
        app.update();

        assert!(!state(&app, owner).pending);
        assert!(instances(&mut app, owner).is_empty());
    }

    #[test]
    fn test_removing_component_despawns_instances() {
        let mut app = app();
        let (_, owner) = spawn_fence(&mut app);

        app.world_mut()
            .entity_mut(owner)
            .remove::<DynamicSplineMesh>();
        app.update();

        assert!(instances(&mut app, owner).is_empty());
        assert!(app.world().get::<SplineMeshState>(owner).is_none());
    }

    #[test]
    fn test_despawned_owner_flushes_synthesized_points() {
        let mut app = app();
        let (spline, owner) = spawn_fence(&mut app);

        let mut ground = app
            .world_mut()
            .get_mut::<SynthesizedPoints>(spline)
            .unwrap()
            .take(owner)
            .unwrap();
        {
            let mut path = app.world_mut().get_mut::<Spline>(spline).unwrap();
            let air = Vec3::new(50.0, 10.0, 0.0);
            assert!(ground.insert_tracked(&mut *path, 1, air, SplinePointType::Linear));
        }
        app.world_mut()
            .get_mut::<SynthesizedPoints>(spline)
            .unwrap()
            .record(owner, &ground);
        assert_eq!(app.world().get::<Spline>(spline).unwrap().point_count(), 3);

        app.world_mut().despawn(owner);
        app.update();

        let path = app.world().get::<Spline>(spline).unwrap();
        assert_eq!(
            path.positions(),
            vec![Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0)]
        );
        assert!(instances(&mut app, owner).is_empty());
    }
}
