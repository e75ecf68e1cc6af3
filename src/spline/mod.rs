mod arc_length;
mod components;
mod path;
mod types;

pub use arc_length::*;
pub use components::*;
pub use path::*;
pub use types::*;

use bevy::prelude::*;

/// Plugin that registers spline types for reflection/serialization.
pub struct SplinePlugin;

impl Plugin for SplinePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SplinePointType>()
            .register_type::<SplinePoint>()
            .register_type::<Spline>();
    }
}
