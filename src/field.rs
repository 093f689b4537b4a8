//! Pointer-tracking arrow field.
//!
//! - **config**: arrow constants (`arrow_config.ron`) and key bindings (`controls.ron`)
//! - **grid**: cell layout for the current viewport
//! - **math**: angle wrapping, smoothing and distance fade
//! - **pointer**: latest pointer position
//! - **stepper**: per-frame angle update, one draw instruction per cell
//! - **surface**: canvas trait, transform guard, software canvas
//! - **compositor**: trail overlay plus arrow strokes
//! - **lifecycle**: Idle/Running states, mount, teardown, resize, upload

use bevy::prelude::*;

pub mod compositor;
pub mod config;
pub mod grid;
pub mod lifecycle;
pub mod math;
pub mod pointer;
pub mod stepper;
pub mod surface;

use config::FieldConfigPlugin;
use lifecycle::SurfacePlugin;

pub use lifecycle::{FieldSet, SurfaceState};

/// Everything the binary needs: config, surface lifecycle and a 2D camera.
pub struct FieldPlugin;

impl Plugin for FieldPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((FieldConfigPlugin, SurfacePlugin))
            .add_systems(Startup, spawn_camera);
    }
}

fn spawn_camera(mut commands: Commands) {
    // Default 2D camera: world origin at the window center, one unit per
    // logical pixel, which is how the surface sprite is sized.
    commands.spawn(Camera2d);
}
