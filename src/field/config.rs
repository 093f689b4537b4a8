use bevy::prelude::*;
use bevy_common_assets::ron::RonAssetPlugin;
use serde::{Deserialize, Serialize};

use super::grid::MIN_SPACING;

pub const ARROW_CONFIG_PATH: &str = "assets/arrow_config.ron";

/// Numeric constants driving the field. Each value feeds exactly one formula
/// in the grid builder, stepper or compositor.
///
/// Loaded synchronously at startup and re-applied on demand (see
/// [`FieldControls::reload_key`]). Re-applying always rebuilds the grid.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ArrowConfig {
    // Grid
    pub spacing: f32,

    // Compositing
    pub blur_alpha: f32,
    pub background: [f32; 3],

    // Arrow shape
    pub arrow_length: f32,
    pub arrowhead_size: f32,
    pub stroke_width: f32,
    pub arrow_color: [f32; 3],

    // Distance fade
    pub fade_start: f32,
    pub fade_end: f32,
    pub min_opacity: f32,
    pub max_opacity: f32,

    // Rotation
    pub smoothing_factor: f32,
}

impl Default for ArrowConfig {
    fn default() -> Self {
        Self {
            spacing: 50.0,
            blur_alpha: 0.15,
            background: [0.0, 0.0, 0.0],
            arrow_length: 20.0,
            arrowhead_size: 6.0,
            stroke_width: 2.0,
            arrow_color: [1.0, 1.0, 1.0],
            fade_start: 100.0,
            fade_end: 400.0,
            min_opacity: 0.01,
            max_opacity: 1.0,
            smoothing_factor: 0.1,
        }
    }
}

impl ArrowConfig {
    /// Returns a copy with out-of-range values repaired. Every repair is logged.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut cfg = self.clone();

        if !(cfg.spacing.is_finite() && cfg.spacing > 0.0) {
            warn!("spacing {} must be positive, using {}", cfg.spacing, defaults.spacing);
            cfg.spacing = defaults.spacing;
        } else if cfg.spacing < MIN_SPACING {
            warn!("spacing {} below {}, raised to {}", cfg.spacing, MIN_SPACING, MIN_SPACING);
            cfg.spacing = MIN_SPACING;
        }
        for (name, value) in [
            ("blur_alpha", &mut cfg.blur_alpha),
            ("min_opacity", &mut cfg.min_opacity),
            ("max_opacity", &mut cfg.max_opacity),
        ] {
            let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
            if clamped != *value {
                warn!("{} {} outside [0, 1], clamped to {}", name, value, clamped);
                *value = clamped;
            }
        }
        if !(cfg.smoothing_factor > 0.0 && cfg.smoothing_factor <= 1.0) {
            let clamped = if cfg.smoothing_factor > 1.0 { 1.0 } else { defaults.smoothing_factor };
            warn!(
                "smoothing_factor {} outside (0, 1], using {}",
                cfg.smoothing_factor, clamped
            );
            cfg.smoothing_factor = clamped;
        }
        if cfg.fade_start > cfg.fade_end {
            warn!("fade_start {} > fade_end {}, swapping", cfg.fade_start, cfg.fade_end);
            std::mem::swap(&mut cfg.fade_start, &mut cfg.fade_end);
        }
        if cfg.min_opacity > cfg.max_opacity {
            warn!("min_opacity {} > max_opacity {}, swapping", cfg.min_opacity, cfg.max_opacity);
            std::mem::swap(&mut cfg.min_opacity, &mut cfg.max_opacity);
        }
        cfg
    }

    pub fn overlay_color(&self) -> [f32; 4] {
        let [r, g, b] = self.background;
        [r, g, b, self.blur_alpha]
    }

    pub fn background_color(&self) -> [f32; 4] {
        let [r, g, b] = self.background;
        [r, g, b, 1.0]
    }

    pub fn arrow_rgba(&self, opacity: f32) -> [f32; 4] {
        let [r, g, b] = self.arrow_color;
        [r, g, b, opacity]
    }
}

/// Reads and sanitizes an [`ArrowConfig`], falling back to defaults when the
/// file is missing or malformed.
pub fn read_arrow_config(path: &str) -> ArrowConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match ron::from_str::<ArrowConfig>(&contents) {
            Ok(config) => {
                info!("Loaded arrow config from {}", path);
                config.sanitized()
            }
            Err(e) => {
                error!("Failed to parse arrow config: {}", e);
                error!("Using default ArrowConfig");
                ArrowConfig::default()
            }
        },
        Err(e) => {
            error!("Failed to read {}: {}", path, e);
            error!("Using default ArrowConfig");
            ArrowConfig::default()
        }
    }
}

/// Key bindings. Hot-reloaded from `assets/controls.ron`.
#[derive(Deserialize, Serialize, Asset, TypePath, Clone, Debug)]
pub struct FieldControls {
    /// Tears the surface down when running, mounts it again when idle.
    pub key_toggle_surface: KeyCode,
    /// Re-reads `arrow_config.ron` and rebuilds the grid.
    pub reload_key: Option<KeyCode>,
}

impl Default for FieldControls {
    fn default() -> Self {
        Self {
            key_toggle_surface: KeyCode::Space,
            reload_key: Some(KeyCode::KeyR),
        }
    }
}

#[derive(Resource)]
pub struct FieldControlsHandle(pub Handle<FieldControls>);

/// Config reapply requests, consumed by the lifecycle systems.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ReloadArrowConfig;

pub struct FieldConfigPlugin;

impl Plugin for FieldConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(RonAssetPlugin::<FieldControls>::new(&["controls.ron"]))
            .add_message::<ReloadArrowConfig>()
            .add_systems(Startup, (load_arrow_config, setup_controls))
            .add_systems(Update, request_config_reload);
    }
}

fn load_arrow_config(mut commands: Commands, existing: Option<ResMut<ArrowConfig>>) {
    // An explicitly inserted config (tests, embedding apps) wins over the file,
    // but goes through the same repairs.
    if let Some(mut config) = existing {
        let repaired = config.sanitized();
        if repaired != *config {
            *config = repaired;
        }
        return;
    }
    commands.insert_resource(read_arrow_config(ARROW_CONFIG_PATH));
}

fn setup_controls(mut commands: Commands, asset_server: Res<AssetServer>) {
    let handle = asset_server.load("controls.ron");
    commands.insert_resource(FieldControlsHandle(handle));
}

/// Resolves the active bindings, using defaults until the asset has loaded.
pub fn active_controls(
    handle: Option<&FieldControlsHandle>,
    assets: &Assets<FieldControls>,
) -> FieldControls {
    handle
        .and_then(|h| assets.get(&h.0))
        .cloned()
        .unwrap_or_default()
}

fn request_config_reload(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    handle: Option<Res<FieldControlsHandle>>,
    controls: Res<Assets<FieldControls>>,
    mut reloads: MessageWriter<ReloadArrowConfig>,
) {
    let Some(keys) = keys else { return };
    let Some(reload_key) = active_controls(handle.as_deref(), &controls).reload_key else {
        return;
    };
    if keys.just_pressed(reload_key) {
        info!("Reloading {}", ARROW_CONFIG_PATH);
        reloads.write(ReloadArrowConfig);
    }
}
