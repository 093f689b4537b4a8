//! Mount/teardown of the arrow surface and the per-frame systems.
//!
//! `SurfaceState::Running` is the "repaint cycle scheduled" state: every
//! frame system is gated on it, so leaving it cancels the cycle and stops all
//! pointer/resize handling. Systems still check that their resources exist
//! and skip the frame silently if the surface has already been torn down.

use bevy::asset::RenderAssetUsages;
use bevy::diagnostic::FrameCount;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::{PrimaryWindow, WindowResized};
use quiver_macros::profile;

use crate::profile_log;

use super::compositor::composite;
use super::config::{
    active_controls, read_arrow_config, ArrowConfig, FieldControls, FieldControlsHandle,
    ReloadArrowConfig, ARROW_CONFIG_PATH,
};
use super::grid::ArrowGrid;
use super::pointer::{track_pointer, PointerTarget};
use super::stepper::{step_frame, ArrowInstruction};
use super::surface::{PixelSurface, Surface};

#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SurfaceState {
    /// No repaint cycle. Initial state and the state after teardown.
    #[default]
    Idle,
    /// Surface mounted, one frame per `Update`.
    Running,
}

/// Frame pipeline order. Resize handling sits in `Input`, so a rebuilt grid
/// is always in place before the stepper runs.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum FieldSet {
    Input,
    Step,
    Composite,
    Present,
}

/// Logical size of the drawing area, in the same units as cursor positions.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn pixel_size(&self) -> (u32, u32) {
        let px = |v: f32| if v.is_finite() { v.max(0.0).round() as u32 } else { 0 };
        (px(self.width), px(self.height))
    }
}

/// Instruction buffer shared between the stepper and the compositor.
#[derive(Resource, Default, Debug)]
pub struct FrameInstructions(pub Vec<ArrowInstruction>);

/// A mounted surface: the software canvas, the image it is uploaded to and
/// the sprite showing that image. Present only while `Running`.
#[derive(Resource)]
pub struct FieldSurface {
    pub surface: PixelSurface,
    pub image: Handle<Image>,
    pub sprite: Entity,
}

pub struct SurfacePlugin;

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<SurfaceState>()
            .init_resource::<PointerTarget>()
            .init_resource::<Viewport>()
            .configure_sets(
                Update,
                (FieldSet::Input, FieldSet::Step, FieldSet::Composite, FieldSet::Present)
                    .chain()
                    .run_if(in_state(SurfaceState::Running)),
            )
            .add_systems(Startup, request_mount)
            .add_systems(OnEnter(SurfaceState::Running), mount_surface)
            .add_systems(OnExit(SurfaceState::Running), teardown_surface)
            .add_systems(
                Update,
                (
                    (toggle_surface, apply_config_reload).before(FieldSet::Input),
                    (track_pointer, handle_resize).chain().in_set(FieldSet::Input),
                    step_arrows.in_set(FieldSet::Step),
                    composite_frame.in_set(FieldSet::Composite),
                    present_frame.in_set(FieldSet::Present),
                ),
            );
    }
}

fn request_mount(mut next: ResMut<NextState<SurfaceState>>) {
    next.set(SurfaceState::Running);
}

fn surface_image(width: u32, height: u32) -> Image {
    Image::new_fill(
        Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0, 0, 0, 255],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    )
}

/// Idle -> Running. Sizes everything from the primary window, or from an
/// already-inserted [`Viewport`] when there is no window.
fn mount_surface(
    mut commands: Commands,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut viewport: ResMut<Viewport>,
    config: Res<ArrowConfig>,
    mut images: ResMut<Assets<Image>>,
) {
    if let Ok(window) = windows.single() {
        *viewport = Viewport::new(window.width(), window.height());
    }
    let (w, h) = viewport.pixel_size();

    let surface = PixelSurface::new(w, h, config.background_color());
    let image = images.add(surface_image(w, h));
    let sprite = commands
        .spawn(Sprite {
            image: image.clone(),
            custom_size: Some(Vec2::new(viewport.width, viewport.height)),
            ..default()
        })
        .id();

    let grid = ArrowGrid::new(viewport.width, viewport.height, config.spacing);
    info!(
        "Surface mounted: {}x{} px, {} arrows ({} cols x {} rows)",
        w,
        h,
        grid.len(),
        grid.columns,
        grid.rows
    );

    commands.insert_resource(FrameInstructions(Vec::with_capacity(grid.len())));
    commands.insert_resource(grid);
    commands.insert_resource(FieldSurface { surface, image, sprite });
}

/// Running -> Idle. Drops the surface, its image and sprite, and the grid.
fn teardown_surface(
    mut commands: Commands,
    field: Option<Res<FieldSurface>>,
    mut images: ResMut<Assets<Image>>,
) {
    if let Some(field) = field {
        if let Ok(mut sprite) = commands.get_entity(field.sprite) {
            sprite.despawn();
        }
        images.remove(&field.image);
    }
    commands.remove_resource::<FieldSurface>();
    commands.remove_resource::<ArrowGrid>();
    commands.remove_resource::<FrameInstructions>();
    info!("Surface torn down");
}

fn toggle_surface(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    handle: Option<Res<FieldControlsHandle>>,
    controls: Res<Assets<FieldControls>>,
    state: Res<State<SurfaceState>>,
    mut next: ResMut<NextState<SurfaceState>>,
) {
    let Some(keys) = keys else { return };
    let key = active_controls(handle.as_deref(), &controls).key_toggle_surface;
    if !keys.just_pressed(key) {
        return;
    }
    match state.get() {
        SurfaceState::Idle => next.set(SurfaceState::Running),
        SurfaceState::Running => next.set(SurfaceState::Idle),
    }
}

/// Full reset on resize: new grid (all angles back to zero), new canvas
/// contents, resized image and sprite.
fn handle_resize(
    mut resized: MessageReader<WindowResized>,
    mut viewport: ResMut<Viewport>,
    config: Res<ArrowConfig>,
    grid: Option<ResMut<ArrowGrid>>,
    field: Option<ResMut<FieldSurface>>,
    mut images: ResMut<Assets<Image>>,
    mut sprites: Query<&mut Sprite>,
) {
    let Some(last) = resized.read().last() else { return };
    let next = Viewport::new(last.width, last.height);
    if next == *viewport {
        return;
    }
    *viewport = next;
    let (w, h) = viewport.pixel_size();

    if let Some(mut grid) = grid {
        grid.reset(viewport.width, viewport.height, config.spacing);
        info!("Viewport resized to {}x{}, {} arrows", w, h, grid.len());
    }
    let Some(mut field) = field else { return };
    field.surface.resize(w, h, config.background_color());
    if let Some(image) = images.get_mut(&field.image) {
        image.resize(Extent3d {
            width: w.max(1),
            height: h.max(1),
            depth_or_array_layers: 1,
        });
    }
    if let Ok(mut sprite) = sprites.get_mut(field.sprite) {
        sprite.custom_size = Some(Vec2::new(viewport.width, viewport.height));
    }
}

/// Re-reads the config file and resets the grid and canvas to match it.
/// Runs in both states so a reload while idle applies to the next mount.
fn apply_config_reload(
    mut reloads: MessageReader<ReloadArrowConfig>,
    mut config: ResMut<ArrowConfig>,
    viewport: Res<Viewport>,
    grid: Option<ResMut<ArrowGrid>>,
    field: Option<ResMut<FieldSurface>>,
) {
    if reloads.read().last().is_none() {
        return;
    }
    *config = read_arrow_config(ARROW_CONFIG_PATH);
    if let Some(mut grid) = grid {
        grid.reset(viewport.width, viewport.height, config.spacing);
    }
    if let Some(mut field) = field {
        field.surface.clear(config.background_color());
    }
}

/// Advances every arrow toward the pointer.
///
/// Only reader of [`PointerTarget`]; the value is copied once so the whole
/// frame sees one consistent target.
#[profile(2)]
#[cfg_attr(not(feature = "perf_stats"), allow(unused_variables))]
fn step_arrows(
    pointer: Res<PointerTarget>,
    config: Res<ArrowConfig>,
    grid: Option<ResMut<ArrowGrid>>,
    instructions: Option<ResMut<FrameInstructions>>,
    frame: Res<FrameCount>,
) {
    let (Some(mut grid), Some(mut instructions)) = (grid, instructions) else { return };
    let target = *pointer;
    let count = step_frame(&mut grid.cells, target, &config, &mut instructions.0);
    profile_log!(frame, "[STEP] {} arrows toward ({:.1}, {:.1})", count, target.x, target.y);
}

#[profile(4)]
#[cfg_attr(not(feature = "perf_stats"), allow(unused_variables))]
fn composite_frame(
    config: Res<ArrowConfig>,
    field: Option<ResMut<FieldSurface>>,
    instructions: Option<Res<FrameInstructions>>,
    frame: Res<FrameCount>,
) {
    let (Some(mut field), Some(instructions)) = (field, instructions) else { return };
    composite(&mut field.surface, &instructions.0, &config);
    profile_log!(frame, "[COMPOSITE] {}x{}", field.surface.width(), field.surface.height());
}

/// Copies the canvas into its image so the sprite shows this frame.
fn present_frame(field: Option<Res<FieldSurface>>, mut images: ResMut<Assets<Image>>) {
    let Some(field) = field else { return };
    let Some(image) = images.get_mut(&field.image) else { return };
    if let Some(data) = image.data.as_mut() {
        field.surface.write_rgba8(data);
    }
}
