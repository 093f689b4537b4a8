use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use bevy::window::{CursorMoved, PrimaryWindow, WindowResized, WindowResolution};
use quiver::field::config::{ArrowConfig, FieldConfigPlugin, ReloadArrowConfig};
use quiver::field::grid::ArrowGrid;
use quiver::field::lifecycle::{FieldSurface, SurfacePlugin, SurfaceState, Viewport};
use quiver::field::math::{shortest_delta, step_angle, target_angle};
use quiver::field::pointer::PointerTarget;
use quiver::field::surface::Surface;

/// Headless app with the field plugins and a fake primary window.
fn field_app(width: u32, height: u32) -> (App, Entity) {
    field_app_with(width, height, ArrowConfig::default())
}

fn field_app_with(width: u32, height: u32, config: ArrowConfig) -> (App, Entity) {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(StatesPlugin);
    app.add_plugins(AssetPlugin::default());
    app.init_asset::<Image>();
    app.init_resource::<ButtonInput<KeyCode>>();
    app.add_message::<CursorMoved>();
    app.add_message::<WindowResized>();

    // Explicit config so tests don't depend on the shipped file.
    app.insert_resource(config);
    app.add_plugins((FieldConfigPlugin, SurfacePlugin));

    let window = app
        .world_mut()
        .spawn((
            Window {
                resolution: WindowResolution::new(width, height),
                ..default()
            },
            PrimaryWindow,
        ))
        .id();

    (app, window)
}

fn move_pointer(app: &mut App, window: Entity, x: f32, y: f32) {
    app.world_mut().write_message(CursorMoved {
        window,
        position: Vec2::new(x, y),
        delta: None,
    });
}

fn press(app: &mut App, key: KeyCode) {
    app.world_mut().resource_mut::<ButtonInput<KeyCode>>().press(key);
    app.update();
    let mut keys = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
    keys.release(key);
    keys.clear();
    // State change lands on the following frame.
    app.update();
}

fn state(app: &App) -> SurfaceState {
    *app.world().resource::<State<SurfaceState>>().get()
}

fn cell_angle(app: &App, x: f32, y: f32) -> f32 {
    app.world()
        .resource::<ArrowGrid>()
        .cells
        .iter()
        .find(|c| c.x == x && c.y == y)
        .map(|c| c.current_angle)
        .expect("cell should exist")
}

#[test]
fn test_mount_builds_grid_for_window() {
    let (mut app, _) = field_app(500, 500);
    assert!(app.world().get_resource::<FieldSurface>().is_none());

    app.update();

    assert_eq!(state(&app), SurfaceState::Running);
    assert_eq!(*app.world().resource::<Viewport>(), Viewport::new(500.0, 500.0));

    let grid = app.world().resource::<ArrowGrid>();
    assert_eq!((grid.columns, grid.rows), (10, 10));
    assert_eq!((grid.cells[0].x, grid.cells[0].y), (25.0, 25.0));

    let field = app.world().resource::<FieldSurface>();
    assert_eq!((field.surface.width(), field.surface.height()), (500, 500));
    assert!(app.world().get_entity(field.sprite).is_ok());
    assert!(app.world().resource::<Assets<Image>>().get(&field.image).is_some());
}

#[test]
fn test_pointer_moves_are_tracked_and_arrows_follow() {
    let (mut app, window) = field_app(500, 500);
    app.update();

    move_pointer(&mut app, window, 300.0, 300.0);
    app.update();
    assert_eq!(*app.world().resource::<PointerTarget>(), PointerTarget::new(300.0, 300.0));

    // Cell up and to the right of the pointer keeps closing on it.
    let target = target_angle(325.0, 225.0, 300.0, 300.0);
    let mut gap = shortest_delta(cell_angle(&app, 325.0, 225.0), target).abs();
    for _ in 0..10 {
        app.update();
        let next = shortest_delta(cell_angle(&app, 325.0, 225.0), target).abs();
        assert!(next < gap, "gap grew from {gap} to {next}");
        gap = next;
    }
}

#[test]
fn test_only_latest_pointer_position_is_used() {
    let (mut app, window) = field_app(500, 500);
    app.update();

    move_pointer(&mut app, window, 10.0, 10.0);
    move_pointer(&mut app, window, 20.0, 40.0);
    move_pointer(&mut app, window, 450.0, 60.0);
    app.update();

    assert_eq!(*app.world().resource::<PointerTarget>(), PointerTarget::new(450.0, 60.0));
}

#[test]
fn test_resize_rebuilds_grid_from_zero() {
    let (mut app, window) = field_app(500, 500);
    app.update();
    move_pointer(&mut app, window, 480.0, 20.0);
    for _ in 0..5 {
        app.update();
    }

    app.world_mut().write_message(WindowResized {
        window,
        width: 300.0,
        height: 200.0,
    });
    app.update();

    assert_eq!(*app.world().resource::<Viewport>(), Viewport::new(300.0, 200.0));
    let grid = app.world().resource::<ArrowGrid>();
    assert_eq!((grid.columns, grid.rows), (6, 4));

    // The rebuild happens before this frame's step, so every angle is one
    // step away from zero.
    let k = app.world().resource::<ArrowConfig>().smoothing_factor;
    for cell in &grid.cells {
        let expected = step_angle(0.0, target_angle(cell.x, cell.y, 480.0, 20.0), k);
        assert!((cell.current_angle - expected).abs() < 1e-6);
    }

    let field = app.world().resource::<FieldSurface>();
    assert_eq!((field.surface.width(), field.surface.height()), (300, 200));
    let image = app.world().resource::<Assets<Image>>().get(&field.image).unwrap();
    assert_eq!((image.width(), image.height()), (300, 200));
}

#[test]
fn test_frames_reach_the_image() {
    let (mut app, window) = field_app(200, 200);
    app.update();
    move_pointer(&mut app, window, 100.0, 100.0);
    for _ in 0..3 {
        app.update();
    }

    let field = app.world().resource::<FieldSurface>();
    let image = app.world().resource::<Assets<Image>>().get(&field.image).unwrap();
    let data = image.data.as_ref().unwrap();
    assert_eq!(data.len(), 200 * 200 * 4);
    assert!(data.chunks_exact(4).any(|p| p[0] > 200), "no arrow pixels uploaded");
    assert!(data.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn test_teardown_and_remount() {
    let (mut app, window) = field_app(500, 500);
    app.update();
    let sprite = app.world().resource::<FieldSurface>().sprite;

    press(&mut app, KeyCode::Space);
    assert_eq!(state(&app), SurfaceState::Idle);
    assert!(app.world().get_resource::<FieldSurface>().is_none());
    assert!(app.world().get_resource::<ArrowGrid>().is_none());
    assert!(app.world().get_entity(sprite).is_err());
    assert_eq!(app.world().resource::<Assets<Image>>().len(), 0);

    // Listeners are off while idle.
    move_pointer(&mut app, window, 123.0, 45.0);
    for _ in 0..3 {
        app.update();
    }
    assert_eq!(*app.world().resource::<PointerTarget>(), PointerTarget::default());
    assert!(app.world().get_resource::<FieldSurface>().is_none());

    press(&mut app, KeyCode::Space);
    assert_eq!(state(&app), SurfaceState::Running);
    assert_eq!(app.world().resource::<ArrowGrid>().len(), 100);
    assert!(app.world().get_resource::<FieldSurface>().is_some());
}

#[test]
fn test_frame_skipped_when_surface_vanishes() {
    let (mut app, _) = field_app(300, 300);
    app.update();

    app.world_mut().remove_resource::<FieldSurface>();
    app.world_mut().remove_resource::<ArrowGrid>();
    for _ in 0..3 {
        app.update();
    }
    assert_eq!(state(&app), SurfaceState::Running);
}

#[test]
fn test_config_reload_rebuilds_grid() {
    let config = ArrowConfig { spacing: 100.0, ..default() };
    let (mut app, _) = field_app_with(500, 500, config);
    app.update();
    assert_eq!(app.world().resource::<ArrowGrid>().len(), 25);

    // The shipped file uses spacing 50.
    app.world_mut().write_message(ReloadArrowConfig);
    app.update();

    assert_eq!(app.world().resource::<ArrowConfig>().spacing, 50.0);
    assert_eq!(app.world().resource::<ArrowGrid>().len(), 100);
}

#[test]
fn test_inserted_config_is_repaired_before_first_frame() {
    let config = ArrowConfig {
        min_opacity: 0.9,
        max_opacity: 0.2,
        spacing: 1e-6,
        ..default()
    };
    let (mut app, window) = field_app_with(40, 20, config);
    move_pointer(&mut app, window, 20.0, 10.0);
    app.update();
    app.update();

    let config = app.world().resource::<ArrowConfig>();
    assert_eq!((config.min_opacity, config.max_opacity), (0.2, 0.9));
    assert_eq!(config.spacing, 1.0);
    assert_eq!(state(&app), SurfaceState::Running);
    assert_eq!(app.world().resource::<ArrowGrid>().len(), 40 * 20);
}
