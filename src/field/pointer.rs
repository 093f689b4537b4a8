use bevy::prelude::*;
use bevy::window::CursorMoved;

/// Latest pointer position in surface coordinates (top-left origin, y down).
///
/// Single writer: [`track_pointer`]. Single reader: the frame stepper, once
/// per frame. Pointer events never trigger a redraw on their own.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq)]
pub struct PointerTarget {
    pub x: f32,
    pub y: f32,
}

impl PointerTarget {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Copies the most recent cursor position into [`PointerTarget`].
///
/// Only the last message of the frame matters; earlier ones would be
/// overwritten before the stepper reads the target anyway.
pub fn track_pointer(mut cursor: MessageReader<CursorMoved>, mut target: ResMut<PointerTarget>) {
    if let Some(last) = cursor.read().last() {
        target.x = last.position.x;
        target.y = last.position.y;
    }
}
