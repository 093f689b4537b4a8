use super::config::ArrowConfig;
use super::grid::GridCell;
use super::math::{fade_opacity, step_angle, target_angle};
use super::pointer::PointerTarget;

/// One arrow to draw this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrowInstruction {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub opacity: f32,
}

/// Advances every cell one tick toward `pointer` and appends one instruction
/// per cell to `out` (cleared first). Returns the number of instructions.
///
/// This is the only code that writes `GridCell::current_angle`.
pub fn step_frame(
    cells: &mut [GridCell],
    pointer: PointerTarget,
    config: &ArrowConfig,
    out: &mut Vec<ArrowInstruction>,
) -> usize {
    out.clear();
    out.reserve(cells.len());
    for cell in cells.iter_mut() {
        let target = target_angle(cell.x, cell.y, pointer.x, pointer.y);
        cell.current_angle = step_angle(cell.current_angle, target, config.smoothing_factor);

        let distance = (pointer.x - cell.x).hypot(pointer.y - cell.y);
        let opacity = fade_opacity(
            distance,
            config.fade_start,
            config.fade_end,
            config.min_opacity,
            config.max_opacity,
        );

        out.push(ArrowInstruction {
            x: cell.x,
            y: cell.y,
            angle: cell.current_angle,
            opacity,
        });
    }
    out.len()
}
