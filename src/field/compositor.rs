use super::config::ArrowConfig;
use super::stepper::ArrowInstruction;
use super::surface::{Surface, TransformGuard};

/// Paints one frame: the translucent trail overlay, then every arrow.
pub fn composite<S: Surface + ?Sized>(
    surface: &mut S,
    instructions: &[ArrowInstruction],
    config: &ArrowConfig,
) {
    paint_trail_overlay(surface, config);
    for instruction in instructions {
        draw_arrow(surface, instruction, config);
    }
}

/// Blends the whole surface toward the background by `blur_alpha`.
///
/// Nothing is cleared, so earlier frames fade out over many ticks.
pub fn paint_trail_overlay<S: Surface + ?Sized>(surface: &mut S, config: &ArrowConfig) {
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    surface.fill_rect(0.0, 0.0, w, h, config.overlay_color());
}

/// Shaft along +x in the arrow's local space, with two barbs swept back from
/// the tip.
pub fn draw_arrow<S: Surface + ?Sized>(
    surface: &mut S,
    instruction: &ArrowInstruction,
    config: &ArrowConfig,
) {
    let mut s = TransformGuard::new(surface);
    s.translate(instruction.x, instruction.y);
    s.rotate(instruction.angle);

    let tip = config.arrow_length;
    let back = tip - config.arrowhead_size;
    let spread = config.arrowhead_size * 0.5;

    s.begin_path();
    s.move_to(0.0, 0.0);
    s.line_to(tip, 0.0);
    s.move_to(tip, 0.0);
    s.line_to(back, -spread);
    s.move_to(tip, 0.0);
    s.line_to(back, spread);
    s.stroke(config.stroke_width, config.arrow_rgba(instruction.opacity));
}
