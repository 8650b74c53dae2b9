//! Pixel primitives for painting into layer surfaces.
//!
//! All public entry points take logical coordinates; scaling to the backing
//! store happens here. Blending is plain source-over with straight alpha.

use crate::drawable::{Drawable, DrawableKind, Style};
use crate::surface::Surface;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use egui::{Color32, Pos2, Rect};
use image::RgbaImage;

/// Line height used when laying out multi-line text, as a factor of the
/// font size.
pub const TEXT_LINE_HEIGHT: f32 = 1.2;

fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Color32, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let [sr, sg, sb, sa] = color.to_srgba_unmultiplied();
    let alpha = (sa as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x as u32, y as u32);
    let da = dst[3] as f32 / 255.0;
    let out_a = alpha + da * (1.0 - alpha);
    if out_a <= 0.0 {
        return;
    }
    let blend = |s: u8, d: u8| -> u8 {
        let c = (s as f32 * alpha + d as f32 * da * (1.0 - alpha)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    *dst = image::Rgba([
        blend(sr, dst[0]),
        blend(sg, dst[1]),
        blend(sb, dst[2]),
        (out_a * 255.0).round() as u8,
    ]);
}

fn stamp_disc(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Color32) {
    let r = radius.max(0.5);
    let x0 = (cx - r - 1.0).floor() as i32;
    let x1 = (cx + r + 1.0).ceil() as i32;
    let y0 = (cy - r - 1.0).floor() as i32;
    let y1 = (cy + r + 1.0).ceil() as i32;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            // one-pixel anti-aliased rim
            let coverage = (r - dist + 0.5).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend_pixel(img, x, y, color, coverage);
            }
        }
    }
}

/// Fill an axis-aligned rectangle.
pub fn fill_rect(surface: &mut Surface, rect: Rect, color: Color32) {
    let ratio = surface.pixel_ratio();
    let rect = Rect::from_two_pos(rect.min, rect.max);
    let x0 = (rect.min.x * ratio).floor() as i32;
    let y0 = (rect.min.y * ratio).floor() as i32;
    let x1 = (rect.max.x * ratio).ceil() as i32;
    let y1 = (rect.max.y * ratio).ceil() as i32;
    let img = surface.image_mut();
    for y in y0..y1 {
        for x in x0..x1 {
            blend_pixel(img, x, y, color, 1.0);
        }
    }
}

/// Stroke the outline of an axis-aligned rectangle, the stroke centered on
/// its edges.
pub fn stroke_rect(surface: &mut Surface, rect: Rect, width: f32, color: Color32) {
    let rect = Rect::from_two_pos(rect.min, rect.max);
    let hw = (width / 2.0).max(0.5);
    let (min, max) = (rect.min, rect.max);
    // top, bottom, left, right strips
    fill_rect(
        surface,
        Rect::from_min_max(
            Pos2::new(min.x - hw, min.y - hw),
            Pos2::new(max.x + hw, min.y + hw),
        ),
        color,
    );
    fill_rect(
        surface,
        Rect::from_min_max(
            Pos2::new(min.x - hw, max.y - hw),
            Pos2::new(max.x + hw, max.y + hw),
        ),
        color,
    );
    fill_rect(
        surface,
        Rect::from_min_max(
            Pos2::new(min.x - hw, min.y + hw),
            Pos2::new(min.x + hw, max.y - hw),
        ),
        color,
    );
    fill_rect(
        surface,
        Rect::from_min_max(
            Pos2::new(max.x - hw, min.y + hw),
            Pos2::new(max.x + hw, max.y - hw),
        ),
        color,
    );
}

/// Fill a circle with an anti-aliased rim.
pub fn fill_circle(surface: &mut Surface, center: Pos2, radius: f32, color: Color32) {
    let ratio = surface.pixel_ratio();
    let img = surface.image_mut();
    stamp_disc(
        img,
        center.x * ratio,
        center.y * ratio,
        radius.abs() * ratio,
        color,
    );
}

/// Stroke a circle outline by stamping discs along the circumference.
pub fn stroke_circle(surface: &mut Surface, center: Pos2, radius: f32, width: f32, color: Color32) {
    let r = radius.abs();
    if r <= 0.0 {
        return;
    }
    let ratio = surface.pixel_ratio();
    let r_px = r * ratio;
    let half_w = (width * ratio / 2.0).max(0.5);
    // step small enough that consecutive stamps overlap
    let circumference = 2.0 * std::f32::consts::PI * r_px;
    let steps = (circumference / (half_w.min(1.0))).ceil().max(8.0) as usize;
    let img = surface.image_mut();
    for i in 0..steps {
        let theta = (i as f32 / steps as f32) * 2.0 * std::f32::consts::PI;
        let cx = center.x * ratio + r_px * theta.cos();
        let cy = center.y * ratio + r_px * theta.sin();
        stamp_disc(img, cx, cy, half_w, color);
    }
}

/// Stroke a straight line segment with round caps.
pub fn stroke_line(surface: &mut Surface, from: Pos2, to: Pos2, width: f32, color: Color32) {
    let ratio = surface.pixel_ratio();
    let a = egui::pos2(from.x * ratio, from.y * ratio);
    let b = egui::pos2(to.x * ratio, to.y * ratio);
    let half_w = (width * ratio / 2.0).max(0.5);
    let len = (b - a).length();
    let steps = (len / (half_w.min(1.0))).ceil().max(1.0) as usize;
    let img = surface.image_mut();
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let p = a + (b - a) * t;
        stamp_disc(img, p.x, p.y, half_w, color);
    }
}

/// Stroke a polyline as consecutive round-capped segments.
pub fn stroke_polyline(surface: &mut Surface, points: &[Pos2], width: f32, color: Color32) {
    if points.len() == 1 {
        let ratio = surface.pixel_ratio();
        let half_w = (width * ratio / 2.0).max(0.5);
        let (px, py) = (points[0].x * ratio, points[0].y * ratio);
        stamp_disc(surface.image_mut(), px, py, half_w, color);
        return;
    }
    for pair in points.windows(2) {
        stroke_line(surface, pair[0], pair[1], width, color);
    }
}

/// Draw a decoded snapshot scaled to the surface's logical size (times its
/// backing ratio). The caller clears first; this replaces pixels outright.
pub fn blit_scaled(surface: &mut Surface, src: &RgbaImage) {
    let (dw, dh) = {
        let img = surface.image();
        (img.width(), img.height())
    };
    if src.width() == 0 || src.height() == 0 {
        return;
    }
    let scaled = if src.dimensions() == (dw, dh) {
        src.clone()
    } else {
        image::imageops::resize(src, dw, dh, image::imageops::FilterType::Triangle)
    };
    surface.restore_pixels(scaled);
}

/// Measure the rendered width of a single line at the given font size, in
/// logical units.
pub fn measure_line(font: &FontArc, text: &str, font_size: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(font_size));
    text.chars()
        .map(|ch| scaled.h_advance(font.glyph_id(ch)))
        .sum()
}

/// Rasterize word-wrapped text lines anchored at `pos` (top-left). Without
/// a font the call is absorbed as a no-op; input before a font is available
/// is simply dropped.
pub fn draw_text(
    surface: &mut Surface,
    font: Option<&FontArc>,
    pos: Pos2,
    lines: &[String],
    font_size: f32,
    color: Color32,
) {
    let Some(font) = font else {
        log::debug!("draw_text: no font available, skipping rasterization");
        return;
    };
    let ratio = surface.pixel_ratio();
    let scale = PxScale::from(font_size * ratio);
    let scaled = font.as_scaled(scale);
    let ascent = scaled.ascent();
    let line_height = font_size * TEXT_LINE_HEIGHT * ratio;
    let img = surface.image_mut();

    for (i, line) in lines.iter().enumerate() {
        let baseline = pos.y * ratio + i as f32 * line_height + ascent;
        let mut x = pos.x * ratio;
        for ch in line.chars() {
            let gid = font.glyph_id(ch);
            let glyph = gid.with_scale_and_position(scale, point(x, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, cov| {
                    blend_pixel(
                        img,
                        bounds.min.x as i32 + gx as i32,
                        bounds.min.y as i32 + gy as i32,
                        color,
                        cov,
                    );
                });
            }
            x += scaled.h_advance(gid);
        }
    }
}

/// Paint one committed drawable onto a surface in its final form.
pub fn draw_drawable(surface: &mut Surface, drawable: &Drawable, font: Option<&FontArc>) {
    let Style {
        fill,
        stroke,
        stroke_width,
        font_size,
    } = drawable.style;
    match &drawable.kind {
        DrawableKind::Rect { rect } => {
            if fill.a() > 0 {
                fill_rect(surface, *rect, fill);
            }
            if stroke_width > 0.0 {
                stroke_rect(surface, *rect, stroke_width, stroke);
            }
        }
        DrawableKind::Circle { center, radius } => {
            if fill.a() > 0 {
                fill_circle(surface, *center, *radius, fill);
            }
            if stroke_width > 0.0 {
                stroke_circle(surface, *center, *radius, stroke_width, stroke);
            }
        }
        DrawableKind::Line { from, to } => {
            stroke_line(surface, *from, *to, stroke_width.max(1.0), stroke);
        }
        DrawableKind::Text { pos, lines, .. } => {
            let color = if fill.a() > 0 { fill } else { stroke };
            draw_text(surface, font, *pos, lines, font_size, color);
        }
        DrawableKind::Brush { points } => {
            stroke_polyline(surface, points, stroke_width.max(1.0), stroke);
        }
    }
}
