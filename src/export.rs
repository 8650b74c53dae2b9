//! Flattening a project into a single shareable PNG.

use crate::layer::{self, Layer};
use crate::project::Project;
use crate::snapshot::{Snapshot, SnapshotError};
use crate::surface::SurfaceRegistry;
use image::{Rgba, RgbaImage};

/// Source-over one layer image onto the output, with the layer's opacity
/// multiplied into the source alpha.
fn composite_layer(out: &mut RgbaImage, src: &RgbaImage, layer_alpha: f32) {
    for (dst, src) in out.pixels_mut().zip(src.pixels()) {
        let sa = (src[3] as f32 / 255.0) * layer_alpha;
        if sa <= 0.0 {
            continue;
        }
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            continue;
        }
        for c in 0..3 {
            let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (out_a * 255.0).round() as u8;
    }
}

fn layer_image(layer: &Layer, registry: &SurfaceRegistry) -> Option<RgbaImage> {
    if let Some(surface) = registry.get(layer.id) {
        return Some(surface.image().clone());
    }
    // Layers without a live surface (e.g. an inactive project) still export
    // from their stored raster.
    match &layer.snapshot {
        Some(snap) if !snap.is_empty() => match snap.decode() {
            Ok(img) => Some(img),
            Err(err) => {
                log::warn!("export: snapshot decode failed for layer {}: {err}", layer.id);
                None
            }
        },
        _ => None,
    }
}

/// Flatten a project's visible layers, base first then ascending z index,
/// over a white background. The output is scaled by the largest backing
/// pixel ratio among the project's live surfaces so exports keep the
/// on-screen sharpness.
pub fn flatten(project: &Project, registry: &SurfaceRegistry) -> RgbaImage {
    let scale = project
        .layers
        .iter()
        .filter_map(|l| registry.get(l.id))
        .map(|s| s.pixel_ratio())
        .fold(1.0_f32, f32::max);
    let width = ((project.width as f32) * scale).round().max(1.0) as u32;
    let height = ((project.height as f32) * scale).round().max(1.0) as u32;
    let mut out = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    for layer in layer::sorted_for_render(&project.layers) {
        if layer.hidden || layer.opacity == 0 {
            continue;
        }
        let Some(img) = layer_image(layer, registry) else {
            continue;
        };
        let img = if img.dimensions() == (width, height) {
            img
        } else {
            image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle)
        };
        composite_layer(&mut out, &img, layer.alpha());
    }
    out
}

/// Flatten and PNG-encode a project.
pub fn export_png(project: &Project, registry: &SurfaceRegistry) -> Result<Vec<u8>, SnapshotError> {
    let flat = flatten(project, registry);
    Ok(Snapshot::encode(&flat)?.into_bytes())
}

/// Suggested download filename for an exported project.
pub fn export_filename(project_name: &str) -> String {
    let stem = project_name.trim().replace(' ', "_");
    if stem.is_empty() {
        "untitled.png".to_string()
    } else {
        format!("{stem}.png")
    }
}
