//! Rendering of detection results onto scene images.

use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{imageops, DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut, text_size};
use notescan_core::{GrayImage, Point, Quad};
use notescan_detect::{total_value, FoundInstance};

use crate::error::{CliError, CliResult};

/// Colours used for annotations
pub struct Palette;

impl Palette {
    pub const OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);
    pub const LABEL: Rgb<u8> = Rgb([0, 0, 255]);
    pub const MATCH: Rgb<u8> = Rgb([255, 0, 0]);
}

const OUTLINE_HALF_WIDTH: i32 = 2;
/// Label text spans this fraction of the outline's larger side
const LABEL_RATIO: f32 = 0.25;
const TOTAL_SCALE: f32 = 32.0;

pub fn load_font(path: &Path) -> CliResult<FontVec> {
    let data = fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(data).map_err(|_| CliError::Font {
        path: path.to_path_buf(),
    })
}

pub fn to_rgb(img: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(img.clone()).into_rgb8()
}

/// Thick closed outline, shifted right by `offset_x`
pub fn draw_quad(canvas: &mut RgbImage, quad: &Quad, offset_x: f32, colour: Rgb<u8>) {
    let c = quad.corners();
    for i in 0..4 {
        let (a, b) = (c[i], c[(i + 1) % 4]);
        for dy in -OUTLINE_HALF_WIDTH..=OUTLINE_HALF_WIDTH {
            for dx in -OUTLINE_HALF_WIDTH..=OUTLINE_HALF_WIDTH {
                let (dx, dy) = (dx as f32, dy as f32);
                draw_line_segment_mut(
                    canvas,
                    (a.x + offset_x + dx, a.y + dy),
                    (b.x + offset_x + dx, b.y + dy),
                    colour,
                );
            }
        }
    }
}

fn draw_centered_label(canvas: &mut RgbImage, font: &FontVec, quad: &Quad, text: &str) {
    let (min, max) = quad.bounding_box();
    let max_dimen = (max.x - min.x).max(max.y - min.y);

    let unit_scale = PxScale::from(TOTAL_SCALE);
    let (unit_w, _) = text_size(unit_scale, font, text);
    if unit_w == 0 {
        return;
    }
    let scale = PxScale::from((TOTAL_SCALE * max_dimen * LABEL_RATIO / unit_w as f32).max(8.0));
    let (w, h) = text_size(scale, font, text);

    let center = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
    let x = (center.x - w as f32 / 2.0) as i32;
    let y = (center.y - h as f32 / 2.0) as i32;
    draw_text_mut(canvas, Palette::LABEL, x, y, scale, font, text);
}

/// Scene with every detected note outlined; with a font, each note is
/// labelled with its value and the total is printed top-left.
pub fn annotate_scene(scene: &GrayImage, instances: &[FoundInstance], font: Option<&FontVec>) -> RgbImage {
    let mut canvas = to_rgb(scene);
    for instance in instances {
        draw_quad(&mut canvas, &instance.corners, 0.0, Palette::OUTLINE);
    }

    if let Some(font) = font {
        for instance in instances {
            draw_centered_label(&mut canvas, font, &instance.corners, &instance.value.to_string());
        }
        let total = total_value(instances).to_string();
        draw_text_mut(&mut canvas, Palette::LABEL, 5, 5, PxScale::from(TOTAL_SCALE), font, &total);
    }

    canvas
}

/// Template and scene side by side, inlier correspondences joined by lines
/// and the detected outline drawn on the scene half.
pub fn draw_matches(template: &GrayImage, scene: &GrayImage, instance: &FoundInstance) -> RgbImage {
    let tw = template.width();
    let mut canvas = RgbImage::new(tw + scene.width(), template.height().max(scene.height()));
    imageops::overlay(&mut canvas, &to_rgb(template), 0, 0);
    imageops::overlay(&mut canvas, &to_rgb(scene), i64::from(tw), 0);

    let offset = tw as f32;
    for pair in &instance.inliers {
        draw_line_segment_mut(
            &mut canvas,
            (pair.template.x, pair.template.y),
            (pair.scene.x + offset, pair.scene.y),
            Palette::MATCH,
        );
    }
    draw_quad(&mut canvas, &instance.corners, offset, Palette::OUTLINE);
    canvas
}
