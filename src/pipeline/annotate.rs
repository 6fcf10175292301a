// src/pipeline/annotate.rs
//
// Visualization overlay: the retained circle candidate drawn onto the
// display frame as a green outline with a red center dot.

use crate::types::CircleCandidate;
use image::{Rgb, RgbImage};

const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const OUTLINE_THICKNESS: i32 = 3;
const CENTER_RADIUS: i32 = 3;

pub fn draw_candidate(frame: &mut RgbImage, circle: &CircleCandidate) {
    let cx = circle.cx.round() as i32;
    let cy = circle.cy.round() as i32;
    let r = circle.radius.round() as i32;

    for t in 0..OUTLINE_THICKNESS {
        draw_circle_outline(frame, cx, cy, r - 1 + t, OUTLINE_COLOR);
    }
    fill_disc(frame, cx, cy, CENTER_RADIUS, CENTER_COLOR);
}

/// Single-pixel circle outline via dense angle stepping.
fn draw_circle_outline(frame: &mut RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>) {
    if r <= 0 {
        return;
    }
    let steps = (8 * r).max(16);
    for i in 0..steps {
        let angle = 2.0 * std::f32::consts::PI * i as f32 / steps as f32;
        let x = cx + (r as f32 * angle.cos()).round() as i32;
        let y = cy + (r as f32 * angle.sin()).round() as i32;
        put_pixel_checked(frame, x, y, color);
    }
}

fn fill_disc(frame: &mut RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>) {
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                put_pixel_checked(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

#[inline]
fn put_pixel_checked(frame: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
        frame.put_pixel(x as u32, y as u32, color);
    }
}
