//! Triangle and line rasterization into a color + depth target.

use std::cmp::{max, min};

use image::{Rgba, RgbaImage};
use nalgebra as na;
use na::{vector, Vector2, Vector3, Vector4};

use super::kernel::{ClipVertex, Varyings};
use super::texture::{to_pixel, to_unit_color};
use super::DepthMode;

/// Smallest clip space w kept after clipping. Geometry closer to the eye plane projects far
/// outside the viewport, so cutting it away changes no covered pixel.
const W_EPSILON: f32 = 1e-3;

/// One Sutherland-Hodgman pass: keeps the part of `polygon` where `distance >= 0`.
fn clip_against(polygon: &[ClipVertex], distance: impl Fn(&ClipVertex) -> f32) -> Vec<ClipVertex> {
    let mut clipped = Vec::with_capacity(polygon.len() + 1);
    for i in 0..polygon.len() {
        let current = &polygon[i];
        let next = &polygon[(i + 1) % polygon.len()];
        let d_current = distance(current);
        let d_next = distance(next);
        if d_current >= 0.0 {
            clipped.push(*current);
        }
        if (d_current >= 0.0) != (d_next >= 0.0) {
            let t = d_current / (d_current - d_next);
            clipped.push(ClipVertex {
                clip: current.clip.lerp(&next.clip, t),
                varyings: Varyings::lerp(&current.varyings, &next.varyings, t),
            });
        }
    }
    return clipped;
}

/// Clips a triangle against the near plane (z >= -w) and then against w >= `W_EPSILON`,
/// returning a convex polygon. The second plane matters for far plane geometry, where z = w
/// turns the near plane into w >= 0.
fn clip_near(vertices: [ClipVertex; 3]) -> Vec<ClipVertex> {
    if vertices.iter().all(|v| v.clip.z + v.clip.w >= 0.0 && v.clip.w >= W_EPSILON) {
        return vertices.to_vec();
    }
    let polygon = clip_against(&vertices, |v| v.clip.z + v.clip.w);
    if polygon.len() < 3 {
        return polygon;
    }
    return clip_against(&polygon, |v| v.clip.w - W_EPSILON);
}

/// Doubled signed area of (a, b, p). Computed in f64, clipped vertices near the eye plane
/// land far outside the target.
fn edge(a: Vector2<f32>, b: Vector2<f32>, p: Vector2<f32>) -> f32 {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let area = (b.x as f64 - ax) * (p.y as f64 - ay) - (b.y as f64 - ay) * (p.x as f64 - ax);
    return area as f32;
}

/// Rasterizes one triangle, calling `shade` for every fragment that passes the depth test.
pub fn draw_triangle(
    target: &mut Target,
    state: RasterState,
    vertices: [ClipVertex; 3],
    shade: &mut dyn FnMut(&Varyings) -> Vector4<f32>,
) {
    let polygon = clip_near(vertices);
    if polygon.len() < 3 {
        return;
    }
    // Fan triangulation of the clipped polygon.
    for i in 1..polygon.len() - 1 {
        draw_clipped_triangle(target, state, [&polygon[0], &polygon[i], &polygon[i + 1]], shade);
    }
}

fn draw_clipped_triangle(
    target: &mut Target,
    state: RasterState,
    vertices: [&ClipVertex; 3],
    shade: &mut dyn FnMut(&Varyings) -> Vector4<f32>,
) {
    let width = target.width();
    let height = target.height();
    let points = vertices.map(|v| to_screen_point(v.clip, width, height));
    let corners = points.map(|p| vector![p.x, p.y]);

    let area = edge(corners[0], corners[1], corners[2]);
    if area.abs() < 1e-8 {
        // Degenerate triangle.
        return;
    }

    // Bounding box, clamped to the target.
    let min_x = max(points.iter().map(|p| p.x.floor() as i64).min().unwrap_or(0), 0);
    let min_y = max(points.iter().map(|p| p.y.floor() as i64).min().unwrap_or(0), 0);
    let max_x = min(points.iter().map(|p| p.x.ceil() as i64).max().unwrap_or(0), width as i64 - 1);
    let max_y = min(points.iter().map(|p| p.y.ceil() as i64).max().unwrap_or(0), height as i64 - 1);

    for j in min_y..=max_y {
        for i in min_x..=max_x {
            let center = vector![i as f32 + 0.5, j as f32 + 0.5];
            let barycentric = vector![
                edge(corners[1], corners[2], center) / area,
                edge(corners[2], corners[0], center) / area,
                edge(corners[0], corners[1], center) / area
            ];
            if barycentric.x < -1e-6 || barycentric.y < -1e-6 || barycentric.z < -1e-6 {
                // Point is not in the triangle.
                continue;
            }

            // Written relative to the first vertex so equal depths interpolate exactly.
            let depth = points[0].depth
                + barycentric.y * (points[1].depth - points[0].depth)
                + barycentric.z * (points[2].depth - points[0].depth);
            if depth < 0.0 || depth > 1.0 + 1e-6 {
                continue;
            }
            let index = (i as u32 + j as u32 * width) as usize;
            let passes = match state.depth_mode {
                DepthMode::Less => depth < target.depth[index],
                DepthMode::LessEqual => depth <= target.depth[index],
                DepthMode::Disabled => true,
            };
            if !passes {
                continue;
            }

            // Perspective correct weights.
            let weighted = vector![
                barycentric.x * points[0].inv_w,
                barycentric.y * points[1].inv_w,
                barycentric.z * points[2].inv_w
            ];
            let sum = weighted.sum();
            if sum.abs() < f32::EPSILON {
                continue;
            }
            let varyings = Varyings::blend(
                [&vertices[0].varyings, &vertices[1].varyings, &vertices[2].varyings],
                weighted / sum,
            );
            let color = shade(&varyings);

            if state.depth_mode != DepthMode::Disabled {
                target.depth[index] = depth.min(1.0);
            }
            write_pixel(&mut target.color, i as u32, j as u32, color, state.blend);
        }
    }
}

fn write_pixel(image: &mut RgbaImage, x: u32, y: u32, color: Vector4<f32>, blend: bool) {
    if !blend {
        image.put_pixel(x, y, to_pixel(color));
        return;
    }
    let destination = to_unit_color(*image.get_pixel(x, y));
    let alpha = color.w.clamp(0.0, 1.0);
    let rgb: Vector3<f32> = color.xyz() * alpha + destination.xyz() * (1.0 - alpha);
    let out_alpha = alpha + destination.w * (1.0 - alpha);
    image.put_pixel(x, y, to_pixel(vector![rgb.x, rgb.y, rgb.z, out_alpha]));
}

/// Draws a line between two clip space points via Bresenham's algorithm as presented in
/// https://en.wikipedia.org/wiki/Bresenham%27s_line_algorithm
/// Draws over anything, the depth buffer is neither tested nor written.
pub fn draw_line_z_ignore(target: &mut Target, a: Vector4<f32>, b: Vector4<f32>, color: Rgba<u8>) {
    if a.w <= W_EPSILON || b.w <= W_EPSILON {
        return;
    }
    let width = target.width();
    let height = target.height();
    let point_a = to_screen_point(a, width, height);
    let point_b = to_screen_point(b, width, height);

    let mut x_0 = point_a.x.floor() as i64;
    let x_1 = point_b.x.floor() as i64;
    let mut y_0 = point_a.y.floor() as i64;
    let y_1 = point_b.y.floor() as i64;
    let dx = (x_1 - x_0).abs();
    let sx = if x_0 < x_1 { 1 } else { -1 };
    let dy = -(y_1 - y_0).abs();
    let sy = if y_0 < y_1 { 1 } else { -1 };
    let mut error = dx + dy;

    loop {
        if x_0 >= 0 && y_0 >= 0 && x_0 < width as i64 && y_0 < height as i64 {
            target.color.put_pixel(x_0 as u32, y_0 as u32, color);
        }
        if x_0 == x_1 && y_0 == y_1 {
            break;
        }
        let e2 = 2 * error;
        if e2 >= dy {
            if x_0 == x_1 {
                break;
            }
            error += dy;
            x_0 += sx;
        }
        if e2 <= dx {
            if y_0 == y_1 {
                break;
            }
            error += dx;
            y_0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn vertex(x: f32, y: f32, z: f32) -> ClipVertex {
        return ClipVertex {
            clip: vector![x, y, z, 1.0],
            varyings: Varyings::default(),
        };
    }

    fn fill(target: &mut Target, z: f32, depth_mode: DepthMode, color: Vector4<f32>) {
        let state = RasterState {
            depth_mode,
            blend: false,
        };
        for triangle in [
            [vertex(-1.0, -1.0, z), vertex(1.0, -1.0, z), vertex(1.0, 1.0, z)],
            [vertex(-1.0, -1.0, z), vertex(1.0, 1.0, z), vertex(-1.0, 1.0, z)],
        ] {
            draw_triangle(target, state, triangle, &mut |_| color);
        }
    }

    #[test]
    fn full_screen_quad_covers_every_pixel() {
        let mut target = Target::new(7, 5, BLACK);
        fill(&mut target, 0.0, DepthMode::Less, vector![1.0, 0.0, 0.0, 1.0]);
        assert!(target.color.pixels().all(|p| *p == RED));
    }

    #[test]
    fn depth_test_keeps_the_nearer_fragment() {
        let mut target = Target::new(4, 4, BLACK);
        fill(&mut target, -0.5, DepthMode::Less, vector![1.0, 0.0, 0.0, 1.0]);
        fill(&mut target, 0.5, DepthMode::Less, vector![0.0, 0.0, 1.0, 1.0]);
        assert!(target.color.pixels().all(|p| *p == RED));

        fill(&mut target, 0.5, DepthMode::Disabled, vector![0.0, 0.0, 1.0, 1.0]);
        assert!(target.color.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn far_plane_passes_only_with_less_equal() {
        let mut target = Target::new(4, 4, BLACK);
        fill(&mut target, 1.0, DepthMode::Less, vector![1.0, 0.0, 0.0, 1.0]);
        assert!(target.color.pixels().all(|p| *p == BLACK));
        fill(&mut target, 1.0, DepthMode::LessEqual, vector![1.0, 0.0, 0.0, 1.0]);
        assert!(target.color.pixels().all(|p| *p == RED));
    }

    #[test]
    fn blending_mixes_with_destination() {
        let mut target = Target::new(2, 2, BLACK);
        let state = RasterState {
            depth_mode: DepthMode::Disabled,
            blend: true,
        };
        // One oversized triangle, so no pixel is covered twice.
        let triangle = [vertex(-1.0, -1.0, 0.0), vertex(3.0, -1.0, 0.0), vertex(-1.0, 3.0, 0.0)];
        draw_triangle(&mut target, state, triangle, &mut |_| vector![1.0, 1.0, 1.0, 0.5]);
        assert!(target.color.pixels().all(|p| *p == Rgba([128, 128, 128, 255])));
    }

    #[test]
    fn triangle_behind_the_eye_is_dropped() {
        let mut target = Target::new(4, 4, BLACK);
        let behind = |x: f32, y: f32| ClipVertex {
            clip: vector![x, y, 2.0, -1.0],
            varyings: Varyings::default(),
        };
        draw_triangle(
            &mut target,
            RasterState {
                depth_mode: DepthMode::Disabled,
                blend: false,
            },
            [behind(-1.0, -1.0), behind(1.0, -1.0), behind(0.0, 1.0)],
            &mut |_| vector![1.0, 0.0, 0.0, 1.0],
        );
        assert!(target.color.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn straddling_triangle_is_clipped_not_dropped() {
        let mut target = Target::new(8, 8, BLACK);
        let vertices = [
            vertex(-1.0, -1.0, 0.0),
            vertex(1.0, -1.0, 0.0),
            ClipVertex {
                clip: vector![0.0, 1.0, -3.0, 1.0],
                varyings: Varyings::default(),
            },
        ];
        draw_triangle(
            &mut target,
            RasterState {
                depth_mode: DepthMode::Disabled,
                blend: false,
            },
            vertices,
            &mut |_| vector![1.0, 0.0, 0.0, 1.0],
        );
        // Bottom row survives, the tip beyond the near plane is cut away.
        assert_eq!(*target.color.get_pixel(4, 7), RED);
        assert_eq!(*target.color.get_pixel(4, 0), BLACK);
    }

    #[test]
    fn far_plane_triangle_through_the_eye_plane_keeps_its_visible_part() {
        // z = w pins the triangle to the far plane; one vertex sits behind the eye.
        let far = |x: f32, y: f32, w: f32| ClipVertex {
            clip: vector![x, y, w, w],
            varyings: Varyings::default(),
        };
        let mut target = Target::new(8, 8, BLACK);
        draw_triangle(
            &mut target,
            RasterState {
                depth_mode: DepthMode::LessEqual,
                blend: false,
            },
            [far(-1.0, -1.0, 1.0), far(1.0, -1.0, 1.0), far(0.0, 3.0, -1.0)],
            &mut |_| vector![1.0, 0.0, 0.0, 1.0],
        );
        // Seen from the front, the part before the eye plane fans out over the whole target.
        assert!(target.color.pixels().all(|p| *p == RED));
    }

    #[test]
    fn clipped_polygon_stays_in_front_of_the_eye() {
        let far = |x: f32, w: f32| ClipVertex {
            clip: vector![x, 0.0, w, w],
            varyings: Varyings::default(),
        };
        let polygon = clip_near([far(-1.0, 1.0), far(1.0, 1.0), far(0.0, -1.0)]);
        assert_eq!(polygon.len(), 4);
        assert!(polygon.iter().all(|v| v.clip.w >= W_EPSILON * 0.999));
    }

    #[test]
    fn line_ignores_depth() {
        let mut target = Target::new(8, 8, BLACK);
        fill(&mut target, -1.0, DepthMode::Less, vector![0.0, 0.0, 0.0, 1.0]);
        draw_line_z_ignore(&mut target, vector![-1.0, 0.0, 0.5, 1.0], vector![1.0, 0.0, 0.5, 1.0], RED);
        let red_pixels = target.color.pixels().filter(|p| **p == RED).count();
        assert!(red_pixels >= 8);
    }
}
