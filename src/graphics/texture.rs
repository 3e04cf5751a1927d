use image::{Rgba, RgbaImage};
use nalgebra as na;
use na::{vector, Vector2, Vector3, Vector4};

/// What a texture slot of the software context holds.
pub enum TextureData {
    Image(RgbaImage),
    Cubemap(Box<[RgbaImage; 6]>),
    Target(usize),  // Color attachment of an offscreen target, sampled in place.
}

pub fn to_unit_color(pixel: Rgba<u8>) -> Vector4<f32> {
    return vector![
        pixel.0[0] as f32 / 255.0,
        pixel.0[1] as f32 / 255.0,
        pixel.0[2] as f32 / 255.0,
        pixel.0[3] as f32 / 255.0
    ];
}

pub fn to_pixel(color: Vector4<f32>) -> Rgba<u8> {
    fn channel(value: f32) -> u8 {
        return (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    return Rgba([channel(color.x), channel(color.y), channel(color.z), channel(color.w)]);
}

/// Nearest texel with repeat wrapping. `v = 0` is the bottom row, rows are stored top first.
pub fn sample_2d(image: &RgbaImage, uv: Vector2<f32>) -> Vector4<f32> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vector4::zeros();
    }
    let u = uv.x - uv.x.floor();
    let v = uv.y - uv.y.floor();
    let x = ((u * width as f32) as u32).min(width - 1);
    let y = (((1.0 - v) * height as f32) as u32).min(height - 1);
    return to_unit_color(*image.get_pixel(x, y));
}

/// Cubemap lookup by direction, faces in +x, -x, +y, -y, +z, -z order.
pub fn sample_cube(faces: &[RgbaImage; 6], direction: Vector3<f32>) -> Vector4<f32> {
    let (x, y, z) = (direction.x, direction.y, direction.z);
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
    // Major axis selects the face, the other two give the face coordinates.
    let (face, sc, tc, ma) = if ax >= ay && ax >= az {
        if x > 0.0 { (0, -z, -y, ax) } else { (1, z, -y, ax) }
    } else if ay >= az {
        if y > 0.0 { (2, x, z, ay) } else { (3, x, -z, ay) }
    } else if z > 0.0 {
        (4, x, -y, az)
    } else {
        (5, -x, -y, az)
    };
    if ma <= f32::EPSILON {
        return Vector4::zeros();
    }

    let image = &faces[face];
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vector4::zeros();
    }
    let s = (sc / ma + 1.0) / 2.0;
    let t = (tc / ma + 1.0) / 2.0;
    let column = ((s * width as f32) as u32).min(width - 1);
    let row = ((t * height as f32) as u32).min(height - 1);
    return to_unit_color(*image.get_pixel(column, row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_2d_puts_v_zero_at_the_bottom_row() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        image.put_pixel(0, 1, Rgba([255, 0, 0, 255]));
        let color = sample_2d(&image, vector![0.25, 0.25]);
        assert_eq!(to_pixel(color), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn sample_2d_wraps() {
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        assert_eq!(to_pixel(sample_2d(&image, vector![1.75, 0.5])), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn sample_cube_selects_major_axis_face() {
        let faces: [RgbaImage; 6] =
            std::array::from_fn(|i| RgbaImage::from_pixel(4, 4, Rgba([i as u8 * 40, 0, 0, 255])));
        let directions = [
            vector![1.0, 0.1, 0.2],
            vector![-1.0, 0.1, 0.2],
            vector![0.1, 1.0, 0.2],
            vector![0.1, -1.0, 0.2],
            vector![0.1, 0.2, 1.0],
            vector![0.1, 0.2, -1.0],
        ];
        for (face, direction) in directions.iter().enumerate() {
            assert_eq!(to_pixel(sample_cube(&faces, *direction)).0[0], face as u8 * 40);
        }
    }
}
