//! Shared fixtures for the unit tests: synthetic rasters encoded in memory.

use crate::codec::EncodedImage;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// A gradient so resizes and crops have something to chew on.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

pub fn png_image(width: u32, height: u32) -> EncodedImage {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Png)
}

pub fn jpeg_image(width: u32, height: u32) -> EncodedImage {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Jpeg)
}

/// A PNG filled with one RGBA colour.
pub fn solid_png(width: u32, height: u32, pixel: [u8; 4]) -> EncodedImage {
    let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub fn decode(image: &EncodedImage) -> DynamicImage {
    image::load_from_memory(&image.data).unwrap()
}

fn encode(img: DynamicImage, format: ImageFormat) -> EncodedImage {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    let mime = match format {
        ImageFormat::Jpeg => "image/jpeg",
        _ => "image/png",
    };
    EncodedImage::new(buf, mime)
}
