#![allow(dead_code)]

use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

pub fn solid(rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(48, 48, Rgb(rgb))
}

/// Diagonal stripes over a horizontal gradient; gives every family some
/// signal.
pub fn textured(seed: u8) -> RgbImage {
    RgbImage::from_fn(96, 80, |x, y| {
        let stripe = if (x + y + seed as u32) % 12 < 6 { 200 } else { 40 };
        Rgb([stripe, (x * 255 / 95) as u8, seed.wrapping_mul(37)])
    })
}

pub fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut std::io::Cursor::new(&mut buf), format)
        .expect("encode fixture");
    buf
}

pub fn write(dir: &Path, name: &str, img: &RgbImage, format: ImageFormat) {
    std::fs::write(dir.join(name), encode(img, format)).expect("write fixture");
}

/// red, blue and pink squares, a textured bmp, a corrupt jpeg and a text
/// file.
pub fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().expect("tempdir");
    write(dir.path(), "red.png", &solid([250, 10, 10]), ImageFormat::Png);
    write(dir.path(), "blue.png", &solid([10, 10, 250]), ImageFormat::Png);
    write(dir.path(), "pink.png", &solid([250, 140, 160]), ImageFormat::Png);
    write(dir.path(), "Tile.BMP", &textured(3), ImageFormat::Bmp);
    std::fs::write(dir.path().join("corrupt.jpg"), b"definitely not a jpeg").expect("write");
    std::fs::write(dir.path().join("notes.txt"), b"ignored").expect("write");
    dir
}
