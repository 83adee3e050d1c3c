//! Turns dark-on-light artwork into white artwork on a transparent background.

use std::path::Path;

use image::{DynamicImage, Rgba, RgbaImage};

/// Luminance with the ITU-R 601-2 weights in 16-bit fixed point, rounded. Alpha is ignored.
fn luma(Rgba([r, g, b, _]): Rgba<u8>) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// White pixels whose opacity is the inverted brightness of the source.
pub fn whiten(img: &DynamicImage) -> RgbaImage {
    let src = img.to_rgba8();
    RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        Rgba([255, 255, 255, 255 - luma(*src.get_pixel(x, y))])
    })
}

pub fn whiten_file(input: &Path, output: &Path) -> anyhow::Result<()> {
    let img = image::open(input)?;
    whiten(&img).save_with_format(output, image::ImageFormat::Png)?;
    log::info!("Wrote {} ({}x{})", output.display(), img.width(), img.height());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_becomes_opaque_white() {
        let mut src = RgbaImage::from_pixel(3, 1, Rgba([255, 255, 255, 255]));
        src.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([100, 100, 100, 255]));

        let out = whiten(&DynamicImage::ImageRgba8(src));

        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 255, 255, 155]));
        assert_eq!(out.get_pixel(2, 0), &Rgba([255, 255, 255, 0]));
    }

    #[test]
    fn luminance_weights() {
        assert_eq!(luma(Rgba([255, 0, 0, 0])), 76);
        assert_eq!(luma(Rgba([0, 255, 0, 255])), 150);
        assert_eq!(luma(Rgba([0, 0, 255, 255])), 29);
        assert_eq!(luma(Rgba([255, 255, 255, 0])), 255);
        assert_eq!(luma(Rgba([10, 200, 30, 255])), 124);
    }

    #[test]
    fn converts_png_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("logo.png");
        let output = dir.path().join("logo_fixed.png");
        RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 255]))
            .save(&input)
            .unwrap();

        whiten_file(&input, &output).unwrap();

        let out = image::open(&output).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (4, 2));
        assert!(out.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }
}
