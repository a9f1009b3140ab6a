use image::{GrayImage, Luma, Rgb, Rgb32FImage, RgbImage};

/// Convert a normalized [0, 1] colour image to an 8-bit grayscale plane
/// using the Rec. 601 luma weights.
pub fn grayscale(image: &Rgb32FImage) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let [r, g, b] = px.0;
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        out.put_pixel(x, y, Luma([(luma * 255.0).clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Convert an 8-bit colour image into the normalized [0, 1] working format.
pub fn normalize_rgb8(image: &RgbImage) -> Rgb32FImage {
    let mut out = Rgb32FImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let [r, g, b] = px.0;
        out.put_pixel(
            x,
            y,
            Rgb([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]),
        );
    }
    out
}

/// Convert a normalized [0, 1] image back to 8-bit for export.
pub fn to_rgb8(image: &Rgb32FImage) -> RgbImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let [r, g, b] = px.0;
        out.put_pixel(
            x,
            y,
            Rgb([
                (r * 255.0).clamp(0.0, 255.0) as u8,
                (g * 255.0).clamp(0.0, 255.0) as u8,
                (b * 255.0).clamp(0.0, 255.0) as u8,
            ]),
        );
    }
    out
}

/// Clamp every channel of `image` into [0, 1] in place.
pub fn clip_unit(image: &mut Rgb32FImage) {
    for px in image.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = c.clamp(0.0, 1.0);
        }
    }
}
