// File: ./src/render/canvas.rs
// embedded-graphics drawing onto an RGBA image buffer.
use crate::color_utils::{Rgb, blend};
use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use image::{Rgba, RgbaImage};
use std::convert::Infallible;

/// Draw target that maps logical pixel `p` to the physical block at
/// `anchor + p * scale`, alpha-blending every write onto the image.
/// Pixels outside the image are dropped.
pub struct BlendCanvas<'a> {
    image: &'a mut RgbaImage,
    anchor: Point,
    scale: u32,
    alpha: u8,
}

impl<'a> BlendCanvas<'a> {
    pub fn new(image: &'a mut RgbaImage) -> Self {
        Self {
            image,
            anchor: Point::zero(),
            scale: 1,
            alpha: u8::MAX,
        }
    }

    /// Logical origin placed at `anchor`, each logical pixel drawn `scale` pixels wide.
    pub fn scaled_at(image: &'a mut RgbaImage, anchor: Point, scale: u32) -> Self {
        Self {
            image,
            anchor,
            scale: scale.max(1),
            alpha: u8::MAX,
        }
    }

    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb) {
        if x < 0 || y < 0 || x >= i64::from(self.image.width()) || y >= i64::from(self.image.height())
        {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        let (r, g, b) = blend((px[0], px[1], px[2]), color, self.alpha);
        *px = Rgba([r, g, b, 255]);
    }
}

impl DrawTarget for BlendCanvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let scale = i64::from(self.scale);
        for Pixel(point, color) in pixels {
            let rgb = (color.r(), color.g(), color.b());
            let base_x = i64::from(self.anchor.x) + i64::from(point.x) * scale;
            let base_y = i64::from(self.anchor.y) + i64::from(point.y) * scale;
            for dy in 0..scale {
                for dx in 0..scale {
                    self.put(base_x + dx, base_y + dy, rgb);
                }
            }
        }
        Ok(())
    }
}

impl OriginDimensions for BlendCanvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

pub fn to_rgb888(color: Rgb) -> Rgb888 {
    Rgb888::new(color.0, color.1, color.2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_scaled_pixels_fill_blocks_and_clip() {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        {
            let mut canvas = BlendCanvas::scaled_at(&mut img, Point::new(6, 0), 2);
            canvas
                .draw_iter([Pixel(Point::new(0, 0), Rgb888::BLACK), Pixel(Point::new(1, 0), Rgb888::BLACK)])
                .unwrap();
        }
        assert_eq!(img.get_pixel(6, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(7, 1), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(5, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(6, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_alpha_fill_darkens() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255]));
        {
            let mut canvas = BlendCanvas::new(&mut img).with_alpha(128);
            Rectangle::new(Point::new(-2, -2), Size::new(4, 4))
                .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
                .draw(&mut canvas)
                .unwrap();
        }
        assert_eq!(img.get_pixel(0, 0), &Rgba([100, 100, 100, 255]));
        assert_eq!(img.get_pixel(3, 3), &Rgba([200, 200, 200, 255]));
    }
}
