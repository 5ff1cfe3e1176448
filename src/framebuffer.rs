use assert2::assert;

use crate::geometry::ScreenSize;
use crate::screen_block::ScreenBlock;
use crate::util::{BLACK, Rgb, color_to_image};

/// Full-frame floating point pixel buffer, one RGB triple per pixel,
/// row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    size: ScreenSize,
    pixels: Vec<Rgb>,
}

impl FrameBuffer {
    pub fn new(size: ScreenSize) -> FrameBuffer {
        FrameBuffer {
            size,
            pixels: vec![BLACK; (size.x * size.y) as usize],
        }
    }

    pub fn size(&self) -> ScreenSize {
        self.size
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.pixels[(y * self.size.x + x) as usize]
    }

    /// Copies a rendered tile into place. `samples` must hold the tile's
    /// pixels row-major, exactly `block.area()` of them.
    pub fn write_tile(&mut self, block: &ScreenBlock, samples: &[Rgb]) {
        assert!(samples.len() == block.area() as usize);
        assert!(block.max.x <= self.size.x && block.max.y <= self.size.y);

        for (point, sample) in block.internal_points().zip(samples) {
            self.pixels[(point.y * self.size.x + point.x) as usize] = *sample;
        }
    }

    /// Clamped 8-bit conversion; tone mapping is left to the caller.
    pub fn to_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.size.x, self.size.y, |x, y| {
            color_to_image(self.pixel(x, y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ScreenPoint;
    use assert2::assert;

    #[test]
    fn tiles_land_in_the_right_place() {
        let mut frame = FrameBuffer::new(ScreenSize::new(4, 3));
        let block = ScreenBlock::new(ScreenPoint::new(1, 1), ScreenPoint::new(3, 3));
        let tile: Vec<Rgb> = (0..4).map(|i| Rgb::new(i as f32, 0.0, 0.0)).collect();

        frame.write_tile(&block, &tile);

        assert!(frame.pixel(1, 1) == Rgb::new(0.0, 0.0, 0.0));
        assert!(frame.pixel(2, 1) == Rgb::new(1.0, 0.0, 0.0));
        assert!(frame.pixel(1, 2) == Rgb::new(2.0, 0.0, 0.0));
        assert!(frame.pixel(2, 2) == Rgb::new(3.0, 0.0, 0.0));
        // Untouched pixels stay black
        assert!(frame.pixel(0, 0) == BLACK);
        assert!(frame.pixel(3, 2) == BLACK);
    }

    #[test]
    #[should_panic]
    fn wrong_sample_count_is_rejected() {
        let mut frame = FrameBuffer::new(ScreenSize::new(4, 3));
        let block = ScreenBlock::new(ScreenPoint::new(0, 0), ScreenPoint::new(2, 2));
        frame.write_tile(&block, &[BLACK; 3]);
    }

    #[test]
    fn image_conversion_clamps() {
        let mut frame = FrameBuffer::new(ScreenSize::new(1, 1));
        frame.write_tile(
            &ScreenBlock::new(ScreenPoint::new(0, 0), ScreenPoint::new(1, 1)),
            &[Rgb::new(2.0, 0.5, -1.0)],
        );
        let image = frame.to_image();
        assert!(image.get_pixel(0, 0).0 == [255, 128, 0]);
    }
}
