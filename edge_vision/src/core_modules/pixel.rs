// THEORY:
// `Pixel` and `PixelBuffer` are the data every other module reads and writes.
//
// Key architectural principles:
// 1.  **Dumb containers**: A `Pixel` is three channel bytes and nothing more. It is a
//     `Copy` value type; the kernel builds a fresh one for every output coordinate.
// 2.  **Wire-shaped storage**: `PixelBuffer` wraps an `image::RgbImage`, whose raw
//     storage is interleaved R,G,B bytes in scanline order. That is byte-for-byte the
//     body of a binary PPM, so the codec never repacks pixels, and the engine can hand
//     each worker a plain `&mut [u8]` slice of the destination.
// 3.  **Flat indexing**: Index `i` maps to `(i % width, i / width)`. The buffer always
//     holds exactly `width * height` pixels.

pub mod pixel {
    use image::{Rgb, RgbImage};

    pub type Channel = u8;
    pub type Bytes = Vec<Channel>;

    /// Bytes per pixel in the interleaved storage.
    pub const CHANNELS: usize = 3;
    /// The only max-channel-value the image container accepts.
    pub const MAX_CHANNEL_VALUE: Channel = 255;

    /// A single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub const BLACK: Pixel = Pixel::new(0, 0, 0);
        pub const WHITE: Pixel = Pixel::new(255, 255, 255);

        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        pub const fn channels(&self) -> [Channel; CHANNELS] {
            [self.red, self.green, self.blue]
        }
    }

    impl From<&[Channel]> for Pixel {
        fn from(bytes: &[Channel]) -> Self {
            if bytes.len() != CHANNELS {
                panic!("Cannot convert {} bytes into pixel.", bytes.len());
            }
            Pixel::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl From<Rgb<Channel>> for Pixel {
        fn from(Rgb([red, green, blue]): Rgb<Channel>) -> Self {
            Pixel::new(red, green, blue)
        }
    }

    impl From<Pixel> for Rgb<Channel> {
        fn from(pixel: Pixel) -> Self {
            Rgb(pixel.channels())
        }
    }

    /// A row-major grid of `width * height` pixels.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PixelBuffer {
        image: RgbImage,
    }

    impl PixelBuffer {
        /// Allocates an all-black buffer.
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                image: RgbImage::new(width, height),
            }
        }

        /// Number of body bytes a `width` x `height` image occupies, or `None` if
        /// that does not fit in `usize`.
        pub fn byte_len(width: u32, height: u32) -> Option<usize> {
            (width as usize)
                .checked_mul(height as usize)?
                .checked_mul(CHANNELS)
        }

        /// Wraps interleaved RGB bytes. Returns `None` unless `bytes` holds exactly
        /// `width * height * 3` bytes.
        pub fn from_raw(width: u32, height: u32, bytes: Bytes) -> Option<Self> {
            if Self::byte_len(width, height)? != bytes.len() {
                return None;
            }
            RgbImage::from_raw(width, height, bytes).map(|image| Self { image })
        }

        pub fn from_pixels(width: u32, height: u32, pixels: &[Pixel]) -> Option<Self> {
            let bytes: Bytes = pixels.iter().flat_map(Pixel::channels).collect();
            Self::from_raw(width, height, bytes)
        }

        pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Pixel) -> Self {
            Self {
                image: RgbImage::from_fn(width, height, |x, y| f(x, y).into()),
            }
        }

        pub fn width(&self) -> u32 {
            self.image.width()
        }

        pub fn height(&self) -> u32 {
            self.image.height()
        }

        pub fn dimensions(&self) -> (u32, u32) {
            self.image.dimensions()
        }

        /// Number of pixels (`width * height`).
        pub fn len(&self) -> usize {
            self.image.as_raw().len() / CHANNELS
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// The pixel at `(x, y)`. Panics when out of bounds.
        pub fn get(&self, x: u32, y: u32) -> Pixel {
            (*self.image.get_pixel(x, y)).into()
        }

        /// The pixel at flat row-major `index`. Panics when out of bounds.
        pub fn at(&self, index: usize) -> Pixel {
            let offset = index * CHANNELS;
            Pixel::from(&self.image.as_raw()[offset..offset + CHANNELS])
        }

        pub fn put(&mut self, x: u32, y: u32, pixel: Pixel) {
            self.image.put_pixel(x, y, pixel.into());
        }

        pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
            self.image.pixels().map(|rgb| Pixel::from(*rgb))
        }

        /// Interleaved R,G,B bytes in scanline order.
        pub fn as_bytes(&self) -> &[Channel] {
            self.image.as_raw()
        }

        pub fn as_bytes_mut(&mut self) -> &mut [Channel] {
            &mut self.image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn flat_index_is_row_major() {
        let buffer = PixelBuffer::from_fn(4, 3, |x, y| Pixel::new(x as u8, y as u8, 7));

        assert_eq!(buffer.len(), 12);
        for index in 0..buffer.len() {
            let expected = Pixel::new((index % 4) as u8, (index / 4) as u8, 7);
            assert_eq!(buffer.at(index), expected);
        }
        assert_eq!(buffer.get(3, 2), Pixel::new(3, 2, 7));
    }

    #[test]
    fn from_raw_requires_exact_length() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 12]).is_some());
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 11]).is_none());
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 13]).is_none());
    }

    #[test]
    fn bytes_are_interleaved_rgb() {
        let pixels = [Pixel::new(1, 2, 3), Pixel::new(4, 5, 6)];
        let buffer = PixelBuffer::from_pixels(2, 1, &pixels).expect("two pixels fit 2x1");

        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.pixels().collect::<Vec<_>>(), pixels);
    }

    #[test]
    fn new_buffer_is_black() {
        let buffer = PixelBuffer::new(3, 2);
        assert!(buffer.pixels().all(|p| p == Pixel::BLACK));
        assert!(PixelBuffer::new(0, 0).is_empty());
    }
}
