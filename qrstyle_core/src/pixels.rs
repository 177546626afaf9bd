use crate::Error;

/// Number of bytes per pixel. Channels are always stored in `R, G, B, A` order.
pub const CHANNELS: usize = 4;

/// Read-only, bounds-checked view over a tightly packed RGBA8 buffer.
///
/// Pixel `(x, y)` starts at byte `(y * width + x) * 4`; rows are not padded.
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> PixelView<'a> {
    /// Wrap `data` as a `width` x `height` RGBA image. Fails unless `data` holds exactly that many
    /// pixels.
    /// # Example
    /// ```
    /// use qrstyle_core::PixelView;
    /// let data = [0u8, 0, 0, 255, 255, 255, 255, 255];
    /// let view = PixelView::new(&data, 2, 1).unwrap();
    /// assert_eq!(view.get(1, 0), Some([255, 255, 255, 255]));
    /// assert_eq!(view.get(2, 0), None);
    /// ```
    pub fn new(data: &'a [u8], width: usize, height: usize) -> Result<Self, Error> {
        let expected = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .ok_or_else(|| Error::geometry("pixel buffer dimensions overflow"))?;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(Error::geometry(format!(
                "pixel buffer of {} bytes does not match {}x{} RGBA pixels",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Byte offset of pixel `(x, y)`, if it is inside the view.
    #[inline]
    pub fn offset(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y * self.width + x) * CHANNELS)
        } else {
            None
        }
    }

    /// Get the `[r, g, b, a]` channels of pixel `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<[u8; CHANNELS]> {
        let offset = self.offset(x, y)?;
        let mut pixel = [0; CHANNELS];
        pixel.copy_from_slice(&self.data[offset..offset + CHANNELS]);
        Some(pixel)
    }

    /// Iterate over `(x, y, [r, g, b, a])` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, [u8; CHANNELS])> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .enumerate()
            .map(move |(index, chunk)| {
                (
                    index % self.width,
                    index / self.width,
                    [chunk[0], chunk[1], chunk[2], chunk[3]],
                )
            })
    }
}
