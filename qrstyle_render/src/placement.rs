use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use qrstyle_core::{Error, IntSize, Rect, Size};

/// Filter used whenever a placed image has to be resampled.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// How an image is mapped onto a target rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageMode {
    /// Stretch the image to the target, ignoring its aspect ratio.
    ScaleToFill,
    /// Scale the image uniformly until it fits inside the target, leaving transparent bands.
    ScaleAspectFit,
    /// Scale the image uniformly until it covers the target, cropping the excess.
    #[default]
    ScaleAspectFill,
}

impl ImageMode {
    /// Rectangle covered by an image of natural size `image` placed in `canvas`.
    ///
    /// With [ImageMode::ScaleAspectFill] the result may exceed `canvas` and must be clipped by the
    /// caller.
    /// # Example
    /// ```
    /// use qrstyle_core::{Rect, Size};
    /// use qrstyle_render::ImageMode;
    /// let canvas = Rect::new(0.0, 0.0, 100.0, 100.0);
    /// let fit = ImageMode::ScaleAspectFit.place(Size::new(200.0, 100.0), canvas).unwrap();
    /// assert_eq!(fit, Rect::new(0.0, 25.0, 100.0, 50.0));
    /// let fill = ImageMode::ScaleAspectFill.place(Size::new(200.0, 100.0), canvas).unwrap();
    /// assert_eq!(fill, Rect::new(-50.0, 0.0, 200.0, 100.0));
    /// ```
    pub fn place(self, image: Size, canvas: Rect) -> Result<Rect, Error> {
        let image = image.ensure_positive("image")?;
        canvas.size.ensure_positive("canvas")?;
        let placed = match self {
            ImageMode::ScaleToFill => return Ok(canvas),
            ImageMode::ScaleAspectFit => {
                let scale = f64::max(
                    image.width / canvas.width(),
                    image.height / canvas.height(),
                );
                Size::new(image.width / scale, image.height / scale)
            }
            ImageMode::ScaleAspectFill => {
                let scale = f64::max(
                    canvas.width() / image.width,
                    canvas.height() / image.height,
                );
                image.scaled(scale)
            }
        };
        Ok(Rect::centered_in(placed, canvas))
    }

    /// Region of the image, in image pixels, that ends up covering a canvas of size `canvas`.
    ///
    /// The region is centered on the image. It is smaller than the image when
    /// [ImageMode::ScaleAspectFill] crops the excess and larger when [ImageMode::ScaleAspectFit]
    /// pads it with transparent bands; [ImageMode::ScaleToFill] always takes the whole image.
    /// # Example
    /// ```
    /// use qrstyle_core::{Rect, Size};
    /// use qrstyle_render::ImageMode;
    /// let image = Size::new(200.0, 100.0);
    /// let canvas = Size::square(50.0);
    /// assert_eq!(
    ///     ImageMode::ScaleAspectFill.crop_for(image, canvas).unwrap(),
    ///     Rect::new(50.0, 0.0, 100.0, 100.0)
    /// );
    /// assert_eq!(
    ///     ImageMode::ScaleAspectFit.crop_for(image, canvas).unwrap(),
    ///     Rect::new(0.0, -50.0, 200.0, 200.0)
    /// );
    /// ```
    pub fn crop_for(self, image: Size, canvas: Size) -> Result<Rect, Error> {
        let image = image.ensure_positive("image")?;
        let canvas = canvas.ensure_positive("canvas")?;
        let width_ratio = image.width / canvas.width;
        let height_ratio = image.height / canvas.height;
        let ratio = match self {
            ImageMode::ScaleToFill => return Ok(Rect::with_size(image)),
            ImageMode::ScaleAspectFit => f64::max(width_ratio, height_ratio),
            ImageMode::ScaleAspectFill => f64::min(width_ratio, height_ratio),
        };
        Ok(Rect::centered_in(canvas.scaled(ratio), Rect::with_size(image)))
    }

    /// Produce an image of exactly `canvas` pixels from `image`: crop or pad it as
    /// [ImageMode::crop_for] prescribes, then resample.
    pub fn apply(self, image: &RgbaImage, canvas: IntSize) -> Result<RgbaImage, Error> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(Error::geometry(format!(
                "canvas must have positive dimensions, got {}x{}",
                canvas.width, canvas.height
            )));
        }
        let natural = IntSize::new(image.width(), image.height());
        let crop = self.crop_for(natural.into(), canvas.into())?;
        let x0 = crop.min_x().round() as i64;
        let y0 = crop.min_y().round() as i64;
        let width = (crop.width().round() as u32).max(1);
        let height = (crop.height().round() as u32).max(1);
        let region = if (x0, y0, width, height) == (0, 0, natural.width, natural.height) {
            image.clone()
        } else {
            RgbaImage::from_fn(width, height, |x, y| {
                let sx = x0 + x as i64;
                let sy = y0 + y as i64;
                let inside = (0..natural.width as i64).contains(&sx)
                    && (0..natural.height as i64).contains(&sy);
                if inside {
                    *image.get_pixel(sx as u32, sy as u32)
                } else {
                    Rgba([0, 0, 0, 0])
                }
            })
        };
        if (width, height) == (canvas.width, canvas.height) {
            return Ok(region);
        }
        Ok(imageops::resize(
            &region,
            canvas.width,
            canvas.height,
            RESAMPLE_FILTER,
        ))
    }
}

/// Placement of an image of natural size `image_size` on a canvas of size `canvas_size` anchored at
/// the origin. See [ImageMode::place].
pub fn place(image_size: Size, canvas_size: Size, mode: ImageMode) -> Result<Rect, Error> {
    mode.place(image_size, Rect::with_size(canvas_size))
}
