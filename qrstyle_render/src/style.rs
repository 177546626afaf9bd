use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use qrstyle_core::{Color, Error, Size};

use crate::ImageMode;

/// Shape of data modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleShape {
    #[default]
    Rectangle,
    Circle,
    /// Square with corners rounded by a quarter of its side.
    RoundedRectangle,
    /// Circle whose diameter is `scale` times a factor in `0.33..1.0` drawn from the seed.
    RandomRound,
}

/// How timing and alignment pattern modules are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternTreatment {
    /// Same as data modules.
    #[default]
    Inherit,
    /// Full, undecorated cells.
    FullCell,
    /// Centered square of side `size`.
    Rectangle,
    /// Centered circle of diameter `size`.
    Round,
    /// Centered square of side `size` with corners rounded by `size / 4`.
    RoundedRectangle,
}

/// Parameters of the timing or alignment patterns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    pub treatment: PatternTreatment,
    /// Side of the shape relative to its cell, in `(0.0, 1.0]`. Only shaped treatments use it.
    pub size: f64,
    /// Color of dark modules, the data color when unset.
    pub dark: Option<Color>,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            treatment: PatternTreatment::default(),
            size: 1.0,
            dark: None,
        }
    }
}

impl PatternParams {
    pub fn new(treatment: PatternTreatment) -> Self {
        Self {
            treatment,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_dark(mut self, color: Color) -> Self {
        self.dark = Some(color);
        self
    }
}

/// Decoration of the three finder patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionStyle {
    /// Every finder module is a full square cell.
    #[default]
    Rectangle,
    /// A disk inside a ring on a light backing disk.
    Round,
    /// [PositionStyle::Round] with a dashed orbit and four satellites.
    Planets,
    /// A disk inside a rounded square outline.
    RoundedRectangle,
    /// A center square framed by four bars, one per side.
    Dsj,
}

impl PositionStyle {
    /// Whether the decoration replaces the whole finder block rather than styling its modules.
    pub fn absorbs_finder(&self) -> bool {
        !matches!(self, PositionStyle::Rectangle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionParams {
    pub style: PositionStyle,
    pub dark: Color,
    pub light: Color,
    /// Width of the ring and bars and diameter of the satellites, in modules.
    pub size: f64,
}

impl Default for PositionParams {
    fn default() -> Self {
        Self {
            style: PositionStyle::default(),
            dark: Color::BLACK,
            light: Color::WHITE,
            size: 1.0,
        }
    }
}

/// Parameters of the standard module-by-module style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicParams {
    pub shape: ModuleShape,
    pub dark: Color,
    pub light: Color,
    /// Opacity of data modules, in `0.0..=1.0`.
    pub opacity: f64,
    /// Side of a data module relative to its cell, in `(0.0, 1.0]`.
    pub scale: f64,
    pub timing: PatternParams,
    pub alignment: PatternParams,
    pub position: PositionParams,
    /// Seed of [ModuleShape::RandomRound].
    pub seed: u64,
}

impl Default for BasicParams {
    fn default() -> Self {
        Self {
            shape: ModuleShape::default(),
            dark: Color::BLACK,
            light: Color::WHITE,
            opacity: 1.0,
            scale: 1.0,
            timing: PatternParams::default(),
            alignment: PatternParams::default(),
            position: PositionParams::default(),
            seed: 0,
        }
    }
}

impl BasicParams {
    pub fn with_shape(mut self, shape: ModuleShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_colors(mut self, dark: Color, light: Color) -> Self {
        self.dark = dark;
        self.light = light;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_position(mut self, style: PositionStyle) -> Self {
        self.position.style = style;
        self
    }

    pub fn with_timing(mut self, treatment: PatternTreatment) -> Self {
        self.timing.treatment = treatment;
        self
    }

    pub fn with_alignment(mut self, treatment: PatternTreatment) -> Self {
        self.alignment.treatment = treatment;
        self
    }

    pub fn with_timing_params(mut self, params: PatternParams) -> Self {
        self.timing = params;
        self
    }

    pub fn with_alignment_params(mut self, params: PatternParams) -> Self {
        self.alignment = params;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Parameters of the style drawing every dark module as two jittered, tinted squares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomRectangleParams {
    /// Base tint. Its alpha is the opacity of the squares.
    pub color: Color,
    /// Seed of the jitter; equal seeds give equal drawings.
    pub seed: u64,
}

impl Default for RandomRectangleParams {
    fn default() -> Self {
        Self {
            color: Color::rgb(20, 170, 60),
            seed: 0,
        }
    }
}

/// Parameters of the style showing the watermark image through the dark modules only.
///
/// Inside dark modules, `background` is painted first, then the watermark image, then `mask`.
/// Light modules show the backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFillParams {
    pub background: Color,
    /// Tint laid over the image, usually translucent.
    pub mask: Color,
}

impl Default for ImageFillParams {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            mask: Color::rgba(0, 0, 0, 0.1),
        }
    }
}

/// Style variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StyleKind {
    Basic(BasicParams),
    RandomRectangle(RandomRectangleParams),
    ImageFill(ImageFillParams),
}

impl Default for StyleKind {
    fn default() -> Self {
        StyleKind::Basic(BasicParams::default())
    }
}

/// Decoded image, either a single frame or an animation.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    Static(RgbaImage),
    Animated {
        frames: Vec<RgbaImage>,
        delays: Vec<Duration>,
    },
}

impl ImagePayload {
    /// Build an animation. Frames must share their dimensions and come with one delay each.
    pub fn animated(frames: Vec<RgbaImage>, delays: Vec<Duration>) -> Result<Self, Error> {
        let payload = Self::Animated { frames, delays };
        payload.check()?;
        Ok(payload)
    }

    /// Check that an animation has frames of a single size and one delay per frame.
    /// # Example
    /// ```
    /// use qrstyle_render::ImagePayload;
    /// let empty = ImagePayload::Animated { frames: vec![], delays: vec![] };
    /// assert!(empty.check().is_err());
    /// ```
    pub fn check(&self) -> Result<(), Error> {
        let ImagePayload::Animated { frames, delays } = self else {
            return Ok(());
        };
        let Some(first) = frames.first() else {
            return Err(Error::geometry("animation has no frames"));
        };
        if frames.len() != delays.len() {
            return Err(Error::geometry(format!(
                "animation has {} frames but {} delays",
                frames.len(),
                delays.len()
            )));
        }
        if frames.iter().any(|f| f.dimensions() != first.dimensions()) {
            return Err(Error::geometry("animation frames differ in size"));
        }
        Ok(())
    }

    /// Natural size of the image in pixels.
    pub fn size(&self) -> Size {
        let (width, height) = self.first_frame().dimensions();
        Size::new(width as f64, height as f64)
    }

    pub fn first_frame(&self) -> &RgbaImage {
        self.frame(0)
    }

    /// Frame shown at step `index`; animations loop.
    ///
    /// # Panics
    /// Panics on an animation without frames, see [ImagePayload::check].
    pub fn frame(&self, index: usize) -> &RgbaImage {
        match self {
            ImagePayload::Static(image) => image,
            ImagePayload::Animated { frames, .. } => &frames[index % frames.len()],
        }
    }

    pub fn frame_count(&self) -> usize {
        match self {
            ImagePayload::Static(_) => 1,
            ImagePayload::Animated { frames, .. } => frames.len(),
        }
    }

    /// Delays between frames, empty for static images.
    pub fn delays(&self) -> &[Duration] {
        match self {
            ImagePayload::Static(_) => &[],
            ImagePayload::Animated { delays, .. } => delays,
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, ImagePayload::Animated { .. })
    }
}

impl From<RgbaImage> for ImagePayload {
    fn from(value: RgbaImage) -> Self {
        ImagePayload::Static(value)
    }
}

/// Image laid over the center of the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct IconDescriptor {
    pub image: ImagePayload,
    pub mode: ImageMode,
    pub opacity: f64,
    /// Color of the backing square drawn behind the image.
    pub border_color: Color,
    /// Side of the icon relative to the side of the symbol. Capped by the recovery rate of the
    /// error correction level.
    pub percentage: f64,
}

impl IconDescriptor {
    pub fn new<I: Into<ImagePayload>>(image: I) -> Self {
        Self {
            image: image.into(),
            mode: ImageMode::ScaleAspectFill,
            opacity: 1.0,
            border_color: Color::WHITE,
            percentage: 0.2,
        }
    }

    pub fn with_mode(mut self, mode: ImageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_border_color(mut self, color: Color) -> Self {
        self.border_color = color;
        self
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.percentage = percentage;
        self
    }
}

/// Image drawn under the whole symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkDescriptor {
    pub image: ImagePayload,
    pub mode: ImageMode,
    pub opacity: f64,
    /// Draw modules on the middle third of their cell only, so the watermark shows around them.
    pub shrink_modules: bool,
}

impl WatermarkDescriptor {
    pub fn new<I: Into<ImagePayload>>(image: I) -> Self {
        Self {
            image: image.into(),
            mode: ImageMode::ScaleAspectFill,
            opacity: 1.0,
            shrink_modules: false,
        }
    }

    pub fn with_mode(mut self, mode: ImageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_shrunk_modules(mut self, shrink: bool) -> Self {
        self.shrink_modules = shrink;
        self
    }
}

/// Background behind the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backdrop {
    pub color: Color,
    /// Corner radius of the background, in modules.
    pub corner_radius: f64,
    /// Modules of empty margin around the grid.
    pub quiet_zone: usize,
}

impl Default for Backdrop {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            corner_radius: 0.0,
            quiet_zone: 1,
        }
    }
}

/// Everything that determines how a symbol is drawn. Images are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub style: StyleKind,
    pub backdrop: Backdrop,
    #[serde(skip)]
    pub icon: Option<IconDescriptor>,
    #[serde(skip)]
    pub watermark: Option<WatermarkDescriptor>,
}

impl StyleConfig {
    pub fn new(style: StyleKind) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    pub fn with_backdrop(mut self, backdrop: Backdrop) -> Self {
        self.backdrop = backdrop;
        self
    }

    pub fn with_icon(mut self, icon: IconDescriptor) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_watermark(mut self, watermark: WatermarkDescriptor) -> Self {
        self.watermark = Some(watermark);
        self
    }

    /// Whether modules are shrunk to the middle third of their cell, in which case raster
    /// magnifications must be multiples of 3.
    /// # Example
    /// ```
    /// use image::RgbaImage;
    /// use qrstyle_render::{StyleConfig, WatermarkDescriptor};
    /// let watermark = WatermarkDescriptor::new(RgbaImage::new(4, 4));
    /// let style = StyleConfig::default().with_watermark(watermark.clone());
    /// assert!(!style.requires_thirds());
    /// let style = StyleConfig::default().with_watermark(watermark.with_shrunk_modules(true));
    /// assert!(style.requires_thirds());
    /// ```
    pub fn requires_thirds(&self) -> bool {
        matches!(self.style, StyleKind::Basic(_))
            && self.watermark.as_ref().is_some_and(|w| w.shrink_modules)
    }
}
