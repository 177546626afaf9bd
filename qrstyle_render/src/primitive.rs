use std::ops::Range;

use qrstyle_core::{Color, ModuleGrid, Point, Rect};

use crate::{Backdrop, ImageMode, ImagePayload};

/// Which configured image an image primitive draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Watermark,
    Icon,
}

/// Geometry and paint of a primitive, in module units. `(0, 0)` is the top-left corner of the
/// top-left module of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect {
        rect: Rect,
        corner_radius: f64,
        fill: Color,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Color,
    },
    /// Circle outline, optionally dashed with equal dashes and gaps of length `dash`.
    Ring {
        center: Point,
        radius: f64,
        stroke_width: f64,
        dash: Option<f64>,
        stroke: Color,
    },
    /// Outline of a rounded rectangle, the stroke centered on its edge.
    Frame {
        rect: Rect,
        corner_radius: f64,
        stroke_width: f64,
        stroke: Color,
    },
    /// Image stretched over `placement` and clipped to `clip`.
    Image {
        slot: ImageSlot,
        mode: ImageMode,
        placement: Rect,
        clip: Rect,
    },
}

/// One emitted shape. `id` orders primitives from bottom to top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawPrimitive {
    pub id: usize,
    pub shape: Shape,
    /// Multiplies the alpha of the paint.
    pub opacity: f64,
}

/// Run of primitives only visible inside the dark modules of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMask {
    pub modules: ModuleGrid,
    /// Ids of the masked primitives.
    pub primitives: Range<usize>,
}

impl ModuleMask {
    /// Whether `point`, in module units, lies in a dark module.
    /// # Example
    /// ```
    /// use qrstyle_core::{ModuleGrid, Point};
    /// use qrstyle_render::ModuleMask;
    /// let modules = ModuleGrid::from_text("#.\n..").unwrap();
    /// let mask = ModuleMask { modules, primitives: 0..1 };
    /// assert!(mask.reveals(Point::new(0.5, 0.5)));
    /// assert!(!mask.reveals(Point::new(1.5, 0.5)));
    /// assert!(!mask.reveals(Point::new(-0.5, 0.5)));
    /// ```
    pub fn reveals(&self, point: Point) -> bool {
        if point.x < 0.0 || point.y < 0.0 {
            return false;
        }
        self.modules
            .is_dark(point.x.floor() as usize, point.y.floor() as usize)
    }

    /// Whether the primitive `id` is masked.
    pub fn applies_to(&self, id: usize) -> bool {
        self.primitives.contains(&id)
    }
}

/// Result of styling a symbol: an ordered primitive list and the images it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing<'s> {
    /// Side of the module grid.
    pub dimension: usize,
    pub backdrop: Backdrop,
    pub primitives: Vec<DrawPrimitive>,
    pub watermark: Option<&'s ImagePayload>,
    pub icon: Option<&'s ImagePayload>,
    pub mask: Option<ModuleMask>,
}

impl<'s> Drawing<'s> {
    /// Image bound to `slot`, if configured.
    pub fn image(&self, slot: ImageSlot) -> Option<&'s ImagePayload> {
        match slot {
            ImageSlot::Watermark => self.watermark,
            ImageSlot::Icon => self.icon,
        }
    }

    /// Side of the drawing in modules, quiet zone included.
    pub fn extent(&self) -> usize {
        self.dimension + 2 * self.backdrop.quiet_zone
    }

    /// Number of frames needed to show every animated image at least once.
    pub fn frame_count(&self) -> usize {
        [self.watermark, self.icon]
            .into_iter()
            .flatten()
            .map(ImagePayload::frame_count)
            .max()
            .unwrap_or(1)
    }

    /// Delays of the longest animation, empty if nothing is animated.
    pub fn frame_delays(&self) -> &'s [std::time::Duration] {
        [self.watermark, self.icon]
            .into_iter()
            .flatten()
            .max_by_key(|image| image.frame_count())
            .map(ImagePayload::delays)
            .unwrap_or(&[])
    }
}

/// Sequential id source for emitted primitives.
#[derive(Debug, Default)]
pub(crate) struct Emitter {
    primitives: Vec<DrawPrimitive>,
}

impl Emitter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            primitives: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, shape: Shape, opacity: f64) {
        let id = self.primitives.len();
        self.primitives.push(DrawPrimitive { id, shape, opacity });
    }

    pub(crate) fn len(&self) -> usize {
        self.primitives.len()
    }

    pub(crate) fn finish(self) -> Vec<DrawPrimitive> {
        self.primitives
    }
}
