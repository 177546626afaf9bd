use crate::Error;

/// Width and height in arbitrary units (modules, pixels, ...).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A square of side `side`.
    pub const fn square(side: f64) -> Self {
        Self::new(side, side)
    }

    /// Ratio `width / height`.
    /// # Example
    /// ```
    /// use qrstyle_core::Size;
    /// assert_eq!(Size::new(300.0, 150.0).aspect_ratio(), 2.0);
    /// ```
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Multiply both dimensions by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// Whether both dimensions are strictly positive and finite.
    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Return `self` if [Size::is_positive], otherwise an [Error::InvalidGeometry] naming `what`.
    pub fn ensure_positive(self, what: &str) -> Result<Self, Error> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(Error::geometry(format!(
                "{} must have positive dimensions, got {}x{}",
                what, self.width, self.height
            )))
        }
    }
}

impl From<IntSize> for Size {
    fn from(value: IntSize) -> Self {
        Self::new(value.width as f64, value.height as f64)
    }
}

/// Integer size, used for pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntSize {
    pub width: u32,
    pub height: u32,
}

impl IntSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle with its origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub const fn from_parts(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Rectangle of `size` at the origin.
    pub const fn with_size(size: Size) -> Self {
        Self::from_parts(Point::ORIGIN, size)
    }

    /// Rectangle of `size` centered in `container`.
    /// # Example
    /// ```
    /// use qrstyle_core::{Rect, Size};
    /// let container = Rect::new(0.0, 0.0, 10.0, 10.0);
    /// let centered = Rect::centered_in(Size::new(4.0, 2.0), container);
    /// assert_eq!(centered, Rect::new(3.0, 4.0, 4.0, 2.0));
    /// ```
    pub fn centered_in(size: Size, container: Rect) -> Self {
        Self::new(
            container.min_x() + (container.width() - size.width) / 2.0,
            container.min_y() + (container.height() - size.height) / 2.0,
            size.width,
            size.height,
        )
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Shrink (or grow, for negative `amount`) the rectangle by `amount` on every side.
    pub fn inset(&self, amount: f64) -> Self {
        Self::new(
            self.origin.x + amount,
            self.origin.y + amount,
            self.size.width - 2.0 * amount,
            self.size.height - 2.0 * amount,
        )
    }

    /// Translate by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::from_parts(self.origin.offset(dx, dy), self.size)
    }

    /// Whether `point` lies inside the half-open rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.min_y() >= self.min_y()
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }
}
