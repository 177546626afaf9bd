mod color;
mod error;
mod geometry;
mod grid;
mod meta;
mod pixels;
pub mod qrstandard;
pub mod roles;

pub use color::Color;
pub use error::Error;
pub use geometry::{IntSize, Point, Rect, Size};
pub use grid::{Module, ModuleGrid};
pub use meta::{Ecl, Meta, Version};
pub use pixels::{PixelView, CHANNELS};
pub use roles::{ModuleRole, RoleCache, RoleTable};

/// QR symbol as handed over by the codec: the module grid, possibly surrounded by a quiet zone
/// frame, and its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    grid: ModuleGrid,
    meta: Meta,
    border: usize,
}

impl Symbol {
    /// Construct a new [Symbol]. The width of the frame is inferred from the difference between the
    /// grid side and the symbol side implied by the [Version]; fails if that difference is negative
    /// or odd.
    /// # Example
    /// ```
    /// use qrstyle_core::{Ecl, Meta, Module, ModuleGrid, Symbol, Version};
    /// let meta = Meta::new(Version::MIN, Ecl::H);
    /// let symbol = Symbol::new(ModuleGrid::filled(23, Module::Light), meta).unwrap();
    /// assert_eq!(symbol.border(), 1);
    /// assert!(Symbol::new(ModuleGrid::filled(22, Module::Light), meta).is_err());
    /// ```
    pub fn new(grid: ModuleGrid, meta: Meta) -> Result<Self, Error> {
        let symbol_size = meta.symbol_size();
        let frame = grid.size().checked_sub(symbol_size).ok_or_else(|| {
            Error::geometry(format!(
                "grid of side {} is smaller than a {} symbol",
                grid.size(),
                meta.version
            ))
        })?;
        if frame % 2 != 0 {
            return Err(Error::geometry(format!(
                "grid of side {} does not frame a {} symbol evenly",
                grid.size(),
                meta.version
            )));
        }
        Ok(Self {
            grid,
            meta,
            border: frame / 2,
        })
    }

    /// Construct a [Symbol] from a grid surrounded by a frame of `border` modules, inferring the
    /// version from its side.
    pub fn from_grid(grid: ModuleGrid, ecl: Ecl, border: usize) -> Result<Self, Error> {
        let symbol_size = grid.size().checked_sub(2 * border).ok_or_else(|| {
            Error::geometry(format!(
                "border {} does not fit in a grid of side {}",
                border,
                grid.size()
            ))
        })?;
        let version = qrstandard::version_for_symbol_size(symbol_size)?;
        Self::new(grid, Meta::new(version, ecl))
    }

    /// Get the underlying grid.
    pub fn grid(&self) -> &ModuleGrid {
        &self.grid
    }

    /// Get the metadata.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Width of the quiet zone frame included in the grid.
    pub fn border(&self) -> usize {
        self.border
    }

    /// Side of the grid, frame included.
    pub fn dimension(&self) -> usize {
        self.grid.size()
    }

    /// Classify every module of the grid.
    pub fn roles(&self) -> RoleTable {
        RoleTable::new(self.meta.version, self.border)
    }
}

impl AsRef<ModuleGrid> for Symbol {
    fn as_ref(&self) -> &ModuleGrid {
        self.grid()
    }
}

impl From<Symbol> for ModuleGrid {
    fn from(value: Symbol) -> Self {
        value.grid
    }
}
