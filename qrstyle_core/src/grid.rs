use bitvec::vec::BitVec;

use crate::{Error, PixelView};

/// Module (aka, a cell) of a QR code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Module {
    Light,
    Dark,
}

impl Module {
    pub fn is_dark(&self) -> bool {
        matches!(self, Module::Dark)
    }
}

impl From<bool> for Module {
    fn from(value: bool) -> Self {
        if value {
            Module::Dark
        } else {
            Module::Light
        }
    }
}

impl From<Module> for bool {
    fn from(value: Module) -> Self {
        value.is_dark()
    }
}

/// A square matrix of bits stored row by row.
#[derive(Clone, PartialEq, Eq)]
struct BitMatrix {
    data: BitVec,
    size: usize,
}

impl BitMatrix {
    fn filled(size: usize, value: bool) -> Self {
        Self {
            data: BitVec::repeat(value, size * size),
            size,
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.size && y < self.size {
            Some(self.size * y + x)
        } else {
            None
        }
    }

    #[inline]
    fn get(&self, x: usize, y: usize) -> Option<bool> {
        self.data.get(self.index(x, y)?).map(|bit| *bit)
    }

    /// # Panics
    /// Panics if position `(x, y)` is out of bounds.
    #[inline]
    fn set(&mut self, x: usize, y: usize, value: bool) {
        let index = self.index(x, y).unwrap_or_else(|| {
            panic!(
                "index out of bounds: the size is {} but the index is ({}, {})",
                self.size, x, y
            )
        });
        self.data.set(index, value)
    }
}

/// The square module matrix produced by the external codec. Immutable once built.
///
/// Coordinates are `(x, y)`: `x` is the column, `y` the row, `(0, 0)` is the top-left module.
#[derive(Clone, PartialEq, Eq)]
pub struct ModuleGrid {
    matrix: BitMatrix,
}

impl ModuleGrid {
    /// Return a grid of side `size` filled with `module`.
    pub fn filled(size: usize, module: Module) -> Self {
        Self {
            matrix: BitMatrix::filled(size, module.into()),
        }
    }

    /// Build a grid from rows of booleans (`true` is dark). Every row must be as long as there are
    /// rows.
    /// # Example
    /// ```
    /// use qrstyle_core::{Module, ModuleGrid};
    /// let grid = ModuleGrid::from_rows(&[vec![true, false], vec![false, true]]).unwrap();
    /// assert_eq!(grid.get(1, 0), Some(Module::Light));
    /// assert_eq!(grid.get(1, 1), Some(Module::Dark));
    /// ```
    pub fn from_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<Self, Error> {
        let size = rows.len();
        if size == 0 {
            return Err(Error::geometry("module grid has no rows"));
        }
        let mut matrix = BitMatrix::filled(size, false);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != size {
                return Err(Error::geometry(format!(
                    "module grid row {} has {} modules, expected {}",
                    y,
                    row.len(),
                    size
                )));
            }
            for (x, &dark) in row.iter().enumerate() {
                matrix.set(x, y, dark);
            }
        }
        Ok(Self { matrix })
    }

    /// Parse a textual grid, one row per line. `#`, `1` and `█` are dark; `.`, `0` and spaces are
    /// light. Empty lines are ignored.
    /// # Example
    /// ```
    /// use qrstyle_core::ModuleGrid;
    /// let grid = ModuleGrid::from_text("#.\n.#\n").unwrap();
    /// assert_eq!(grid.size(), 2);
    /// assert!(grid.is_dark(0, 0));
    /// ```
    pub fn from_text(text: &str) -> Result<Self, Error> {
        let rows = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.chars()
                    .map(|c| match c {
                        '#' | '1' | '█' => Ok(true),
                        '.' | '0' | ' ' => Ok(false),
                        other => Err(Error::geometry(format!(
                            "unexpected character '{}' in module grid",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<bool>, Error>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(&rows)
    }

    /// Read a rendering made of exactly one pixel per module. Pure black pixels are dark whatever
    /// their alpha, everything else is light.
    pub fn from_pixels(view: &PixelView) -> Result<Self, Error> {
        if view.width() != view.height() {
            return Err(Error::geometry(format!(
                "module image must be square, got {}x{}",
                view.width(),
                view.height()
            )));
        }
        let mut matrix = BitMatrix::filled(view.width(), false);
        for (x, y, [r, g, b, _]) in view.pixels() {
            matrix.set(x, y, r == 0 && g == 0 && b == 0);
        }
        Ok(Self { matrix })
    }

    /// Get the side of the grid.
    #[inline]
    pub fn size(&self) -> usize {
        self.matrix.size
    }

    /// Get the module at position `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Module> {
        self.matrix.get(x, y).map(Module::from)
    }

    /// Whether the module at `(x, y)` is dark. Out-of-bounds positions read as light.
    #[inline]
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.matrix.get(x, y).unwrap_or(false)
    }

    /// Set the module at position `(x, y)`.
    /// # Panics
    /// Panics if position `(x, y)` is out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: Module) {
        self.matrix.set(x, y, value.into())
    }

    /// Iterate over `(x, y, module)` in row-major order.
    pub fn modules(&self) -> impl Iterator<Item = (usize, usize, Module)> + '_ {
        let size = self.size();
        self.matrix
            .data
            .iter()
            .by_vals()
            .enumerate()
            .map(move |(index, bit)| (index % size, index / size, Module::from(bit)))
    }

    /// Number of dark modules.
    pub fn count_dark(&self) -> usize {
        self.matrix.data.count_ones()
    }
}

impl AsRef<ModuleGrid> for ModuleGrid {
    fn as_ref(&self) -> &ModuleGrid {
        self
    }
}

impl std::fmt::Debug for ModuleGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ModuleGrid({}) {{", self.size())?;
        for y in 0..self.size() {
            write!(f, "    ")?;
            for x in 0..self.size() {
                write!(f, "{}", if self.is_dark(x, y) { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}
