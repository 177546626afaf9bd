use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use itertools::iproduct;

use crate::qrstandard::{self, ALIGNMENT_RADIUS, FINDER_BLOCK_SIZE, FINDER_SIZE, TIMING_POS};
use crate::{Error, ModuleGrid, Version};

/// Structural role of a module. Roles depend on the position and the grid layout only, never on
/// the module value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleRole {
    /// Quiet zone frame around the symbol.
    Border,
    /// One of the three corner finder blocks (finder pattern plus separator).
    FinderPattern,
    TimingPattern,
    AlignmentPattern,
    Data,
}

impl ModuleRole {
    pub const ALL: [ModuleRole; 5] = [
        ModuleRole::Border,
        ModuleRole::FinderPattern,
        ModuleRole::TimingPattern,
        ModuleRole::AlignmentPattern,
        ModuleRole::Data,
    ];

    /// Single character tag used in role maps.
    pub fn symbol(self) -> char {
        match self {
            ModuleRole::Border => '-',
            ModuleRole::FinderPattern => 'F',
            ModuleRole::TimingPattern => 'T',
            ModuleRole::AlignmentPattern => 'A',
            ModuleRole::Data => '.',
        }
    }
}

/// Classify module `(x, y)` of a `dimension` x `dimension` grid made of a symbol surrounded by a
/// frame of `border` modules, given the alignment pattern `centers` of the symbol.
///
/// Rules are evaluated in order and the first match wins: border, finder block, timing row and
/// column, alignment pattern, data. Alignment patterns whose center falls inside a finder block are
/// not placed.
/// # Example
/// ```
/// use qrstyle_core::{roles, ModuleRole};
/// // Version 1 symbol with a one module frame.
/// assert_eq!(roles::classify(0, 5, 23, 1, &[]), ModuleRole::Border);
/// assert_eq!(roles::classify(8, 8, 23, 1, &[]), ModuleRole::FinderPattern);
/// assert_eq!(roles::classify(7, 12, 23, 1, &[]), ModuleRole::TimingPattern);
/// assert_eq!(roles::classify(12, 12, 23, 1, &[]), ModuleRole::Data);
/// ```
pub fn classify(
    x: usize,
    y: usize,
    dimension: usize,
    border: usize,
    centers: &[usize],
) -> ModuleRole {
    debug_assert!(x < dimension && y < dimension);
    let symbol = dimension.saturating_sub(2 * border);
    if x < border || y < border || x >= border + symbol || y >= border + symbol {
        return ModuleRole::Border;
    }
    let (sx, sy) = (x - border, y - border);
    if in_finder_block(sx, sy, symbol) {
        return ModuleRole::FinderPattern;
    }
    if sx == TIMING_POS || sy == TIMING_POS {
        return ModuleRole::TimingPattern;
    }
    let in_alignment = iproduct!(centers, centers)
        .filter(|&(&cx, &cy)| !in_finder_block(cx, cy, symbol))
        .any(|(&cx, &cy)| {
            sx.abs_diff(cx) <= ALIGNMENT_RADIUS && sy.abs_diff(cy) <= ALIGNMENT_RADIUS
        });
    if in_alignment {
        ModuleRole::AlignmentPattern
    } else {
        ModuleRole::Data
    }
}

/// Whether symbol coordinate `(sx, sy)` lies in one of the three corner finder blocks.
fn in_finder_block(sx: usize, sy: usize, symbol: usize) -> bool {
    let far = symbol.saturating_sub(FINDER_BLOCK_SIZE);
    (sx < FINDER_BLOCK_SIZE && sy < FINDER_BLOCK_SIZE)
        || (sx < FINDER_BLOCK_SIZE && sy >= far)
        || (sx >= far && sy < FINDER_BLOCK_SIZE)
}

/// Role of every module of a framed symbol, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    roles: Vec<ModuleRole>,
    dimension: usize,
    border: usize,
}

impl RoleTable {
    /// Classify every module of a `version` symbol surrounded by a frame of `border` modules.
    /// # Example
    /// ```
    /// use qrstyle_core::{ModuleRole, RoleTable, Version};
    /// let table = RoleTable::new(Version::MIN, 0);
    /// assert_eq!(table.dimension(), 21);
    /// assert_eq!(table.role(0, 0), ModuleRole::FinderPattern);
    /// assert_eq!(table.role(20, 20), ModuleRole::Data);
    /// ```
    pub fn new(version: Version, border: usize) -> Self {
        let dimension = qrstandard::symbol_size(version) + 2 * border;
        let centers = qrstandard::alignment_pattern_positions(version);
        let roles = iproduct!(0..dimension, 0..dimension)
            .map(|(y, x)| classify(x, y, dimension, border, &centers))
            .collect();
        Self {
            roles,
            dimension,
            border,
        }
    }

    /// Wrap a role table computed elsewhere. `roles` is read row by row and must cover a framed
    /// symbol of a valid version.
    pub fn from_roles(
        dimension: usize,
        border: usize,
        roles: Vec<ModuleRole>,
    ) -> Result<Self, Error> {
        let symbol = dimension.checked_sub(2 * border).ok_or_else(|| {
            Error::geometry(format!(
                "border {} does not fit in {} modules",
                border, dimension
            ))
        })?;
        qrstandard::version_for_symbol_size(symbol)?;
        if roles.len() != dimension * dimension {
            return Err(Error::geometry(format!(
                "role table has {} entries, expected {}",
                roles.len(),
                dimension * dimension
            )));
        }
        Ok(Self {
            roles,
            dimension,
            border,
        })
    }

    /// Side of the table, frame included.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Width of the frame around the symbol.
    #[inline]
    pub fn border(&self) -> usize {
        self.border
    }

    /// Version of the symbol the table describes.
    pub fn version(&self) -> Result<Version, Error> {
        qrstandard::version_for_symbol_size(self.dimension - 2 * self.border)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<ModuleRole> {
        if x < self.dimension && y < self.dimension {
            Some(self.roles[y * self.dimension + x])
        } else {
            None
        }
    }

    /// Get the role of module `(x, y)`.
    /// # Panics
    /// Panics if position `(x, y)` is out of bounds.
    #[inline]
    pub fn role(&self, x: usize, y: usize) -> ModuleRole {
        self.get(x, y).unwrap_or_else(|| {
            panic!(
                "index out of bounds: the size is {} but the index is ({}, {})",
                self.dimension, x, y
            )
        })
    }

    /// Iterate over `(x, y, role)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, ModuleRole)> + '_ {
        self.roles
            .iter()
            .enumerate()
            .map(|(index, &role)| (index % self.dimension, index / self.dimension, role))
    }

    /// Number of modules with `role`.
    pub fn count(&self, role: ModuleRole) -> usize {
        self.roles.iter().filter(|&&r| r == role).count()
    }

    /// Grid coordinates of the three finder pattern centers: top-left, top-right, bottom-left.
    pub fn finder_centers(&self) -> [(usize, usize); 3] {
        let symbol = self.dimension - 2 * self.border;
        qrstandard::finder_origins(symbol).map(|(x, y)| {
            (
                self.border + x + FINDER_SIZE / 2,
                self.border + y + FINDER_SIZE / 2,
            )
        })
    }

    /// Whether `(x, y)` is the center module of a finder pattern.
    pub fn is_finder_center(&self, x: usize, y: usize) -> bool {
        self.finder_centers().contains(&(x, y))
    }

    /// Fail unless `grid` has the dimension of this table.
    pub fn check_grid(&self, grid: &ModuleGrid) -> Result<(), Error> {
        if grid.size() == self.dimension {
            Ok(())
        } else {
            Err(Error::geometry(format!(
                "module grid of side {} does not match role table of side {}",
                grid.size(),
                self.dimension
            )))
        }
    }
}

/// Memo of role tables keyed by version and frame width.
///
/// Tables are computed on first use and never invalidated, so readers only contend with the single
/// writer inserting a missing entry.
#[derive(Debug, Default)]
pub struct RoleCache {
    tables: RwLock<HashMap<(Version, usize), Arc<RoleTable>>>,
}

impl RoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the table for `version` and `border`, computing it if needed.
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use qrstyle_core::{RoleCache, Version};
    /// let cache = RoleCache::new();
    /// let first = cache.get(Version::MIN, 1);
    /// let second = cache.get(Version::MIN, 1);
    /// assert!(Arc::ptr_eq(&first, &second));
    /// assert_eq!(cache.len(), 1);
    /// ```
    pub fn get(&self, version: Version, border: usize) -> Arc<RoleTable> {
        let key = (version, border);
        if let Some(table) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(table);
        }
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .entry(key)
            .or_insert_with(|| {
                log::debug!("classifying {} symbol with a {} module frame", version, border);
                Arc::new(RoleTable::new(version, border))
            });
        Arc::clone(table)
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
