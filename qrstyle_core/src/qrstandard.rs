use crate::{Error, Version};

/// Side of a finder pattern in modules.
pub const FINDER_SIZE: usize = 1 + 1 + 3 + 1 + 1;
/// Side of a finder pattern together with its light separator.
pub const FINDER_BLOCK_SIZE: usize = FINDER_SIZE + 1;
/// Row and column carrying the timing patterns.
pub const TIMING_POS: usize = 6;
/// Distance from an alignment pattern center to its outer ring.
pub const ALIGNMENT_RADIUS: usize = 2;

/// Determine the side of the symbol in modules for the given `version`.
/// # Example
/// ```
/// use qrstyle_core::{qrstandard, Version};
/// assert_eq!(qrstandard::symbol_size(Version::MIN), 21);
/// assert_eq!(qrstandard::symbol_size(Version::MAX), 177);
/// ```
pub fn symbol_size(version: Version) -> usize {
    17 + version.number() as usize * 4
}

/// Inverse of [symbol_size].
/// # Example
/// ```
/// use qrstyle_core::{qrstandard, Version};
/// assert_eq!(qrstandard::version_for_symbol_size(25).map(Version::number), Ok(2));
/// assert!(qrstandard::version_for_symbol_size(26).is_err());
/// ```
pub fn version_for_symbol_size(size: usize) -> Result<Version, Error> {
    if size < 21 || (size - 17) % 4 != 0 {
        return Err(Error::geometry(format!(
            "{} is not the side of a QR symbol (17 + 4 * version)",
            size
        )));
    }
    let number = (size - 17) / 4;
    u8::try_from(number)
        .map_err(|_| Error::UnsupportedVersion(u8::MAX))
        .and_then(Version::new)
}

/// Number of alignment pattern coordinates along one axis for `version`.
pub fn num_alignment_coordinates(version: Version) -> usize {
    match version.number() {
        1 => 0,
        v => 2 + v as usize / 7,
    }
}

/// Coordinates, along either axis, of the alignment pattern centers of `version`.
///
/// The list starts at the timing row (6) and ends seven modules before the far edge; the
/// coordinates in between are evenly spaced by an even step. Version 1 has no alignment patterns.
/// # Example
/// ```
/// use qrstyle_core::{qrstandard, Version};
/// let v1 = Version::new(1).unwrap();
/// let v7 = Version::new(7).unwrap();
/// assert!(qrstandard::alignment_pattern_positions(v1).is_empty());
/// assert_eq!(qrstandard::alignment_pattern_positions(v7), vec![6, 22, 38]);
/// ```
pub fn alignment_pattern_positions(version: Version) -> Vec<usize> {
    let divisions = num_alignment_coordinates(version);
    if divisions == 0 {
        return Vec::new();
    }
    let size = symbol_size(version);
    let last = size - FINDER_SIZE;
    let step = alignment_step(version, divisions);
    let mut coords = Vec::with_capacity(divisions);
    coords.push(TIMING_POS);
    coords.extend((0..divisions - 1).rev().map(|i| last - i * step));
    coords
}

/// Spacing between consecutive alignment coordinates, always even.
fn alignment_step(version: Version, divisions: usize) -> usize {
    // Version 32 is the only one where the rounding rule picks the wrong step.
    if version.number() == 32 {
        return 26;
    }
    let v = version.number() as usize;
    (4 * v + 2 * divisions + 1) / (2 * divisions - 2) * 2
}

/// Same as [alignment_pattern_positions] for a raw version number.
pub fn locate(version: u8) -> Result<Vec<usize>, Error> {
    Version::new(version).map(alignment_pattern_positions)
}

/// Top-left corners, in symbol coordinates, of the three finder patterns of a symbol of side
/// `size`.
pub fn finder_origins(size: usize) -> [(usize, usize); 3] {
    let far = size - FINDER_SIZE;
    [(0, 0), (far, 0), (0, far)]
}
