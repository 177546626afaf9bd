//! Snapping of pixel sizes to the module grid.
//!
//! Magnifications stay integral so that module boundaries fall on pixel boundaries. When modules
//! are shrunk to the middle third of their cell the magnification must also be a multiple of 3.

use qrstyle_core::Error;

/// How many candidates below or above the estimate the magnification search looks at.
const SEARCH_WINDOW: usize = 4;

fn check_inputs(module_count: usize, target: f64) -> Result<(), Error> {
    if module_count == 0 {
        return Err(Error::geometry("module count must be positive"));
    }
    if !(target.is_finite() && target > 0.0) {
        return Err(Error::geometry(format!(
            "target size must be positive, got {}",
            target
        )));
    }
    Ok(())
}

/// Smallest integer size `>= target` that is a multiple of `module_count`.
/// # Example
/// ```
/// use qrstyle_render::sizing;
/// assert_eq!(sizing::min_suitable_size(21, 256.0), Ok(273));
/// assert_eq!(sizing::min_suitable_size(21, 273.0), Ok(273));
/// ```
pub fn min_suitable_size(module_count: usize, target: f64) -> Result<usize, Error> {
    check_inputs(module_count, target)?;
    let base = target.floor() as usize;
    (base..=base + module_count)
        .find(|&size| size as f64 >= target && size % module_count == 0)
        .ok_or(Error::NoFeasibleMagnification {
            modules: module_count,
            target,
        })
}

/// Largest magnification `m` with `m * module_count <= target`, a multiple of 3 if `thirds`.
///
/// The search starts from `floor(target / module_count)` (at least 1) and looks at most three steps
/// down. If it reaches zero, the smallest usable magnification (1, or 3 with `thirds`) is returned
/// even though the rendering will exceed `target`.
/// # Example
/// ```
/// use qrstyle_render::sizing;
/// assert_eq!(sizing::max_magnification(21, 600.0, false), Ok(28));
/// assert_eq!(sizing::max_magnification(21, 600.0, true), Ok(27));
/// ```
pub fn max_magnification(module_count: usize, target: f64, thirds: bool) -> Result<usize, Error> {
    check_inputs(module_count, target)?;
    let base = ((target / module_count as f64).floor() as usize).max(1);
    for offset in 0..SEARCH_WINDOW {
        let Some(candidate) = base.checked_sub(offset).filter(|&m| m > 0) else {
            let floor = if thirds { 3 } else { 1 };
            log::warn!(
                "{} modules do not fit in {} pixels, using magnification {}",
                module_count,
                target,
                floor
            );
            return Ok(floor);
        };
        if (candidate * module_count) as f64 <= target && (!thirds || candidate % 3 == 0) {
            return Ok(candidate);
        }
    }
    Err(Error::NoFeasibleMagnification {
        modules: module_count,
        target,
    })
}

/// Smallest magnification `m` with `m * module_count >= target`, a multiple of 3 if `thirds`.
///
/// The search starts from `floor(target / module_count)` (at least 1) and looks at most three steps
/// up.
/// # Example
/// ```
/// use qrstyle_render::sizing;
/// assert_eq!(sizing::min_magnification(21, 600.0, false), Ok(29));
/// assert_eq!(sizing::min_magnification(21, 600.0, true), Ok(30));
/// ```
pub fn min_magnification(module_count: usize, target: f64, thirds: bool) -> Result<usize, Error> {
    check_inputs(module_count, target)?;
    let base = ((target / module_count as f64).floor() as usize).max(1);
    (base..base + SEARCH_WINDOW)
        .find(|&m| (m * module_count) as f64 >= target && (!thirds || m % 3 == 0))
        .ok_or(Error::NoFeasibleMagnification {
            modules: module_count,
            target,
        })
}
