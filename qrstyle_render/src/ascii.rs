use std::io::Write;

use qrstyle_core::{ModuleGrid, RoleTable};

/// Terminal sink printing one pattern per module, with an optional quiet zone of light modules.
pub struct AsciiRenderer {
    light_pattern: Box<str>,
    dark_pattern: Box<str>,
    quiet_zone: usize,
}

impl AsciiRenderer {
    /// Construct a new [AsciiRenderer] that uses "██" to render dark modules and "  " to print light
    /// ones, without quiet zone.
    pub fn new() -> Self {
        Self {
            light_pattern: "  ".into(),
            dark_pattern: "██".into(),
            quiet_zone: 0,
        }
    }

    /// Set the light module `pattern` to be used when rendering.
    pub fn with_light_pattern(mut self, pattern: &str) -> Self {
        self.light_pattern = pattern.into();
        self
    }

    /// Set the dark module `pattern` to be used when rendering.
    pub fn with_dark_pattern(mut self, pattern: &str) -> Self {
        self.dark_pattern = pattern.into();
        self
    }

    /// Surround the grid with `modules` light modules on every side.
    pub fn with_quiet_zone(mut self, modules: usize) -> Self {
        self.quiet_zone = modules;
        self
    }

    /// Invert the light and dark patterns.
    pub fn inverted(mut self) -> Self {
        std::mem::swap(&mut self.light_pattern, &mut self.dark_pattern);
        self
    }

    /// Peek at the pattern used to render light modules.
    pub fn light_pattern(&self) -> &str {
        self.light_pattern.as_ref()
    }

    /// Peek at the pattern used to render dark modules.
    pub fn dark_pattern(&self) -> &str {
        self.dark_pattern.as_ref()
    }

    /// Render the `grid` into `output`.
    /// # Example
    /// ```
    /// use qrstyle_core::ModuleGrid;
    /// use qrstyle_render::AsciiRenderer;
    /// let grid = ModuleGrid::from_text("#.\n.#").unwrap();
    /// let mut output = Vec::new();
    /// let renderer = AsciiRenderer::new().with_dark_pattern("#").with_light_pattern(".");
    /// renderer.render(&mut output, &grid).unwrap();
    /// assert_eq!(String::from_utf8(output).unwrap(), "#.\n.#\n");
    /// ```
    pub fn render<G, W>(&self, output: &mut W, grid: G) -> std::io::Result<()>
    where
        G: AsRef<ModuleGrid>,
        W: Write,
    {
        let grid = grid.as_ref();
        let side = grid.size() + 2 * self.quiet_zone;
        for y in 0..side {
            for x in 0..side {
                let dark = x
                    .checked_sub(self.quiet_zone)
                    .zip(y.checked_sub(self.quiet_zone))
                    .is_some_and(|(x, y)| grid.is_dark(x, y));
                let pattern = if dark {
                    self.dark_pattern()
                } else {
                    self.light_pattern()
                };
                write!(output, "{}", pattern)?;
            }
            writeln!(output)?;
        }
        Ok(())
    }
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Print the role of every module of `roles` as one character.
/// See [qrstyle_core::ModuleRole::symbol].
pub fn render_roles<W: Write>(output: &mut W, roles: &RoleTable) -> std::io::Result<()> {
    for y in 0..roles.dimension() {
        let row: String = (0..roles.dimension())
            .map(|x| roles.role(x, y).symbol())
            .collect();
        writeln!(output, "{}", row)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use qrstyle_core::{Module, Version};

    #[test]
    fn test_quiet_zone_and_inversion() {
        let grid = ModuleGrid::filled(1, Module::Dark);
        let mut output = Vec::new();
        AsciiRenderer::new()
            .with_dark_pattern("X")
            .with_light_pattern("_")
            .with_quiet_zone(1)
            .render(&mut output, &grid)
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "___\n_X_\n___\n");

        let renderer = AsciiRenderer::new().inverted();
        assert_eq!(renderer.dark_pattern(), "  ");
        assert_eq!(renderer.light_pattern(), "██");
    }

    #[test]
    fn test_render_roles() {
        let roles = RoleTable::new(Version::MIN, 1);
        let mut output = Vec::new();
        render_roles(&mut output, &roles).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 23);
        assert_eq!(lines[0], "-".repeat(23));
        assert!(lines[1].starts_with("-FFFFFFFF"));
        assert_eq!(&lines[7][8..10], "FT");
    }
}
