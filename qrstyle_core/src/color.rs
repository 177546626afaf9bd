use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// An sRGB color with 8-bit channels and a floating point alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    alpha: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        alpha: 0.0,
    };

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    /// Color with an explicit `alpha`, which is clamped to `0.0..=1.0`.
    pub fn rgba(r: u8, g: u8, b: u8, alpha: f64) -> Self {
        Self::rgb(r, g, b).with_alpha(alpha)
    }

    /// Build a color from normalized components in `0.0..=1.0`.
    /// # Example
    /// ```
    /// use qrstyle_core::Color;
    /// assert_eq!(Color::from_components(1.0, 0.0, 0.0, 1.0), Ok(Color::rgb(255, 0, 0)));
    /// assert!(Color::from_components(1.5, 0.0, 0.0, 1.0).is_err());
    /// ```
    pub fn from_components(r: f64, g: f64, b: f64, alpha: f64) -> Result<Self, Error> {
        let channel = |value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok((value * 255.0).round() as u8)
            } else {
                Err(Error::ColorConversionFailure(format!(
                    "({}, {}, {}, {})",
                    r, g, b, alpha
                )))
            }
        };
        channel(alpha)?;
        Ok(Self {
            r: channel(r)?,
            g: channel(g)?,
            b: channel(b)?,
            alpha,
        })
    }

    /// Replace the alpha, clamping it to `0.0..=1.0`. NaN becomes fully transparent.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = if alpha.is_nan() {
            0.0
        } else {
            alpha.clamp(0.0, 1.0)
        };
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }

    /// `[r, g, b, a]` bytes, alpha scaled by `opacity`.
    pub fn to_rgba8(&self, opacity: f64) -> [u8; 4] {
        let alpha = (self.alpha * opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        [self.r, self.g, self.b, alpha]
    }

    /// Lowercase `#rrggbb`, ignoring alpha.
    /// # Example
    /// ```
    /// use qrstyle_core::Color;
    /// assert_eq!(Color::rgb(255, 16, 0).hex_string(), "#ff1000");
    /// ```
    pub fn hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_opaque() {
            write!(f, "{}", self.hex_string())
        } else {
            write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, self.alpha)
        }
    }
}

impl std::str::FromStr for Color {
    type Err = Error;

    /// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `rgb(r,g,b)`, `rgba(r,g,b,a)` or one of `black`,
    /// `white` and `transparent`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let failure = || Error::ColorConversionFailure(s.to_string());
        match s.to_ascii_lowercase().as_str() {
            "black" => return Ok(Self::BLACK),
            "white" => return Ok(Self::WHITE),
            "transparent" => return Ok(Self::TRANSPARENT),
            _ => {}
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(failure);
        }
        if let Some(body) = function_body(s, "rgba") {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if let [r, g, b, a] = parts[..] {
                let alpha: f64 = a.parse().map_err(|_| failure())?;
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(failure());
                }
                return Ok(Self::rgba(
                    r.parse().map_err(|_| failure())?,
                    g.parse().map_err(|_| failure())?,
                    b.parse().map_err(|_| failure())?,
                    alpha,
                ));
            }
            return Err(failure());
        }
        if let Some(body) = function_body(s, "rgb") {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if let [r, g, b] = parts[..] {
                return Ok(Self::rgb(
                    r.parse().map_err(|_| failure())?,
                    g.parse().map_err(|_| failure())?,
                    b.parse().map_err(|_| failure())?,
                ));
            }
        }
        Err(failure())
    }
}

fn function_body<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok().map(|d| d * 17);
            Some(Color::rgb(digit(0)?, digit(1)?, digit(2)?))
        }
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            byte(6)? as f64 / 255.0,
        )),
        _ => None,
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
