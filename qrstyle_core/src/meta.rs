use serde::{Deserialize, Serialize};

use crate::{qrstandard, Error};

/// Metadata the codec hands over together with the module grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub version: Version,
    pub ecl: Ecl,
}

impl Meta {
    pub fn new(version: Version, ecl: Ecl) -> Self {
        Self { version, ecl }
    }

    /// Side of the symbol in modules, without any frame.
    pub fn symbol_size(&self) -> usize {
        qrstandard::symbol_size(self.version)
    }
}

/// Version of a QR code, which determines its size. Only values in `1..=40` can be constructed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u8);

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    /// Construct a new version given its number.
    /// # Example
    /// ```
    /// use qrstyle_core::{Error, Version};
    /// assert!(Version::new(1).is_ok());
    /// assert_eq!(Version::new(41), Err(Error::UnsupportedVersion(41)));
    /// ```
    pub fn new(number: u8) -> Result<Self, Error> {
        if number >= Self::MIN.0 && number <= Self::MAX.0 {
            Ok(Self(number))
        } else {
            Err(Error::UnsupportedVersion(number))
        }
    }

    /// Get the version number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Iterate over every valid version in ascending order.
    pub fn all() -> impl Iterator<Item = Version> {
        (Self::MIN.0..=Self::MAX.0).map(Version)
    }
}

impl TryFrom<u8> for Version {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Version> for u8 {
    fn from(value: Version) -> Self {
        value.number()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}", self.number())
    }
}

/// Error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Ecl {
    /// Low: 7% recovery rate.
    L,
    /// Medium: 15% recovery rate.
    M,
    /// Quartile: 25% recovery rate.
    Q,
    /// High: 30% recovery rate.
    #[default]
    H,
}

impl Ecl {
    /// Fraction of the symbol the codec can recover. Also the largest fraction of the canvas side
    /// an icon may cover.
    /// # Example
    /// ```
    /// use qrstyle_core::Ecl;
    /// assert_eq!(Ecl::H.recovery_rate(), 0.30);
    /// assert!(Ecl::L.recovery_rate() < Ecl::M.recovery_rate());
    /// ```
    pub fn recovery_rate(self) -> f64 {
        match self {
            Self::L => 0.07,
            Self::M => 0.15,
            Self::Q => 0.25,
            Self::H => 0.30,
        }
    }
}

impl std::str::FromStr for Ecl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" | "l" => Ok(Self::L),
            "M" | "m" => Ok(Self::M),
            "Q" | "q" => Ok(Self::Q),
            "H" | "h" => Ok(Self::H),
            other => Err(format!("invalid error correction level '{}'", other)),
        }
    }
}
