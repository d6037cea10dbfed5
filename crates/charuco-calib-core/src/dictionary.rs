//! Predefined ArUco marker dictionaries a board can be printed with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker dictionary identifier.
///
/// Only the identity and capacity of a dictionary matter here; the bit
/// patterns live with whatever detector decodes the markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArucoDictionary {
    #[serde(rename = "DICT_ARUCO_ORIGINAL", alias = "aruco_orig")]
    ArucoOriginal,
    #[serde(rename = "DICT_4X4_50")]
    Dict4x4_50,
    #[serde(rename = "DICT_4X4_100")]
    Dict4x4_100,
    #[serde(rename = "DICT_4X4_250", alias = "4x4_250")]
    Dict4x4_250,
    #[serde(rename = "DICT_4X4_1000", alias = "4x4_1000")]
    #[default]
    Dict4x4_1000,
    #[serde(rename = "DICT_5X5_50")]
    Dict5x5_50,
    #[serde(rename = "DICT_5X5_100")]
    Dict5x5_100,
    #[serde(rename = "DICT_5X5_250", alias = "5x5_250")]
    Dict5x5_250,
    #[serde(rename = "DICT_5X5_1000")]
    Dict5x5_1000,
    #[serde(rename = "DICT_6X6_50")]
    Dict6x6_50,
    #[serde(rename = "DICT_6X6_100")]
    Dict6x6_100,
    #[serde(rename = "DICT_6X6_250", alias = "6x6_250")]
    Dict6x6_250,
    #[serde(rename = "DICT_6X6_1000")]
    Dict6x6_1000,
    #[serde(rename = "DICT_7X7_50")]
    Dict7x7_50,
    #[serde(rename = "DICT_7X7_100")]
    Dict7x7_100,
    #[serde(rename = "DICT_7X7_250", alias = "7x7_250")]
    Dict7x7_250,
    #[serde(rename = "DICT_7X7_1000")]
    Dict7x7_1000,
}

/// Name could not be matched to a known dictionary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown ArUco dictionary `{0}`")]
pub struct UnknownDictionary(pub String);

impl ArucoDictionary {
    pub const ALL: [ArucoDictionary; 17] = [
        Self::ArucoOriginal,
        Self::Dict4x4_50,
        Self::Dict4x4_100,
        Self::Dict4x4_250,
        Self::Dict4x4_1000,
        Self::Dict5x5_50,
        Self::Dict5x5_100,
        Self::Dict5x5_250,
        Self::Dict5x5_1000,
        Self::Dict6x6_50,
        Self::Dict6x6_100,
        Self::Dict6x6_250,
        Self::Dict6x6_1000,
        Self::Dict7x7_50,
        Self::Dict7x7_100,
        Self::Dict7x7_250,
        Self::Dict7x7_1000,
    ];

    /// Canonical `DICT_*` name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ArucoOriginal => "DICT_ARUCO_ORIGINAL",
            Self::Dict4x4_50 => "DICT_4X4_50",
            Self::Dict4x4_100 => "DICT_4X4_100",
            Self::Dict4x4_250 => "DICT_4X4_250",
            Self::Dict4x4_1000 => "DICT_4X4_1000",
            Self::Dict5x5_50 => "DICT_5X5_50",
            Self::Dict5x5_100 => "DICT_5X5_100",
            Self::Dict5x5_250 => "DICT_5X5_250",
            Self::Dict5x5_1000 => "DICT_5X5_1000",
            Self::Dict6x6_50 => "DICT_6X6_50",
            Self::Dict6x6_100 => "DICT_6X6_100",
            Self::Dict6x6_250 => "DICT_6X6_250",
            Self::Dict6x6_1000 => "DICT_6X6_1000",
            Self::Dict7x7_50 => "DICT_7X7_50",
            Self::Dict7x7_100 => "DICT_7X7_100",
            Self::Dict7x7_250 => "DICT_7X7_250",
            Self::Dict7x7_1000 => "DICT_7X7_1000",
        }
    }

    /// Number of distinct marker ids the dictionary encodes.
    pub fn capacity(self) -> usize {
        match self {
            Self::ArucoOriginal => 1024,
            Self::Dict4x4_50 | Self::Dict5x5_50 | Self::Dict6x6_50 | Self::Dict7x7_50 => 50,
            Self::Dict4x4_100 | Self::Dict5x5_100 | Self::Dict6x6_100 | Self::Dict7x7_100 => 100,
            Self::Dict4x4_250 | Self::Dict5x5_250 | Self::Dict6x6_250 | Self::Dict7x7_250 => 250,
            Self::Dict4x4_1000 | Self::Dict5x5_1000 | Self::Dict6x6_1000 | Self::Dict7x7_1000 => {
                1000
            }
        }
    }

    /// Inner marker side length in bits.
    pub fn marker_bits(self) -> usize {
        match self {
            Self::ArucoOriginal => 5,
            Self::Dict4x4_50 | Self::Dict4x4_100 | Self::Dict4x4_250 | Self::Dict4x4_1000 => 4,
            Self::Dict5x5_50 | Self::Dict5x5_100 | Self::Dict5x5_250 | Self::Dict5x5_1000 => 5,
            Self::Dict6x6_50 | Self::Dict6x6_100 | Self::Dict6x6_250 | Self::Dict6x6_1000 => 6,
            Self::Dict7x7_50 | Self::Dict7x7_100 | Self::Dict7x7_250 | Self::Dict7x7_1000 => 7,
        }
    }
}

impl fmt::Display for ArucoDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArucoDictionary {
    type Err = UnknownDictionary;

    /// Accepts `DICT_4X4_1000`, `4x4_1000` and `aruco_orig` style names,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "ARUCO_ORIG" || upper == "ARUCO_ORIGINAL" {
            return Ok(Self::ArucoOriginal);
        }
        let full = if upper.starts_with("DICT_") {
            upper
        } else {
            format!("DICT_{upper}")
        };
        Self::ALL
            .into_iter()
            .find(|d| d.name() == full)
            .ok_or_else(|| UnknownDictionary(s.to_string()))
    }
}
