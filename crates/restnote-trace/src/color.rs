//! Colours used to annotate tabular and text output.

use std::fmt;
use std::str::FromStr;

use owo_colors::{AnsiColors, OwoColorize};
use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// A colour a renderer may apply to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Gray
    Gray,
    /// Green
    Green,
    /// Blue
    Blue,
    /// Red
    Red,
    /// Yellow
    Yellow,
    /// Black
    Black,
}

impl Color {
    /// Lowercase colour name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Black => "black",
        }
    }

    fn ansi(self) -> AnsiColors {
        match self {
            Self::Gray => AnsiColors::BrightBlack,
            Self::Green => AnsiColors::Green,
            Self::Blue => AnsiColors::Blue,
            Self::Red => AnsiColors::Red,
            Self::Yellow => AnsiColors::Yellow,
            Self::Black => AnsiColors::Black,
        }
    }

    /// `value` in this colour as an ANSI foreground.
    pub fn paint(self, value: &str) -> String {
        value.color(self.ansi()).to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gray" | "grey" => Ok(Self::Gray),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "black" => Ok(Self::Black),
            _ => Err(TraceError::UnknownColor(s.to_string())),
        }
    }
}
