use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status color as understood by the Xymon server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Yellow,
    Red,
    Clear,
    Purple,
    Blue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown color: {0}")]
pub struct UnknownColor(pub String);

impl Color {
    /// Every color, in the order appfeed filters list them.
    pub const ALL: [Color; 6] = [
        Color::Blue,
        Color::Purple,
        Color::Clear,
        Color::Yellow,
        Color::Green,
        Color::Red,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::Clear => "clear",
            Color::Purple => "purple",
            Color::Blue => "blue",
        }
    }

    /// Comma-joined list, e.g. `blue,purple`.
    pub fn join(colors: &[Color]) -> String {
        colors.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(",")
    }

    /// Parse a comma-separated list of colors (e.g. "red,yellow").
    /// Blank entries are ignored and duplicates dropped, keeping first-seen order.
    pub fn parse_list(spec: &str) -> Result<Vec<Color>, UnknownColor> {
        let mut colors = Vec::new();
        for part in spec.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let c: Color = part.parse()?;
            if !colors.contains(&c) {
                colors.push(c);
            }
        }
        Ok(colors)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "red" => Ok(Color::Red),
            "clear" => Ok(Color::Clear),
            "purple" => Ok(Color::Purple),
            "blue" => Ok(Color::Blue),
            _ => Err(UnknownColor(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_colors_in_feed_order() {
        assert_eq!(Color::join(&Color::ALL), "blue,purple,clear,yellow,green,red");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("RED".parse::<Color>().unwrap(), Color::Red);
        assert_eq!(" green ".parse::<Color>().unwrap(), Color::Green);
        assert!("orange".parse::<Color>().is_err());
    }

    #[test]
    fn parse_list_dedups_and_skips_blanks() {
        let v = Color::parse_list("red,,yellow,red").unwrap();
        assert_eq!(v, vec![Color::Red, Color::Yellow]);
        assert_eq!(Color::parse_list("red,pink"), Err(UnknownColor("pink".into())));
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(Color::Purple.to_string(), "purple");
    }
}
