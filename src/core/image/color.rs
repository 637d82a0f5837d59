use super::error::ImageTrimError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const HEX_COLOR_PATTERN: &str =
    r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})?$";

/// 颜色（#RRGGBB 或 #RRGGBBAA）
///
/// `a` 为 `None` 表示未指定透明度：替换颜色时只写 RGB，保留原像素的 alpha。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: Option<u8>,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: None }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a: Some(a) }
    }

    pub fn from_pixel(px: &[u8]) -> Self {
        Self::rgb(px[0], px[1], px[2])
    }

    /// 各通道绝对差之和（忽略 alpha）
    pub fn diff(&self, other: &Color) -> u32 {
        self.diff_rgb(other.r, other.g, other.b)
    }

    #[inline]
    pub fn diff_rgb(&self, r: u8, g: u8, b: u8) -> u32 {
        (self.r as i32 - r as i32).unsigned_abs()
            + (self.g as i32 - g as i32).unsigned_abs()
            + (self.b as i32 - b as i32).unsigned_abs()
    }

    pub fn is_similar(&self, other: &Color, diff_threshold: u32) -> bool {
        self.diff(other) <= diff_threshold
    }

    /// RGB 相同即视为同色
    pub fn same_rgb(&self, other: &Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    pub fn to_hex(&self) -> String {
        match self.a {
            Some(a) => format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, a),
            None => format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
        }
    }
}

impl FromStr for Color {
    type Err = ImageTrimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let regex = Regex::new(HEX_COLOR_PATTERN)
            .map_err(|e| ImageTrimError::InvalidColor(e.to_string()))?;
        let caps = regex
            .captures(s.trim())
            .ok_or_else(|| ImageTrimError::InvalidColor(s.to_string()))?;

        let channel = |i: usize| -> Result<u8, ImageTrimError> {
            u8::from_str_radix(&caps[i], 16).map_err(|_| ImageTrimError::InvalidColor(s.to_string()))
        };

        let a = match caps.get(4) {
            Some(m) => Some(
                u8::from_str_radix(m.as_str(), 16)
                    .map_err(|_| ImageTrimError::InvalidColor(s.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            r: channel(1)?,
            g: channel(2)?,
            b: channel(3)?,
            a,
        })
    }
}

impl TryFrom<String> for Color {
    type Error = ImageTrimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb_hex() {
        let c: Color = "#016AFD".parse().unwrap();
        assert_eq!(c, Color::rgb(0x01, 0x6a, 0xfd));
        assert_eq!(c.a, None);
    }

    #[test]
    fn test_parse_rgba_hex() {
        let c: Color = "#FFFFFF00".parse().unwrap();
        assert_eq!(c, Color::rgba(255, 255, 255, 0));
        assert_eq!(c.to_hex(), "#ffffff00");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("blue".parse::<Color>().is_err());
    }

    #[test]
    fn test_diff_ignores_alpha() {
        let a = Color::rgba(10, 20, 30, 0);
        let b = Color::rgba(13, 18, 30, 255);
        assert_eq!(a.diff(&b), 5);
        assert!(a.is_similar(&b, 5));
        assert!(!a.is_similar(&b, 4));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::BLACK).unwrap();
        assert_eq!(json, "\"#000000\"");
        let back: Color = serde_json::from_str("\"#016afd\"").unwrap();
        assert_eq!(back, Color::rgb(1, 106, 253));
    }
}
