//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use crate::pieces::ColorTag;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const RED: Color = Color::Rgb(0xEF, 0x44, 0x44);
const BLUE: Color = Color::Rgb(0x3B, 0x82, 0xF6);
const GREEN: Color = Color::Rgb(0x22, 0xC5, 0x5E);
const YELLOW: Color = Color::Rgb(0xEA, 0xB3, 0x08);
const PURPLE: Color = Color::Rgb(0xA8, 0x55, 0xF7);

/// Block colours per tag and UI colours, optionally loaded from a theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Block colours for tags 1..=5: red, blue, green, yellow, purple.
    pub blocks: [Color; 5],
    /// Board background behind the cells.
    pub bg: Color,
    /// Empty cell.
    pub empty: Color,
    /// Borders.
    pub grid: Color,
    /// Text (score, best).
    pub main_fg: Color,
    /// Titles and the burst label.
    pub title: Color,
    /// Help text, empty tray slots.
    pub inactive_fg: Color,
    /// Hover preview where the piece fits.
    pub accept: Color,
    /// Hover preview where it does not.
    pub reject: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            blocks: [RED, BLUE, GREEN, YELLOW, PURPLE],
            bg: Color::Rgb(0x1F, 0x23, 0x2B),
            empty: Color::Rgb(0x37, 0x41, 0x51),
            grid: Color::Rgb(0x4B, 0x55, 0x63),
            main_fg: Color::Rgb(0xE5, 0xE7, 0xEB),
            title: YELLOW,
            inactive_fg: Color::Rgb(0x6B, 0x72, 0x80),
            accept: Color::Rgb(0x9C, 0xA3, 0xAF),
            reject: Color::Rgb(0xF8, 0x71, 0x71),
        }
    }
}

impl Theme {
    /// Load from a btop-style file (`theme[key]="value"`), then apply `palette`.
    /// No path or a missing file gives the defaults.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            _ => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override block colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.blocks = [
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                ];
                self.reject = Color::Rgb(0xFF, 0x00, 0x00);
                self.accept = Color::Rgb(0xFF, 0xFF, 0xFF);
            }
            Palette::Colorblind => {
                // Paul Tol's bright scheme; no red/green pair.
                self.blocks = [
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xBB, 0xBB, 0x00),
                    Color::Rgb(0xEE, 0x33, 0x77),
                ];
                self.reject = Color::Rgb(0xCC, 0x33, 0x11);
            }
        }
    }

    /// Keys follow btop themes; anything missing keeps the default.
    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()));
        let d = Self::default();
        Self {
            blocks: [
                get(&["cpu_end", "temp_end"]).unwrap_or(d.blocks[0]),
                get(&["cpu_box"]).unwrap_or(d.blocks[1]),
                get(&["mem_box", "cpu_start"]).unwrap_or(d.blocks[2]),
                get(&["cpu_mid", "title"]).unwrap_or(d.blocks[3]),
                get(&["net_box"]).unwrap_or(d.blocks[4]),
            ],
            bg: get(&["main_bg"]).unwrap_or(d.bg),
            empty: get(&["meter_bg"]).unwrap_or(d.empty),
            grid: get(&["div_line"]).unwrap_or(d.grid),
            main_fg: get(&["main_fg"]).unwrap_or(d.main_fg),
            title: get(&["title"]).unwrap_or(d.title),
            inactive_fg: get(&["inactive_fg"]).unwrap_or(d.inactive_fg),
            accept: get(&["hi_fg"]).unwrap_or(d.accept),
            reject: get(&["temp_end", "cpu_end"]).unwrap_or(d.reject),
        }
    }

    #[inline]
    pub fn block(&self, tag: ColorTag) -> Color {
        self.blocks[tag.index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.starts_with('#') {
            continue;
        }
        let Some(rest) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, value)) = rest.split_once(']') else {
            continue;
        };
        let Some((_, value)) = value.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(hex.to_string());
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    match hex.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}
