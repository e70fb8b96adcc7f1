//! Color normalization for theme edits.
//!
//! Every color that reaches the change store goes through [`normalize_to_hex`]
//! (or [`normalize_to_hex_alpha`] for values that may keep transparency), so
//! comparisons and persisted CSS only ever see lowercase `#rrggbb[aa]`.

use csscolorparser::Color as CssColor;
use std::fmt;

/// A resolved sRGB color. `alpha` is `None` for fully opaque colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: Option<f64>,
}

impl Rgba {
    /// `#rrggbb`, alpha dropped.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// `#rrggbbaa` for translucent colors, `#rrggbb` otherwise.
    pub fn to_hex_alpha(&self) -> String {
        match self.alpha {
            Some(a) => format!("{}{:02x}", self.to_hex(), (a * 255.0).round() as u8),
            None => self.to_hex(),
        }
    }
}

impl From<&CssColor> for Rgba {
    fn from(color: &CssColor) -> Self {
        let [r, g, b, _] = color.to_rgba8();
        let alpha = f64::from(color.a).clamp(0.0, 1.0);
        Rgba {
            r,
            g,
            b,
            alpha: (alpha < 1.0).then_some(alpha),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_alpha())
    }
}

/// Lowercase, trim, and drop one leading and one trailing quote.
fn prepare(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let unquoted = lowered
        .strip_prefix(['\'', '"'])
        .unwrap_or(&lowered);
    let unquoted = unquoted.strip_suffix(['\'', '"']).unwrap_or(unquoted);
    unquoted.trim().to_string()
}

/// Resolve any CSS color syntax: hex (3, 4, 6 or 8 digits), `rgb()`/`rgba()`,
/// `hsl()`/`hsla()`, `hwb()`, a named color, or `transparent`.
pub fn resolve(input: &str) -> Option<Rgba> {
    let value = prepare(input);
    // Bare digits are not CSS colors, even when they spell valid hex.
    if value.is_empty() || value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let parsed: CssColor = value.parse().ok()?;
    Some(Rgba::from(&parsed))
}

fn is_hex_digits(digits: &str, len: usize) -> bool {
    digits.len() == len && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Normalize any color input to lowercase `#rrggbb`.
///
/// Returns `None` when the input is not a color. Callers keep their previous
/// value in that case; `None` never means black.
pub fn normalize_to_hex(input: &str) -> Option<String> {
    let value = prepare(input);
    if let Some(digits) = value.strip_prefix('#') {
        if is_hex_digits(digits, 3) {
            return Some(digits.chars().fold(String::from("#"), |mut acc, ch| {
                acc.push(ch);
                acc.push(ch);
                acc
            }));
        }
        if is_hex_digits(digits, 6) {
            return Some(value);
        }
    }
    resolve(&value).map(|color| color.to_hex())
}

/// Like [`normalize_to_hex`] but keeps an alpha channel as two trailing hex
/// digits when the input had one.
pub fn normalize_to_hex_alpha(input: &str) -> Option<String> {
    resolve(input).map(|color| color.to_hex_alpha())
}

/// RGB channels of a color, black if it does not resolve.
pub fn hex_to_rgb(hex: &str) -> [u8; 3] {
    resolve(hex)
        .map(|c| [c.r, c.g, c.b])
        .unwrap_or([0, 0, 0])
}

/// True for free-text hex entries: `#?rrggbb` or `#?rrggbbaa`.
pub fn is_hex_input(text: &str) -> bool {
    let text = text.trim();
    let digits = text.strip_prefix('#').unwrap_or(text);
    matches!(digits.len(), 6 | 8) && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// WCAG relative luminance of an sRGB triple.
pub fn relative_luminance([r, g, b]: [u8; 3]) -> f64 {
    let linear = |channel: u8| {
        let c = f64::from(channel) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Pick the text color (`#ffffff` or `#000000`) with the higher contrast
/// against `hex`. White wins ties.
pub fn ideal_text_color(hex: &str) -> &'static str {
    let luminance = relative_luminance(hex_to_rgb(hex));
    let contrast_white = 1.05 / (luminance + 0.05);
    let contrast_black = (luminance + 0.05) / 0.05;
    if contrast_white >= contrast_black {
        "#ffffff"
    } else {
        "#000000"
    }
}
