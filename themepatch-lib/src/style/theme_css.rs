use crate::error::{Result, ThemeError};
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, StyleSheet as LightningStyleSheet};

fn parse_sheet(css_text: &str) -> Result<LightningStyleSheet<'_, '_>> {
    LightningStyleSheet::parse(css_text, ParserOptions::default())
        .map_err(|e| ThemeError::Css(e.to_string()))
}

/// Parse CSS and count its style rules (rules nested in `@media` included).
pub fn validate(css_text: &str) -> Result<usize> {
    let sheet = parse_sheet(css_text)?;

    let mut style_rules = 0;
    for rule in &sheet.rules.0 {
        match rule {
            CssRule::Style(_) => style_rules += 1,
            CssRule::Media(media_rule) => {
                style_rules += media_rule
                    .rules
                    .0
                    .iter()
                    .filter(|inner_rule| matches!(inner_rule, CssRule::Style(_)))
                    .count();
            }
            _ => {}
        }
    }
    Ok(style_rules)
}

/// Log a warning when `css_text` does not parse. Never fails the caller.
pub fn lint(css_text: &str) {
    match validate(css_text) {
        Ok(style_rules) => log::debug!("stylesheet parsed: {style_rules} style rules"),
        Err(e) => log::warn!("stylesheet may not apply cleanly: {e}"),
    }
}

/// Minified form of `css_text`, for export.
pub fn minify(css_text: &str) -> Result<String> {
    let sheet = parse_sheet(css_text)?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| ThemeError::Css(e.to_string()))?;
    Ok(printed.code)
}
