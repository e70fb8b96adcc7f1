//! Theme configuration: which selectors are editable and how each property
//! is entered. The JSON layout matches the `themeConfig` / `propertyGroups`
//! documents the editor UI is generated from.

use crate::color;
use crate::error::ConfigError;
use crate::style::change_set::{BoxSides, StyleValue};
use crate::style::owned_css::selector_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_THEME: &str = include_str!("../assets/default_theme.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    pub theme_config: Vec<ThemeModule>,
    pub property_groups: BTreeMap<String, PropertyGroup>,
}

/// A page region (header, footer, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeModule {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub selectors: Vec<SelectorConfig>,
    #[serde(default)]
    pub logos: Vec<LogoConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    pub selector: String,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub property_group_refs: Vec<PropertyGroupRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyGroupRef {
    pub group_id: String,
    pub include: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyGroup {
    pub name: String,
    pub properties: Vec<PropertyDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Color,
    Number,
    Select,
    Composite,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    pub property: String,
    pub label: String,
    pub input_type: InputType,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub sub_props: Vec<String>,
}

/// Size bounds for a logo image, in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoConfig {
    pub title: String,
    pub original_image_selector: String,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl LogoConfig {
    /// Clamp a `width` or `height` to the configured bounds. Other dimensions
    /// pass through untouched.
    pub fn clamp(&self, dimension: &str, pixels: u32) -> u32 {
        match dimension {
            "width" => pixels.clamp(self.min_width, self.max_width.max(self.min_width)),
            "height" => pixels.clamp(self.min_height, self.max_height.max(self.min_height)),
            _ => pixels,
        }
    }
}

impl PropertyDef {
    pub fn is_composite(&self) -> bool {
        self.input_type == InputType::Composite
    }

    fn unit(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }

    /// Turn raw control input into a pending value.
    ///
    /// Numbers get the property's unit, composite input accepts one to four
    /// numbers in CSS shorthand order, colors are normalized and selects only
    /// take one of their options. Returns `None` when the input does not fit
    /// the control (caller keeps the old value).
    pub fn format_value(&self, raw: &str) -> Option<StyleValue> {
        let raw = raw.trim();
        match self.input_type {
            InputType::Color => color::normalize_to_hex(raw).map(StyleValue::Value),
            InputType::Number => match parse_number(raw, self.unit()) {
                Some(number) => Some(StyleValue::Value(format!("{number}{}", self.unit()))),
                None if raw.is_empty() => Some(StyleValue::Value(String::new())),
                None => None,
            },
            InputType::Composite => self.parse_sides(raw).map(StyleValue::Sides),
            InputType::Select if !raw.is_empty() && !self.options.is_empty() => self
                .options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(raw))
                .map(|option| StyleValue::Value(option.clone())),
            InputType::Select | InputType::Text => Some(StyleValue::Value(raw.to_string())),
        }
    }

    fn parse_sides(&self, raw: &str) -> Option<BoxSides> {
        let values = raw
            .split_whitespace()
            .map(|part| parse_number(part, self.unit()))
            .collect::<Option<Vec<f64>>>()?;
        let (top, right, bottom, left) = match values.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return None,
        };
        Some(BoxSides::new(top, right, bottom, left, self.unit()))
    }
}

/// A number, optionally already carrying `unit`.
fn parse_number(raw: &str, unit: &str) -> Option<f64> {
    let raw = raw.trim();
    let raw = if unit.is_empty() {
        raw
    } else {
        raw.strip_suffix(unit).unwrap_or(raw)
    };
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl ThemeConfig {
    /// The header/footer theme shipped with the library.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_THEME)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ThemeConfig = serde_json::from_str(json)?;
        config.check_group_refs()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    fn check_group_refs(&self) -> Result<(), ConfigError> {
        for selector in self.selectors() {
            for group_ref in &selector.property_group_refs {
                if !self.property_groups.contains_key(&group_ref.group_id) {
                    return Err(ConfigError::UnknownGroup {
                        selector: selector.selector.clone(),
                        group: group_ref.group_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn selectors(&self) -> impl Iterator<Item = &SelectorConfig> {
        self.theme_config
            .iter()
            .flat_map(|module| module.selectors.iter())
    }

    pub fn selector(&self, selector: &str) -> Option<&SelectorConfig> {
        let key = selector_key(selector);
        self.selectors().find(|s| selector_key(&s.selector) == key)
    }

    /// Properties a selector exposes, in the order its group refs list them.
    /// Names missing from the referenced group are skipped.
    pub fn editable_properties(&self, selector: &str) -> Vec<&PropertyDef> {
        let Some(config) = self.selector(selector) else {
            return Vec::new();
        };
        config
            .property_group_refs
            .iter()
            .filter_map(|group_ref| {
                self.property_groups
                    .get(&group_ref.group_id)
                    .map(|group| (group, &group_ref.include))
            })
            .flat_map(|(group, include)| {
                include.iter().filter_map(move |name| {
                    group.properties.iter().find(|def| &def.property == name)
                })
            })
            .collect()
    }

    pub fn property(&self, selector: &str, property: &str) -> Option<&PropertyDef> {
        self.editable_properties(selector)
            .into_iter()
            .find(|def| def.property == property)
    }

    /// First definition of `property` anywhere in the group catalog.
    pub fn catalog_property(&self, property: &str) -> Option<&PropertyDef> {
        self.property_groups
            .values()
            .flat_map(|group| group.properties.iter())
            .find(|def| def.property == property)
    }

    pub fn is_composite(&self, selector: &str, property: &str) -> bool {
        self.property(selector, property)
            .is_some_and(PropertyDef::is_composite)
    }

    pub fn logos(&self) -> impl Iterator<Item = &LogoConfig> {
        self.theme_config.iter().flat_map(|module| module.logos.iter())
    }

    pub fn logo(&self, selector: &str) -> Option<&LogoConfig> {
        let key = selector_key(selector);
        self.logos()
            .find(|logo| selector_key(&logo.original_image_selector) == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_config_loads() {
        let config = ThemeConfig::builtin().expect("builtin theme");
        assert_eq!(config.theme_config.len(), 2);

        let names: Vec<&str> = config
            .editable_properties(".admin-header")
            .iter()
            .map(|def| def.property.as_str())
            .collect();
        assert_eq!(names, vec!["background-color", "color", "font-size", "padding"]);
        assert!(config.is_composite(".admin-header", "padding"));
        assert!(!config.is_composite(".admin-header", "color"));
        assert!(config.property(".footer-main,.footer-secondary", "font-family").is_none());
        assert!(config.property(".footer-main,  .footer-secondary", "font-family").is_some());
    }

    #[test]
    fn unknown_group_is_rejected() {
        let json = r#"{
            "themeConfig": [{ "id": "x", "label": "X", "selectors": [
                { "selector": ".x", "propertyGroupRefs": [{ "groupId": "nope", "include": ["color"] }] }
            ]}],
            "propertyGroups": {}
        }"#;
        let err = ThemeConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownGroup { ref group, .. } if group == "nope"));
    }

    #[test]
    fn format_value_per_input_type() {
        let config = ThemeConfig::builtin().unwrap();
        let font_size = config.property(".admin-header", "font-size").unwrap();
        assert_eq!(font_size.format_value("16"), Some(StyleValue::Value("16px".into())));
        assert_eq!(font_size.format_value("18px"), Some(StyleValue::Value("18px".into())));
        assert_eq!(font_size.format_value("big"), None);
        assert_eq!(font_size.format_value(""), Some(StyleValue::Value(String::new())));

        let bg = config.property(".admin-header", "background-color").unwrap();
        assert_eq!(bg.format_value("#ABC"), Some(StyleValue::Value("#aabbcc".into())));
        assert_eq!(bg.format_value("not a color"), None);

        let padding = config.property(".admin-header", "padding").unwrap();
        assert_eq!(
            padding.format_value("10 4"),
            Some(StyleValue::Sides(BoxSides::new(10.0, 4.0, 10.0, 4.0, "px")))
        );
        assert_eq!(padding.format_value("1 2 3 4 5"), None);

        let family = config.property(".footer-main, .footer-secondary", "font-family").unwrap();
        assert_eq!(family.format_value("lato"), Some(StyleValue::Value("Lato".into())));
        assert_eq!(family.format_value("Comic Sans"), None);
        assert_eq!(family.format_value(""), Some(StyleValue::Value(String::new())));
    }

    #[test]
    fn logo_bounds_clamp() {
        let config = ThemeConfig::builtin().unwrap();
        let fav = config.logo(".brand-link .brand-image-fev").unwrap();
        assert_eq!(fav.clamp("width", 400), 50);
        assert_eq!(fav.clamp("height", 5), 20);
        assert_eq!(fav.clamp("opacity", 5), 5);
    }
}
