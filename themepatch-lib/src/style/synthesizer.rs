//! Merge pending edits into previously persisted CSS text.
//!
//! Pure text-in, text-out: nothing here touches storage or the active sheet.

use crate::config::{InputType, ThemeConfig};
use crate::style::change_set::{BoxSides, StyleChangeSet, StyleChangeStore, StyleValue};
use crate::style::owned_css::{declaration_round_trips, OwnedStylesheet};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Rebuild `previous_css` with every selector in `pending` replaced.
///
/// For each touched selector all of its existing blocks are removed, and a
/// fresh block is appended only if at least one property survives (not
/// unset, not blank, and readable back out of the block it is written to).
/// Untouched text is kept byte-for-byte; rebuilt blocks follow it in
/// `pending` order.
pub fn rebuild(pending: &StyleChangeSet, previous_css: &str) -> String {
    let mut sheet = OwnedStylesheet::parse(previous_css);

    for changes in pending {
        let removed = sheet.remove_selector(&changes.selector);
        let mut surviving = changes.surviving();
        surviving.retain(|(property, value)| {
            let fits = declaration_round_trips(property, value);
            if !fits {
                log::warn!(
                    "{}: dropping {property}: {value:?}, it would break the block",
                    changes.selector
                );
            }
            fits
        });
        if surviving.is_empty() {
            log::debug!(
                "{}: dropped {removed} block(s), no properties survive",
                changes.selector
            );
            continue;
        }
        log::debug!(
            "{}: replaced {removed} block(s) with {} properties",
            changes.selector,
            surviving.len()
        );
        sheet.push_rule(&changes.selector, &surviving);
    }

    sheet.to_string()
}

/// A value submitted by a form control.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
    Sides {
        top: f64,
        right: f64,
        bottom: f64,
        left: f64,
    },
}

/// Selector -> property -> submitted value.
pub type FormValues = BTreeMap<String, BTreeMap<String, FormValue>>;

/// Render the stylesheet for a whole form submission.
///
/// Only properties the configuration exposes for a selector are written, in
/// configuration order. Values that do not fit their control are skipped, and
/// so are zero numbers, which a form submits for fields left at their default.
pub fn generate_from_form(config: &ThemeConfig, values: &FormValues) -> String {
    let mut store = StyleChangeStore::new();

    for selector_config in config.selectors() {
        let Some(submitted) = values.get(&selector_config.selector) else {
            continue;
        };
        for def in config.editable_properties(&selector_config.selector) {
            let Some(value) = submitted.get(&def.property) else {
                continue;
            };
            if *value == FormValue::Number(0.0) {
                log::debug!("skipping {} {}: zero", selector_config.selector, def.property);
                continue;
            }
            let unit = def.unit.as_deref().unwrap_or("");
            let pending = match (value, def.input_type) {
                (FormValue::Sides { top, right, bottom, left }, InputType::Composite) => {
                    Some(StyleValue::Sides(BoxSides::new(*top, *right, *bottom, *left, unit)))
                }
                (FormValue::Sides { .. }, _) => None,
                (FormValue::Number(n), InputType::Composite) => {
                    Some(StyleValue::Sides(BoxSides::uniform(*n, unit)))
                }
                (FormValue::Number(n), _) => Some(StyleValue::Value(format!("{n}{unit}"))),
                (FormValue::Text(text), _) => def.format_value(text),
            };
            match pending {
                Some(pending) => store.record(&selector_config.selector, &def.property, pending),
                None => log::warn!(
                    "skipping {} {}: {value:?} does not fit a {:?} control",
                    selector_config.selector,
                    def.property,
                    def.input_type
                ),
            }
        }
    }

    rebuild(&store.drain(), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pending(entries: &[(&str, &str, StyleValue)]) -> StyleChangeSet {
        let mut set = StyleChangeSet::new();
        for (selector, property, value) in entries {
            set.insert(selector, property, value.clone());
        }
        set
    }

    #[test]
    fn rebuild_from_empty() {
        let set = pending(&[
            (".a", "color", "#ff0000".into()),
            (".a", "padding", StyleValue::Sides(BoxSides::new(1.0, 2.0, 3.0, 4.0, "px"))),
        ]);
        assert_eq!(
            rebuild(&set, ""),
            ".a { color: #ff0000; padding: 1px 2px 3px 4px; }\n"
        );
    }

    #[test]
    fn rebuild_is_idempotent() {
        let set = pending(&[
            (".a", "color", "#ff0000".into()),
            (".b", "margin", "0".into()),
            (".c", "color", StyleValue::Unset),
        ]);
        let once = rebuild(&set, "");
        assert_eq!(rebuild(&set, &once), once);

        let seeded = rebuild(&set, "/* keep */\n.z { color: blue; }");
        assert_eq!(rebuild(&set, &seeded), seeded);
    }

    #[test]
    fn rebuild_is_idempotent_with_awkward_values() {
        let set = pending(&[
            (".a", "color", "red}".into()),
            (".a", "margin", "0; padding: 9px".into()),
            (".a", "font-family", "\"Open Sans\", serif".into()),
            (".a", "background-image", "url(data:image/png;base64,AAA=)".into()),
            (".b", "width", "calc(100% - (2 * 8px))".into()),
            (".b", "content", "\"}\"".into()),
            (".c", "color", "rgb(1, 2".into()),
        ]);
        let once = rebuild(&set, ".z { color: blue; }\n");
        assert_eq!(
            once,
            ".z { color: blue; }\n\
             .a { font-family: \"Open Sans\", serif; background-image: url(data:image/png;base64,AAA=); }\n\
             .b { width: calc(100% - (2 * 8px)); content: \"}\"; }\n"
        );
        assert_eq!(rebuild(&set, &once), once);
    }

    #[test]
    fn selectors_written_with_different_whitespace_merge() {
        let mut set = StyleChangeSet::new();
        set.insert(".admin-header  .nav", "color", "red".into());
        set.insert(".admin-header .nav", "margin", "0".into());
        let out = rebuild(&set, ".admin-header\n  .nav { color: blue; }\n");
        assert_eq!(out, ".admin-header .nav { color: red; margin: 0; }\n");
    }

    #[test]
    fn unset_removes_block() {
        let set = pending(&[(".a", "color", StyleValue::Unset)]);
        let out = rebuild(&set, ".a { color: red; }");
        assert!(!out.contains(".a"), "{out}");
    }

    #[test]
    fn whole_block_is_replaced() {
        let set = pending(&[(".a", "background-color", "#00ff00".into())]);
        let out = rebuild(&set, ".a { color: red; }");
        assert_eq!(out, ".a { background-color: #00ff00; }\n");
        assert!(!out.contains("color: red"));
    }

    #[test]
    fn untouched_selector_is_byte_identical() {
        let previous = ".a { color: red; }\n.keep   {  margin : 0 }\n.b { color: blue; }\n";
        let set = pending(&[
            (".a", "color", "#111111".into()),
            (".b", "color", StyleValue::Unset),
        ]);
        let out = rebuild(&set, previous);
        assert_eq!(out, ".keep   {  margin : 0 }\n.a { color: #111111; }\n");
    }

    #[test]
    fn blank_values_do_not_survive() {
        let set = pending(&[
            (".a", "color", "".into()),
            (".a", "margin", "  ".into()),
        ]);
        assert_eq!(rebuild(&set, ".a { color: red; }\n.b { x: y; }\n"), ".b { x: y; }\n");
    }

    #[test]
    fn literal_selectors_with_metacharacters() {
        let previous = "a[href$=\".pdf\"] { color: red; }\na { color: blue; }\n";
        let set = pending(&[("a[href$=\".pdf\"]", "color", "#000000".into())]);
        assert_eq!(
            rebuild(&set, previous),
            "a { color: blue; }\na[href$=\".pdf\"] { color: #000000; }\n"
        );
    }

    #[test]
    fn generate_from_form_uses_config_units() {
        let config = ThemeConfig::builtin().unwrap();
        let values: FormValues = serde_json::from_str(
            r##"{
                ".admin-header": {
                    "background-color": "#ABC",
                    "font-size": 18,
                    "padding": { "top": 4, "right": 8, "bottom": 4, "left": 8 },
                    "letter-spacing": 3,
                    "color": 0
                },
                ".footer-main, .footer-secondary": {
                    "font-family": "Roboto",
                    "background-color": "nope"
                }
            }"##,
        )
        .unwrap();

        assert_eq!(
            generate_from_form(&config, &values),
            ".admin-header { background-color: #aabbcc; font-size: 18px; padding: 4px 8px 4px 8px; }\n\
             .footer-main, .footer-secondary { font-family: Roboto; }\n"
        );
    }
}
