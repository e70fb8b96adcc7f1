//! An editing session: controls record edits here, `save` turns them into
//! the persisted and applied stylesheet.

use crate::applicator::{PersistOutcome, StylesheetApplicator};
use crate::color;
use crate::config::{InputType, ThemeConfig};
use crate::debounce::Debouncer;
use crate::events::{EventBus, PropertyChange, ThemeEvent};
use crate::storage::StyleStorage;
use crate::style::change_set::{BoxSides, StyleChangeSet, StyleChangeStore, StyleValue};
use crate::style::owned_css::{declaration_round_trips, selector_key, OwnedStylesheet};
use crate::style::{synthesizer, theme_css};
use std::collections::HashSet;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

/// One control's edit.
#[derive(Debug, Clone, Copy)]
pub struct StyleUpdate<'a> {
    pub selector: &'a str,
    pub property: &'a str,
    pub value: &'a str,
    /// A second key that receives the same edit, tracked independently.
    pub group_selector: Option<&'a str>,
}

impl<'a> StyleUpdate<'a> {
    pub fn new(selector: &'a str, property: &'a str, value: &'a str) -> Self {
        StyleUpdate {
            selector,
            property,
            value,
            group_selector: None,
        }
    }

    pub fn grouped(mut self, group_selector: &'a str) -> Self {
        self.group_selector = Some(group_selector);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nothing pending; nothing was written.
    NoChanges,
    Saved {
        css: String,
        persisted: PersistOutcome,
    },
}

fn is_unset_keyword(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("unset")
}

fn is_reset_keyword(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("unset") || value.eq_ignore_ascii_case("remove")
}

pub struct ThemeEditor<S: StyleStorage> {
    config: ThemeConfig,
    changes: StyleChangeStore,
    applicator: StylesheetApplicator<S>,
    events: EventBus,
    /// Selectors whose text color was picked by hand; auto-contrast leaves them alone.
    manual_text_color: HashSet<String>,
    typed: Debouncer<(String, String), String>,
}

impl<S: StyleStorage> ThemeEditor<S> {
    pub fn new(config: ThemeConfig, applicator: StylesheetApplicator<S>) -> Self {
        ThemeEditor {
            config,
            changes: StyleChangeStore::new(),
            applicator,
            events: EventBus::new(),
            manual_text_color: HashSet::new(),
            typed: Debouncer::default(),
        }
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.typed = Debouncer::new(window);
        self
    }

    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    pub fn applicator(&self) -> &StylesheetApplicator<S> {
        &self.applicator
    }

    pub fn pending(&self) -> &StyleChangeSet {
        self.changes.pending()
    }

    pub fn subscribe(&mut self) -> Receiver<ThemeEvent> {
        self.events.subscribe()
    }

    /// Apply whatever previous sessions persisted. Call before any edit.
    pub fn startup(&mut self) -> bool {
        let css = self.applicator.load_persisted();
        if css.trim().is_empty() {
            log::debug!("no persisted theme under {:?}", self.applicator.key());
            return false;
        }
        theme_css::lint(&css);
        self.applicator.apply(&css);
        log::info!("restored persisted theme ({} bytes)", css.len());
        true
    }

    /// The persisted value of `property` for `selector`, last declaration wins.
    pub fn persisted_value(&self, selector: &str, property: &str) -> Option<String> {
        let sheet = OwnedStylesheet::parse(&self.applicator.load_persisted());
        sheet
            .find(selector)
            .iter()
            .flat_map(|rule| rule.declarations())
            .filter(|decl| decl.property == property)
            .last()
            .map(|decl| decl.value)
    }

    fn emit_change(&mut self, selector: &str, property: &str, value: &StyleValue) {
        let change = PropertyChange {
            selector: selector.to_string(),
            property: property.to_string(),
            value: value.css_text(),
        };
        let event = if *value == StyleValue::Unset {
            ThemeEvent::Reset(change)
        } else {
            ThemeEvent::Changed(change)
        };
        self.events.emit(event);
    }

    /// Record a generic control edit. Returns whether anything was recorded.
    ///
    /// `unset` reverts the property. Other values go through the configured
    /// control for the property (units appended, colors normalized); values
    /// the control rejects leave the store untouched.
    pub fn update_style(&mut self, update: StyleUpdate<'_>) -> bool {
        let StyleUpdate {
            selector,
            property,
            value,
            group_selector,
        } = update;
        if selector.trim().is_empty() || property.trim().is_empty() {
            log::warn!("ignoring edit without selector or property");
            return false;
        }

        let pending = if is_unset_keyword(value) {
            StyleValue::Unset
        } else {
            let def = self
                .config
                .property(selector, property)
                .or_else(|| self.config.catalog_property(property));
            match def {
                Some(def) => match def.format_value(value) {
                    Some(formatted) => formatted,
                    None => {
                        log::warn!("{selector} {property}: {value:?} rejected, keeping previous value");
                        return false;
                    }
                },
                None => StyleValue::Value(value.trim().to_string()),
            }
        };

        if let Some(text) = pending.css_text() {
            if !declaration_round_trips(property, &text) {
                log::warn!("{selector} {property}: {value:?} cannot be written into a rule block");
                return false;
            }
        }

        if pending == StyleValue::Unset && property == "color" {
            self.manual_text_color.remove(&selector_key(selector));
        }
        self.changes
            .record_grouped(selector, group_selector, property, pending.clone());
        self.emit_change(selector, property, &pending);
        true
    }

    /// Record a color edit. Returns the normalized hex, or `None` when the
    /// input was not a color (nothing recorded) or was a reset keyword.
    ///
    /// A new background also sets the contrasting text color on the same
    /// selector, unless that text color was chosen by hand.
    pub fn set_color(&mut self, selector: &str, property: &str, input: &str) -> Option<String> {
        self.set_color_grouped(selector, None, property, input)
    }

    /// [`ThemeEditor::set_color`] that also records every resulting edit,
    /// the contrasting text color included, under `group_selector`.
    pub fn set_color_grouped(
        &mut self,
        selector: &str,
        group_selector: Option<&str>,
        property: &str,
        input: &str,
    ) -> Option<String> {
        if is_reset_keyword(input) {
            self.reset_grouped(selector, group_selector, property);
            return None;
        }
        let Some(hex) = color::normalize_to_hex(input) else {
            log::debug!("{selector} {property}: {input:?} is not a color, keeping previous value");
            return None;
        };

        let value = StyleValue::Value(hex.clone());
        self.changes
            .record_grouped(selector, group_selector, property, value.clone());
        self.emit_change(selector, property, &value);

        match property {
            "color" => {
                self.manual_text_color.insert(selector_key(selector));
            }
            "background-color" if !self.manual_text_color.contains(&selector_key(selector)) => {
                let ideal = StyleValue::Value(color::ideal_text_color(&hex).to_string());
                self.changes
                    .record_grouped(selector, group_selector, "color", ideal.clone());
                self.emit_change(selector, "color", &ideal);
            }
            _ => {}
        }
        Some(hex)
    }

    /// Record a composite (four-sided) edit.
    pub fn set_sides(&mut self, selector: &str, property: &str, sides: BoxSides) {
        let value = StyleValue::Sides(sides);
        self.changes.record(selector, property, value.clone());
        self.emit_change(selector, property, &value);
    }

    /// Set a logo's `width`/`height` in pixels, clamped to the logo's
    /// configured bounds. `None` reverts the dimension. Returns the recorded size.
    pub fn set_logo_dimension(
        &mut self,
        selector: &str,
        dimension: &str,
        pixels: Option<u32>,
    ) -> Option<u32> {
        let Some(pixels) = pixels else {
            self.reset_property(selector, dimension);
            return None;
        };
        let pixels = match self.config.logo(selector) {
            Some(logo) => logo.clamp(dimension, pixels),
            None => pixels,
        };
        let value = StyleValue::Value(format!("{pixels}px"));
        self.changes.record(selector, dimension, value.clone());
        self.emit_change(selector, dimension, &value);
        Some(pixels)
    }

    /// Revert a property to the page's stylesheet on the next save.
    pub fn reset_property(&mut self, selector: &str, property: &str) {
        self.reset_grouped(selector, None, property);
    }

    fn reset_grouped(&mut self, selector: &str, group_selector: Option<&str>, property: &str) {
        if property == "color" {
            self.manual_text_color.remove(&selector_key(selector));
        }
        self.changes
            .record_unset_grouped(selector, group_selector, property);
        self.emit_change(selector, property, &StyleValue::Unset);
    }

    /// Revert every color control the configuration exposes, as a form reset
    /// does, and forget hand-picked text colors. Returns how many were reset.
    pub fn reset_all(&mut self) -> usize {
        let config = &self.config;
        let colors: Vec<(String, String)> = config
            .selectors()
            .flat_map(move |selector_config| {
                config
                    .editable_properties(&selector_config.selector)
                    .into_iter()
                    .filter(|def| def.input_type == InputType::Color)
                    .map(move |def| (selector_config.selector.clone(), def.property.clone()))
            })
            .collect();

        self.manual_text_color.clear();
        for (selector, property) in &colors {
            self.reset_property(selector, property);
        }
        log::debug!("reset {} color properties", colors.len());
        colors.len()
    }

    /// Drop a pending edit as if it had never been made.
    pub fn forget(&mut self, selector: &str, property: &str) -> bool {
        self.changes.forget(selector, property).is_some()
    }

    /// Queue free-text color input; only the last entry per control within
    /// the debounce window is applied by [`ThemeEditor::flush_typed`].
    pub fn type_color(&mut self, selector: &str, property: &str, text: &str, now: Instant) {
        self.typed.push(
            (selector.to_string(), property.to_string()),
            text.to_string(),
            now,
        );
    }

    /// Apply typed colors whose window has elapsed. Returns the recorded hex values.
    pub fn flush_typed(&mut self, now: Instant) -> Vec<String> {
        self.typed
            .take_due(now)
            .into_iter()
            .filter_map(|((selector, property), text)| self.set_color(&selector, &property, &text))
            .collect()
    }

    /// Rebuild against the persisted CSS, apply, persist and clear the store.
    pub fn save(&mut self) -> SaveOutcome {
        if !self.changes.has_changes() {
            log::info!("No changes to save!");
            return SaveOutcome::NoChanges;
        }

        let previous = self.applicator.load_persisted();
        let pending = self.changes.drain();
        let css = synthesizer::rebuild(&pending, &previous);
        theme_css::lint(&css);

        self.applicator.apply(&css);
        let persisted = self.applicator.persist(&css);
        log::info!(
            "saved {} selector(s), {} bytes of CSS ({persisted:?})",
            pending.len(),
            css.len()
        );
        SaveOutcome::Saved { css, persisted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn editor() -> ThemeEditor<MemoryStorage> {
        let config = ThemeConfig::builtin().expect("builtin theme");
        ThemeEditor::new(config, StylesheetApplicator::new(MemoryStorage::new()))
    }

    #[test]
    fn update_style_formats_through_config() {
        let mut editor = editor();
        assert!(editor.update_style(StyleUpdate::new(".admin-header", "font-size", "18")));
        assert!(!editor.update_style(StyleUpdate::new(".admin-header", "font-size", "huge")));
        assert!(!editor.update_style(StyleUpdate::new("", "font-size", "18")));
        assert_eq!(
            editor.pending().get(".admin-header", "font-size"),
            Some(&StyleValue::Value("18px".into()))
        );
    }

    #[test]
    fn background_sets_contrasting_text_until_overridden() {
        let mut editor = editor();
        assert_eq!(
            editor.set_color(".admin-header", "background-color", "navy").as_deref(),
            Some("#000080")
        );
        assert_eq!(
            editor.pending().get(".admin-header", "color"),
            Some(&StyleValue::Value("#ffffff".into()))
        );

        editor.set_color(".admin-header", "color", "#333");
        editor.set_color(".admin-header", "background-color", "#ffffff");
        assert_eq!(
            editor.pending().get(".admin-header", "color"),
            Some(&StyleValue::Value("#333333".into()))
        );
    }

    #[test]
    fn values_that_would_break_the_block_are_rejected() {
        let mut editor = editor();
        assert!(editor.update_style(StyleUpdate::new(".a", "content", "\"}\"")));
        assert!(!editor.update_style(StyleUpdate::new(".a", "width", "10px}")));
        assert!(!editor.update_style(StyleUpdate::new(".a", "width", "1px; color: red")));
        assert_eq!(editor.pending().get(".a", "width"), None);
    }

    #[test]
    fn grouped_color_keeps_auto_contrast() {
        let mut editor = editor();
        let hex = editor.set_color_grouped(
            ".brand-link .brand-image",
            Some(".brand-link"),
            "background-color",
            "black",
        );
        assert_eq!(hex.as_deref(), Some("#000000"));
        for selector in [".brand-link .brand-image", ".brand-link"] {
            assert_eq!(
                editor.pending().get(selector, "color"),
                Some(&StyleValue::Value("#ffffff".into())),
                "{selector}"
            );
        }

        let image = ".brand-link .brand-image";
        editor.set_color_grouped(image, Some(".brand-link"), "color", "remove");
        assert_eq!(editor.pending().get(".brand-link", "color"), Some(&StyleValue::Unset));
    }

    #[test]
    fn reset_all_reverts_every_color_control() {
        let mut editor = editor();
        let events = editor.subscribe();
        editor.set_color(".admin-header", "color", "#333");

        assert_eq!(editor.reset_all(), 3);
        for (selector, property) in [
            (".admin-header", "background-color"),
            (".admin-header", "color"),
            (".footer-main, .footer-secondary", "background-color"),
        ] {
            assert_eq!(
                editor.pending().get(selector, property),
                Some(&StyleValue::Unset),
                "{selector} {property}"
            );
        }
        let resets = events
            .try_iter()
            .filter(|event| matches!(event, ThemeEvent::Reset(_)))
            .count();
        assert_eq!(resets, 3);

        // The hand-picked text color is forgotten, so contrast applies again.
        editor.set_color(".admin-header", "background-color", "#000000");
        assert_eq!(
            editor.pending().get(".admin-header", "color"),
            Some(&StyleValue::Value("#ffffff".into()))
        );
    }

    #[test]
    fn invalid_color_keeps_previous_value() {
        let mut editor = editor();
        editor.set_color(".a", "color", "#123456");
        assert_eq!(editor.set_color(".a", "color", "not-a-color"), None);
        assert_eq!(
            editor.pending().get(".a", "color"),
            Some(&StyleValue::Value("#123456".into()))
        );
    }

    #[test]
    fn save_without_changes_is_reported() {
        let mut editor = editor();
        assert_eq!(editor.save(), SaveOutcome::NoChanges);
        assert!(editor.applicator().active().is_none());
    }

    #[test]
    fn logo_dimensions_are_clamped() {
        let mut editor = editor();
        let fav = ".brand-link .brand-image-fev";
        assert_eq!(editor.set_logo_dimension(fav, "width", Some(400)), Some(50));
        assert_eq!(editor.set_logo_dimension(".unknown", "width", Some(400)), Some(400));
        assert_eq!(editor.set_logo_dimension(fav, "height", None), None);
        assert_eq!(editor.pending().get(fav, "height"), Some(&StyleValue::Unset));
    }

    #[test]
    fn typed_colors_are_debounced() {
        let mut editor = editor().with_debounce(Duration::from_millis(120));
        let start = Instant::now();
        editor.type_color(".a", "border-color", "#f", start);
        editor.type_color(".a", "border-color", "#ff0", start + Duration::from_millis(40));
        assert!(editor.flush_typed(start + Duration::from_millis(100)).is_empty());
        assert_eq!(
            editor.flush_typed(start + Duration::from_millis(200)),
            vec!["#ffff00".to_string()]
        );
        assert!(editor.pending().get(".a", "border-color").is_some());
    }
}
