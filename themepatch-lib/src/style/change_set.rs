//! Pending style edits, accumulated between saves.

use crate::style::owned_css::selector_key;
use std::fmt;

/// Four sub-values of a composite property (padding, margin) sharing one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSides {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
    pub unit: String,
}

impl BoxSides {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64, unit: impl Into<String>) -> Self {
        BoxSides {
            top,
            right,
            bottom,
            left,
            unit: unit.into(),
        }
    }

    pub fn uniform(value: f64, unit: impl Into<String>) -> Self {
        BoxSides::new(value, value, value, value, unit)
    }
}

impl fmt::Display for BoxSides {
    /// Shorthand in top/right/bottom/left order, e.g. `10px 4px 10px 4px`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = &self.unit;
        write!(
            f,
            "{}{unit} {}{unit} {}{unit} {}{unit}",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// A pending value for one property.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Value(String),
    Sides(BoxSides),
    /// Drop the custom override and fall back to the page's stylesheet.
    Unset,
}

impl StyleValue {
    /// The CSS text this value renders to, or `None` when it must not be
    /// written (unset or blank).
    pub fn css_text(&self) -> Option<String> {
        match self {
            StyleValue::Value(v) if v.trim().is_empty() => None,
            StyleValue::Value(v) => Some(v.trim().to_string()),
            StyleValue::Sides(sides) => Some(sides.to_string()),
            StyleValue::Unset => None,
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Value(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Value(value)
    }
}

/// Edits recorded for one selector, in first-touched order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorChanges {
    pub selector: String,
    pub properties: Vec<(String, StyleValue)>,
}

impl SelectorChanges {
    pub fn get(&self, property: &str) -> Option<&StyleValue> {
        self.properties
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Properties that survive into CSS, as `(name, css text)`.
    pub fn surviving(&self) -> Vec<(&str, String)> {
        self.properties
            .iter()
            .filter_map(|(name, value)| value.css_text().map(|text| (name.as_str(), text)))
            .collect()
    }
}

/// Selector -> property -> pending value.
///
/// Selectors are stored in canonical form (see [`selector_key`]), the same
/// identity the synthesizer uses to find blocks. A selector is only present
/// while it holds at least one property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleChangeSet {
    entries: Vec<SelectorChanges>,
}

impl StyleChangeSet {
    pub fn new() -> Self {
        StyleChangeSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectorChanges> {
        self.entries.iter()
    }

    fn position(&self, selector: &str) -> Option<usize> {
        let key = selector_key(selector);
        self.entries.iter().position(|e| e.selector == key)
    }

    pub fn selector(&self, selector: &str) -> Option<&SelectorChanges> {
        self.position(selector).map(|idx| &self.entries[idx])
    }

    pub fn get(&self, selector: &str, property: &str) -> Option<&StyleValue> {
        self.selector(selector).and_then(|e| e.get(property))
    }

    /// Last write wins for the same `(selector, property)`.
    pub fn insert(&mut self, selector: &str, property: &str, value: StyleValue) {
        let idx = match self.position(selector) {
            Some(idx) => idx,
            None => {
                self.entries.push(SelectorChanges {
                    selector: selector_key(selector),
                    properties: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        let props = &mut self.entries[idx].properties;
        match props.iter_mut().find(|(name, _)| name == property) {
            Some(slot) => slot.1 = value,
            None => props.push((property.to_string(), value)),
        }
    }

    /// Remove a pending change. Drops the selector once it has no properties.
    pub fn remove(&mut self, selector: &str, property: &str) -> Option<StyleValue> {
        let idx = self.position(selector)?;
        let props = &mut self.entries[idx].properties;
        let prop_idx = props.iter().position(|(name, _)| name == property)?;
        let (_, value) = props.remove(prop_idx);
        if props.is_empty() {
            self.entries.remove(idx);
        }
        Some(value)
    }
}

impl<'a> IntoIterator for &'a StyleChangeSet {
    type Item = &'a SelectorChanges;
    type IntoIter = std::slice::Iter<'a, SelectorChanges>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The session's accumulator of pending edits.
#[derive(Debug, Default)]
pub struct StyleChangeStore {
    pending: StyleChangeSet,
    unset_raised: bool,
}

impl StyleChangeStore {
    pub fn new() -> Self {
        StyleChangeStore::default()
    }

    pub fn record(&mut self, selector: &str, property: &str, value: impl Into<StyleValue>) {
        let value = value.into();
        if value == StyleValue::Unset {
            self.unset_raised = true;
        }
        log::debug!("recording {selector} {{ {property}: {value:?} }}");
        self.pending.insert(selector, property, value);
    }

    /// Record the same edit under the literal selector and a grouping key.
    pub fn record_grouped(
        &mut self,
        selector: &str,
        group_selector: Option<&str>,
        property: &str,
        value: impl Into<StyleValue>,
    ) {
        let value = value.into();
        if let Some(group) = group_selector.filter(|g| selector_key(g) != selector_key(selector)) {
            self.record(group, property, value.clone());
        }
        self.record(selector, property, value);
    }

    pub fn record_unset(&mut self, selector: &str, property: &str) {
        self.record(selector, property, StyleValue::Unset);
    }

    pub fn record_unset_grouped(
        &mut self,
        selector: &str,
        group_selector: Option<&str>,
        property: &str,
    ) {
        self.record_grouped(selector, group_selector, property, StyleValue::Unset);
    }

    /// Forget a pending change entirely, as if it had never been made.
    pub fn forget(&mut self, selector: &str, property: &str) -> Option<StyleValue> {
        self.pending.remove(selector, property)
    }

    pub fn pending(&self) -> &StyleChangeSet {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True when a save would do something.
    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty() || self.unset_raised
    }

    /// Take every pending change and reset the store.
    pub fn drain(&mut self) -> StyleChangeSet {
        self.unset_raised = false;
        std::mem::take(&mut self.pending)
    }
}
