//! Control registry.
//!
//! The in-memory set of typed UI control values the daemon exposes. Kinds
//! are unique within a registry and insertion order (configuration order)
//! is preserved for descriptor reconciliation.

use std::fmt;

use serde::Deserialize;

/// The closed set of control kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Toggle,
    ColorPicker,
    TextField,
    Checkbox,
}

impl ControlKind {
    /// All kinds, in a fixed order.
    pub const ALL: [ControlKind; 4] = [
        ControlKind::Toggle,
        ControlKind::ColorPicker,
        ControlKind::TextField,
        ControlKind::Checkbox,
    ];

    /// The key clients send on the wire (`KEY=VALUE`).
    pub fn wire_key(&self) -> &'static str {
        match self {
            ControlKind::Toggle => "TOGGLE",
            ControlKind::ColorPicker => "COLORPICKER",
            ControlKind::TextField => "TEXTFIELD",
            ControlKind::Checkbox => "CHECKBOX",
        }
    }

    /// The key used in descriptor txt-records (lowercased wire key).
    pub fn record_key(&self) -> &'static str {
        match self {
            ControlKind::Toggle => "toggle",
            ControlKind::ColorPicker => "colorpicker",
            ControlKind::TextField => "textfield",
            ControlKind::Checkbox => "checkbox",
        }
    }

    /// The value a control of this kind starts with when none is configured.
    pub fn default_value(&self) -> &'static str {
        match self {
            ControlKind::Toggle => "false",
            ControlKind::ColorPicker => "FFFFFF",
            ControlKind::TextField => "empty",
            ControlKind::Checkbox => "false",
        }
    }

    /// Look up a kind by its case-exact wire key.
    pub fn from_wire_key(key: &str) -> Option<ControlKind> {
        Self::ALL.iter().copied().find(|k| k.wire_key() == key)
    }

    /// Look up a kind by its descriptor record key.
    pub fn from_record_key(key: &str) -> Option<ControlKind> {
        Self::ALL.iter().copied().find(|k| k.record_key() == key)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

/// One exposed control: a kind plus its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: ControlKind,
    pub value: String,
}

impl Control {
    pub fn new(kind: ControlKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// A control of the given kind holding its default value.
    pub fn with_default(kind: ControlKind) -> Self {
        Self::new(kind, kind.default_value())
    }
}

/// The result of a successful [`ControlRegistry::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub kind: ControlKind,
    /// The value that was replaced, kept for logging the transition.
    pub old_value: String,
    pub new_value: String,
}

/// Signals that [`ControlRegistry::apply`] was given a kind the registry
/// does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownKind(pub ControlKind);

/// Ordered collection of controls, one per kind.
///
/// Only the single serving loop ever mutates a registry, so there is no
/// interior locking.
#[derive(Debug, Clone, Default)]
pub struct ControlRegistry {
    controls: Vec<Control>,
}

impl ControlRegistry {
    /// Build a registry from configured controls. Kinds must be unique;
    /// settings validation enforces that before this is reached.
    pub fn new(controls: Vec<Control>) -> Self {
        debug_assert!(
            controls
                .iter()
                .all(|c| controls.iter().filter(|o| o.kind == c.kind).count() == 1),
            "registry kinds must be unique"
        );
        Self { controls }
    }

    /// Overwrite the value of the control with the given kind.
    ///
    /// Returns the applied transition, or [`UnknownKind`] if no control of
    /// that kind is registered.
    pub fn apply(&mut self, kind: ControlKind, value: &str) -> Result<Applied, UnknownKind> {
        let control = self
            .controls
            .iter_mut()
            .find(|c| c.kind == kind)
            .ok_or(UnknownKind(kind))?;

        let old_value = std::mem::replace(&mut control.value, value.to_string());
        Ok(Applied {
            kind,
            old_value,
            new_value: control.value.clone(),
        })
    }

    /// Read-only iteration over all controls, in configuration order.
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.iter()
    }

    /// Whether a control of the given kind is registered.
    pub fn contains(&self, kind: ControlKind) -> bool {
        self.controls.iter().any(|c| c.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ControlRegistry {
        ControlRegistry::new(vec![
            Control::with_default(ControlKind::Toggle),
            Control::with_default(ControlKind::ColorPicker),
        ])
    }

    #[test]
    fn test_apply_overwrites_and_returns_old_value() {
        let mut reg = registry();
        let applied = reg.apply(ControlKind::Toggle, "true").unwrap();

        assert_eq!(applied.old_value, "false");
        assert_eq!(applied.new_value, "true");

        let toggle = reg
            .controls()
            .find(|c| c.kind == ControlKind::Toggle)
            .unwrap();
        assert_eq!(toggle.value, "true");
    }

    #[test]
    fn test_apply_unknown_kind() {
        let mut reg = registry();
        let result = reg.apply(ControlKind::Checkbox, "true");
        assert_eq!(result, Err(UnknownKind(ControlKind::Checkbox)));
    }

    #[test]
    fn test_apply_preserves_other_controls() {
        let mut reg = registry();
        reg.apply(ControlKind::ColorPicker, "00FF00").unwrap();

        let toggle = reg
            .controls()
            .find(|c| c.kind == ControlKind::Toggle)
            .unwrap();
        assert_eq!(toggle.value, "false");
    }

    #[test]
    fn test_iteration_order_is_configuration_order() {
        let reg = ControlRegistry::new(vec![
            Control::with_default(ControlKind::Checkbox),
            Control::with_default(ControlKind::Toggle),
        ]);
        let kinds: Vec<_> = reg.controls().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ControlKind::Checkbox, ControlKind::Toggle]);
    }

    #[test]
    fn test_wire_and_record_keys() {
        assert_eq!(ControlKind::ColorPicker.wire_key(), "COLORPICKER");
        assert_eq!(ControlKind::ColorPicker.record_key(), "colorpicker");
        assert_eq!(ControlKind::from_wire_key("TEXTFIELD"), Some(ControlKind::TextField));
        assert_eq!(ControlKind::from_wire_key("textfield"), None);
        assert_eq!(ControlKind::from_record_key("checkbox"), Some(ControlKind::Checkbox));
    }
}
