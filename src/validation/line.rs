//! Line protocol validation.
//!
//! Clients send newline-delimited `KEY=VALUE` updates. Everything here is a
//! pure function of the input line and the closed kind set: no I/O, no
//! shared state.

use crate::error::ProtocolErrorKind;
use crate::registry::ControlKind;

/// A validated update ready to be applied to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlUpdate {
    pub kind: ControlKind,
    pub value: String,
}

/// Validate a raw protocol line and extract the update it carries.
///
/// Checks, in order:
/// 1. the line splits on `=` into exactly two non-empty parts,
/// 2. the key case-exactly matches a control kind's wire key,
/// 3. the value does not contain both `<` and `>` (keeps descriptor markup
///    intact no matter what a peer sends),
/// 4. the value matches the kind's format rule.
pub fn parse_update(line: &str) -> Result<ControlUpdate, ProtocolErrorKind> {
    let mut parts = line.split('=');
    let (key, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() => (key, value),
        _ => return Err(ProtocolErrorKind::Malformed),
    };

    let kind = ControlKind::from_wire_key(key).ok_or_else(|| ProtocolErrorKind::UnknownKey {
        key: key.to_string(),
    })?;

    if value.contains('<') && value.contains('>') {
        return Err(ProtocolErrorKind::MarkupInjection);
    }

    if !value_format_ok(kind, value) {
        return Err(ProtocolErrorKind::BadValue { kind });
    }

    Ok(ControlUpdate {
        kind,
        value: value.to_string(),
    })
}

/// Per-kind value format rule.
///
/// ColorPicker only hex-checks bytes 1..=5; the first byte is deliberately
/// left unchecked to stay compatible with peers that send a marker byte
/// there. TextField accepts anything, including the empty string.
pub fn value_format_ok(kind: ControlKind, value: &str) -> bool {
    match kind {
        ControlKind::Toggle | ControlKind::Checkbox => value == "true" || value == "false",
        ControlKind::ColorPicker => {
            value.len() == 6 && value.bytes().skip(1).all(|b| (b as char).is_ascii_hexdigit())
        }
        ControlKind::TextField => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_boolean_updates() {
        for line in ["TOGGLE=true", "TOGGLE=false", "CHECKBOX=true", "CHECKBOX=false"] {
            assert!(parse_update(line).is_ok(), "{line} should be accepted");
        }
    }

    #[test]
    fn test_boolean_rejects_anything_else() {
        for line in ["TOGGLE=True", "TOGGLE=1", "TOGGLE=yes", "CHECKBOX=FALSE", "CHECKBOX=0"] {
            let result = parse_update(line);
            assert!(
                matches!(result, Err(ProtocolErrorKind::BadValue { .. })),
                "{line} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn test_colorpicker_accepts_hex() {
        let update = parse_update("COLORPICKER=00FF00").unwrap();
        assert_eq!(update.kind, ControlKind::ColorPicker);
        assert_eq!(update.value, "00FF00");
        assert!(parse_update("COLORPICKER=abcdef").is_ok());
    }

    #[test]
    fn test_colorpicker_first_byte_unchecked() {
        // Only positions 1..=5 are hex-checked.
        assert!(parse_update("COLORPICKER=ZABCDE").is_ok());
        assert!(parse_update("COLORPICKER=!12345").is_ok());
        // A bad digit anywhere else is still rejected.
        assert!(matches!(
            parse_update("COLORPICKER=1234Z6"),
            Err(ProtocolErrorKind::BadValue { .. })
        ));
    }

    #[test]
    fn test_colorpicker_length_must_be_six() {
        for line in ["COLORPICKER=12345", "COLORPICKER=1234567", "COLORPICKER=F"] {
            assert!(matches!(
                parse_update(line),
                Err(ProtocolErrorKind::BadValue { .. })
            ));
        }
    }

    #[test]
    fn test_textfield_accepts_anything() {
        assert!(parse_update("TEXTFIELD=hello world").is_ok());
        assert!(parse_update("TEXTFIELD=123!@#").is_ok());
    }

    #[test]
    fn test_textfield_format_rule_accepts_empty_value() {
        // The per-kind rule places no constraint on textfield values; the
        // line-level split is what rejects an empty right-hand side.
        assert!(value_format_ok(ControlKind::TextField, ""));
        assert!(matches!(
            parse_update("TEXTFIELD="),
            Err(ProtocolErrorKind::Malformed)
        ));
    }

    #[test]
    fn test_injection_rejected_for_every_kind() {
        for line in [
            "TOGGLE=<script>",
            "TEXTFIELD=<b>bold</b>",
            "COLORPICKER=<1234>",
            "CHECKBOX=<x>",
        ] {
            assert_eq!(parse_update(line), Err(ProtocolErrorKind::MarkupInjection));
        }
    }

    #[test]
    fn test_one_sided_angle_bracket_is_not_injection() {
        assert!(parse_update("TEXTFIELD=a < b").is_ok());
        assert!(parse_update("TEXTFIELD=b > a").is_ok());
    }

    #[test]
    fn test_malformed_lines() {
        for line in ["", "TOGGLE", "=true", "TOGGLE=true=extra", "a=b=c"] {
            assert_eq!(parse_update(line), Err(ProtocolErrorKind::Malformed), "{line}");
        }
    }

    #[test]
    fn test_unknown_key_is_case_exact() {
        assert_eq!(
            parse_update("toggle=true"),
            Err(ProtocolErrorKind::UnknownKey {
                key: "toggle".to_string()
            })
        );
        assert!(matches!(
            parse_update("SLIDER=5"),
            Err(ProtocolErrorKind::UnknownKey { .. })
        ));
    }
}
