//! Pure line-level editing of the descriptor document.
//!
//! Every operation here maps a slice of existing lines to a new `Vec` of
//! lines; nothing touches the filesystem. Lines the daemon does not own
//! (anything that is not the port element, the running record, or a
//! control txt-record) pass through verbatim and in order.

use crate::registry::{ControlKind, ControlRegistry};

/// Indentation used for lines the daemon rewrites or inserts. Matches the
/// skeleton written by `initialize`.
const INDENT: &str = "    ";

/// What a single descriptor line is, as far as the daemon is concerned.
#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    /// The `<port>` element.
    Port,
    /// The `running` boolean txt-record.
    Running,
    /// Any other txt-record; `key` is the part before the first `=`, or the
    /// whole inner text if there is none.
    Record { key: &'a str },
    /// A line the daemon does not own.
    Other,
}

fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();

    if trimmed.starts_with("<port>") && trimmed.ends_with("</port>") {
        return LineKind::Port;
    }

    if let Some(inner) = trimmed
        .strip_prefix("<txt-record>")
        .and_then(|rest| rest.strip_suffix("</txt-record>"))
    {
        let key = inner.split('=').next().unwrap_or(inner);
        if key == "running" {
            return LineKind::Running;
        }
        return LineKind::Record { key };
    }

    LineKind::Other
}

pub(super) fn port_line(port: u16) -> String {
    format!("{INDENT}<port>{port}</port>")
}

pub(super) fn record_line(key: &str, value: &str) -> String {
    format!("{INDENT}<txt-record>{key}={value}</txt-record>")
}

pub(super) fn running_line(running: bool) -> String {
    record_line("running", if running { "true" } else { "false" })
}

/// Synthesize a complete descriptor document for a fresh file.
pub(super) fn skeleton(registry: &ControlRegistry, port: u16, service_type: &str) -> String {
    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" standalone='no'?><!--*-nxml-*-->\n");
    doc.push_str("<!DOCTYPE service-group SYSTEM \"avahi-service.dtd\">\n\n");
    doc.push_str("<service-group>\n\n");
    doc.push_str("  <name replace-wildcards=\"yes\">%h</name>\n\n");
    doc.push_str("  <service>\n");
    doc.push_str(&format!("{INDENT}<type>{service_type}</type>\n"));
    doc.push_str(&port_line(port));
    doc.push('\n');
    doc.push_str(&running_line(true));
    doc.push('\n');
    for control in registry.controls() {
        doc.push_str(&record_line(control.kind.record_key(), &control.value));
        doc.push('\n');
    }
    doc.push_str("  </service>\n\n");
    doc.push_str("</service-group>\n");
    doc
}

/// Reconcile existing descriptor lines against the registry.
///
/// Single pass over the old lines building the new sequence:
/// - the port element is rewritten in place,
/// - the running record is reset to `true`, position untouched,
/// - a record whose kind is registered is kept verbatim (the on-file value
///   stays authoritative over the registry default); duplicates beyond the
///   first are dropped,
/// - any other txt-record is removed,
/// - unowned lines pass through unchanged.
///
/// Kinds with no surviving record are appended in registry order right
/// after the last owned line (last record, else running, else port).
/// Reconciling an already-converged document is a byte-level no-op.
pub(super) fn reconcile_lines(
    old: &[String],
    registry: &ControlRegistry,
    port: u16,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(old.len() + registry.len());
    let mut seen: Vec<ControlKind> = Vec::with_capacity(registry.len());
    let mut append_at: Option<usize> = None;

    for line in old {
        match classify(line) {
            LineKind::Port => {
                out.push(port_line(port));
                append_at = Some(out.len());
            }
            LineKind::Running => {
                out.push(running_line(true));
                append_at = Some(out.len());
            }
            LineKind::Record { key } => match ControlKind::from_record_key(key) {
                Some(kind) if registry.contains(kind) && !seen.contains(&kind) => {
                    seen.push(kind);
                    out.push(line.clone());
                    append_at = Some(out.len());
                }
                // Stale or foreign record, dropped.
                _ => {}
            },
            LineKind::Other => out.push(line.clone()),
        }
    }

    let at = append_at.unwrap_or(out.len());
    let missing = registry.controls().filter(|c| !seen.contains(&c.kind));
    for (offset, control) in missing.enumerate() {
        out.insert(
            at + offset,
            record_line(control.kind.record_key(), &control.value),
        );
    }

    out
}

/// Rewrite the record for `kind` to hold `value`.
///
/// Returns the new lines and whether a matching record was found.
pub(super) fn rewrite_record(old: &[String], kind: ControlKind, value: &str) -> (Vec<String>, bool) {
    let mut found = false;
    let out = old
        .iter()
        .map(|line| match classify(line) {
            LineKind::Record { key } if !found && key == kind.record_key() => {
                found = true;
                record_line(kind.record_key(), value)
            }
            _ => line.clone(),
        })
        .collect();
    (out, found)
}

/// Rewrite the running record to hold `running`.
pub(super) fn rewrite_running(old: &[String], running: bool) -> Vec<String> {
    old.iter()
        .map(|line| match classify(line) {
            LineKind::Running => running_line(running),
            _ => line.clone(),
        })
        .collect()
}
