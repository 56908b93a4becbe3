//! Ariadne-based rendering for Opal diagnostics.
//!
//! Produces labeled terminal reports: severity, code (for schema
//! violations), a primary label at the offending span, the suggestion as
//! help, and the note as a footnote. Output is colorless so tests can
//! assert on it directly.

use ariadne::{Config, Label, Report, ReportKind, Source};

use crate::diagnostic::{Diagnostic, Severity};

/// Render a single diagnostic against its source text.
pub fn render_diagnostic(diag: &Diagnostic, source: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp the span into the source so ariadne always gets a valid range.
    let range = diag.position.range();
    let start = range.start.min(source_len);
    let end = range.end.min(source_len).max(start);
    let range = if start == end {
        start..start.saturating_add(1).min(source_len.max(1))
    } else {
        start..end
    };

    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };

    let label_msg = if diag.expected.is_empty() {
        diag.context.clone()
    } else {
        format!("expected {} here", diag.expected.join(" or "))
    };

    let mut builder = Report::build(kind, range.clone())
        .with_message(&diag.message)
        .with_config(config)
        .with_label(Label::new(range).with_message(label_msg));

    if let Some(schema) = &diag.schema {
        builder = builder.with_code(schema.code.as_str());
    }
    if !diag.suggestion.is_empty() {
        builder = builder.with_help(&diag.suggestion);
    }
    if !diag.note.is_empty() {
        builder = builder.with_note(&diag.note);
    } else if !diag.example.is_empty() {
        builder = builder.with_note(format!("example: {}", diag.example));
    }

    let mut buf = Vec::new();
    let cache = Source::from(source);
    builder
        .finish()
        .write(cache, &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

/// Render every diagnostic in order, separated by blank lines.
pub fn render_all(diags: &[Diagnostic], source: &str) -> String {
    diags
        .iter()
        .map(|d| render_diagnostic(d, source))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Position, SchemaCode};

    #[test]
    fn renders_message_and_help() {
        let source = "fun greet( {";
        let diag = Diagnostic::error(
            "expected ) in parameter list",
            "parameter list",
            Position::new(11, 1, 1, 12),
        )
        .with_expected(vec![")".into()])
        .with_suggestion("Add `)` to close the parameter list");

        let out = render_diagnostic(&diag, source);
        assert!(out.contains("expected ) in parameter list"), "{out}");
        assert!(out.contains("Add `)` to close the parameter list"), "{out}");
    }

    #[test]
    fn renders_schema_code() {
        let source = "@env.HOME(default=42)";
        let diag = Diagnostic::error(
            "parameter 'default' expects string, got integer",
            "@env",
            Position::new(18, 2, 1, 19),
        )
        .with_schema(SchemaCode::TypeMismatch, "default", "string", "integer");

        let out = render_diagnostic(&diag, source);
        assert!(out.contains("SCHEMA_TYPE_MISMATCH"), "{out}");
    }

    #[test]
    fn span_past_end_is_clamped() {
        let diag = Diagnostic::error("unexpected end of file", "file", Position::new(99, 0, 1, 1));
        // Must not panic.
        let _ = render_diagnostic(&diag, "x");
    }
}
