use std::fmt;

use serde::Serialize;

/// Where a diagnostic points in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    /// Byte offset of the offending token.
    pub offset: u32,
    /// Byte length of the offending token (0 at end of file).
    pub len: u32,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub col: u32,
}

impl Position {
    pub fn new(offset: u32, len: u32, line: u32, col: u32) -> Self {
        Self {
            offset,
            len,
            line,
            col,
        }
    }

    /// The position as a byte range, clamped to at least one byte so
    /// renderers always have something to underline.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + (self.len.max(1) as usize)
    }
}

/// Error or warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Structured codes for decorator schema-validation failures.
///
/// The string renderings are part of the public surface (tooling matches
/// on them) and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchemaCode {
    TypeMismatch,
    RequiredMissing,
    EnumInvalid,
    EnumDeprecated,
    PatternMismatch,
    AdditionalProp,
    RangeViolation,
    IntRequired,
    FormatInvalid,
    LengthViolation,
    ArrayElementType,
    ObjectFieldType,
}

impl SchemaCode {
    /// The stable wire/string form of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaCode::TypeMismatch => "SCHEMA_TYPE_MISMATCH",
            SchemaCode::RequiredMissing => "SCHEMA_REQUIRED_MISSING",
            SchemaCode::EnumInvalid => "SCHEMA_ENUM_INVALID",
            SchemaCode::EnumDeprecated => "SCHEMA_ENUM_DEPRECATED",
            SchemaCode::PatternMismatch => "SCHEMA_PATTERN_MISMATCH",
            SchemaCode::AdditionalProp => "SCHEMA_ADDITIONAL_PROP",
            SchemaCode::RangeViolation => "SCHEMA_RANGE_VIOLATION",
            SchemaCode::IntRequired => "SCHEMA_INT_REQUIRED",
            SchemaCode::FormatInvalid => "SCHEMA_FORMAT_INVALID",
            SchemaCode::LengthViolation => "SCHEMA_LENGTH_VIOLATION",
            SchemaCode::ArrayElementType => "SCHEMA_ARRAY_ELEMENT_TYPE",
            SchemaCode::ObjectFieldType => "SCHEMA_OBJECT_FIELD_TYPE",
        }
    }
}

impl fmt::Display for SchemaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The schema half of a decorator-validation diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    pub code: SchemaCode,
    /// Parameter path, e.g. `delay` or `format.timestamp`.
    pub path: String,
    /// Human description of the expected type, e.g. `duration (e.g., "5m", "1h")`.
    pub expected_type: String,
    /// Rendering of what was actually supplied, e.g. `integer`.
    pub got_value: String,
}

/// A parse or validation diagnostic.
///
/// Every diagnostic carries a message and a context ("parameter list",
/// "if condition", ...). Expected/got token tags, suggestion, example,
/// and note are filled where the parser has something useful to say;
/// schema-validation diagnostics additionally carry a [`SchemaViolation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub position: Position,
    pub message: String,
    pub context: String,
    /// Expected-token descriptions, empty when not an expectation failure.
    pub expected: Vec<String>,
    /// Tag of the token actually found, empty when irrelevant.
    pub got: String,
    pub suggestion: String,
    pub example: String,
    pub note: String,
    pub schema: Option<SchemaViolation>,
}

impl Diagnostic {
    /// Create a bare diagnostic; the `with_*` builders fill in the rest.
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        context: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            severity,
            file: "<input>".to_string(),
            position,
            message: message.into(),
            context: context.into(),
            expected: Vec::new(),
            got: String::new(),
            suggestion: String::new(),
            example: String::new(),
            note: String::new(),
            schema: None,
        }
    }

    pub fn error(message: impl Into<String>, context: impl Into<String>, position: Position) -> Self {
        Self::new(Severity::Error, message, context, position)
    }

    pub fn warning(
        message: impl Into<String>,
        context: impl Into<String>,
        position: Position,
    ) -> Self {
        Self::new(Severity::Warning, message, context, position)
    }

    pub fn with_expected(mut self, expected: Vec<String>) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_got(mut self, got: impl Into<String>) -> Self {
        self.got = got.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_schema(
        mut self,
        code: SchemaCode,
        path: impl Into<String>,
        expected_type: impl Into<String>,
        got_value: impl Into<String>,
    ) -> Self {
        self.schema = Some(SchemaViolation {
            code,
            path: path.into(),
            expected_type: expected_type.into(),
            got_value: got_value.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.position.line, self.position.col, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_codes_are_stable() {
        assert_eq!(SchemaCode::TypeMismatch.as_str(), "SCHEMA_TYPE_MISMATCH");
        assert_eq!(
            SchemaCode::RequiredMissing.as_str(),
            "SCHEMA_REQUIRED_MISSING"
        );
        assert_eq!(SchemaCode::EnumInvalid.as_str(), "SCHEMA_ENUM_INVALID");
        assert_eq!(SchemaCode::EnumDeprecated.as_str(), "SCHEMA_ENUM_DEPRECATED");
        assert_eq!(
            SchemaCode::PatternMismatch.as_str(),
            "SCHEMA_PATTERN_MISMATCH"
        );
        assert_eq!(SchemaCode::AdditionalProp.as_str(), "SCHEMA_ADDITIONAL_PROP");
        assert_eq!(SchemaCode::RangeViolation.as_str(), "SCHEMA_RANGE_VIOLATION");
        assert_eq!(SchemaCode::IntRequired.as_str(), "SCHEMA_INT_REQUIRED");
        assert_eq!(SchemaCode::FormatInvalid.as_str(), "SCHEMA_FORMAT_INVALID");
        assert_eq!(
            SchemaCode::LengthViolation.as_str(),
            "SCHEMA_LENGTH_VIOLATION"
        );
        assert_eq!(
            SchemaCode::ArrayElementType.as_str(),
            "SCHEMA_ARRAY_ELEMENT_TYPE"
        );
        assert_eq!(
            SchemaCode::ObjectFieldType.as_str(),
            "SCHEMA_OBJECT_FIELD_TYPE"
        );
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::error("expected )", "parameter list", Position::new(10, 1, 2, 3))
            .with_expected(vec![")".into()])
            .with_got("{")
            .with_suggestion("Add `)` to close the parameter list")
            .with_example("fun greet(name String) {}");
        assert!(d.is_error());
        assert_eq!(d.expected, vec![")".to_string()]);
        assert_eq!(d.got, "{");
        assert_eq!(d.to_string(), "2:3: expected )");
        assert!(d.schema.is_none());
    }

    #[test]
    fn schema_builder() {
        let d = Diagnostic::error(
            "parameter 'default' expects string, got integer",
            "@env",
            Position::default(),
        )
        .with_schema(SchemaCode::TypeMismatch, "default", "string", "integer");
        let schema = d.schema.unwrap();
        assert_eq!(schema.code, SchemaCode::TypeMismatch);
        assert_eq!(schema.path, "default");
        assert_eq!(schema.expected_type, "string");
        assert_eq!(schema.got_value, "integer");
    }

    #[test]
    fn position_range_never_empty() {
        assert_eq!(Position::new(5, 0, 1, 6).range(), 5..6);
        assert_eq!(Position::new(5, 3, 1, 6).range(), 5..8);
    }
}
