//! Shared leaf types for the Opal toolchain.
//!
//! Everything here is consumed by both the lexer and the parser: source
//! spans with on-demand line/column lookup, the token vocabulary,
//! collected lexer errors, and the diagnostic model (including the
//! structured schema-validation codes) with ariadne-based rendering.

pub mod diagnostic;
pub mod lex_error;
pub mod render;
pub mod span;
pub mod token;

pub use diagnostic::{Diagnostic, Position, SchemaCode, SchemaViolation, Severity};
pub use lex_error::{LexError, LexErrorKind};
pub use span::{LineIndex, Span};
pub use token::{keyword_from_str, Token, TokenKind};
