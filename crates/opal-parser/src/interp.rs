//! String interpolation scanner.
//!
//! Splits quoted-string content into literal and decorator segments,
//! zero-copy: each part is a byte range into the input. `@name` becomes
//! a decorator segment only when `name` is registered as a value
//! decorator; otherwise the text (including any `.ident` tail) stays
//! literal, so `user@example.com` never fragments.
//!
//! A two-pass design counts parts first, then fills a pre-sized buffer.

use opal_registry::DecoratorRegistry;
use serde::Serialize;

/// One segment of a string's content. Offsets are byte positions into
/// the content (without quotes). `prop_start`/`prop_end` delimit the
/// `.property` of a decorator segment, or are -1 when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StringPart {
    pub start: u32,
    pub end: u32,
    pub is_decorator: bool,
    pub prop_start: i32,
    pub prop_end: i32,
}

impl StringPart {
    fn literal(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
            is_decorator: false,
            prop_start: -1,
            prop_end: -1,
        }
    }

    fn decorator(start: usize, end: usize, prop: Option<(usize, usize)>) -> Self {
        let (prop_start, prop_end) = match prop {
            Some((s, e)) => (s as i32, e as i32),
            None => (-1, -1),
        };
        Self {
            start: start as u32,
            end: end as u32,
            is_decorator: true,
            prop_start,
            prop_end,
        }
    }

    /// Whether this decorator segment carries a `.property`.
    pub fn has_property(&self) -> bool {
        self.prop_start >= 0
    }
}

/// Scan string content into parts.
///
/// Single-quoted content is always one literal part. Empty content
/// yields no parts. Content without registered decorators yields one
/// literal part spanning everything.
pub fn scan_string_parts(
    content: &str,
    quote: char,
    registry: &DecoratorRegistry,
) -> Vec<StringPart> {
    // Pass one: count.
    let mut count = 0usize;
    scan_with(content, quote, registry, &mut |_| count += 1);

    // Pass two: fill the pre-sized buffer.
    let mut parts = Vec::with_capacity(count);
    scan_with(content, quote, registry, &mut |part| parts.push(part));
    parts
}

fn scan_with(
    content: &str,
    quote: char,
    registry: &DecoratorRegistry,
    emit: &mut dyn FnMut(StringPart),
) {
    if content.is_empty() {
        return;
    }
    if quote == '\'' {
        emit(StringPart::literal(0, content.len()));
        return;
    }

    let bytes = content.as_bytes();
    let len = bytes.len();
    let mut lit_start = 0usize;
    let mut i = 0usize;

    while i < len {
        if bytes[i] == b'@' && i + 1 < len && is_ident_start(bytes[i + 1]) {
            let name_start = i + 1;
            let mut j = name_start;
            while j < len && is_ident_continue(bytes[j]) {
                j += 1;
            }
            let name = &content[name_start..j];

            if registry.is_value_decorator(name) {
                if i > lit_start {
                    emit(StringPart::literal(lit_start, i));
                }
                let mut end = j;
                let mut prop = None;
                if j + 1 < len && bytes[j] == b'.' && is_ident_start(bytes[j + 1]) {
                    let prop_start = j + 1;
                    let mut prop_end = prop_start;
                    while prop_end < len && is_ident_continue(bytes[prop_end]) {
                        prop_end += 1;
                    }
                    prop = Some((prop_start, prop_end));
                    end = prop_end;
                }
                emit(StringPart::decorator(i, end, prop));
                lit_start = end;
                i = end;
            } else {
                // Unregistered: the name and any .ident tail stay literal,
                // so email addresses survive intact.
                let mut k = j;
                while k + 1 < len && bytes[k] == b'.' && is_ident_start(bytes[k + 1]) {
                    k += 1;
                    while k < len && is_ident_continue(bytes[k]) {
                        k += 1;
                    }
                }
                i = k;
            }
        } else {
            i += 1;
        }
    }

    if lit_start < len {
        emit(StringPart::literal(lit_start, len));
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_registry::Registries;

    fn scan(content: &str, quote: char) -> Vec<StringPart> {
        scan_string_parts(content, quote, Registries::builtin().decorators)
    }

    #[test]
    fn empty_content_yields_no_parts() {
        assert!(scan("", '"').is_empty());
    }

    #[test]
    fn plain_text_is_one_literal_part() {
        let parts = scan("hello world", '"');
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_decorator);
        assert_eq!((parts[0].start, parts[0].end), (0, 11));
    }

    #[test]
    fn single_quotes_never_interpolate() {
        let parts = scan("home is @env.HOME", '\'');
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_decorator);
    }

    #[test]
    fn registered_decorator_with_property() {
        let parts = scan("home is @env.HOME!", '"');
        assert_eq!(parts.len(), 3);
        assert!(!parts[0].is_decorator);
        assert_eq!((parts[0].start, parts[0].end), (0, 8));
        assert!(parts[1].is_decorator);
        assert_eq!((parts[1].start, parts[1].end), (8, 17));
        assert!(parts[1].has_property());
        assert_eq!(
            &"home is @env.HOME!"[parts[1].prop_start as usize..parts[1].prop_end as usize],
            "HOME"
        );
        assert_eq!((parts[2].start, parts[2].end), (17, 18));
    }

    #[test]
    fn decorator_without_property() {
        let parts = scan("run @shell now", '"');
        assert_eq!(parts.len(), 3);
        assert!(parts[1].is_decorator);
        assert!(!parts[1].has_property());
    }

    #[test]
    fn unregistered_name_stays_literal() {
        // `example` is not a value decorator; the email must not fragment.
        let parts = scan("user@example.com", '"');
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_decorator);
        assert_eq!((parts[0].start, parts[0].end), (0, 16));
    }

    #[test]
    fn decorator_at_end_has_no_trailing_literal() {
        let parts = scan("home: @env.HOME", '"');
        assert_eq!(parts.len(), 2);
        assert!(parts[1].is_decorator);
        assert_eq!(parts[1].end, 15);
    }

    #[test]
    fn backtick_strings_interpolate() {
        let parts = scan("path @env.PATH", '`');
        assert_eq!(parts.len(), 2);
        assert!(parts[1].is_decorator);
    }

    #[test]
    fn bare_at_is_literal() {
        let parts = scan("a @ b", '"');
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_decorator);
    }
}
