//! Span helpers for building statements from fixture SQL.

use crate::statement::{ColumnDefinition, ColumnRef, Identifier, QuoteCharacter, Span, TableRef};

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Span of the `nth` (zero-based) whole-word occurrence of `needle`.
pub(crate) fn span_nth(sql: &str, needle: &str, nth: usize) -> Span {
    let mut seen = 0;
    for (start, _) in sql.match_indices(needle) {
        let end = start + needle.len();
        let before = sql[..start].chars().next_back();
        let after = sql[end..].chars().next();
        let bounded_left = !needle.starts_with(is_word_char) || !before.is_some_and(is_word_char);
        let bounded_right = !needle.ends_with(is_word_char) || !after.is_some_and(is_word_char);
        if bounded_left && bounded_right {
            if seen == nth {
                return Span::new(start, end);
            }
            seen += 1;
        }
    }
    panic!("`{}` occurrence {} not found in `{}`", needle, nth, sql);
}

pub(crate) fn span(sql: &str, needle: &str) -> Span {
    span_nth(sql, needle, 0)
}

/// Identifier for the `nth` occurrence of a raw, possibly quoted, name.
pub(crate) fn ident_nth(sql: &str, raw: &str, nth: usize) -> Identifier {
    let quote = QuoteCharacter::of(raw);
    let value = match quote {
        QuoteCharacter::None => raw,
        _ => &raw[1..raw.len() - 1],
    };
    Identifier::new(value, span_nth(sql, raw, nth)).quoted(quote)
}

pub(crate) fn ident(sql: &str, raw: &str) -> Identifier {
    ident_nth(sql, raw, 0)
}

/// Column for the `nth` occurrence of `name` or `owner.name`.
pub(crate) fn column_nth(sql: &str, raw: &str, nth: usize) -> ColumnRef {
    let whole = span_nth(sql, raw, nth);
    match raw.split_once('.') {
        Some((owner, name)) => {
            let owner_span = Span::new(whole.start, whole.start + owner.len());
            let name_span = Span::new(whole.end - name.len(), whole.end);
            let owner_quote = QuoteCharacter::of(owner);
            let name_quote = QuoteCharacter::of(name);
            ColumnRef::new(Identifier::new(unquote(name), name_span).quoted(name_quote))
                .with_owner(Identifier::new(unquote(owner), owner_span).quoted(owner_quote))
        }
        None => ColumnRef::new(ident_nth(sql, raw, nth)),
    }
}

pub(crate) fn column(sql: &str, raw: &str) -> ColumnRef {
    column_nth(sql, raw, 0)
}

pub(crate) fn table(sql: &str, raw: &str) -> TableRef {
    TableRef::new(ident(sql, raw))
}

/// Column definition running from `name` through `definition`.
pub(crate) fn definition(sql: &str, name: &str, definition: &str) -> ColumnDefinition {
    let text = format!("{}{}", name, definition);
    let whole = span(sql, &text);
    let mut identifier = ident(&sql[whole.start..], name);
    identifier.span = Span::new(whole.start, whole.start + name.len());
    ColumnDefinition::new(identifier, whole)
}

fn unquote(raw: &str) -> &str {
    match QuoteCharacter::of(raw) {
        QuoteCharacter::None => raw,
        _ => &raw[1..raw.len() - 1],
    }
}
