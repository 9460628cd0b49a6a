//! `CREATE TABLE` text rewriting for SHOW CREATE TABLE results.
//!
//! The backend reports the physical layout. Every encrypted logical column
//! is folded back into a single clause: the first physical clause found for
//! it keeps its type and constraints under the logical name, the other
//! physical clauses are dropped. Keys, ordinary columns and table options
//! are left as they are.

use std::collections::HashSet;

use shroud_core::EncryptTable;
use shroud_rewrite::statement::QuoteCharacter;

/// Rewrite the `CREATE TABLE` text `ddl` for `table`.
///
/// Text without a parenthesised column list is returned unchanged. Applying
/// the rewrite to its own output changes nothing.
pub fn rewrite_create_table(ddl: &str, table: &EncryptTable) -> String {
    let Some((open, close)) = column_list(ddl) else {
        tracing::warn!(table = table.name(), "No column list in CREATE TABLE text");
        return ddl.to_string();
    };

    let body = &ddl[open + 1..close];
    let content = body.trim_end();
    let tail = &body[content.len()..];

    let mut seen = HashSet::new();
    let mut clauses = Vec::new();
    let mut changed = false;
    for clause in split_clauses(content) {
        let Some(name) = ClauseName::parse(clause) else {
            clauses.push(clause.to_string());
            continue;
        };
        let Some((column, role)) = table.find_by_physical(name.value) else {
            clauses.push(clause.to_string());
            continue;
        };

        let logical = column.logical_name();
        if !seen.insert(logical.to_ascii_lowercase()) {
            tracing::trace!(table = table.name(), column = name.value, %role, "Dropping physical clause");
            changed = true;
            continue;
        }
        if name.value != logical {
            changed = true;
        }
        clauses.push(format!(
            "{}{}{}",
            &clause[..name.start],
            name.quote.wrap(logical),
            &clause[name.end..]
        ));
    }

    if !changed {
        return ddl.to_string();
    }
    tracing::debug!(table = table.name(), "Rewrote CREATE TABLE text to logical columns");
    format!("{}{}{}{}", &ddl[..=open], clauses.join(","), tail, &ddl[close..])
}

/// Byte offsets of the parentheses around the column list.
fn column_list(ddl: &str) -> Option<(usize, usize)> {
    let mut scanner = Scanner::default();
    let mut open = None;
    for (idx, c) in ddl.char_indices() {
        if scanner.step(c) {
            continue;
        }
        match c {
            '(' => {
                if scanner.depth == 0 && open.is_none() {
                    open = Some(idx);
                }
                scanner.depth += 1;
            }
            ')' => {
                scanner.depth = scanner.depth.saturating_sub(1);
                if scanner.depth == 0 {
                    if let Some(open) = open {
                        return Some((open, idx));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Split the column list on top-level commas. Each clause keeps its
/// surrounding whitespace.
fn split_clauses(body: &str) -> Vec<&str> {
    let mut scanner = Scanner::default();
    let mut clauses = Vec::new();
    let mut start = 0;
    for (idx, c) in body.char_indices() {
        if scanner.step(c) {
            continue;
        }
        match c {
            '(' => scanner.depth += 1,
            ')' => scanner.depth = scanner.depth.saturating_sub(1),
            ',' if scanner.depth == 0 => {
                clauses.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    clauses.push(&body[start..]);
    clauses
}

/// Quote and escape state while walking SQL text.
#[derive(Default)]
struct Scanner {
    quote: Option<char>,
    escaped: bool,
    depth: usize,
}

impl Scanner {
    /// Feed one character; `true` when it belongs to a quoted section.
    fn step(&mut self, c: char) -> bool {
        let Some(quote) = self.quote else {
            if matches!(c, '\'' | '"' | '`') {
                self.quote = Some(c);
                return true;
            }
            return false;
        };
        if self.escaped {
            self.escaped = false;
        } else if c == '\\' && quote != '`' {
            self.escaped = true;
        } else if c == quote {
            // A doubled quote closes and reopens, which leaves the state as is.
            self.quote = None;
        }
        true
    }
}

/// The leading identifier of a clause.
struct ClauseName<'a> {
    value: &'a str,
    quote: QuoteCharacter,
    /// Offsets of the identifier, quotes included, within the clause.
    start: usize,
    end: usize,
}

impl<'a> ClauseName<'a> {
    fn parse(clause: &'a str) -> Option<Self> {
        let start = clause.len() - clause.trim_start().len();
        let rest = &clause[start..];
        let quote = QuoteCharacter::of(rest);
        let (value, len) = match quote {
            QuoteCharacter::None => {
                let len = rest
                    .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                    .unwrap_or(rest.len());
                (&rest[..len], len)
            }
            QuoteCharacter::Brackets => {
                let close = rest.find(']')?;
                (&rest[1..close], close + 1)
            }
            QuoteCharacter::BackQuote | QuoteCharacter::DoubleQuote => {
                let mark = if quote == QuoteCharacter::BackQuote { '`' } else { '"' };
                let close = rest[1..].find(mark)? + 1;
                (&rest[1..close], close + 1)
            }
        };
        (!value.is_empty()).then_some(Self {
            value,
            quote,
            start,
            end: start + len,
        })
    }
}
