//! Edit tokens.
//!
//! A token says how one span of the original SQL changes. Generators only
//! produce tokens; [`SqlBuilder`](crate::builder::SqlBuilder) applies them.

use crate::error::RewriteError;
use crate::statement::{Literal, QuoteCharacter, Span};

/// One edit to the original SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlToken {
    pub span: Span,
    pub kind: TokenKind,
}

/// The closed set of edits the encrypt rewrite emits.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Delete the span.
    Remove,
    /// Replace the span (or insert at its start) with column names.
    SubstituteColumnNames(SubstituteColumnNames),
    /// Replace an assignment with one assignment per physical column.
    AssignmentRewrite(Vec<AssignmentPair>),
    /// Replace a value with a comma separated list of values.
    SubstituteValues(Vec<ValueItem>),
}

/// One value written by [`TokenKind::SubstituteValues`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueItem {
    /// A `?` marker.
    Parameter,
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstituteColumnNames {
    pub projections: Vec<SubstituteProjection>,
    /// Original type and constraint text re-emitted after each name.
    pub definition: Option<Span>,
    pub splice: Splice,
}

/// How substituted names join the surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splice {
    /// Exactly the rendered names.
    InPlace,
    /// An extra column definition: `"def, "`, or `", def"` after the last
    /// column.
    Column { last_column: bool },
    /// An extra ALTER TABLE clause, `"<label> def"` with a label such as
    /// `", ADD COLUMN"`.
    Clause(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstituteProjection {
    pub owner: Option<String>,
    /// Column renamed by `CHANGE COLUMN`, written before the name.
    pub previous: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    pub quote: QuoteCharacter,
}

impl SubstituteProjection {
    pub fn new(name: impl Into<String>, quote: QuoteCharacter) -> Self {
        Self {
            owner: None,
            previous: None,
            name: name.into(),
            alias: None,
            quote,
        }
    }

    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(previous) = &self.previous {
            out.push_str(&self.quote.wrap(previous));
            out.push(' ');
        }
        if let Some(owner) = &self.owner {
            out.push_str(&self.quote.wrap(owner));
            out.push('.');
        }
        out.push_str(&self.quote.wrap(&self.name));
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            out.push_str(&self.quote.wrap(alias));
        }
        out
    }
}

/// `column = value` for one physical column.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPair {
    pub owner: Option<String>,
    pub column: String,
    pub quote: QuoteCharacter,
    pub value: AssignmentTokenValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentTokenValue {
    /// A `?` marker; the caller binds one value per marker.
    Parameter,
    /// A value already computed for this column.
    Literal(Literal),
    /// `VALUES(<physical source>)`.
    Values(String),
}

impl SqlToken {
    pub fn remove(span: Span) -> Self {
        Self {
            span,
            kind: TokenKind::Remove,
        }
    }

    pub fn substitute(span: Span, projections: Vec<SubstituteProjection>, splice: Splice) -> Self {
        Self {
            span,
            kind: TokenKind::SubstituteColumnNames(SubstituteColumnNames {
                projections,
                definition: None,
                splice,
            }),
        }
    }

    /// Attach the definition text re-emitted after each substituted name.
    pub fn with_definition(mut self, definition: Span) -> Self {
        if let TokenKind::SubstituteColumnNames(substitute) = &mut self.kind {
            substitute.definition = Some(definition);
        }
        self
    }

    pub fn assignment(span: Span, pairs: Vec<AssignmentPair>) -> Self {
        Self {
            span,
            kind: TokenKind::AssignmentRewrite(pairs),
        }
    }

    pub fn values(span: Span, values: Vec<ValueItem>) -> Self {
        Self {
            span,
            kind: TokenKind::SubstituteValues(values),
        }
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    /// Physical column names this token writes, in output order.
    pub fn column_names(&self) -> Vec<&str> {
        match &self.kind {
            TokenKind::Remove | TokenKind::SubstituteValues(_) => Vec::new(),
            TokenKind::SubstituteColumnNames(substitute) => substitute
                .projections
                .iter()
                .map(|p| p.name.as_str())
                .collect(),
            TokenKind::AssignmentRewrite(pairs) => {
                pairs.iter().map(|p| p.column.as_str()).collect()
            }
        }
    }

    /// Replacement text for the token's span.
    pub fn render(&self, sql: &str) -> Result<String, RewriteError> {
        match &self.kind {
            TokenKind::Remove => Ok(String::new()),
            TokenKind::SubstituteColumnNames(substitute) => substitute.render(sql),
            TokenKind::AssignmentRewrite(pairs) => Ok(render_assignments(pairs)),
            TokenKind::SubstituteValues(values) => Ok(values
                .iter()
                .map(|value| match value {
                    ValueItem::Parameter => "?".to_string(),
                    ValueItem::Literal(literal) => literal.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ")),
        }
    }
}

impl SubstituteColumnNames {
    fn render(&self, sql: &str) -> Result<String, RewriteError> {
        let definition = match self.definition {
            Some(span) => sql.get(span.start..span.end).ok_or(RewriteError::InvalidToken {
                start: span.start,
                end: span.end,
                len: sql.len(),
            })?,
            None => "",
        };

        let body = self
            .projections
            .iter()
            .map(|projection| format!("{}{}", projection.render(), definition))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(match self.splice {
            Splice::InPlace => body,
            Splice::Column { last_column: false } => format!("{}, ", body),
            Splice::Column { last_column: true } => format!(", {}", body),
            Splice::Clause(label) => format!("{} {}", label, body),
        })
    }
}

fn render_assignments(pairs: &[AssignmentPair]) -> String {
    let mut out = String::new();
    for (i, pair) in pairs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let column = match &pair.owner {
            Some(owner) => format!("{}.{}", pair.quote.wrap(owner), pair.quote.wrap(&pair.column)),
            None => pair.quote.wrap(&pair.column),
        };
        let assignment = match &pair.value {
            AssignmentTokenValue::Parameter => format!("{} = ?", column),
            AssignmentTokenValue::Literal(literal) => format!("{} = {}", column, literal),
            AssignmentTokenValue::Values(source) => {
                format!("{} = VALUES({})", column, pair.quote.wrap(source))
            }
        };
        out.push_str(&assignment);
    }
    out
}
