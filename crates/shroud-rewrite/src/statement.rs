//! Position-tagged statement model.
//!
//! This is the shape the parser layer hands to the token generators: every
//! segment that may be rewritten carries its byte span in the original SQL
//! text. Only the segments the encrypt rewrite looks at are modelled; the rest
//! of a statement is copied through untouched by the token applier.

use std::fmt;

/// Half-open byte range `[start, end)` in the original SQL.
///
/// A span with `end <= start` marks an insertion point at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span used by insertion tokens.
    pub const fn at(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub const fn is_insertion(&self) -> bool {
        self.end <= self.start
    }
}

/// Quoting style of an identifier as written by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuoteCharacter {
    #[default]
    None,
    BackQuote,
    DoubleQuote,
    Brackets,
}

impl QuoteCharacter {
    /// Quote `value` in this style.
    pub fn wrap(self, value: &str) -> String {
        match self {
            QuoteCharacter::None => value.to_string(),
            QuoteCharacter::BackQuote => format!("`{}`", value),
            QuoteCharacter::DoubleQuote => format!("\"{}\"", value),
            QuoteCharacter::Brackets => format!("[{}]", value),
        }
    }

    /// Detect the style from the first character of a raw identifier.
    pub fn of(raw: &str) -> Self {
        match raw.chars().next() {
            Some('`') => QuoteCharacter::BackQuote,
            Some('"') => QuoteCharacter::DoubleQuote,
            Some('[') => QuoteCharacter::Brackets,
            _ => QuoteCharacter::None,
        }
    }
}

/// A (possibly quoted) identifier and where it sits in the SQL.
///
/// `value` is the unquoted name; `span` covers the quotes as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub value: String,
    pub quote: QuoteCharacter,
    pub span: Span,
}

impl Identifier {
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Self {
            value: value.into(),
            quote: QuoteCharacter::None,
            span,
        }
    }

    pub fn quoted(mut self, quote: QuoteCharacter) -> Self {
        self.quote = quote;
        self
    }
}

/// A column reference, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub owner: Option<Identifier>,
    pub name: Identifier,
}

impl ColumnRef {
    pub fn new(name: Identifier) -> Self {
        Self { owner: None, name }
    }

    pub fn with_owner(mut self, owner: Identifier) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Span covering owner and name.
    pub fn span(&self) -> Span {
        let start = self
            .owner
            .as_ref()
            .map_or(self.name.span.start, |owner| owner.span.start);
        Span::new(start, self.name.span.end)
    }
}

/// A table in a FROM, JOIN, UPDATE or DDL position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

impl TableRef {
    pub fn new(name: Identifier) -> Self {
        Self { name, alias: None }
    }

    pub fn with_alias(mut self, alias: Identifier) -> Self {
        self.alias = Some(alias);
        self
    }
}

/// Statement shapes the encrypt rewrite distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTableStatement),
    AlterTable(AlterTableStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
    /// Anything without encrypt-relevant segments.
    Other,
}

// --- DDL ---------------------------------------------------------------

/// One column definition: name, type and constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: Identifier,
    /// Whole definition, starting at the name.
    pub span: Span,
}

impl ColumnDefinition {
    pub fn new(name: Identifier, span: Span) -> Self {
        Self { name, span }
    }

    /// Everything after the name: type and constraints.
    pub fn definition_span(&self) -> Span {
        Span::new(self.name.span.end, self.span.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableStatement {
    pub table: TableRef,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTableStatement {
    pub table: TableRef,
    pub clauses: Vec<AlterClause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterClause {
    Add(ColumnDefinitionClause),
    Modify(ColumnDefinitionClause),
    Change(ChangeColumnClause),
    Drop(DropColumnClause),
}

/// `ADD COLUMN ...` or `MODIFY COLUMN ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinitionClause {
    pub definition: ColumnDefinition,
    pub position: Option<ColumnPosition>,
    /// Whole clause including the leading keywords and position.
    pub span: Span,
}

/// `CHANGE COLUMN previous new_definition ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeColumnClause {
    pub previous: Identifier,
    pub definition: ColumnDefinition,
    pub position: Option<ColumnPosition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(Identifier),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropColumnClause {
    pub column: Identifier,
    pub span: Span,
}

// --- DML ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: TableRef,
    /// Explicit column list; empty when the statement has none.
    pub columns: Vec<ColumnRef>,
    /// `VALUES` rows, each lined up with `columns`.
    pub rows: Vec<InsertRow>,
    pub on_duplicate_key_update: Vec<Assignment>,
}

impl InsertStatement {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate_key_update: Vec::new(),
        }
    }
}

/// One parenthesised `VALUES` row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertRow {
    pub values: Vec<InsertValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertValue {
    pub value: AssignmentValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub tables: Vec<TableRef>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<WhereSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub tables: Vec<TableRef>,
    pub where_clause: Option<WhereSegment>,
}

/// `column = value` in a SET list or an ON DUPLICATE KEY UPDATE list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnRef,
    pub value: AssignmentValue,
    /// Whole assignment, column through value.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentValue {
    /// Positional `?` marker, zero-based.
    Parameter { index: usize },
    Literal(Literal),
    /// `VALUES(column)` back-reference.
    Values(ColumnRef),
    /// Any other expression.
    Expression,
}

/// A literal value, as bound or as written in the SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Number(String),
    String(String),
    Boolean(bool),
}

impl Literal {
    /// Text handed to an encryptor, `None` for NULL.
    pub fn plaintext(&self) -> Option<String> {
        match self {
            Literal::Null => None,
            Literal::Number(n) => Some(n.clone()),
            Literal::String(s) => Some(s.clone()),
            Literal::Boolean(b) => Some(b.to_string()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Number(n) => f.write_str(n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

// --- SELECT ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub projections: Vec<Projection>,
    pub tables: Vec<TableRef>,
    pub where_clause: Option<WhereSegment>,
    pub join_conditions: Vec<WhereSegment>,
    pub having: Option<WhereSegment>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<ColumnRef>,
    pub subqueries: Vec<Subquery>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Column(ColumnProjection),
    Shorthand(ShorthandProjection),
    /// Functions and other expressions, with the columns they reference.
    Expression { span: Span, columns: Vec<ColumnRef> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProjection {
    pub column: ColumnRef,
    pub alias: Option<Identifier>,
    /// Whole projection including the alias.
    pub span: Span,
}

/// `*` or `owner.*` together with the columns it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct ShorthandProjection {
    pub owner: Option<Identifier>,
    pub span: Span,
    /// Expanded column list supplied by the metadata layer, each qualified
    /// by the table (or alias) it belongs to.
    pub actual_columns: Vec<ColumnRef>,
}

impl ShorthandProjection {
    /// Start of the projection, owner included.
    pub fn start(&self) -> usize {
        self.owner
            .as_ref()
            .map_or(self.span.start, |owner| owner.span.start.min(self.span.start))
    }
}

/// Where a nested SELECT appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    /// In the projection list.
    Projection,
    /// In FROM.
    Table,
    /// Right-hand side of a predicate such as `IN (SELECT ...)`.
    Predicate,
    /// `EXISTS (SELECT ...)`.
    Exists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub kind: SubqueryKind,
    pub select: Box<SelectStatement>,
}

impl Subquery {
    pub fn new(kind: SubqueryKind, select: SelectStatement) -> Self {
        Self {
            kind,
            select: Box::new(select),
        }
    }
}

/// A WHERE, HAVING or JOIN ... ON condition split into OR-separated groups
/// of AND-joined predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereSegment {
    pub and_predicates: Vec<AndPredicate>,
}

impl WhereSegment {
    pub fn new(and_predicates: Vec<AndPredicate>) -> Self {
        Self { and_predicates }
    }

    /// A condition made of a single AND group.
    pub fn all(predicates: Vec<Predicate>) -> Self {
        Self::new(vec![AndPredicate { predicates }])
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.and_predicates.iter().flat_map(|group| group.predicates.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AndPredicate {
    pub predicates: Vec<Predicate>,
}

/// A comparison with a column on its left-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: ColumnRef,
    pub operator: PredicateOperator,
    pub values: Vec<PredicateValue>,
}

impl Predicate {
    pub fn new(column: ColumnRef, operator: PredicateOperator) -> Self {
        Self {
            column,
            operator,
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: PredicateValue) -> Self {
        self.values.push(value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOperator {
    Equal,
    NotEqual,
    In,
    NotIn,
    Like,
    NotLike,
    Between,
    Comparison,
    IsNull,
}

impl PredicateOperator {
    /// Equality-style comparisons can be answered by the assisted-query column.
    pub fn is_assisted_query_eligible(self) -> bool {
        matches!(
            self,
            PredicateOperator::Equal
                | PredicateOperator::NotEqual
                | PredicateOperator::In
                | PredicateOperator::NotIn
        )
    }

    pub fn is_like_query_eligible(self) -> bool {
        matches!(self, PredicateOperator::Like | PredicateOperator::NotLike)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Parameter { index: usize },
    Literal { value: Literal, span: Span },
    /// Another column, as in join conditions.
    Column(ColumnRef),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_wrap() {
        assert_eq!(QuoteCharacter::BackQuote.wrap("a"), "`a`");
        assert_eq!(QuoteCharacter::DoubleQuote.wrap("a"), "\"a\"");
        assert_eq!(QuoteCharacter::Brackets.wrap("a"), "[a]");
        assert_eq!(QuoteCharacter::None.wrap("a"), "a");
        assert_eq!(QuoteCharacter::of("`a`"), QuoteCharacter::BackQuote);
        assert_eq!(QuoteCharacter::of("a"), QuoteCharacter::None);
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Null.to_string(), "NULL");
        assert_eq!(Literal::Number("42".into()).to_string(), "42");
        assert_eq!(Literal::String("it's".into()).to_string(), "'it''s'");
        assert_eq!(Literal::Boolean(true).to_string(), "TRUE");
        assert_eq!(Literal::Null.plaintext(), None);
    }

    #[test]
    fn test_column_ref_span_includes_owner() {
        let column = ColumnRef::new(Identifier::new("user_id", Span::new(9, 16)))
            .with_owner(Identifier::new("u", Span::new(7, 8)));
        assert_eq!(column.span(), Span::new(7, 16));
    }

    #[test]
    fn test_insertion_span() {
        assert!(Span::at(4).is_insertion());
        assert!(Span::new(5, 4).is_insertion());
        assert!(!Span::new(4, 5).is_insertion());
    }
}
