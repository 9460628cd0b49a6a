//! SQL classification.
//!
//! The rewrite itself works on the position-tagged [`Statement`](crate::statement::Statement)
//! model. This analyzer answers the questions the result side asks of raw
//! SQL: what kind of statement it is, which tables it names and which
//! columns a query projects.

use crate::error::RewriteError;
use sqlparser::ast::{Expr, SelectItem, ShowCreateObject, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

/// Parses SQL with the MySQL dialect and extracts table references.
pub struct SqlAnalyzer {
    dialect: MySqlDialect,
}

impl Clone for SqlAnalyzer {
    fn clone(&self) -> Self {
        Self {
            dialect: MySqlDialect {},
        }
    }
}

impl Default for SqlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlAnalyzer {
    pub fn new() -> Self {
        Self {
            dialect: MySqlDialect {},
        }
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, RewriteError> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| RewriteError::ParseError(e.to_string()))
    }

    /// Classify the first statement of `sql`.
    pub fn analyze(&self, sql: &str) -> Result<StatementContext, RewriteError> {
        let statements = self.parse(sql)?;
        let Some(statement) = statements.first() else {
            return Ok(StatementContext::new(StatementKind::Other));
        };
        let context = StatementContext {
            kind: self.get_kind(statement),
            tables: self.extract_tables(statement),
            projections: self.extract_projections(statement),
        };
        tracing::trace!(
            kind = ?context.kind,
            tables = context.tables.len(),
            projections = context.projections.len(),
            "Analyzed statement"
        );
        Ok(context)
    }

    /// Extract table names from a statement.
    pub fn extract_tables(&self, stmt: &Statement) -> Vec<TableReference> {
        let mut tables = Vec::new();
        self.visit_statement(stmt, &mut tables);
        tables
    }

    /// Column projections of a query, `[owner.]column [AS alias]`.
    ///
    /// Wildcards and other expressions are skipped.
    pub fn extract_projections(&self, stmt: &Statement) -> Vec<ProjectionReference> {
        let Statement::Query(query) = stmt else {
            return Vec::new();
        };
        let Some(select) = query.body.as_select() else {
            return Vec::new();
        };
        select
            .projection
            .iter()
            .filter_map(|item| {
                let (expr, alias) = match item {
                    SelectItem::UnnamedExpr(expr) => (expr, None),
                    SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias)),
                    _ => return None,
                };
                let (owner, column) = match expr {
                    Expr::Identifier(ident) => (None, ident),
                    Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                        [.., owner, column] => (Some(owner.value.clone()), column),
                        [column] => (None, column),
                        [] => return None,
                    },
                    _ => return None,
                };
                Some(ProjectionReference {
                    label: alias.unwrap_or(column).value.clone(),
                    owner,
                    column: column.value.clone(),
                })
            })
            .collect()
    }

    fn visit_statement(&self, stmt: &Statement, tables: &mut Vec<TableReference>) {
        match stmt {
            Statement::Query(query) => {
                if let Some(body) = query.body.as_select() {
                    for table_with_joins in &body.from {
                        self.visit_table_with_joins(table_with_joins, tables);
                    }
                }
            }
            Statement::Insert(insert) => {
                tables.push(TableReference::new(insert.table.to_string()));
            }
            Statement::Update(update) => {
                self.visit_table_with_joins(&update.table, tables);
            }
            Statement::Delete(delete) => match &delete.from {
                sqlparser::ast::FromTable::WithFromKeyword(tables_with_joins)
                | sqlparser::ast::FromTable::WithoutKeyword(tables_with_joins) => {
                    for twj in tables_with_joins {
                        self.visit_table_with_joins(twj, tables);
                    }
                }
            },
            Statement::CreateTable(create) => {
                tables.push(TableReference::new(create.name.to_string()));
            }
            Statement::ShowCreate {
                obj_type: ShowCreateObject::Table,
                obj_name,
                ..
            } => {
                tables.push(TableReference::new(obj_name.to_string()));
            }
            Statement::ShowColumns { show_options, .. } => {
                if let Some(name) = show_options
                    .show_in
                    .as_ref()
                    .and_then(|show_in| show_in.parent_name.as_ref())
                {
                    tables.push(TableReference::new(name.to_string()));
                }
            }
            _ => {}
        }
    }

    fn visit_table_with_joins(
        &self,
        table_with_joins: &TableWithJoins,
        tables: &mut Vec<TableReference>,
    ) {
        let relations = std::iter::once(&table_with_joins.relation)
            .chain(table_with_joins.joins.iter().map(|join| &join.relation));
        for relation in relations {
            if let TableFactor::Table { name, alias, .. } = relation {
                tables.push(TableReference {
                    name: name.to_string(),
                    alias: alias.as_ref().map(|a| a.name.value.clone()),
                });
            }
        }
    }

    /// Get the kind of a statement.
    pub fn get_kind(&self, stmt: &Statement) -> StatementKind {
        match stmt {
            Statement::Query(_) => StatementKind::Select,
            Statement::Insert { .. } => StatementKind::Insert,
            Statement::Update { .. } => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
            Statement::CreateTable { .. } => StatementKind::CreateTable,
            Statement::AlterTable { .. } => StatementKind::AlterTable,
            Statement::ShowColumns { .. } => StatementKind::ShowColumns,
            Statement::ShowCreate {
                obj_type: ShowCreateObject::Table,
                ..
            } => StatementKind::ShowCreateTable,
            _ => StatementKind::Other,
        }
    }
}

/// What the result side needs to know about an executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementContext {
    pub kind: StatementKind,
    pub tables: Vec<TableReference>,
    /// Column projections of a query, in select-list order.
    pub projections: Vec<ProjectionReference>,
}

impl StatementContext {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            tables: Vec::new(),
            projections: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableReference) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_projection(mut self, projection: ProjectionReference) -> Self {
        self.projections.push(projection);
        self
    }
}

/// A column a query projects, and the label its result column carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionReference {
    /// The alias, or the column name when there is none.
    pub label: String,
    /// Table name or alias qualifying the column.
    pub owner: Option<String>,
    pub column: String,
}

impl ProjectionReference {
    pub fn new(owner: Option<&str>, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            label: column.clone(),
            owner: owner.map(str::to_string),
            column,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A reference to a table in a SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    /// The table name, schema-qualified when written that way.
    pub name: String,
    pub alias: Option<String>,
}

impl TableReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    AlterTable,
    ShowColumns,
    ShowCreateTable,
    Other,
}
