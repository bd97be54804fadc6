//! Prepared statements: parsed query templates bound at execution time.
//!
//! The registry accepts a small SQL subset, `SELECT * FROM <table>` with
//! an optional single-comparison WHERE clause, parsed with `sqlparser`'s
//! PostgreSQL dialect. The literal side of the comparison may be a
//! `$name` placeholder, filled in from defaults recorded at prepare time
//! and parameters supplied at execution time.

use std::collections::HashMap;
use std::fmt;

use lattice_common::Value;
use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser as SqlParser;

use crate::error::{EngineError, EngineResult};
use crate::predicate::{CompareOp, Predicate};

/// The right-hand side of a prepared comparison: fixed at prepare time or
/// deferred to a parameter.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(Value),
    Placeholder(String),
}

/// The WHERE clause of a prepared statement, before binding.
#[derive(Debug, Clone, PartialEq)]
struct FilterTemplate {
    column: String,
    op: CompareOp,
    operand: Operand,
}

/// One registered statement: its identifier, original text, target table,
/// optional filter template, and per-placeholder defaults.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    id: String,
    text: String,
    table: String,
    filter: Option<FilterTemplate>,
    defaults: HashMap<String, Value>,
}

impl PreparedStatement {
    /// The statement's identifier, `stmt_<n>`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The original statement text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The table the statement selects from.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Placeholder names the statement needs bound, in clause order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        match &self.filter {
            Some(FilterTemplate {
                operand: Operand::Placeholder(name),
                ..
            }) => vec![name.as_str()],
            _ => Vec::new(),
        }
    }

    /// Resolves the filter template against `params`, falling back to the
    /// statement's defaults. `None` means the statement has no WHERE
    /// clause and selects everything.
    pub fn bind(&self, params: &HashMap<String, Value>) -> EngineResult<Option<Predicate>> {
        let Some(filter) = &self.filter else {
            return Ok(None);
        };
        let value = match &filter.operand {
            Operand::Literal(value) => value.clone(),
            Operand::Placeholder(name) => params
                .get(name)
                .or_else(|| self.defaults.get(name))
                .cloned()
                .ok_or_else(|| EngineError::MissingParameter(name.clone()))?,
        };
        Ok(Some(Predicate::new(
            filter.column.clone(),
            filter.op,
            value,
        )))
    }
}

impl fmt::Display for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.text)
    }
}

/// Issues statement identifiers and keeps prepared statements addressable
/// by them.
#[derive(Debug)]
pub struct StatementRegistry {
    statements: HashMap<String, PreparedStatement>,
    next_id: u64,
}

impl StatementRegistry {
    /// Creates an empty registry. The first statement gets `stmt_1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            statements: HashMap::new(),
            next_id: 1,
        }
    }

    /// Parses `text` and registers it, returning the new identifier.
    pub fn prepare(&mut self, text: &str) -> EngineResult<String> {
        self.prepare_with_defaults(text, HashMap::new())
    }

    /// Parses `text` and registers it together with placeholder defaults
    /// consulted when execution leaves a placeholder unbound.
    pub fn prepare_with_defaults(
        &mut self,
        text: &str,
        defaults: HashMap<String, Value>,
    ) -> EngineResult<String> {
        let (table, filter) = parse_select(text)?;
        let id = format!("stmt_{}", self.next_id);
        self.next_id += 1;
        self.statements.insert(
            id.clone(),
            PreparedStatement {
                id: id.clone(),
                text: text.to_owned(),
                table,
                filter,
                defaults,
            },
        );
        Ok(id)
    }

    /// The statement registered under `id`.
    pub fn get(&self, id: &str) -> EngineResult<&PreparedStatement> {
        self.statements
            .get(id)
            .ok_or_else(|| EngineError::StatementNotFound(id.to_owned()))
    }

    /// Number of registered statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether nothing has been prepared yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl Default for StatementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses the supported subset: `SELECT * FROM <table>` with an optional
/// `WHERE <column> <op> <literal or $placeholder>`.
fn parse_select(text: &str) -> EngineResult<(String, Option<FilterTemplate>)> {
    if text.trim().is_empty() {
        return Err(EngineError::Unsupported("empty statement".to_owned()));
    }
    let dialect = PostgreSqlDialect {};
    let mut ast = SqlParser::parse_sql(&dialect, text)?;
    if ast.len() != 1 {
        return Err(EngineError::Unsupported(format!(
            "expected one statement, found {}",
            ast.len()
        )));
    }

    let sql_ast::Statement::Query(query) = ast.remove(0) else {
        return Err(EngineError::Unsupported(
            "only SELECT statements can be prepared".to_owned(),
        ));
    };
    let sql_ast::SetExpr::Select(select) = *query.body else {
        return Err(EngineError::Unsupported(
            "only plain SELECT bodies are supported".to_owned(),
        ));
    };

    if select.projection.len() != 1
        || !matches!(select.projection[0], sql_ast::SelectItem::Wildcard(_))
    {
        return Err(EngineError::Unsupported(
            "projection must be *".to_owned(),
        ));
    }
    let [from] = select.from.as_slice() else {
        return Err(EngineError::Unsupported(
            "exactly one FROM table is required".to_owned(),
        ));
    };
    if !from.joins.is_empty() {
        return Err(EngineError::Unsupported(
            "JOIN clauses are not supported in prepared statements".to_owned(),
        ));
    }
    let sql_ast::TableFactor::Table { name, .. } = &from.relation else {
        return Err(EngineError::Unsupported(
            "FROM must name a table".to_owned(),
        ));
    };
    let table = name
        .0
        .last()
        .map(|ident| ident.value.clone())
        .ok_or_else(|| EngineError::Unsupported("empty table name".to_owned()))?;

    let filter = select.selection.map(parse_comparison).transpose()?;
    Ok((table, filter))
}

/// Turns the WHERE expression into a filter template. Only a single
/// `column <op> operand` comparison is accepted.
fn parse_comparison(expr: sql_ast::Expr) -> EngineResult<FilterTemplate> {
    let (left, op, right) = match expr {
        sql_ast::Expr::BinaryOp { left, op, right } => (left, op, right),
        other => {
            return Err(EngineError::Unsupported(format!(
                "unsupported WHERE clause: {other}"
            )));
        }
    };
    let sql_ast::Expr::Identifier(column) = *left else {
        return Err(EngineError::Unsupported(
            "the left side of WHERE must be a column name".to_owned(),
        ));
    };
    let op = match op {
        sql_ast::BinaryOperator::Eq => CompareOp::Eq,
        sql_ast::BinaryOperator::NotEq => CompareOp::Ne,
        sql_ast::BinaryOperator::Lt => CompareOp::Lt,
        sql_ast::BinaryOperator::LtEq => CompareOp::Le,
        sql_ast::BinaryOperator::Gt => CompareOp::Gt,
        sql_ast::BinaryOperator::GtEq => CompareOp::Ge,
        other => {
            return Err(EngineError::Unsupported(format!(
                "unsupported operator: {other}"
            )));
        }
    };
    Ok(FilterTemplate {
        column: column.value,
        op,
        operand: parse_operand(*right)?,
    })
}

/// Parses the comparison's right side: a literal or a `$name` placeholder.
fn parse_operand(expr: sql_ast::Expr) -> EngineResult<Operand> {
    match expr {
        sql_ast::Expr::Value(value) => parse_value(value),
        // Negative numbers arrive as unary minus over a literal.
        sql_ast::Expr::UnaryOp {
            op: sql_ast::UnaryOperator::Minus,
            expr,
        } => match parse_operand(*expr)? {
            Operand::Literal(Value::Int(v)) => Ok(Operand::Literal(Value::int(-v))),
            Operand::Literal(Value::Float(v)) => Ok(Operand::Literal(Value::float(-v))),
            other => Err(EngineError::Unsupported(format!(
                "cannot negate {other:?}"
            ))),
        },
        other => Err(EngineError::Unsupported(format!(
            "unsupported comparison operand: {other}"
        ))),
    }
}

fn parse_value(value: sql_ast::Value) -> EngineResult<Operand> {
    match value {
        sql_ast::Value::Placeholder(name) => Ok(Operand::Placeholder(
            name.trim_start_matches('$').to_owned(),
        )),
        sql_ast::Value::Number(text, _) => {
            if let Ok(v) = text.parse::<i64>() {
                Ok(Operand::Literal(Value::int(v)))
            } else if let Ok(v) = text.parse::<f64>() {
                Ok(Operand::Literal(Value::float(v)))
            } else {
                Err(EngineError::Unsupported(format!(
                    "unparseable number: {text}"
                )))
            }
        }
        sql_ast::Value::SingleQuotedString(text) => Ok(Operand::Literal(Value::text(text))),
        sql_ast::Value::Boolean(v) => Ok(Operand::Literal(Value::boolean(v))),
        other => Err(EngineError::Unsupported(format!(
            "unsupported literal: {other}"
        ))),
    }
}
