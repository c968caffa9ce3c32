//! Condition tree and literal values of the query builder.

use std::borrow::Cow;

use crate::{ProfError, ProfResult, SqlBuilder};

/// Column rewritten against the `first_sample` baseline when a query is built for a profile.
pub const RELATIVE_START_COLUMN: &str = "events.start_timestamp_from_beginning";

pub(crate) const RELATIVE_START_EXPR: &str = "EPOCH_MS(events.start_timestamp - fs.first_ts)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Long(i64),
    Bool(bool),
}

impl Literal {
    /// Converts a dynamically typed value. Floats, nulls, arrays and objects have no
    /// literal form in the builder and are rejected.
    pub fn try_from_json(value: &serde_json::Value) -> ProfResult<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Self::Long).ok_or_else(|| {
                ProfError::QueryBuild(format!("unsupported literal type: number {n}"))
            }),
            other => Err(ProfError::QueryBuild(format!(
                "unsupported literal type: {}",
                json_kind(other)
            ))),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Long(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Long(i64::from(value))
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Self::Long(i64::from(value))
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(Literal),
    Column(String),
    /// Named parameter bound by the event store (`:name`).
    Param(String),
}

impl From<Literal> for Operand {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Literal(value.into())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Literal(value.into())
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Literal(value.into())
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Literal(value.into())
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Self::Literal(value.into())
    }
}

pub fn l(value: impl Into<Literal>) -> Operand {
    Operand::Literal(value.into())
}

pub fn c(name: impl Into<String>) -> Operand {
    Operand::Column(name.into())
}

pub fn p(name: impl Into<String>) -> Operand {
    Operand::Param(name.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// One entry of a WHERE/HAVING list: a condition optionally prefixed with `AND`/`OR`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub connective: Option<Connective>,
    pub condition: Condition,
}

impl Clause {
    pub fn new(condition: Condition) -> Self {
        Self {
            connective: None,
            condition,
        }
    }

    pub fn and(condition: Condition) -> Self {
        Self {
            connective: Some(Connective::And),
            condition,
        }
    }

    pub fn or(condition: Condition) -> Self {
        Self {
            connective: Some(Connective::Or),
            condition,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        column: String,
        op: String,
        value: Operand,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    In {
        column: String,
        values: Vec<Literal>,
    },
    NotInOrNull {
        column: String,
        values: Vec<Literal>,
    },
    Like {
        column: String,
        pattern: String,
    },
    Exists(Box<SqlBuilder>),
    NotExists(Box<SqlBuilder>),
    /// Clause list merged from another builder, rendered in parentheses.
    Group(Vec<Clause>),
    Raw(String),
}

/// Rendering switches shared by a whole statement.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RenderContext {
    pub relative_start: bool,
}

impl RenderContext {
    pub fn column<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.relative_start && name == RELATIVE_START_COLUMN {
            Cow::Borrowed(RELATIVE_START_EXPR)
        } else {
            Cow::Borrowed(name)
        }
    }
}

impl Condition {
    pub(crate) fn render(&self, ctx: &RenderContext) -> ProfResult<String> {
        match self {
            Self::Comparison { column, op, value } => {
                let rhs = match value {
                    Operand::Literal(lit) => lit.render(),
                    Operand::Column(name) => ctx.column(name).into_owned(),
                    Operand::Param(name) => format!(":{name}"),
                };
                Ok(format!("{} {op} {rhs}", ctx.column(column)))
            }
            Self::And(items) => render_composite(items, Connective::And, ctx),
            Self::Or(items) => render_composite(items, Connective::Or, ctx),
            Self::In { column, values } => {
                let list = render_list(column, values)?;
                Ok(format!("{} IN ({list})", ctx.column(column)))
            }
            Self::NotInOrNull { column, values } => {
                let list = render_list(column, values)?;
                let column = ctx.column(column);
                Ok(format!("({column} NOT IN ({list}) OR {column} IS NULL)"))
            }
            Self::Like { column, pattern } => Ok(format!(
                "{} LIKE {}",
                ctx.column(column),
                Literal::Text(pattern.clone()).render()
            )),
            Self::Exists(sub) => Ok(format!("EXISTS ({})", sub.render(ctx)?)),
            Self::NotExists(sub) => Ok(format!("NOT EXISTS ({})", sub.render(ctx)?)),
            Self::Group(clauses) => Ok(format!("({})", render_clauses(clauses, ctx)?)),
            Self::Raw(text) => Ok(text.clone()),
        }
    }
}

fn render_composite(
    items: &[Condition],
    connective: Connective,
    ctx: &RenderContext,
) -> ProfResult<String> {
    if items.is_empty() {
        return Err(ProfError::QueryBuild(format!(
            "{} condition without operands",
            connective.keyword()
        )));
    }
    let parts = items
        .iter()
        .map(|c| c.render(ctx))
        .collect::<ProfResult<Vec<_>>>()?;
    Ok(format!(
        "({})",
        parts.join(&format!(" {} ", connective.keyword()))
    ))
}

fn render_list(column: &str, values: &[Literal]) -> ProfResult<String> {
    if values.is_empty() {
        return Err(ProfError::QueryBuild(format!(
            "IN list for {column} is empty"
        )));
    }
    Ok(values
        .iter()
        .map(Literal::render)
        .collect::<Vec<_>>()
        .join(", "))
}

/// Joins clauses with single spaces; a connective on the very first clause is dropped.
pub(crate) fn render_clauses(clauses: &[Clause], ctx: &RenderContext) -> ProfResult<String> {
    let mut out = String::new();
    for (idx, clause) in clauses.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
            if let Some(connective) = clause.connective {
                out.push_str(connective.keyword());
                out.push(' ');
            }
        }
        out.push_str(&clause.condition.render(ctx)?);
    }
    Ok(out)
}

fn comparison(column: &str, op: &str, value: impl Into<Operand>) -> Condition {
    Condition::Comparison {
        column: column.to_string(),
        op: op.to_string(),
        value: value.into(),
    }
}

pub fn eq(column: &str, value: impl Into<Operand>) -> Condition {
    comparison(column, "=", value)
}

pub fn ne(column: &str, value: impl Into<Operand>) -> Condition {
    comparison(column, "!=", value)
}

pub fn gt(column: &str, value: impl Into<Operand>) -> Condition {
    comparison(column, ">", value)
}

pub fn gte(column: &str, value: impl Into<Operand>) -> Condition {
    comparison(column, ">=", value)
}

pub fn lt(column: &str, value: impl Into<Operand>) -> Condition {
    comparison(column, "<", value)
}

pub fn lte(column: &str, value: impl Into<Operand>) -> Condition {
    comparison(column, "<=", value)
}

pub fn like(column: &str, pattern: impl Into<String>) -> Condition {
    Condition::Like {
        column: column.to_string(),
        pattern: pattern.into(),
    }
}

pub fn in_strings<I, S>(column: &str, values: I) -> Condition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Condition::In {
        column: column.to_string(),
        values: values.into_iter().map(|v| Literal::Text(v.into())).collect(),
    }
}

pub fn in_longs(column: &str, values: impl IntoIterator<Item = i64>) -> Condition {
    Condition::In {
        column: column.to_string(),
        values: values.into_iter().map(Literal::Long).collect(),
    }
}

pub fn not_in_or_null_longs(column: &str, values: impl IntoIterator<Item = i64>) -> Condition {
    Condition::NotInOrNull {
        column: column.to_string(),
        values: values.into_iter().map(Literal::Long).collect(),
    }
}

pub fn not_in_or_null_strings<I, S>(column: &str, values: I) -> Condition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Condition::NotInOrNull {
        column: column.to_string(),
        values: values.into_iter().map(|v| Literal::Text(v.into())).collect(),
    }
}

pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::And(conditions.into_iter().collect())
}

pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Or(conditions.into_iter().collect())
}

pub fn exists(subquery: SqlBuilder) -> Condition {
    Condition::Exists(Box::new(subquery))
}

pub fn not_exists(subquery: SqlBuilder) -> Condition {
    Condition::NotExists(Box::new(subquery))
}

pub fn raw(text: impl Into<String>) -> Condition {
    Condition::Raw(text.into())
}
