//! Mutable, mergeable SELECT builder.

use crate::sql::condition::{
    Clause, Condition, Connective, Operand, RELATIVE_START_COLUMN, RELATIVE_START_EXPR,
    RenderContext, render_clauses,
};
use crate::{ProfError, ProfResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: Option<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlBuilder {
    columns: Vec<String>,
    from: Vec<String>,
    joins: Vec<Join>,
    filters: Vec<Clause>,
    group_by: Vec<String>,
    having: Vec<Clause>,
    order_by: Vec<String>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from(&mut self, table: &str) -> &mut Self {
        self.from.push(table.to_string());
        self
    }

    pub fn from_as(&mut self, table: &str, alias: &str) -> &mut Self {
        self.from.push(format!("{table} {alias}"));
        self
    }

    /// `INNER JOIN`. A join given no condition is kept but rejected when the query is built.
    pub fn join(&mut self, table: &str, on: impl Into<Option<Condition>>) -> &mut Self {
        self.push_join(JoinKind::Inner, table, on.into())
    }

    pub fn left_join(&mut self, table: &str, on: impl Into<Option<Condition>>) -> &mut Self {
        self.push_join(JoinKind::Left, table, on.into())
    }

    pub fn right_join(&mut self, table: &str, on: impl Into<Option<Condition>>) -> &mut Self {
        self.push_join(JoinKind::Right, table, on.into())
    }

    pub fn cross_join(&mut self, table: &str) -> &mut Self {
        self.push_join(JoinKind::Cross, table, None)
    }

    fn push_join(&mut self, kind: JoinKind, table: &str, on: Option<Condition>) -> &mut Self {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            on,
        });
        self
    }

    /// Appends a WHERE condition with no connective.
    pub fn filter(&mut self, condition: Condition) -> &mut Self {
        self.filters.push(Clause::new(condition));
        self
    }

    pub fn and(&mut self, condition: Condition) -> &mut Self {
        self.filters.push(Clause::and(condition));
        self
    }

    pub fn or(&mut self, condition: Condition) -> &mut Self {
        self.filters.push(Clause::or(condition));
        self
    }

    pub fn group_by<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn having(&mut self, condition: Condition) -> &mut Self {
        self.having.push(Clause::new(condition));
        self
    }

    pub fn order_by(&mut self, column: &str) -> &mut Self {
        self.order_by.push(column.to_string());
        self
    }

    pub fn order_by_dir(&mut self, column: &str, order: SortOrder) -> &mut Self {
        let dir = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        self.order_by.push(format!("{column} {dir}"));
        self
    }

    pub fn add_column(&mut self, column: &str) -> ProfResult<&mut Self> {
        let trimmed = column.trim();
        if trimmed.is_empty() {
            return Err(ProfError::QueryBuild(
                "column cannot be empty".to_string(),
            ));
        }
        self.columns.push(trimmed.to_string());
        Ok(self)
    }

    pub fn add_columns<I, S>(&mut self, columns: I) -> ProfResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            self.add_column(column.as_ref())?;
        }
        Ok(self)
    }

    pub fn clear_columns(&mut self) -> &mut Self {
        self.columns.clear();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Folds `other` into this builder.
    ///
    /// Columns are de-duplicated by exact name; tables, joins, grouping, having and ordering
    /// are appended as-is. WHERE clauses are appended so that the combined list still
    /// reads as one conjunction:
    /// - this builder has no conditions: all of `other`'s are taken verbatim;
    /// - `other` has one condition: appended with `AND` unless it already carries a connective;
    /// - `other` has several: they are wrapped into one parenthesized group joined with `AND`.
    pub fn merge(&mut self, other: SqlBuilder) -> &mut Self {
        let SqlBuilder {
            columns,
            from,
            joins,
            filters,
            group_by,
            having,
            order_by,
        } = other;

        for column in columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self.from.extend(from);
        self.joins.extend(joins);

        if !filters.is_empty() {
            if self.filters.is_empty() {
                self.filters.extend(filters);
            } else if filters.len() == 1 {
                let mut clauses = filters;
                let mut clause = clauses.remove(0);
                if clause.connective.is_none() {
                    clause.connective = Some(Connective::And);
                }
                self.filters.push(clause);
            } else {
                let mut grouped = filters;
                grouped[0].connective = None;
                self.filters.push(Clause::and(Condition::Group(grouped)));
            }
        }

        self.group_by.extend(group_by);
        self.having.extend(having);
        self.order_by.extend(order_by);
        self
    }

    /// Renders the statement without the profile baseline.
    pub fn build(&self) -> ProfResult<String> {
        let sql = self.render(&RenderContext::default())?;
        tracing::debug!(%sql, "built query");
        Ok(sql)
    }

    /// Renders the statement with a `first_sample` CTE for `profile`, cross-joined into
    /// the main query. References to the relative start column are computed against the
    /// CTE's baseline. `profile` is a literal id or a named parameter.
    pub fn build_for_profile(&self, profile: impl Into<Operand>) -> ProfResult<String> {
        let profile = match profile.into() {
            Operand::Literal(lit) => lit.render(),
            Operand::Param(name) => format!(":{name}"),
            Operand::Column(name) => {
                return Err(ProfError::QueryBuild(format!(
                    "profile baseline cannot reference column {name}"
                )));
            }
        };

        let mut with_baseline = self.clone();
        with_baseline.cross_join("first_sample fs");
        let body = with_baseline.render(&RenderContext {
            relative_start: true,
        })?;

        let sql = format!(
            "WITH first_sample AS (\n    SELECT MIN(start_timestamp) AS first_ts\n    FROM events\n    WHERE profile_id = {profile}\n)\n{body}"
        );
        tracing::debug!(%sql, "built profile query");
        Ok(sql)
    }

    pub(crate) fn render(&self, ctx: &RenderContext) -> ProfResult<String> {
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let columns = self
                .columns
                .iter()
                .map(|column| render_select_column(column, ctx))
                .collect::<Vec<_>>();
            sql.push_str(&columns.join(", "));
        }

        if !self.from.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&self.from.join(", "));
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.keyword());
            sql.push(' ');
            sql.push_str(&join.table);
            match (&join.on, join.kind) {
                (_, JoinKind::Cross) => {}
                (Some(on), _) => {
                    sql.push_str(" ON ");
                    sql.push_str(&on.render(ctx)?);
                }
                (None, _) => {
                    return Err(ProfError::QueryBuild(format!(
                        "join on {} has no condition",
                        join.table
                    )));
                }
            }
        }

        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_clauses(&self.filters, ctx)?);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&render_column_list(&self.group_by, ctx));
        }

        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&render_clauses(&self.having, ctx)?);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&render_column_list(&self.order_by, ctx));
        }

        Ok(sql)
    }
}

fn render_select_column(column: &str, ctx: &RenderContext) -> String {
    if ctx.relative_start && column == RELATIVE_START_COLUMN {
        let alias = RELATIVE_START_COLUMN.trim_start_matches("events.");
        return format!("{RELATIVE_START_EXPR} AS {alias}");
    }
    column.to_string()
}

fn render_column_list(columns: &[String], ctx: &RenderContext) -> String {
    columns
        .iter()
        .map(|column| match column.split_once(' ') {
            Some((name, rest)) => format!("{} {rest}", ctx.column(name)),
            None => ctx.column(column).into_owned(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::condition::{and, c, eq, gte, in_strings, l, lt, p, raw};

    #[test]
    fn empty_builder_selects_everything() {
        assert_eq!(SqlBuilder::new().build().expect("sql"), "SELECT *");
    }

    #[test]
    fn renders_all_clauses_in_order() {
        let sql = SqlBuilder::select(["u.name", "COUNT(*) AS cnt"])
            .from_as("users", "u")
            .left_join("orders o", eq("o.user_id", c("u.id")))
            .filter(eq("u.active", l(true)))
            .and(in_strings("u.role", ["admin", "dev"]))
            .or(raw("u.id = 1"))
            .group_by(["u.name"])
            .having(gte("COUNT(*)", 2))
            .order_by_dir("cnt", SortOrder::Desc)
            .build()
            .expect("sql");
        assert_eq!(
            sql,
            "SELECT u.name, COUNT(*) AS cnt FROM users u LEFT JOIN orders o ON o.user_id = u.id \
             WHERE u.active = true AND u.role IN ('admin', 'dev') OR u.id = 1 \
             GROUP BY u.name HAVING COUNT(*) >= 2 ORDER BY cnt DESC"
        );
    }

    #[test]
    fn join_kinds_render_keywords() {
        let sql = SqlBuilder::select(["*"])
            .from("a")
            .join("b", eq("a.id", c("b.id")))
            .right_join("c", eq("a.id", c("c.id")))
            .cross_join("d")
            .build()
            .expect("sql");
        assert_eq!(
            sql,
            "SELECT * FROM a INNER JOIN b ON a.id = b.id RIGHT JOIN c ON a.id = c.id CROSS JOIN d"
        );
    }

    #[test]
    fn join_without_condition_is_rejected() {
        let err = SqlBuilder::new()
            .from("a")
            .join("b", None::<Condition>)
            .build()
            .expect_err("missing join condition");
        assert!(matches!(err, ProfError::QueryBuild(_)));
    }

    #[test]
    fn merge_deduplicates_columns_in_order() {
        let mut a = SqlBuilder::select(["a", "b"]);
        a.merge(SqlBuilder::select(["a", "c"]));
        assert_eq!(a.columns(), ["a", "b", "c"]);
    }

    #[test]
    fn merge_into_empty_where_takes_conditions_verbatim() {
        let mut base = SqlBuilder::new();
        base.from("t");
        let mut other = SqlBuilder::new();
        other.filter(eq("x", 1)).and(eq("y", 2));
        base.merge(other);
        assert_eq!(
            base.build().expect("sql"),
            "SELECT * FROM t WHERE x = 1 AND y = 2"
        );
    }

    #[test]
    fn merge_single_condition_gets_and_prefix() {
        let mut base = SqlBuilder::new();
        base.from("t").filter(eq("x", 1));
        let mut other = SqlBuilder::new();
        other.filter(eq("y", 2));
        base.merge(other);
        let mut or_other = SqlBuilder::new();
        or_other.or(eq("z", 3));
        base.merge(or_other);
        assert_eq!(
            base.build().expect("sql"),
            "SELECT * FROM t WHERE x = 1 AND y = 2 OR z = 3"
        );
    }

    #[test]
    fn merge_multiple_conditions_are_grouped() {
        let mut base = SqlBuilder::new();
        base.from("t").filter(eq("x", 1));
        let mut other = SqlBuilder::new();
        other.and(gte("y", 2)).and(lt("y", 5)).or(eq("z", 0));
        base.merge(other);
        assert_eq!(
            base.build().expect("sql"),
            "SELECT * FROM t WHERE x = 1 AND (y >= 2 AND y < 5 OR z = 0)"
        );
    }

    #[test]
    fn merge_appends_tables_joins_groups_and_order() {
        let mut base = SqlBuilder::select(["a.x"]);
        base.from("a").group_by(["a.x"]).order_by("a.x");
        let mut other = SqlBuilder::select(["b.y"]);
        other
            .join("b", eq("a.id", c("b.id")))
            .group_by(["b.y"])
            .order_by("b.y");
        base.merge(other);
        assert_eq!(
            base.build().expect("sql"),
            "SELECT a.x, b.y FROM a INNER JOIN b ON a.id = b.id GROUP BY a.x, b.y ORDER BY a.x, b.y"
        );
    }

    #[test]
    fn add_column_rejects_blank_names() {
        let mut b = SqlBuilder::new();
        assert!(b.add_column("  ").is_err());
        b.add_columns([" a ", "b"]).expect("columns");
        assert_eq!(b.columns(), ["a", "b"]);
        assert!(b.has_columns());
        b.clear_columns();
        assert!(!b.has_columns());
    }

    #[test]
    fn profile_build_adds_baseline_cte_and_cross_join() {
        let mut b = SqlBuilder::select(["events.event_type", RELATIVE_START_COLUMN]);
        b.from("events")
            .join(
                "threads",
                and([
                    eq("events.profile_id", c("threads.profile_id")),
                    eq("events.thread_hash", c("threads.thread_hash")),
                ]),
            )
            .filter(gte(RELATIVE_START_COLUMN, 1000i64))
            .order_by(RELATIVE_START_COLUMN);
        let sql = b.build_for_profile("p-1").expect("sql");
        assert_eq!(
            sql,
            "WITH first_sample AS (\n    SELECT MIN(start_timestamp) AS first_ts\n    FROM events\n    WHERE profile_id = 'p-1'\n)\n\
             SELECT events.event_type, EPOCH_MS(events.start_timestamp - fs.first_ts) AS start_timestamp_from_beginning \
             FROM events INNER JOIN threads ON (events.profile_id = threads.profile_id AND events.thread_hash = threads.thread_hash) \
             CROSS JOIN first_sample fs \
             WHERE EPOCH_MS(events.start_timestamp - fs.first_ts) >= 1000 \
             ORDER BY EPOCH_MS(events.start_timestamp - fs.first_ts)"
        );
    }

    #[test]
    fn profile_build_accepts_named_parameter() {
        let mut b = SqlBuilder::new();
        b.from("events");
        let sql = b.build_for_profile(p("profile_id")).expect("sql");
        assert!(sql.contains("WHERE profile_id = :profile_id\n)"));
        assert!(sql.ends_with("SELECT * FROM events CROSS JOIN first_sample fs"));
        assert!(b.build_for_profile(c("x")).is_err());
    }
}
