//! The filter compiler.
//!
//! A [`Catalogue`] is the static description of one queryable table: the
//! columns it can display, the joins those columns need, and the filters a
//! request may set. [`FilterPlan::compile`] takes the request parameters
//! and works out which columns to project, which joins are required and
//! which conditions are active. Rendering appends the resulting SQL to a
//! [`SqlBuilder`], binding every request value.
//!
//! Only catalogue fields ever reach the SQL text. Unknown parameters are
//! ignored.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CoreError;
use crate::params::RequestParams;
use crate::sql::{SqlBuilder, SqlValue};
use crate::window::TimeWindow;

/// Value every filter treats as "no restriction".
pub const ALL_SENTINEL: &str = "All";

// ---------------------------------------------------------------------------
// Catalogue description
// ---------------------------------------------------------------------------

/// A `LEFT JOIN` needed to resolve a column or a filter.
#[derive(Debug, PartialEq, Eq)]
pub struct JoinSpec {
    pub alias: &'static str,
    pub table: &'static str,
    pub on: &'static str,
    /// Partitioned tables get the time window repeated on their own
    /// `timestamp` column so the database can prune partitions.
    pub windowed: bool,
    pub one_to_many: bool,
}

impl JoinSpec {
    pub fn render(&self, b: &mut SqlBuilder, window: &TimeWindow) {
        b.push(" LEFT JOIN ")
            .push(self.table)
            .push(" ")
            .push(self.alias)
            .push(" ON (")
            .push(self.on);
        if self.windowed && window.is_bounded() {
            b.push(" AND ");
            window.render(b, &format!("{}.timestamp", self.alias));
        }
        b.push(")");
    }
}

/// An optional display column.
#[derive(Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Form name; toggled by `col_<name>`.
    pub name: &'static str,
    pub label: &'static str,
    pub field: &'static str,
    pub join: Option<&'static JoinSpec>,
    /// Filter parameter a drill link on this column sets.
    pub link: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Always equality.
    Exact,
    /// `LIKE` when the value contains `%`, equality otherwise.
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Text,
}

/// A request parameter that restricts the query.
#[derive(Debug, PartialEq, Eq)]
pub struct FilterSpec {
    pub param: &'static str,
    /// Alternative parameter names accepted for the same filter.
    pub aliases: &'static [&'static str],
    /// Compared fields. More than one means "any of these matches".
    pub fields: &'static [&'static str],
    pub mode: MatchMode,
    pub kind: ValueKind,
    /// Accepts `name[]` and compiles to an OR of equalities.
    pub multi: bool,
    /// Extra "no restriction" value besides [`ALL_SENTINEL`].
    pub sentinel: Option<&'static str>,
    pub joins: &'static [&'static JoinSpec],
}

#[derive(Debug)]
pub struct Catalogue {
    /// Base relation with its alias, e.g. `dlf_messages t1`.
    pub from: &'static str,
    pub time_field: &'static str,
    /// Always projected, ahead of the display columns.
    pub mandatory: &'static [&'static str],
    pub columns: &'static [ColumnSpec],
    pub filters: &'static [FilterSpec],
}

impl Catalogue {
    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Column selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    /// Every catalogue column.
    Default,
    /// Only the named columns.
    Custom(Vec<String>),
}

impl ColumnSelection {
    /// `columns=default` selects everything; otherwise each `col_<name>=on`
    /// adds one column. A request with neither gets the default set.
    pub fn from_params(params: &RequestParams, catalogue: &Catalogue) -> Self {
        if params.get("columns") == Some("default") {
            return ColumnSelection::Default;
        }
        let chosen: Vec<String> = catalogue
            .columns
            .iter()
            .filter(|c| params.is_on(&format!("col_{}", c.name)))
            .map(|c| c.name.to_string())
            .collect();
        if chosen.is_empty() && !params.contains("columns") {
            ColumnSelection::Default
        } else {
            ColumnSelection::Custom(chosen)
        }
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            ColumnSelection::Default => true,
            ColumnSelection::Custom(names) => names.iter().any(|n| n == name),
        }
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equals,
    Like,
    /// Set membership, rendered as an OR of equalities.
    AnyOf,
}

/// One active filter with its request values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub param: &'static str,
    pub fields: &'static [&'static str],
    pub comparison: Comparison,
    pub values: Vec<SqlValue>,
}

impl Condition {
    pub fn render(&self, b: &mut SqlBuilder) {
        let op = match self.comparison {
            Comparison::Like => "LIKE",
            Comparison::Equals | Comparison::AnyOf => "=",
        };
        let mut terms = Vec::with_capacity(self.fields.len() * self.values.len());
        for field in self.fields {
            for value in &self.values {
                let p = b.bind(value.clone());
                terms.push(format!("{field} {op} {p}"));
            }
        }

        if self.fields.len() > 1 {
            let wrapped: Vec<String> = terms.iter().map(|t| format!("({t})")).collect();
            b.push(&format!("({})", wrapped.join(" OR ")));
        } else if self.comparison == Comparison::AnyOf {
            b.push(&format!("({})", terms.join(" OR ")));
        } else {
            b.push(&terms.concat());
        }
    }
}

fn is_unrestricted(value: &str, spec: &FilterSpec) -> bool {
    value.eq_ignore_ascii_case(ALL_SENTINEL) || spec.sentinel == Some(value)
}

fn typed_value(spec: &FilterSpec, name: &str, raw: &str) -> Result<SqlValue, CoreError> {
    match spec.kind {
        ValueKind::Text => Ok(SqlValue::from(raw)),
        ValueKind::Integer => raw
            .parse::<i64>()
            .map(SqlValue::Int)
            .map_err(|_| CoreError::invalid(format!("{name} must be a number, got '{raw}'"))),
    }
}

/// Resolve one filter against the request. `None` when inactive.
fn condition_for(
    spec: &'static FilterSpec,
    params: &RequestParams,
) -> Result<Option<Condition>, CoreError> {
    if spec.multi {
        let mut names = vec![spec.param];
        names.extend_from_slice(spec.aliases);
        let Some((name, values)) = names
            .into_iter()
            .map(|n| (n, params.get_all(n)))
            .find(|(_, vs)| !vs.is_empty())
        else {
            return Ok(None);
        };
        // "All" anywhere in the selection lifts the restriction.
        if values.iter().any(|v| is_unrestricted(v, spec)) {
            return Ok(None);
        }
        let values = values
            .iter()
            .map(|v| typed_value(spec, name, v))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(Condition {
            param: spec.param,
            fields: spec.fields,
            comparison: Comparison::AnyOf,
            values,
        }));
    }

    let mut names = vec![spec.param];
    names.extend_from_slice(spec.aliases);
    let Some((name, raw)) = params.first_of(&names) else {
        return Ok(None);
    };
    if is_unrestricted(raw, spec) {
        return Ok(None);
    }

    let comparison = if spec.mode == MatchMode::Wildcard && raw.contains('%') {
        Comparison::Like
    } else {
        Comparison::Equals
    };
    let value = match comparison {
        Comparison::Like => SqlValue::from(raw),
        _ => typed_value(spec, name, raw)?,
    };
    Ok(Some(Condition {
        param: spec.param,
        fields: spec.fields,
        comparison,
        values: vec![value],
    }))
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Everything the request contributes to one catalogue query.
#[derive(Debug, Clone)]
pub struct FilterPlan {
    pub catalogue: &'static Catalogue,
    pub display: Vec<&'static ColumnSpec>,
    pub joins: Vec<&'static JoinSpec>,
    pub conditions: Vec<Condition>,
}

impl FilterPlan {
    pub fn compile(
        catalogue: &'static Catalogue,
        params: &RequestParams,
        selection: &ColumnSelection,
    ) -> Result<Self, CoreError> {
        let display: Vec<&'static ColumnSpec> = catalogue
            .columns
            .iter()
            .filter(|c| selection.includes(c.name))
            .collect();

        let mut conditions = Vec::new();
        let mut filter_joins = Vec::new();
        for spec in catalogue.filters {
            if let Some(condition) = condition_for(spec, params)? {
                filter_joins.extend_from_slice(spec.joins);
                conditions.push(condition);
            }
        }

        // A join is needed once, whether a column or a filter asked first.
        let mut joins: IndexMap<&'static str, &'static JoinSpec> = IndexMap::new();
        for join in display
            .iter()
            .filter_map(|c| c.join)
            .chain(filter_joins)
        {
            joins.entry(join.alias).or_insert(join);
        }

        Ok(Self {
            catalogue,
            display,
            joins: joins.into_values().collect(),
            conditions,
        })
    }

    /// Mandatory fields followed by the displayed columns.
    pub fn select_list(&self) -> String {
        self.catalogue
            .mandatory
            .iter()
            .copied()
            .chain(self.display.iter().map(|c| c.field))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// ` FROM base` plus every required join.
    pub fn render_from(&self, b: &mut SqlBuilder, window: &TimeWindow) {
        b.push(" FROM ").push(self.catalogue.from);
        for join in &self.joins {
            join.render(b, window);
        }
    }

    /// Active conditions ANDed together, then the time window.
    pub fn render_where(&self, b: &mut SqlBuilder, window: &TimeWindow) {
        for condition in &self.conditions {
            b.and_where();
            condition.render(b);
        }
        if window.is_bounded() {
            b.and_where();
            window.render(b, self.catalogue.time_field);
        }
    }

    pub fn has_join(&self, alias: &str) -> bool {
        self.joins.iter().any(|j| j.alias == alias)
    }

    /// Whether some join can match several rows per base row, so the
    /// projection needs `DISTINCT`.
    pub fn fans_out(&self) -> bool {
        self.joins.iter().any(|j| j.one_to_many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use assert_matches::assert_matches;

    static LEVELS: JoinSpec = JoinSpec {
        alias: "t2",
        table: "levels",
        on: "t1.level = t2.level_no",
        windowed: false,
        one_to_many: false,
    };

    static TAGS: JoinSpec = JoinSpec {
        alias: "t3",
        table: "tags",
        on: "t1.id = t3.id",
        windowed: true,
        one_to_many: false,
    };

    static CATALOGUE: Catalogue = Catalogue {
        from: "events t1",
        time_field: "t1.timestamp",
        mandatory: &["t1.id", "t1.timestamp"],
        columns: &[
            ColumnSpec {
                name: "level",
                label: "Level",
                field: "t2.level_name",
                join: Some(&LEVELS),
                link: None,
            },
            ColumnSpec {
                name: "tag",
                label: "Tag",
                field: "t3.tag",
                join: Some(&TAGS),
                link: Some("tag"),
            },
        ],
        filters: &[
            FilterSpec {
                param: "level",
                aliases: &[],
                fields: &["t1.level"],
                mode: MatchMode::Exact,
                kind: ValueKind::Integer,
                multi: true,
                sentinel: None,
                joins: &[],
            },
            FilterSpec {
                param: "tag",
                aliases: &["label"],
                fields: &["t3.tag"],
                mode: MatchMode::Wildcard,
                kind: ValueKind::Text,
                multi: false,
                sentinel: Some("-1"),
                joins: &[&TAGS],
            },
        ],
    };

    fn compile(pairs: &[(&str, &str)], window: TimeWindow) -> crate::sql::CompiledQuery {
        let params = RequestParams::from_pairs(pairs.iter().copied());
        let selection = ColumnSelection::from_params(&params, &CATALOGUE);
        let plan = FilterPlan::compile(&CATALOGUE, &params, &selection).unwrap();
        let mut b = SqlBuilder::new(Dialect::MySql);
        b.push("SELECT ").push(&plan.select_list());
        plan.render_from(&mut b, &window);
        plan.render_where(&mut b, &window);
        b.build()
    }

    #[test]
    fn single_filter_yields_one_condition() {
        let q = compile(&[("columns", "custom"), ("tag", "abc")], TimeWindow::Everything);
        assert_eq!(
            q.sql,
            "SELECT t1.id, t1.timestamp FROM events t1 \
             LEFT JOIN tags t3 ON (t1.id = t3.id) WHERE t3.tag = ?"
        );
        assert_eq!(q.binds, vec![SqlValue::from("abc")]);
    }

    #[test]
    fn multi_values_become_parenthesized_or() {
        let q = compile(
            &[("columns", "custom"), ("level[]", "3"), ("level[]", "4"), ("level[]", "6")],
            TimeWindow::Everything,
        );
        assert!(q
            .sql
            .ends_with("WHERE (t1.level = ? OR t1.level = ? OR t1.level = ?)"));
        assert_eq!(
            q.binds,
            vec![SqlValue::Int(3), SqlValue::Int(4), SqlValue::Int(6)]
        );
    }

    #[test]
    fn percent_switches_to_like() {
        let q = compile(&[("columns", "custom"), ("label", "%abc%")], TimeWindow::Everything);
        assert!(q.sql.ends_with("WHERE t3.tag LIKE ?"));
        assert_eq!(q.binds, vec![SqlValue::from("%abc%")]);
    }

    #[test]
    fn sentinels_leave_filters_inactive() {
        let q = compile(
            &[("columns", "custom"), ("level[]", "All"), ("level[]", "3"), ("tag", "-1")],
            TimeWindow::Everything,
        );
        assert_eq!(q.sql, "SELECT t1.id, t1.timestamp FROM events t1");
        assert!(q.binds.is_empty());
    }

    #[test]
    fn all_after_a_concrete_value_still_lifts_the_filter() {
        let q = compile(
            &[("columns", "custom"), ("level[]", "3"), ("level[]", "All")],
            TimeWindow::Everything,
        );
        assert_eq!(q.sql, "SELECT t1.id, t1.timestamp FROM events t1");
        assert!(q.binds.is_empty());
    }

    #[test]
    fn displayed_and_filtered_column_joins_once() {
        let q = compile(&[("col_tag", "on"), ("tag", "x")], TimeWindow::Relative { minutes: 5 });
        assert_eq!(q.sql.matches("LEFT JOIN tags").count(), 1);
        assert!(q.sql.starts_with("SELECT t1.id, t1.timestamp, t3.tag FROM events t1"));
        // The partitioned join repeats the window on its own alias.
        assert!(q.sql.contains(
            "ON (t1.id = t3.id AND t3.timestamp > DATE_SUB(NOW(), INTERVAL ? MINUTE))"
        ));
        assert!(q
            .sql
            .ends_with("WHERE t3.tag = ? AND t1.timestamp > DATE_SUB(NOW(), INTERVAL ? MINUTE)"));
        assert_eq!(
            q.binds,
            vec![SqlValue::Int(5), SqlValue::from("x"), SqlValue::Int(5)]
        );
    }

    #[test]
    fn default_selection_displays_every_column() {
        let q = compile(&[], TimeWindow::Everything);
        assert!(q.sql.contains("t2.level_name, t3.tag"));
        assert!(q.sql.contains("LEFT JOIN levels t2"));
    }

    #[test]
    fn unknown_parameters_never_reach_sql() {
        let q = compile(
            &[("columns", "custom"), ("t1.id; DROP TABLE events", "1")],
            TimeWindow::Everything,
        );
        assert_eq!(q.sql, "SELECT t1.id, t1.timestamp FROM events t1");
    }

    #[test]
    fn non_numeric_value_for_numeric_filter_is_rejected() {
        let params = RequestParams::from_pairs([("level[]", "high")]);
        assert_matches!(
            FilterPlan::compile(&CATALOGUE, &params, &ColumnSelection::Default),
            Err(CoreError::InvalidInput(_))
        );
    }
}
