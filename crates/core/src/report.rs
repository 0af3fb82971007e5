//! Monitoring reports.
//!
//! Each report is a [`ReportDescriptor`]: where its rows come from, which
//! column carries the time, which filters it accepts and how the result is
//! shaped. One engine compiles every descriptor into a query for the
//! instance's dialect and reshapes the rows that come back.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use crate::crosstab::CrossTab;
use crate::dialect::Dialect;
use crate::error::CoreError;
use crate::histogram::{
    BinSpec, Histogram, FILES_PER_MOUNT, FILE_SIZE_MB, GC_FILE_AGE_SECONDS, LATENCY_SECONDS,
};
use crate::outcome::Outcome;
use crate::params::RequestParams;
use crate::ranking::Ranking;
use crate::row::ResultSet;
use crate::series::{bucketize, GapFill, Granularity, TimeSeries};
use crate::sql::{CompiledQuery, SqlBuilder, SqlValue};
use crate::types::Timestamp;
use crate::window::{TimeWindow, WindowOptions, MINUTES_PER_DAY};

/// Window used when a report request names none.
pub const DEFAULT_REPORT_DAYS: i64 = 7;

/// Size of the "top N" rankings.
pub const TOP_N: u32 = 10;

static SCHEMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("static regex"));

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// `COUNT(*)`
    Count,
    /// Integer sum of a column.
    Sum(&'static str),
}

/// A per-row value selected for binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueExpr {
    /// A column or arithmetic over columns.
    Column(&'static str),
    /// Seconds elapsed between two time columns.
    SecondsBetween {
        start: &'static str,
        end: &'static str,
    },
}

impl ValueExpr {
    fn render(&self, dialect: Dialect) -> String {
        match *self {
            ValueExpr::Column(expr) => expr.to_string(),
            ValueExpr::SecondsBetween { start, end } => dialect.seconds_between(start, end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Raw values of `value`, binned in the application.
    Histogram {
        value: ValueExpr,
        bins: BinSpec,
    },
    /// One histogram per `group`, laid out as a cross tab whose columns are
    /// the bins.
    BinnedCrossTab {
        group: &'static str,
        value: ValueExpr,
        bins: BinSpec,
    },
    /// Rows per time bucket.
    TimeSeries,
    CrossTab {
        row: &'static str,
        column: &'static str,
        measure: Measure,
        /// Both axes share one label list.
        square: bool,
    },
    Ranking {
        label: &'static str,
        measure: Measure,
        limit: Option<u32>,
    },
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Histogram { .. } => "histogram",
            Shape::TimeSeries => "time_series",
            Shape::CrossTab { .. } | Shape::BinnedCrossTab { .. } => "cross_tab",
            Shape::Ranking { .. } => "ranking",
        }
    }
}

/// A categorical filter a report accepts, e.g. `svcclass`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportFilter {
    pub param: &'static str,
    pub column: &'static str,
}

const SVCCLASS: ReportFilter = ReportFilter {
    param: "svcclass",
    column: "svcclass",
};

const USERNAME: ReportFilter = ReportFilter {
    param: "username",
    column: "username",
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportDescriptor {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// FROM clause; `{schema}` is replaced by the instance's schema.
    pub from: &'static str,
    pub time_column: &'static str,
    /// Fixed predicates, ANDed with the request's filters.
    pub conditions: &'static [&'static str],
    pub filters: &'static [ReportFilter],
    pub shape: Shape,
}

pub static REPORTS: &[ReportDescriptor] = &[
    ReportDescriptor {
        key: "requests-per-svcclass",
        title: "File requests per service class",
        description: "Requests by service class and kind: disk hit, disk-to-disk copy or tape recall.",
        from: "{schema}.requests",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS, USERNAME],
        shape: Shape::CrossTab {
            row: "svcclass",
            column: "type",
            measure: Measure::Count,
            square: false,
        },
    },
    ReportDescriptor {
        key: "prestage-per-svcclass",
        title: "Direct and prestaged recalls per service class",
        description: "Tape recalls per service class, split by whether the file was requested directly or prestaged.",
        from: "{schema}.requests",
        time_column: "timestamp",
        conditions: &["type = 'TapeRecall'"],
        filters: &[SVCCLASS],
        shape: Shape::CrossTab {
            row: "svcclass",
            column: "state",
            measure: Measure::Count,
            square: false,
        },
    },
    ReportDescriptor {
        key: "prestage-users",
        title: "Direct and prestaged recalls per user",
        description: "Tape recalls per user, split by whether the file was requested directly or prestaged.",
        from: "{schema}.requests",
        time_column: "timestamp",
        conditions: &["type = 'TapeRecall'"],
        filters: &[SVCCLASS, USERNAME],
        shape: Shape::CrossTab {
            row: "username",
            column: "state",
            measure: Measure::Count,
            square: false,
        },
    },
    ReportDescriptor {
        key: "request-timeseries",
        title: "File requests over time",
        description: "Number of file requests per time bucket.",
        from: "{schema}.requests",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS, USERNAME],
        shape: Shape::TimeSeries,
    },
    ReportDescriptor {
        key: "top-users",
        title: "Top users",
        description: "Users with the most file requests.",
        from: "{schema}.requests",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::Ranking {
            label: "username",
            measure: Measure::Count,
            limit: Some(TOP_N),
        },
    },
    ReportDescriptor {
        key: "size-distribution",
        title: "Size of recalled files",
        description: "Distribution of the size of files recalled from tape.",
        from: "{schema}.requests",
        time_column: "timestamp",
        conditions: &["type = 'TapeRecall'"],
        filters: &[SVCCLASS, USERNAME],
        shape: Shape::Histogram {
            value: ValueExpr::Column("filesize / 1048576"),
            bins: FILE_SIZE_MB,
        },
    },
    ReportDescriptor {
        key: "size-per-svcclass",
        title: "Size of recalled files per service class",
        description: "Size distribution of files recalled from tape, one row per service class.",
        from: "{schema}.requests",
        time_column: "timestamp",
        conditions: &["type = 'TapeRecall'"],
        filters: &[SVCCLASS, USERNAME],
        shape: Shape::BinnedCrossTab {
            group: "svcclass",
            value: ValueExpr::Column("filesize / 1048576"),
            bins: FILE_SIZE_MB,
        },
    },
    ReportDescriptor {
        key: "latencies",
        title: "Request latency",
        description: "Time from the arrival of a request until the file is returned to the user.",
        from: "{schema}.totallatency",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::Histogram {
            value: ValueExpr::Column("totallatency"),
            bins: LATENCY_SECONDS,
        },
    },
    ReportDescriptor {
        key: "migration-latency",
        title: "Migration latency",
        description: "Time until a file is migrated to tape.",
        from: "{schema}.migration",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::Histogram {
            value: ValueExpr::Column("totallatency"),
            bins: LATENCY_SECONDS,
        },
    },
    ReportDescriptor {
        key: "migrations-per-svcclass",
        title: "Migrations per service class",
        description: "Number of files migrated to tape per service class.",
        from: "{schema}.migration",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::Ranking {
            label: "svcclass",
            measure: Measure::Count,
            limit: None,
        },
    },
    ReportDescriptor {
        key: "migration-timeseries",
        title: "Migrations over time",
        description: "Number of files migrated per time bucket.",
        from: "{schema}.migration",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::TimeSeries,
    },
    ReportDescriptor {
        key: "gc-file-age",
        title: "Age of garbage-collected files",
        description: "How long files stayed on disk before garbage collection removed them.",
        from: "{schema}.gcfiles",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::Histogram {
            value: ValueExpr::Column("fileage"),
            bins: GC_FILE_AGE_SECONDS,
        },
    },
    ReportDescriptor {
        key: "gc-size-distribution",
        title: "Size of garbage-collected files",
        description: "Distribution of the size of files removed by garbage collection.",
        from: "{schema}.gcfiles",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::Histogram {
            value: ValueExpr::Column("filesize / 1048576"),
            bins: FILE_SIZE_MB,
        },
    },
    ReportDescriptor {
        key: "gc-per-svcclass",
        title: "Garbage collection per service class",
        description: "Number of files removed by garbage collection per service class.",
        from: "{schema}.gcfiles",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::Ranking {
            label: "svcclass",
            measure: Measure::Count,
            limit: None,
        },
    },
    ReportDescriptor {
        key: "gc-rerequests",
        title: "Recalls after garbage collection",
        description: "Time between garbage collection of a file and a later tape recall of the same file.",
        from: "{schema}.gcfiles g INNER JOIN {schema}.requests r ON (g.nsfileid = r.nsfileid)",
        time_column: "r.timestamp",
        conditions: &["r.type = 'TapeRecall'", "r.timestamp > g.timestamp"],
        filters: &[ReportFilter {
            param: "svcclass",
            column: "r.svcclass",
        }],
        shape: Shape::Histogram {
            value: ValueExpr::SecondsBetween {
                start: "g.timestamp",
                end: "r.timestamp",
            },
            bins: GC_FILE_AGE_SECONDS,
        },
    },
    ReportDescriptor {
        key: "top-tapes",
        title: "Most recalled tapes",
        description: "Tapes with the most recall requests.",
        from: "{schema}.taperecall",
        time_column: "timestamp",
        conditions: &[],
        filters: &[ReportFilter {
            param: "tapevid",
            column: "tapeid",
        }],
        shape: Shape::Ranking {
            label: "tapeid",
            measure: Measure::Count,
            limit: Some(TOP_N),
        },
    },
    ReportDescriptor {
        key: "user-tape-mounts",
        title: "User tape mount contribution",
        description: "Recall requests per user where the tape was not already mounted.",
        from: "{schema}.requests r INNER JOIN {schema}.taperecall t ON (r.subreqid = t.subreqid)",
        time_column: "r.timestamp",
        conditions: &["r.type = 'TapeRecall'", "t.tapemountsflag = 'T'"],
        filters: &[
            ReportFilter {
                param: "svcclass",
                column: "r.svcclass",
            },
            ReportFilter {
                param: "username",
                column: "r.username",
            },
        ],
        shape: Shape::Ranking {
            label: "r.username",
            measure: Measure::Count,
            limit: Some(TOP_N),
        },
    },
    ReportDescriptor {
        key: "files-per-mount",
        title: "Files recalled per tape mount",
        description: "Number of files recalled from a tape during a single mount.",
        from: "{schema}.tapemountstats",
        time_column: "timestamp",
        conditions: &[],
        filters: &[ReportFilter {
            param: "tapevid",
            column: "tapeid",
        }],
        shape: Shape::Histogram {
            value: ValueExpr::Column("nbfilespermount"),
            bins: FILES_PER_MOUNT,
        },
    },
    ReportDescriptor {
        key: "pool-transfers",
        title: "Disk-to-disk copies between pools",
        description: "Number of files copied from one disk pool to another.",
        from: "{schema}.diskcopy",
        time_column: "timestamp",
        conditions: &[],
        filters: &[],
        shape: Shape::CrossTab {
            row: "originalpool",
            column: "targetpool",
            measure: Measure::Count,
            square: true,
        },
    },
    ReportDescriptor {
        key: "top-errors",
        title: "Most frequent errors",
        description: "Error messages with the highest occurrence count.",
        from: "{schema}.top10errors",
        time_column: "timestamp",
        conditions: &[],
        filters: &[],
        shape: Shape::Ranking {
            label: "errormessage",
            measure: Measure::Sum("nberrors"),
            limit: Some(TOP_N),
        },
    },
    ReportDescriptor {
        key: "errors-per-svcclass",
        title: "Errors per service class",
        description: "Occurrences of each error message broken down by service class.",
        from: "{schema}.top10errors",
        time_column: "timestamp",
        conditions: &[],
        filters: &[SVCCLASS],
        shape: Shape::CrossTab {
            row: "errormessage",
            column: "svcclass",
            measure: Measure::Sum("nberrors"),
            square: false,
        },
    },
];

pub fn find(key: &str) -> Option<&'static ReportDescriptor> {
    REPORTS.iter().find(|r| r.key == key)
}

/// Schemas are spliced into SQL text, so only plain identifiers pass.
pub fn validate_schema(schema: &str) -> Result<(), CoreError> {
    if SCHEMA_RE.is_match(schema) {
        Ok(())
    } else {
        Err(CoreError::Configuration(format!(
            "schema '{schema}' is not a plain identifier"
        )))
    }
}

/// Catalogue entry as listed by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub shape: &'static str,
    pub filters: Vec<&'static str>,
}

impl From<&ReportDescriptor> for ReportSummary {
    fn from(d: &ReportDescriptor) -> Self {
        Self {
            key: d.key,
            title: d.title,
            description: d.description,
            shape: d.shape.name(),
            filters: d.filters.iter().map(|f| f.param).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Shaped report rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ReportData {
    Histogram(Histogram),
    TimeSeries(TimeSeries),
    CrossTab(CrossTab),
    Ranking(Ranking),
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveFilter {
    column: &'static str,
    value: String,
    like: bool,
}

/// A report resolved against one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub descriptor: &'static ReportDescriptor,
    pub window: TimeWindow,
    pub fill: GapFill,
    filters: Vec<ActiveFilter>,
}

impl ReportRequest {
    pub fn from_params(
        descriptor: &'static ReportDescriptor,
        params: &RequestParams,
        drilldown_hours: i64,
    ) -> Result<Self, CoreError> {
        let opts = WindowOptions {
            drilldown_hours,
            fallback_minutes: Some(DEFAULT_REPORT_DAYS * MINUTES_PER_DAY),
        };
        let window = TimeWindow::from_params(params, &opts)?;
        let fill = GapFill::from_params(params)?;

        let filters = descriptor
            .filters
            .iter()
            .filter_map(|f| {
                let value = params.get(f.param)?;
                if value.eq_ignore_ascii_case(crate::filter::ALL_SENTINEL) {
                    return None;
                }
                Some(ActiveFilter {
                    column: f.column,
                    value: value.to_string(),
                    like: value.contains('%'),
                })
            })
            .collect();

        Ok(Self {
            descriptor,
            window,
            fill,
            filters,
        })
    }

    /// Bucket size for time series over this request's window.
    pub fn granularity(&self, now: Timestamp) -> Granularity {
        Granularity::for_span(self.window.span(now))
    }

    fn render_where(&self, b: &mut SqlBuilder) {
        for condition in self.descriptor.conditions {
            b.and_where().push(condition);
        }
        for filter in &self.filters {
            let op = if filter.like { "LIKE" } else { "=" };
            b.and_where()
                .push(filter.column)
                .push(" ")
                .push(op)
                .push(" ")
                .push_bind(SqlValue::from(filter.value.as_str()));
        }
        if self.window.is_bounded() {
            b.and_where();
            self.window.render(b, self.descriptor.time_column);
        }
    }

    pub fn compile(
        &self,
        dialect: Dialect,
        schema: &str,
        now: Timestamp,
    ) -> Result<CompiledQuery, CoreError> {
        validate_schema(schema)?;
        let from = self.descriptor.from.replace("{schema}", schema);
        let measure = |m: Measure| match m {
            Measure::Count => "COUNT(*)".to_string(),
            Measure::Sum(column) => dialect.sum_expr(column),
        };

        let mut b = SqlBuilder::new(dialect);
        let query = match self.descriptor.shape {
            Shape::Histogram { value, .. } => {
                let value = value.render(dialect);
                b.push(&format!("SELECT {value} AS value FROM {from}"));
                self.render_where(&mut b);
                b.build()
            }
            Shape::BinnedCrossTab { group, value, .. } => {
                let value = value.render(dialect);
                b.push(&format!("SELECT {group} AS row_label, {value} AS value FROM {from}"));
                self.render_where(&mut b);
                b.build()
            }
            Shape::TimeSeries => {
                let bucket = dialect.truncate_time(self.descriptor.time_column, self.granularity(now));
                b.push(&format!("SELECT {bucket} AS bucket, COUNT(*) AS value FROM {from}"));
                self.render_where(&mut b);
                b.push(&format!(" GROUP BY {bucket}"));
                b.build()
            }
            Shape::CrossTab {
                row,
                column,
                measure: m,
                ..
            } => {
                let value = measure(m);
                b.push(&format!(
                    "SELECT {row} AS row_label, {column} AS column_label, {value} AS value FROM {from}"
                ));
                self.render_where(&mut b);
                b.push(&format!(" GROUP BY {row}, {column}"));
                b.build()
            }
            Shape::Ranking {
                label,
                measure: m,
                limit,
            } => {
                let value = measure(m);
                b.push(&format!("SELECT {label} AS label, {value} AS value FROM {from}"));
                self.render_where(&mut b);
                b.push(&format!(" GROUP BY {label}"));
                let grouped = b.build();
                match limit {
                    Some(n) => dialect.limit(grouped, "value DESC", n),
                    None => grouped,
                }
            }
        };
        Ok(query)
    }

    /// Reshape the rows of [`ReportRequest::compile`]'s query.
    pub fn shape(&self, rs: &ResultSet, now: Timestamp) -> Outcome<ReportData> {
        if rs.is_empty() {
            return Outcome::NoData;
        }
        let data = match self.descriptor.shape {
            Shape::Histogram { bins, .. } => {
                let values: Vec<f64> = (0..rs.len())
                    .filter_map(|i| rs.value(i, "value").as_f64())
                    .collect();
                if values.is_empty() {
                    return Outcome::NoData;
                }
                ReportData::Histogram(bins.histogram(values))
            }
            Shape::TimeSeries => {
                let entries = (0..rs.len()).filter_map(|i| {
                    let bucket = rs.value(i, "bucket").as_text()?;
                    let start =
                        NaiveDateTime::parse_from_str(bucket.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
                    Some((start, rs.value(i, "value").as_i64().unwrap_or(0)))
                });
                ReportData::TimeSeries(bucketize(
                    entries,
                    self.granularity(now),
                    self.fill,
                    self.window.bounds(now),
                ))
            }
            Shape::BinnedCrossTab { bins, .. } => {
                let entries: Vec<(String, String, i64)> = (0..rs.len())
                    .filter_map(|i| {
                        let value = rs.value(i, "value").as_f64()?;
                        let bin = bins.bins.get(bins.index_of(value))?;
                        Some((label_of(rs, i, "row_label"), bin.label.to_string(), 1))
                    })
                    .collect();
                if entries.is_empty() {
                    return Outcome::NoData;
                }
                let columns = bins.bins.iter().map(|b| b.label.to_string()).collect();
                ReportData::CrossTab(CrossTab::with_columns(entries, columns))
            }
            Shape::CrossTab { square, .. } => {
                let entries = (0..rs.len()).map(|i| {
                    (
                        label_of(rs, i, "row_label"),
                        label_of(rs, i, "column_label"),
                        rs.value(i, "value").as_i64().unwrap_or(0),
                    )
                });
                ReportData::CrossTab(CrossTab::build(entries, square))
            }
            Shape::Ranking { limit, .. } => {
                let entries = (0..rs.len()).map(|i| {
                    (
                        label_of(rs, i, "label"),
                        rs.value(i, "value").as_i64().unwrap_or(0),
                    )
                });
                ReportData::Ranking(Ranking::build(entries, limit.map(|n| n as usize)))
            }
        };
        Outcome::Data(data)
    }
}

fn label_of(rs: &ResultSet, row: usize, column: &str) -> String {
    rs.value(row, column)
        .as_text()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
