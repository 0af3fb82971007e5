//! Time windows.
//!
//! Every log and report query is restricted to one [`TimeWindow`], resolved
//! from the request with a fixed precedence: drill-down, then relative
//! `last`, then an explicit `from`/`to` range, then a report `period`, then
//! the caller's fallback.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::params::RequestParams;
use crate::sql::SqlBuilder;
use crate::types::{format_sql_timestamp, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MINUTES_PER_DAY: i64 = 1440;

/// `period=all` stands for this many days.
pub const ALL_PERIOD_DAYS: i64 = 10_000;

/// Longest relative window a request may ask for, in minutes.
pub const MAX_WINDOW_MINUTES: i64 = ALL_PERIOD_DAYS * MINUTES_PER_DAY;

/// Placeholder text the query form leaves in untouched date fields.
const DATE_PLACEHOLDER: &str = "dd/mm/yyyy";

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)(?:/([0-9]+))?$").expect("static regex"));

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeWindow {
    /// No time restriction.
    Everything,
    /// The last `minutes` minutes before the database's current time.
    Relative { minutes: i64 },
    /// Half-open `[from, to)`.
    Explicit { from: Timestamp, to: Timestamp },
    /// `[center - span, center + span)`.
    Drilldown { center: Timestamp, span_hours: i64 },
}

/// Per-endpoint knobs for [`TimeWindow::from_params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    /// Half-width of a drill-down window.
    pub drilldown_hours: i64,
    /// Relative window used when the request names none. `None` makes the
    /// window mandatory.
    pub fallback_minutes: Option<i64>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            drilldown_hours: 1,
            fallback_minutes: None,
        }
    }
}

impl TimeWindow {
    pub fn from_params(params: &RequestParams, opts: &WindowOptions) -> Result<Self, CoreError> {
        if let Some(raw) = params.get("drilltime") {
            let window = TimeWindow::Drilldown {
                center: parse_drilltime(raw)?,
                span_hours: opts.drilldown_hours,
            };
            if window.bounds(NaiveDateTime::MIN).is_none() {
                return Err(CoreError::invalid(format!(
                    "drilltime '{raw}' is outside the supported range"
                )));
            }
            return Ok(window);
        }

        match params.parse::<i64>("last")? {
            None | Some(0) => {}
            Some(-1) => return Ok(TimeWindow::Everything),
            Some(m) if m > MAX_WINDOW_MINUTES => {
                return Err(CoreError::invalid(format!(
                    "last must not exceed {MAX_WINDOW_MINUTES} minutes, got {m}"
                )))
            }
            Some(m) if m > 0 => return Ok(TimeWindow::Relative { minutes: m }),
            Some(m) => return Err(CoreError::invalid(format!("last must be positive, got {m}"))),
        }

        if let Some(window) = explicit_range(params)? {
            return Ok(window);
        }

        if let Some(raw) = params.get("period") {
            return Ok(TimeWindow::Relative {
                minutes: parse_period(raw)?,
            });
        }

        match opts.fallback_minutes {
            Some(minutes) => Ok(TimeWindow::Relative { minutes }),
            None => Err(CoreError::invalid(
                "a time window is required (drilltime, last, or from/to)",
            )),
        }
    }

    pub fn is_bounded(&self) -> bool {
        !matches!(self, TimeWindow::Everything)
    }

    /// Absolute bounds of the window, taking `now` as the database clock.
    ///
    /// `None` for [`TimeWindow::Everything`] and for bounds chrono cannot
    /// represent.
    pub fn bounds(&self, now: Timestamp) -> Option<(Timestamp, Timestamp)> {
        match *self {
            TimeWindow::Everything => None,
            TimeWindow::Relative { minutes } => {
                let from = now.checked_sub_signed(Duration::try_minutes(minutes)?)?;
                Some((from, now))
            }
            TimeWindow::Explicit { from, to } => Some((from, to)),
            TimeWindow::Drilldown { center, span_hours } => {
                let span = Duration::try_hours(span_hours)?;
                Some((
                    center.checked_sub_signed(span)?,
                    center.checked_add_signed(span)?,
                ))
            }
        }
    }

    pub fn span(&self, now: Timestamp) -> Option<Duration> {
        self.bounds(now).map(|(from, to)| to - from)
    }

    /// Human-readable summary for result headers.
    pub fn describe(&self, now: Timestamp) -> String {
        const FMT: &str = "%d/%m/%Y %H:%M";
        match (self, self.bounds(now)) {
            (TimeWindow::Relative { minutes }, Some((from, to))) => format!(
                "between {} and {} ({minutes} minutes)",
                from.format(FMT),
                to.format(FMT)
            ),
            (TimeWindow::Drilldown { center, span_hours }, _) => format!(
                "within {span_hours} hour(s) of {}",
                center.format("%d/%m/%Y %H:%M:%S")
            ),
            (_, Some((from, to))) => {
                format!("between {} and {}", from.format(FMT), to.format(FMT))
            }
            (_, None) => "over all recorded time".to_string(),
        }
    }

    /// Append the window predicate on `field`, if any. Returns whether
    /// anything was rendered.
    ///
    /// Relative windows are evaluated by the database; absolute ones are
    /// bound as `YYYY-MM-DD HH:MM:SS` text.
    pub fn render(&self, b: &mut SqlBuilder, field: &str) -> bool {
        match *self {
            TimeWindow::Everything => false,
            TimeWindow::Relative { minutes } => {
                let p = b.bind(minutes);
                let expr = b.dialect().relative_time_expr(&p);
                b.push(&format!("{field} > {expr}"));
                true
            }
            TimeWindow::Explicit { .. } | TimeWindow::Drilldown { .. } => {
                // Absolute windows never depend on `now`.
                let Some((from, to)) = self.bounds(NaiveDateTime::MIN) else {
                    return false;
                };
                let dialect = b.dialect();
                let p_from = b.bind(format_sql_timestamp(&from));
                let lower = dialect.date_literal(&p_from);
                let p_to = b.bind(format_sql_timestamp(&to));
                let upper = dialect.date_literal(&p_to);
                b.push(&format!("({field} >= {lower} AND {field} < {upper})"));
                true
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Drill-down anchors come from rendered timestamps (`YYYY-MM-DD HH:MM:SS`,
/// possibly with a `.usec` suffix) or from the form's `dd/mm/yyyy` layout.
fn parse_drilltime(raw: &str) -> Result<Timestamp, CoreError> {
    let base = raw.split('.').next().unwrap_or(raw).trim();
    ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(base, fmt).ok())
        .ok_or_else(|| CoreError::invalid(format!("drilltime '{raw}' is not a timestamp")))
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, CoreError> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| CoreError::invalid(format!("{field} '{raw}' is not a dd/mm/yyyy date")))
}

fn parse_time(raw: &str, field: &str) -> Result<NaiveTime, CoreError> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| CoreError::invalid(format!("{field} '{raw}' is not an HH:MM time")))
}

/// A date field with an optional inline time, completed by its companion
/// time field (default midnight).
fn parse_endpoint(
    params: &RequestParams,
    date_field: &str,
    time_field: &str,
) -> Result<Option<Timestamp>, CoreError> {
    let Some(raw) = params.get(date_field) else {
        return Ok(None);
    };
    if raw.eq_ignore_ascii_case(DATE_PLACEHOLDER) {
        return Ok(None);
    }

    let mut parts = raw.split_whitespace();
    let date = parse_date(parts.next().unwrap_or_default(), date_field)?;
    let time = match (parts.next(), params.get(time_field)) {
        (Some(inline), _) => parse_time(inline, date_field)?,
        (None, Some(t)) => parse_time(t, time_field)?,
        (None, None) => NaiveTime::MIN,
    };
    Ok(Some(date.and_time(time)))
}

fn explicit_range(params: &RequestParams) -> Result<Option<TimeWindow>, CoreError> {
    let from = parse_endpoint(params, "from", "fromtime")?;
    let to = parse_endpoint(params, "to", "totime")?;
    match (from, to) {
        (None, None) => Ok(None),
        (Some(from), Some(to)) if from < to => Ok(Some(TimeWindow::Explicit { from, to })),
        (Some(_), Some(_)) => Err(CoreError::invalid("from must be earlier than to")),
        _ => Err(CoreError::invalid("from and to must be given together")),
    }
}

/// `N` or `N/M` days, or `all`, converted to minutes.
pub fn parse_period(raw: &str) -> Result<i64, CoreError> {
    if raw.eq_ignore_ascii_case("all") {
        return Ok(ALL_PERIOD_DAYS * MINUTES_PER_DAY);
    }
    let invalid = || CoreError::invalid(format!("period '{raw}' must be N, N/M or all"));
    let caps = PERIOD_RE.captures(raw).ok_or_else(invalid)?;
    let days: i64 = caps[1].parse().map_err(|_| invalid())?;
    let divisor: i64 = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => 1,
    };
    if days == 0 || divisor == 0 {
        return Err(invalid());
    }
    let minutes = (days.saturating_mul(MINUTES_PER_DAY) / divisor).max(1);
    if minutes > MAX_WINDOW_MINUTES {
        return Err(CoreError::invalid(format!(
            "period '{raw}' is longer than {ALL_PERIOD_DAYS} days"
        )));
    }
    Ok(minutes)
}
