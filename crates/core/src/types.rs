/// Database-local wall clock time. DLF and the monitoring schema store
/// `DATETIME`/`DATE` values without a zone, so the service never converts.
pub type Timestamp = chrono::NaiveDateTime;

/// Render a timestamp the way both dialects' date literals expect it.
pub fn format_sql_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
