//! Handlers for the DLF log viewer.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use castormon_core::dlf::{Lookup, LookupEntry, MessageQuery, PARAMETER_TABLES};
use castormon_core::outcome::Outcome;
use castormon_core::pagination::PageSummary;
use castormon_core::table::{LogPage, LogTable};
use castormon_core::window::WindowOptions;
use indexmap::IndexMap;

use crate::error::AppResult;
use crate::handlers::local_now;
use crate::query::Params;
use crate::response::DiagnosedResponse;
use crate::state::AppState;

/// GET /api/v1/dlf/lookups?instance=
///
/// Choice lists for the query form, keyed by list name.
pub async fn lookups(
    State(state): State<AppState>,
    params: Params,
) -> AppResult<impl IntoResponse> {
    let mut ctx = state.registry.context(params.instance())?;

    let mut lists: IndexMap<&'static str, Vec<LookupEntry>> = IndexMap::new();
    for lookup in Lookup::ALL {
        let rs = ctx.fetch(&lookup.query()).await?;
        lists.insert(lookup.key(), lookup.shape(&rs));
    }

    Ok(Json(DiagnosedResponse {
        data: lists,
        meta: ctx.diagnostics(),
    }))
}

/// GET /api/v1/dlf/messages?instance=...
///
/// One page of log messages. Runs the count query, then the page query,
/// then one query per parameter table when the parameters column is shown.
/// A window is mandatory; nothing matching yields `{"status":"no_data"}`.
pub async fn messages(
    State(state): State<AppState>,
    params: Params,
) -> AppResult<impl IntoResponse> {
    let window_opts = WindowOptions {
        drilldown_hours: state.config.drilldown_hours,
        fallback_minutes: None,
    };
    let query = MessageQuery::from_params(&params.0, &window_opts, state.config.default_page_size)?;

    let mut ctx = state.registry.context(params.instance())?;
    let dialect = ctx.dialect();

    let count = ctx.fetch(&query.compile_count(dialect)).await?;
    let total = count
        .value(0, "total")
        .as_i64()
        .map_or(0, |n| u64::try_from(n).unwrap_or(0));

    let outcome = if total == 0 {
        Outcome::NoData
    } else {
        let rs = ctx.fetch(&query.compile_page(dialect)).await?;
        let mut table = LogTable::assemble(&query.plan, &rs, query.with_parameters);

        if query.with_parameters && !table.is_empty() {
            let ids = table.ids();
            for parameter_table in PARAMETER_TABLES {
                let rs = ctx
                    .fetch(&query.compile_parameters(dialect, parameter_table, &ids))
                    .await?;
                table.attach_parameters(&rs);
            }
        }

        tracing::debug!(
            instance = %ctx.instance(),
            total,
            rows = table.len(),
            page = query.page.number(),
            "Assembled log page"
        );

        Outcome::Data(LogPage {
            window: query.window.describe(local_now()),
            summary: PageSummary::new(&query.page, table.len(), total),
            table,
        })
    };

    Ok(Json(DiagnosedResponse {
        data: outcome,
        meta: ctx.diagnostics(),
    }))
}
