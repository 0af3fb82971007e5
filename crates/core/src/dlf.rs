//! The DLF message catalogue and the log viewer's queries.
//!
//! `dlf_messages` holds one row per log message. Display columns resolve
//! through small lookup tables (severities, facilities, host maps, message
//! texts) or through the partitioned request-id and tape-id tables, which
//! receive the time window on their own `timestamp` column. Message
//! parameters live in two one-to-many tables, one for string and one for
//! numeric values.

use serde::Serialize;

use crate::dialect::Dialect;
use crate::error::CoreError;
use crate::filter::{
    Catalogue, ColumnSelection, ColumnSpec, FilterPlan, FilterSpec, JoinSpec, MatchMode,
    ValueKind,
};
use crate::pagination::Page;
use crate::params::RequestParams;
use crate::row::ResultSet;
use crate::sql::{CompiledQuery, SqlBuilder};
use crate::window::{TimeWindow, WindowOptions};

/// Tables holding message parameters, queried once each per page.
pub const PARAMETER_TABLES: [&str; 2] = ["dlf_str_param_values", "dlf_num_param_values"];

// ---------------------------------------------------------------------------
// Joins
// ---------------------------------------------------------------------------

static SEVERITIES: JoinSpec = JoinSpec {
    alias: "t2",
    table: "dlf_severities",
    on: "t1.severity = t2.sev_no",
    windowed: false,
    one_to_many: false,
};

static FACILITIES: JoinSpec = JoinSpec {
    alias: "t3",
    table: "dlf_facilities",
    on: "t1.facility = t3.fac_no",
    windowed: false,
    one_to_many: false,
};

static HOSTS: JoinSpec = JoinSpec {
    alias: "t4",
    table: "dlf_host_map",
    on: "t1.hostid = t4.hostid",
    windowed: false,
    one_to_many: false,
};

static MSG_TEXTS: JoinSpec = JoinSpec {
    alias: "t5",
    table: "dlf_msg_texts",
    on: "t1.facility = t5.fac_no AND t1.msg_no = t5.msg_no",
    windowed: false,
    one_to_many: false,
};

static REQIDS: JoinSpec = JoinSpec {
    alias: "t6",
    table: "dlf_reqid_map",
    on: "t1.id = t6.id",
    windowed: true,
    one_to_many: false,
};

static NSHOSTS: JoinSpec = JoinSpec {
    alias: "t7",
    table: "dlf_nshost_map",
    on: "t1.nshostid = t7.nshostid",
    windowed: false,
    one_to_many: false,
};

static TAPES: JoinSpec = JoinSpec {
    alias: "t8",
    table: "dlf_tape_ids",
    on: "t1.id = t8.id",
    windowed: true,
    one_to_many: false,
};

static STR_PARAMS: JoinSpec = JoinSpec {
    alias: "t9",
    table: "dlf_str_param_values",
    on: "t1.id = t9.id",
    windowed: false,
    one_to_many: true,
};

static NUM_PARAMS: JoinSpec = JoinSpec {
    alias: "t10",
    table: "dlf_num_param_values",
    on: "t1.id = t10.id",
    windowed: false,
    one_to_many: true,
};

static REQID_JOINS: [&JoinSpec; 1] = [&REQIDS];
static TAPE_JOINS: [&JoinSpec; 1] = [&TAPES];
static PARAM_JOINS: [&JoinSpec; 2] = [&STR_PARAMS, &NUM_PARAMS];

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// Projected ahead of every display column, in this order.
pub const MANDATORY_FIELDS: &[&str] = &[
    "t1.id",
    "t1.timestamp",
    "t1.timeusec",
    "t1.severity",
    "t1.facility",
    "t1.hostid",
    "t1.nshostid",
];

const fn exact(param: &'static str, field: &'static [&'static str]) -> FilterSpec {
    FilterSpec {
        param,
        aliases: &[],
        fields: field,
        mode: MatchMode::Exact,
        kind: ValueKind::Integer,
        multi: false,
        sentinel: None,
        joins: &[],
    }
}

const fn wildcard(
    param: &'static str,
    field: &'static [&'static str],
    joins: &'static [&'static JoinSpec],
) -> FilterSpec {
    FilterSpec {
        param,
        aliases: &[],
        fields: field,
        mode: MatchMode::Wildcard,
        kind: ValueKind::Text,
        multi: false,
        sentinel: None,
        joins,
    }
}

pub static CATALOGUE: Catalogue = Catalogue {
    from: "dlf_messages t1",
    time_field: "t1.timestamp",
    mandatory: MANDATORY_FIELDS,
    columns: &[
        ColumnSpec {
            name: "severity",
            label: "Severity",
            field: "t2.sev_name",
            join: Some(&SEVERITIES),
            link: None,
        },
        ColumnSpec {
            name: "facility",
            label: "Facility",
            field: "t3.fac_name",
            join: Some(&FACILITIES),
            link: Some("facility"),
        },
        ColumnSpec {
            name: "hostname",
            label: "Hostname",
            field: "t4.hostname",
            join: Some(&HOSTS),
            link: Some("hostid"),
        },
        ColumnSpec {
            name: "msgtext",
            label: "Message Text",
            field: "t5.msg_text",
            join: Some(&MSG_TEXTS),
            link: None,
        },
        ColumnSpec {
            name: "pid",
            label: "Process ID",
            field: "t1.pid",
            join: None,
            link: Some("pid"),
        },
        ColumnSpec {
            name: "tid",
            label: "Thread ID",
            field: "t1.tid",
            join: None,
            link: None,
        },
        ColumnSpec {
            name: "reqid",
            label: "Request ID",
            field: "t1.reqid",
            join: None,
            link: Some("reqid"),
        },
        ColumnSpec {
            name: "subreqid",
            label: "Sub Request ID",
            field: "t6.subreqid",
            join: Some(&REQIDS),
            link: Some("subreqid"),
        },
        ColumnSpec {
            name: "nshostname",
            label: "NS Host",
            field: "t7.nshostname",
            join: Some(&NSHOSTS),
            link: Some("nshostid"),
        },
        ColumnSpec {
            name: "nsfileid",
            label: "NS File ID",
            field: "t1.nsfileid",
            join: None,
            link: Some("nsfileid"),
        },
        ColumnSpec {
            name: "tapevid",
            label: "Tape VID",
            field: "t8.tapevid",
            join: Some(&TAPES),
            link: Some("tapevid"),
        },
    ],
    filters: &[
        FilterSpec {
            param: "severity",
            aliases: &[],
            fields: &["t1.severity"],
            mode: MatchMode::Exact,
            kind: ValueKind::Integer,
            multi: true,
            sentinel: None,
            joins: &[],
        },
        exact("facility", &["t1.facility"]),
        FilterSpec {
            aliases: &["hostname"],
            ..exact("hostid", &["t1.hostid"])
        },
        FilterSpec {
            aliases: &["nshostname"],
            ..exact("nshostid", &["t1.nshostid"])
        },
        FilterSpec {
            aliases: &["msgtext"],
            sentinel: Some("-1"),
            ..exact("msg_no", &["t1.msg_no"])
        },
        exact("pid", &["t1.pid"]),
        exact("tid", &["t1.tid"]),
        wildcard("reqid", &["t1.reqid"], &[]),
        wildcard("subreqid", &["t6.subreqid"], &REQID_JOINS),
        wildcard("tapevid", &["t8.tapevid"], &TAPE_JOINS),
        wildcard("nsfileid", &["t1.nsfileid"], &[]),
        wildcard(
            "paramname",
            &["t9.name", "t10.name"],
            &PARAM_JOINS,
        ),
        wildcard(
            "paramvalue",
            &["t9.value", "t10.value"],
            &PARAM_JOINS,
        ),
    ],
};

// ---------------------------------------------------------------------------
// Message query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

impl SortOrder {
    pub fn from_params(params: &RequestParams) -> Result<Self, CoreError> {
        match params.get("sort") {
            None | Some("tdesc") => Ok(SortOrder::Descending),
            Some("tasc") => Ok(SortOrder::Ascending),
            Some(other) => Err(CoreError::invalid(format!(
                "sort must be tdesc or tasc, got '{other}'"
            ))),
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            SortOrder::Descending => "t1.timestamp DESC, t1.timeusec DESC",
            SortOrder::Ascending => "t1.timestamp ASC, t1.timeusec ASC",
        }
    }
}

/// A fully resolved log viewer request.
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub plan: FilterPlan,
    pub window: TimeWindow,
    pub page: Page,
    pub sort: SortOrder,
    /// Whether the nested parameters column is wanted.
    pub with_parameters: bool,
}

impl MessageQuery {
    pub fn from_params(
        params: &RequestParams,
        window_opts: &WindowOptions,
        default_page_size: u32,
    ) -> Result<Self, CoreError> {
        let selection = ColumnSelection::from_params(params, &CATALOGUE);
        let with_parameters = selection == ColumnSelection::Default || params.is_on("col_params");
        Ok(Self {
            plan: FilterPlan::compile(&CATALOGUE, params, &selection)?,
            window: TimeWindow::from_params(params, window_opts)?,
            page: Page::from_params(params, default_page_size)?,
            sort: SortOrder::from_params(params)?,
            with_parameters,
        })
    }

    fn filtered(&self, dialect: Dialect, projection: &str) -> CompiledQuery {
        let mut b = SqlBuilder::new(dialect);
        b.push("SELECT ").push(projection);
        self.plan.render_from(&mut b, &self.window);
        self.plan.render_where(&mut b, &self.window);
        b.build()
    }

    /// One page of messages, newest first unless `sort=tasc`.
    pub fn compile_page(&self, dialect: Dialect) -> CompiledQuery {
        let select = self.plan.select_list();
        let projection = if self.plan.fans_out() {
            format!("DISTINCT {select}")
        } else {
            select
        };
        let inner = self.filtered(dialect, &projection);
        dialect.paginate(inner, self.sort.order_by(), &self.page)
    }

    /// Total number of matching messages.
    pub fn compile_count(&self, dialect: Dialect) -> CompiledQuery {
        self.filtered(dialect, "COUNT(DISTINCT t1.id) AS total")
    }

    /// Parameters of the given messages from one parameter table.
    ///
    /// Parameter tables are partitioned like `dlf_messages`, so the same
    /// window is applied to their `timestamp` column.
    pub fn compile_parameters(&self, dialect: Dialect, table: &str, ids: &[i64]) -> CompiledQuery {
        let mut b = SqlBuilder::new(dialect);
        b.push("SELECT id, name, value FROM ").push(table);
        b.and_where().push("id IN (");
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_bind(*id);
        }
        b.push(")");
        if self.window.is_bounded() {
            b.and_where();
            self.window.render(&mut b, "timestamp");
        }
        b.push(" ORDER BY id");
        b.build()
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Lists the query form offers as choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Severities,
    Facilities,
    Hosts,
    NsHosts,
    MessageTexts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupEntry {
    pub id: i64,
    pub name: String,
    /// Owning facility, for message texts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<i64>,
}

impl Lookup {
    pub const ALL: [Lookup; 5] = [
        Lookup::Severities,
        Lookup::Facilities,
        Lookup::Hosts,
        Lookup::NsHosts,
        Lookup::MessageTexts,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Lookup::Severities => "severities",
            Lookup::Facilities => "facilities",
            Lookup::Hosts => "hosts",
            Lookup::NsHosts => "nshosts",
            Lookup::MessageTexts => "msgtexts",
        }
    }

    pub fn query(&self) -> CompiledQuery {
        CompiledQuery::plain(match self {
            Lookup::Severities => {
                "SELECT sev_no AS id, sev_name AS name FROM dlf_severities ORDER BY sev_no ASC"
            }
            Lookup::Facilities => {
                "SELECT fac_no AS id, fac_name AS name FROM dlf_facilities ORDER BY UPPER(fac_name)"
            }
            Lookup::Hosts => {
                "SELECT hostid AS id, hostname AS name FROM dlf_host_map ORDER BY UPPER(hostname)"
            }
            Lookup::NsHosts => {
                "SELECT nshostid AS id, nshostname AS name FROM dlf_nshost_map ORDER BY UPPER(nshostname)"
            }
            Lookup::MessageTexts => {
                "SELECT msg_no AS id, msg_text AS name, fac_no AS facility FROM dlf_msg_texts \
                 ORDER BY fac_no, UPPER(msg_text)"
            }
        })
    }

    /// Rows with a null id or name are skipped.
    pub fn shape(&self, rs: &ResultSet) -> Vec<LookupEntry> {
        (0..rs.len())
            .filter_map(|i| {
                let id = rs.value(i, "id").as_i64()?;
                let name = rs.value(i, "name").as_text()?;
                let facility = match self {
                    Lookup::MessageTexts => rs.value(i, "facility").as_i64(),
                    _ => None,
                };
                Some(LookupEntry { id, name, facility })
            })
            .collect()
    }
}
