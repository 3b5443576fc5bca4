//! Declarative description of the four target tables.
//!
//! Each table is an ordered list of fields with a declared kind and a policy
//! for values that are missing or fail to parse. The cleaner walks these
//! definitions instead of hard-coding per-table rules.

use crate::error::{ProcessingError, Result};
use crate::models::Value;
use crate::utils::constants::*;
use crate::utils::{parse_integer, parse_timestamp};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { max_len: usize },
    Integer { min: Option<i64> },
    Timestamp,
}

/// Why a raw cell could not become a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParseFailure {
    Missing,
    Malformed,
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Integer(i32),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Text(s) => Value::Text(s.to_string()),
            FieldDefault::Integer(n) => Value::Integer(n),
        }
    }
}

/// What happens to a row whose field fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnInvalid {
    DropRow,
    Default(FieldDefault),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub on_invalid: OnInvalid,
}

impl FieldSpec {
    const fn text(name: &'static str, max_len: usize, on_invalid: OnInvalid) -> Self {
        Self {
            name,
            kind: FieldKind::Text { max_len },
            on_invalid,
        }
    }

    const fn integer(name: &'static str, min: Option<i64>, on_invalid: OnInvalid) -> Self {
        Self {
            name,
            kind: FieldKind::Integer { min },
            on_invalid,
        }
    }

    const fn timestamp(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Timestamp,
            on_invalid: OnInvalid::DropRow,
        }
    }

    pub fn is_required(&self) -> bool {
        self.on_invalid == OnInvalid::DropRow
    }

    pub fn max_len(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Text { max_len } => Some(max_len),
            _ => None,
        }
    }

    /// Parse an already NA-normalized cell.
    ///
    /// Text is never malformed, it is only missing; an over-long text is
    /// returned as-is and truncated later.
    pub fn parse(&self, raw: Option<&str>) -> std::result::Result<Value, ParseFailure> {
        let raw = raw.ok_or(ParseFailure::Missing)?;
        match self.kind {
            FieldKind::Text { .. } => Ok(Value::Text(raw.to_string())),
            FieldKind::Integer { min } => {
                let n = parse_integer(raw).ok_or(ParseFailure::Malformed)?;
                if min.is_some_and(|m| n < m) {
                    return Err(ParseFailure::OutOfRange);
                }
                i32::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| ParseFailure::OutOfRange)
            }
            FieldKind::Timestamp => parse_timestamp(raw)
                .map(Value::Timestamp)
                .ok_or(ParseFailure::Malformed),
        }
    }

    pub fn sql_type(&self) -> String {
        match self.kind {
            FieldKind::Text { max_len } => format!("VARCHAR({})", max_len),
            FieldKind::Integer { .. } => "INTEGER".to_string(),
            FieldKind::Timestamp => "TIMESTAMP".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub parent_table: &'static str,
    pub parent_column: &'static str,
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Positions of the key columns in field order.
    pub fn key_positions(&self) -> Vec<usize> {
        self.key.iter().filter_map(|k| self.position(k)).collect()
    }
}

const NON_NEGATIVE: Option<i64> = Some(0);
const ZERO: OnInvalid = OnInvalid::Default(FieldDefault::Integer(0));
const EMPTY: OnInvalid = OnInvalid::Default(FieldDefault::Text(""));

pub static ADDRESS: TableSchema = TableSchema {
    name: ADDRESS_TABLE,
    fields: &[
        FieldSpec::text("address", MAX_ADDRESS_LEN, OnInvalid::DropRow),
        FieldSpec::integer("flats", NON_NEGATIVE, ZERO),
        FieldSpec::integer("entrances", NON_NEGATIVE, ZERO),
        FieldSpec::integer("floors", NON_NEGATIVE, ZERO),
    ],
    key: &["address"],
    foreign_keys: &[],
};

pub static CLIENT: TableSchema = TableSchema {
    name: CLIENT_TABLE,
    fields: &[
        FieldSpec::text("client_id", MAX_ID_LEN, OnInvalid::DropRow),
        FieldSpec::text("address", MAX_ADDRESS_LEN, OnInvalid::DropRow),
        FieldSpec::text(
            "gender",
            MAX_GENDER_LEN,
            OnInvalid::Default(FieldDefault::Text(UNKNOWN_GENDER)),
        ),
        FieldSpec::text("age_range", MAX_LABEL_LEN, EMPTY),
    ],
    key: &["client_id"],
    foreign_keys: &[ForeignKey {
        column: "address",
        parent_table: ADDRESS_TABLE,
        parent_column: "address",
    }],
};

pub static PACKAGE_CHANNEL: TableSchema = TableSchema {
    name: PACKAGE_CHANNEL_TABLE,
    fields: &[
        FieldSpec::text("pack_name", MAX_LABEL_LEN, EMPTY),
        FieldSpec::integer("ch_id", None, OnInvalid::DropRow),
    ],
    key: &["ch_id"],
    foreign_keys: &[],
};

pub static EPG_STAT: TableSchema = TableSchema {
    name: EPG_STAT_TABLE,
    fields: &[
        FieldSpec::text("client_id", MAX_ID_LEN, OnInvalid::DropRow),
        FieldSpec::text("device_id", MAX_ID_LEN, EMPTY),
        FieldSpec::timestamp("time_ch"),
        FieldSpec::integer("ch_id", None, OnInvalid::DropRow),
        FieldSpec::text("epg_name", MAX_EPG_NAME_LEN, EMPTY),
        FieldSpec::timestamp("time_epg"),
        FieldSpec::timestamp("time_to_epg"),
        FieldSpec::integer("duration", NON_NEGATIVE, OnInvalid::DropRow),
        FieldSpec::text("category", MAX_LABEL_LEN, EMPTY),
        FieldSpec::text("subcategory", MAX_LABEL_LEN, EMPTY),
    ],
    key: &["client_id", "device_id", "time_ch"],
    foreign_keys: &[
        ForeignKey {
            column: "client_id",
            parent_table: CLIENT_TABLE,
            parent_column: "client_id",
        },
        ForeignKey {
            column: "ch_id",
            parent_table: PACKAGE_CHANNEL_TABLE,
            parent_column: "ch_id",
        },
    ],
};

/// The four tables in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableKind {
    Address,
    Client,
    PackageChannel,
    EpgStat,
}

impl TableKind {
    pub const LOAD_ORDER: [TableKind; 4] = [
        TableKind::Address,
        TableKind::Client,
        TableKind::PackageChannel,
        TableKind::EpgStat,
    ];

    pub fn schema(&self) -> &'static TableSchema {
        match self {
            TableKind::Address => &ADDRESS,
            TableKind::Client => &CLIENT,
            TableKind::PackageChannel => &PACKAGE_CHANNEL,
            TableKind::EpgStat => &EPG_STAT,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.schema().name
    }

    pub fn from_table_name(name: &str) -> Result<Self> {
        TableKind::LOAD_ORDER
            .into_iter()
            .find(|kind| kind.table_name() == name)
            .ok_or_else(|| ProcessingError::UnknownTable(name.to_string()))
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
