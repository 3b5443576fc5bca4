pub mod schema;
pub mod table;
pub mod value;
pub mod viewing;

pub use schema::{
    FieldDefault, FieldKind, FieldSpec, ForeignKey, OnInvalid, ParseFailure, TableKind,
    TableSchema, ADDRESS, CLIENT, EPG_STAT, PACKAGE_CHANNEL,
};
pub use table::{CleanedTable, RawTable};
pub use value::{KeySet, Value};
pub use viewing::ViewingRecord;
