mod engine;
mod identifier;
mod schema;
mod summary;

pub use engine::{ComparisonContext, ComparisonRequest, Stage, Verdict};
pub use identifier::TableIdentifier;
pub use schema::{Column, ColumnChange, SchemaDiff, TableSchema};
pub use summary::{MismatchDetail, MismatchSummary, RECORDS_FIELD};
