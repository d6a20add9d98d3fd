mod adapter;
mod connection;
mod executor;
mod types;

pub use adapter::{Connection, SqlServerConnection, open};
pub use connection::{build_config, describe_target};
pub use executor::{TdsClient, collect_result_sets, run_query};
pub use types::{FromRow, ResultColumn, ResultSet, Row, Value, format_number};
