/// Database Module
///
/// The database layer of the adapter, split by concern:
/// - **Connection Management** (`connection.rs`): settings, lazy connect, transactions
/// - **Query Execution** (`query.rs`): prepared statements and result shapes
/// - **Values** (`value.rs`): bind arguments and fetched rows
///
/// All operations report failures through `AdapterError`, except a statement
/// that fails while executing, which comes back as `ExecOutcome::Failed`.
pub mod connection;
pub mod query;
pub mod value;

pub use connection::*;
pub use query::*;
pub use value::*;
