//! Durable storage for verification tasks, ownership results, and run
//! accounting.
//!
//! SQLite via `sqlx`, WAL mode for concurrent readers. All mutation goes
//! through the update APIs here: attempt counters stay monotonic and
//! terminal task states stay immutable because every transition is a
//! conditional UPDATE.

mod pool;
mod results;
mod runs;
mod schema;
mod tasks;

pub use pool::init_db_pool_with_path;
pub use results::ResultStore;
pub use runs::{insert_run_metadata, update_run_stats, RunMetadata, RunStats};
pub use schema::init_schema;
pub use tasks::TaskStore;
