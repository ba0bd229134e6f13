//! Loading attack records from the relational store
//!
//! The pipeline never opens a connection on its own: callers acquire a
//! source, hand it to the pipeline, and release it afterwards.

mod memory;
mod postgres;

pub use memory::MemorySource;
pub use postgres::PgAttackSource;

use crate::error::Result;
use crate::models::AttackRecord;

pub use async_trait::async_trait;

/// Fixed query issued once per run
pub const ATTACKS_QUERY: &str = "SELECT * FROM attacks";

/// Columns the loader requires in the query result
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const SERVICE_COLUMN: &str = "service";
pub const ATTACK_TYPE_COLUMN: &str = "attack_type";

/// Trait for attack record sources
#[async_trait]
pub trait AttackSource: Send {
    /// Fetch every row of the attacks table
    async fn fetch_attacks(&mut self) -> Result<Vec<AttackRecord>>;
}
