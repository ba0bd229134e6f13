//! In-memory attack source for tests and embedding

use super::{async_trait, AttackSource};
use crate::error::Result;
use crate::models::AttackRecord;

/// Source that serves a fixed set of records
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<AttackRecord>,
    fetch_count: usize,
}

impl MemorySource {
    pub fn new(records: Vec<AttackRecord>) -> Self {
        Self {
            records,
            fetch_count: 0,
        }
    }

    /// Number of times the records were fetched
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }
}

#[async_trait]
impl AttackSource for MemorySource {
    async fn fetch_attacks(&mut self) -> Result<Vec<AttackRecord>> {
        self.fetch_count += 1;
        Ok(self.records.clone())
    }
}
