//! PostgreSQL attack source

use super::{
    async_trait, AttackSource, ATTACKS_QUERY, ATTACK_TYPE_COLUMN, SERVICE_COLUMN,
    TIMESTAMP_COLUMN,
};
use crate::error::Result;
use crate::models::{AttackRecord, EventTime};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Connection, Row};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Attack source backed by a single live PostgreSQL connection
pub struct PgAttackSource {
    conn: PgConnection,
}

impl PgAttackSource {
    /// Open a connection to the given database URL
    pub async fn connect(database_url: &str) -> Result<Self> {
        let conn = PgConnection::connect(database_url).await?;
        info!(
            database = %redact_url(database_url),
            "Connected to attack database"
        );
        Ok(Self { conn })
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: PgConnection) -> Self {
        Self { conn }
    }

    /// Close the connection. Close errors are logged, not returned, so this is
    /// safe to call on failure paths.
    pub async fn close(self) {
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "Failed to close database connection cleanly");
        } else {
            debug!("Database connection closed");
        }
    }
}

#[async_trait]
impl AttackSource for PgAttackSource {
    async fn fetch_attacks(&mut self) -> Result<Vec<AttackRecord>> {
        let start = Instant::now();
        let rows = sqlx::query(ATTACKS_QUERY).fetch_all(&mut self.conn).await?;

        let records = rows
            .iter()
            .map(decode_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        debug!(
            rows = records.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Fetched attack rows"
        );
        Ok(records)
    }
}

fn decode_row(row: &PgRow) -> std::result::Result<AttackRecord, sqlx::Error> {
    Ok(AttackRecord {
        timestamp: decode_timestamp(row)?,
        service: row.try_get::<Option<String>, _>(SERVICE_COLUMN)?,
        attack_type: row.try_get::<Option<String>, _>(ATTACK_TYPE_COLUMN)?,
    })
}

/// Accept TIMESTAMP, TIMESTAMPTZ or text columns
fn decode_timestamp(row: &PgRow) -> std::result::Result<Option<EventTime>, sqlx::Error> {
    match row.try_get::<Option<NaiveDateTime>, _>(TIMESTAMP_COLUMN) {
        Ok(value) => return Ok(value.map(EventTime::Parsed)),
        Err(sqlx::Error::ColumnDecode { .. }) => {}
        Err(e) => return Err(e),
    }

    match row.try_get::<Option<DateTime<Utc>>, _>(TIMESTAMP_COLUMN) {
        Ok(value) => return Ok(value.map(|dt| EventTime::Parsed(dt.naive_utc()))),
        Err(sqlx::Error::ColumnDecode { .. }) => {}
        Err(e) => return Err(e),
    }

    row.try_get::<Option<String>, _>(TIMESTAMP_COLUMN)
        .map(|value| value.map(EventTime::Text))
}

/// Strip credentials from a connection URL for logging
pub(crate) fn redact_url(url: &str) -> &str {
    url.rsplit('@').next().unwrap_or("***")
}
