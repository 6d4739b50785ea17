//! Persistence gateway.
//!
//! One trait per aggregate ([`ChatStore`], [`MessageStore`], [`VoteStore`],
//! [`DocumentStore`]); [`SqliteStore`] implements all of them. Services are
//! generic over [`Store`] so tests and alternative backends can plug in.
//!
//! All trait methods use `impl Future` in their signatures, so no
//! `async-trait` boxing is needed on this hot path.

pub mod chat;
pub mod document;
pub mod message;
pub mod vote;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

pub use chat::ChatStore;
pub use document::DocumentStore;
pub use message::MessageStore;
pub use vote::VoteStore;

/// Everything the chat pipeline needs from storage.
pub trait Store: ChatStore + MessageStore + VoteStore + DocumentStore + Clone + Send + Sync + 'static {}

impl<T> Store for T where T: ChatStore + MessageStore + VoteStore + DocumentStore + Clone + Send + Sync + 'static {}

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` is a sqlx SQLite URL, e.g. `"sqlite://parley.db?mode=rwc"`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(url, "database ready");
        Ok(Self { pool })
    }

    /// A private in-memory database. A single connection that never expires
    /// keeps the data alive for the lifetime of the store.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

/// Timestamps are stored as fixed-width RFC 3339 strings so they sort
/// lexicographically.
pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        warn!(raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_owned(),
        source: Box::new(e),
    })
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

pub(crate) fn decode_enum<T: FromStr>(column: &str, raw: &str) -> Result<T, sqlx::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e: T::Err| sqlx::Error::ColumnDecode {
        index: column.to_owned(),
        source: Box::new(e),
    })
}
