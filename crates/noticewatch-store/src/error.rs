use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("timestamp out of range: {0} µs")]
    Timestamp(i64),

    #[error("{0}")]
    Other(String),
}
