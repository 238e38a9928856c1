use thiserror::Error;

/// Local store errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] sqlx::Error),

    #[error("Query build error: {0}")]
    QueryBuildError(#[from] sea_query::error::Error),

    #[error("Bridge I/O error: {0}")]
    BridgeIoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Local endpoint closed the bridge")]
    BridgeClosed,

    #[error("Local endpoint error: {0}")]
    EndpointError(String),

    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("Row decode error in {table}: {message}")]
    DecodeError { table: &'static str, message: String },

    #[error(transparent)]
    CoreError(#[from] darkroom_core::error::CoreError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
