use mediator::MediatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Stored data could not be decoded: {0}")]
    InvalidData(#[from] core_types::CoreError),

    #[error("A strategy named '{0}' already exists.")]
    DuplicateStrategy(String),

    #[error("The requested data was not found in the database.")]
    NotFound,
}

impl From<DbError> for MediatorError {
    fn from(err: DbError) -> Self {
        MediatorError::Database(Box::new(err))
    }
}
