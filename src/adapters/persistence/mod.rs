use sqlx::PgPool;

use crate::app_error::AppError;

pub mod payment;
pub mod subscription;
pub mod webhook_event;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::InvalidInput(format!(
                    "Duplicate record ({})",
                    db_err.constraint().unwrap_or("unique constraint")
                ))
            }
            // A payment raced ahead of its subscription row; 404 makes the provider retry.
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found("Subscription not found")
            }
            _ => {
                // Details stay in the log; the client gets a generic message.
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
