use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid lease: {0}")]
    InvalidLease(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
