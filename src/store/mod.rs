pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Attachment, Bill, BillDraft};

/// Failure reported by the store. The display text is what users get to see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Erreur 404")]
    NotFound,
    #[error("Erreur 500")]
    Server,
    #[error("{0}")]
    Rejected(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            err => {
                log::error!("bill store failure: {err}");
                StoreError::Server
            }
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        log::error!("cannot write receipt: {err}");
        StoreError::Server
    }
}

/// Remote persistence of bills.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list(&self) -> Result<Vec<Bill>, StoreError>;

    /// Persists a new bill, storing `receipt` first when given so the created
    /// bill carries its `file_url`.
    async fn create(&self, draft: BillDraft, receipt: Option<Attachment>)
        -> Result<Bill, StoreError>;

    async fn update(
        &self,
        id: &str,
        draft: BillDraft,
        receipt: Option<Attachment>,
    ) -> Result<Bill, StoreError>;
}
