use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Trade {0} not found")]
    NotFound(String),

    #[error(transparent)]
    StoreError(#[from] StoreError),

    #[error(transparent)]
    ProviderError(#[from] provider_api::Error),

    #[error(transparent)]
    ModelError(#[from] models::Error),

    #[error(transparent)]
    CsvError(#[from] csv::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}
