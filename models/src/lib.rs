pub mod annotation;
pub mod backup;
pub mod coach;
pub mod cost;
pub mod kline;
pub mod trade;

pub use annotation::{Note, Setup, Tag};
pub use backup::{Backup, BackupData};
pub use coach::AiCoach;
pub use cost::{Cost, CostBuilder};
pub use kline::KlineData;
pub use trade::{ManualTrade, Side, Trade, TradeBuilder};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    ValidationError(#[from] garde::Report),

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error(transparent)]
    TradeBuilderError(#[from] trade::TradeBuilderError),

    #[error("Invalid backup: {0}")]
    InvalidBackup(String),
}
