use std::sync::Arc;

use models::{Backup, BackupData, Note, Setup, Tag};
use serde::Serialize;
use tracing::info;

use crate::{
    error::Error,
    repository::{AnnotationRepository, TradeRepository},
    store::KvStore,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub trades: usize,
    pub notes: usize,
    pub setups: usize,
    pub tags: usize,
}

#[derive(Clone)]
pub struct BackupService {
    trades: TradeRepository,
    notes: AnnotationRepository<Note>,
    setups: AnnotationRepository<Setup>,
    tags: AnnotationRepository<Tag>,
}

impl BackupService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        return Self {
            trades: TradeRepository::new(store.clone()),
            notes: AnnotationRepository::new(store.clone()),
            setups: AnnotationRepository::new(store.clone()),
            tags: AnnotationRepository::new(store),
        };
    }

    pub async fn export(&self) -> Result<Backup, Error> {
        let data = BackupData {
            trades: self.trades.list().await?,
            notes: self.notes.list().await?,
            setups: self.setups.list().await?,
            tags: self.tags.list().await?,
        };
        info!(
            "Exporting {} trades, {} notes, {} setups, {} tags",
            data.trades.len(),
            data.notes.len(),
            data.setups.len(),
            data.tags.len()
        );
        return Ok(Backup::new(data));
    }

    /// Upserts every record of a validated backup. Existing records that are
    /// not in the backup are left alone.
    pub async fn restore(&self, backup: Backup) -> Result<RestoreSummary, Error> {
        backup.validate()?;
        let data = backup.data;
        let mut summary = RestoreSummary::default();

        for trade in &data.trades {
            self.trades.upsert(trade).await?;
            summary.trades += 1;
        }
        for note in data.notes {
            self.notes.upsert(note).await?;
            summary.notes += 1;
        }
        for setup in data.setups {
            self.setups.upsert(setup).await?;
            summary.setups += 1;
        }
        for tag in data.tags {
            self.tags.upsert(tag).await?;
            summary.tags += 1;
        }
        info!("Restored backup: {summary:?}");
        return Ok(summary);
    }
}
