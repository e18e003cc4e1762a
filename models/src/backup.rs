use serde::{Deserialize, Serialize};

use crate::{Error, Note, Setup, Tag, Trade};

pub const APP_NAME: &str = "PipPaper";
pub const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub version: u32,
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub app: String,
    pub data: BackupData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupData {
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub setups: Vec<Setup>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Backup {
    pub fn new(data: BackupData) -> Self {
        return Self {
            version: BACKUP_VERSION,
            exported_at: chrono::Utc::now(),
            app: APP_NAME.to_owned(),
            data,
        };
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.app != APP_NAME {
            return Err(Error::InvalidBackup(format!(
                "expected app '{APP_NAME}', found '{}'",
                self.app
            )));
        }
        if self.version > BACKUP_VERSION {
            return Err(Error::InvalidBackup(format!(
                "version {} is newer than supported version {BACKUP_VERSION}",
                self.version
            )));
        }
        return Ok(());
    }
}
