use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: String,
    pub trade_id: Option<String>,
    pub text: String,
    #[serde(default = "chrono::Utc::now")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default = "chrono::Utc::now")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

/// Records stored as independent collections, keyed by `id`. An empty id is
/// replaced by a fresh one before storing.
pub trait Annotation {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn ensure_id(&mut self) -> &str {
        if self.id().is_empty() {
            self.set_id(uuid::Uuid::new_v4().to_string());
        }
        return self.id();
    }
}

impl Annotation for Note {
    const COLLECTION: &'static str = "notes";

    fn id(&self) -> &str {
        return &self.id;
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Annotation for Setup {
    const COLLECTION: &'static str = "setups";

    fn id(&self) -> &str {
        return &self.id;
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Annotation for Tag {
    const COLLECTION: &'static str = "tags";

    fn id(&self) -> &str {
        return &self.id;
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
