use serde::{Deserialize, Serialize};

/// Where the records of a run came from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DataSource {
    /// Parsed from the scraped page by the named strategy.
    Live { strategy: String },
    /// The page was fetched but no strategy produced records.
    Fallback,
    /// The page could not be fetched.
    Disconnected,
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, DataSource::Live { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message produced by a run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Outcome of one pipeline run, as shown to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub owner_id: String,
    pub connected: bool,
    pub last_update_millis: Option<i64>,
    pub source: DataSource,
    pub new_records: usize,
    pub retained: usize,
    pub persisted: bool,
    pub notices: Vec<Notice>,
}
