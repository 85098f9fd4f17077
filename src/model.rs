//! Records produced by the extractor and consumed by the planner.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const UNKNOWN_ID: &str = "unknown";
const UNKNOWN_TITLE: &str = "Unknown Title";

/// One video as reported by the extractor. Only the fields the planner needs
/// are typed; everything else yt-dlp reports stays in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    #[serde(default = "unknown_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn unknown_id() -> String {
    UNKNOWN_ID.to_owned()
}

impl VideoRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            duration: None,
            attributes: Map::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|title| !title.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
    }

    /// Page to hand back to the extractor for the full fetch. Flat listings
    /// usually carry it; otherwise it is rebuilt from the id.
    pub fn watch_url(&self) -> String {
        ["webpage_url", "url"]
            .iter()
            .filter_map(|key| self.attributes.get(*key).and_then(Value::as_str))
            .find(|url| url.starts_with("http://") || url.starts_with("https://"))
            .map(str::to_owned)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id))
    }
}

/// Ordered, null-free result of enumerating a channel or playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelListing {
    pub title: String,
    pub videos: Vec<VideoRecord>,
}

impl ChannelListing {
    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}
