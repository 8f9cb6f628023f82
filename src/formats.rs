use serde::{Deserialize, Serialize};

/// Response wrapper shared by every catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInfo {
    #[serde(rename = "oid", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<ChapterRef>,
    /// Raw `data` object as returned by the API; this is what `info.json` holds.
    #[serde(skip)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    #[serde(rename = "oid", alias = "id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageList {
    pub pages: Vec<String>,
}

impl PageList {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
