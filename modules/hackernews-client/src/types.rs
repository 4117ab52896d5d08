use serde::Deserialize;

/// Raw Firebase item payload, trimmed to the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub by: Option<String>,
    /// Unix seconds.
    pub time: Option<i64>,
    pub score: Option<i64>,
    /// Total comment count.
    pub descendants: Option<i64>,
    pub url: Option<String>,
}

/// A Firebase item confirmed to be a story, with its web discussion URL.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: i64,
    pub title: String,
    pub by: Option<String>,
    pub time: Option<i64>,
    pub score: Option<i64>,
    pub descendants: Option<i64>,
    pub url: Option<String>,
    pub hn_url: String,
}

impl Story {
    /// Filter and normalize a raw item down to a story we can use.
    pub fn from_item(item: Item) -> Option<Self> {
        if item.kind.as_deref() != Some("story") {
            return None;
        }
        Some(Story {
            hn_url: format!("https://news.ycombinator.com/item?id={}", item.id),
            id: item.id,
            title: item.title.unwrap_or_default(),
            by: item.by,
            time: item.time,
            score: item.score,
            descendants: item.descendants,
            url: item.url,
        })
    }
}
