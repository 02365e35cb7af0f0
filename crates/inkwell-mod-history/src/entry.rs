/// Core types for version entries and the views built from them.
use serde::{Deserialize, Serialize};

/// Identity of the person committing an edit.
///
/// Copied into every entry at commit time, so later profile changes never
/// rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    pub uid: String,
    pub username: String,
    pub nickname: String,
}

impl Author {
    pub fn new(
        uid: impl Into<String>,
        username: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            username: username.into(),
            nickname: nickname.into(),
        }
    }
}

/// One record in a document's version log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Milliseconds since the Unix epoch. Unique and increasing per document.
    pub timestamp: u64,
    pub author: Author,
    pub commit_message: String,
    /// True if `payload` is full content, false if it is an encoded patch
    /// against the previous entry's content.
    pub is_snapshot: bool,
    pub payload: String,
}

impl VersionEntry {
    /// Display identifier `"{uid}:{timestamp}:{message}"`. Never used for lookup.
    pub fn version_name(&self) -> String {
        version_name(&self.author.uid, self.timestamp, &self.commit_message)
    }

    /// Metadata view of this entry, without the payload.
    pub fn summary(&self) -> VersionSummary {
        EntryMeta::from(self).summary()
    }
}

/// An entry's fields minus its payload.
///
/// Stored next to every entry so listings and stats never decode content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub timestamp: u64,
    pub author: Author,
    pub commit_message: String,
    pub is_snapshot: bool,
}

impl From<&VersionEntry> for EntryMeta {
    fn from(entry: &VersionEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            author: entry.author.clone(),
            commit_message: entry.commit_message.clone(),
            is_snapshot: entry.is_snapshot,
        }
    }
}

impl EntryMeta {
    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            version_name: version_name(&self.author.uid, self.timestamp, &self.commit_message),
            timestamp: self.timestamp,
            commit_message: self.commit_message.clone(),
            author_uid: self.author.uid.clone(),
            username: self.author.username.clone(),
            nickname: self.author.nickname.clone(),
            is_snapshot: self.is_snapshot,
        }
    }
}

fn version_name(uid: &str, timestamp: u64, message: &str) -> String {
    format!("{uid}:{timestamp}:{message}")
}

/// Cached state of a document: its current content and the version it
/// was reconstructed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHead {
    pub content: String,
    pub latest: u64,
}

/// Entry metadata as listed in history pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version_name: String,
    pub timestamp: u64,
    pub commit_message: String,
    pub author_uid: String,
    pub username: String,
    pub nickname: String,
    pub is_snapshot: bool,
}

/// A version together with its reconstructed content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionContent {
    #[serde(flatten)]
    pub summary: VersionSummary,
    pub content: String,
}

/// Sort direction for history listings. Sorting is always by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Distinct editor listed in history stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Editor {
    pub uid: String,
    pub username: String,
    pub nickname: String,
}

impl From<&Author> for Editor {
    fn from(author: &Author) -> Self {
        Self {
            uid: author.uid.clone(),
            username: author.username.clone(),
            nickname: author.nickname.clone(),
        }
    }
}

/// Aggregate figures over a document's whole log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_edits: usize,
    /// All timestamps, ascending.
    pub edit_timestamps: Vec<u64>,
    /// Deduplicated by uid, in order of first appearance.
    pub editors: Vec<Editor>,
}

/// One page of a document's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub versions: Vec<VersionSummary>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub stats: HistoryStats,
}

/// Result of committing an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub doc_id: String,
    pub version_name: String,
    pub timestamp: u64,
    pub is_snapshot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub doc_id: String,
    pub deleted_versions_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquashOutcome {
    pub doc_id: String,
    pub compressed_versions_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> VersionEntry {
        VersionEntry {
            timestamp: 1_700_000_000_123,
            author: Author::new("u-42", "ada", "Ada L."),
            commit_message: "fix typo".to_string(),
            is_snapshot: false,
            payload: "{}".to_string(),
        }
    }

    #[test]
    fn test_version_name_format() {
        let entry = sample_entry();
        assert_eq!(entry.version_name(), "u-42:1700000000123:fix typo");
    }

    #[test]
    fn test_version_name_with_empty_message() {
        let mut entry = sample_entry();
        entry.commit_message.clear();
        assert_eq!(entry.version_name(), "u-42:1700000000123:");
    }

    #[test]
    fn test_entry_bincode_roundtrip() {
        let entry = sample_entry();
        let bytes = bincode::serialize(&entry).expect("serialize");
        let decoded: VersionEntry = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_value(sample_entry().summary()).expect("json");
        assert_eq!(json["versionName"], "u-42:1700000000123:fix typo");
        assert_eq!(json["authorUid"], "u-42");
        assert_eq!(json["username"], "ada");
        assert_eq!(json["nickname"], "Ada L.");
        assert_eq!(json["isSnapshot"], false);
        assert_eq!(json["commitMessage"], "fix typo");
    }

    #[test]
    fn test_version_content_flattens_summary() {
        let content = VersionContent {
            summary: sample_entry().summary(),
            content: "body".to_string(),
        };
        let json = serde_json::to_value(&content).expect("json");
        assert_eq!(json["content"], "body");
        assert_eq!(json["timestamp"], 1_700_000_000_123u64);
    }

    #[test]
    fn test_outcomes_serialize_camel_case() {
        let reset = ResetOutcome {
            doc_id: "post".to_string(),
            deleted_versions_count: 2,
        };
        let json = serde_json::to_value(&reset).expect("json");
        assert_eq!(json["docId"], "post");
        assert_eq!(json["deletedVersionsCount"], 2);

        let squash = SquashOutcome {
            doc_id: "post".to_string(),
            compressed_versions_count: 1,
        };
        let json = serde_json::to_value(&squash).expect("json");
        assert_eq!(json["compressedVersionsCount"], 1);
    }

    #[test]
    fn test_sort_order_parse() {
        let order: SortOrder = serde_json::from_str("\"asc\"").expect("parse");
        assert_eq!(order, SortOrder::Asc);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }
}
