/// History service: the public face of the engine.
///
/// Lists history, serves versioned content, records edits, and rewrites
/// history by reset (drop everything after a version) or squash (fold
/// everything up to a version into one snapshot). Writes to one document are
/// serialized by a per-document lock; reads run against redb snapshots and
/// never wait on writers.
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::clock::{self, Clock, SystemClock};
use crate::codec;
use crate::config::HistoryConfig;
use crate::entry::{
    Author, CommitReceipt, DocumentHead, HistoryPage, ResetOutcome, SortOrder, SquashOutcome,
    VersionContent, VersionEntry,
};
use crate::error::{HistoryError, Result};
use crate::locks::DocumentLocks;
use crate::log::{validate_doc_id, VersionLog};
use crate::policy::{CadenceInput, SnapshotPolicy};
use crate::reconstruct::{self, ContentReconstructor};

/// Prune idle document locks once the registry grows past this size.
const LOCK_REGISTRY_SOFT_CAP: usize = 1_024;

/// Parameters of a history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// 1-based page number.
    pub page: usize,
    /// `None` uses the configured default.
    pub page_size: Option<usize>,
    pub sort_order: SortOrder,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: None,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Outcome of a full-log consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub doc_id: String,
    pub entries: usize,
    pub snapshots: usize,
    pub latest: Option<u64>,
    /// Whether the cached current content matches the newest version.
    pub head_consistent: bool,
}

/// Orchestrates reads and writes of post history.
pub struct HistoryService {
    log: Arc<VersionLog>,
    config: HistoryConfig,
    policy: Box<dyn SnapshotPolicy>,
    clock: Arc<dyn Clock>,
    locks: DocumentLocks,
}

impl std::fmt::Debug for HistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryService")
            .field("config", &self.config)
            .field("locked_documents", &self.locks.len())
            .finish()
    }
}

impl HistoryService {
    /// Creates a service over an open log, using the config's snapshot
    /// cadence and the system clock.
    pub fn new(log: Arc<VersionLog>, config: HistoryConfig) -> Self {
        Self {
            log,
            policy: Box::new(config.cadence()),
            config,
            clock: Arc::new(SystemClock),
            locks: DocumentLocks::new(),
        }
    }

    /// Opens the log in `config.data_dir` and creates a service over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: HistoryConfig) -> Result<Self> {
        let log = VersionLog::open(&config.data_dir)?;
        Ok(Self::new(log, config))
    }

    /// Replaces the snapshot cadence policy.
    pub fn with_policy(mut self, policy: impl SnapshotPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replaces the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying log, for read-only inspection.
    ///
    /// Mutations stay inside the service, which keeps the cached content in
    /// step with the log:
    ///
    /// ```compile_fail
    /// # fn tamper(svc: &inkwell_mod_history::HistoryService) {
    /// let writer = svc.log().write();
    /// # }
    /// ```
    pub fn log(&self) -> &Arc<VersionLog> {
        &self.log
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// One page of version metadata plus stats over the whole log.
    ///
    /// A document that was never edited yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn get_history(&self, doc_id: &str, query: &HistoryQuery) -> Result<HistoryPage> {
        let page_size = self.config.page_size(query.page_size);
        tracing::debug!(doc_id, page = query.page, page_size, "Listing history");
        self.log
            .list_paged(doc_id, query.page, page_size, query.sort_order)
    }

    /// Content of a document at `timestamp`, or its current content if `None`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` for a never-edited document,
    /// `VersionNotFound` for an unknown timestamp, and a corruption error if
    /// the log can't be replayed.
    pub fn get_version_content(
        &self,
        doc_id: &str,
        timestamp: Option<u64>,
    ) -> Result<VersionContent> {
        let reader = self.log.read()?;
        match timestamp {
            None => {
                let head = reader
                    .head(doc_id)?
                    .ok_or_else(|| HistoryError::DocumentNotFound(doc_id.to_string()))?;
                let entry = reader.get_entry_at(doc_id, head.latest)?;
                Ok(VersionContent {
                    summary: entry.summary(),
                    content: head.content,
                })
            }
            Some(timestamp) => {
                tracing::debug!(doc_id, timestamp, "Reconstructing version");
                let rebuilt = ContentReconstructor::new(&reader).content_at(doc_id, timestamp)?;
                Ok(VersionContent {
                    summary: rebuilt.entry.summary(),
                    content: rebuilt.content,
                })
            }
        }
    }

    /// Records `new_content` as the next version of a document.
    ///
    /// The first commit of a document is always a snapshot. Later commits
    /// store a diff against the current content unless `force_snapshot` is
    /// set or the cadence policy asks for a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or no increasing timestamp could
    /// be minted within the configured retries.
    pub fn commit_edit(
        &self,
        doc_id: &str,
        new_content: &str,
        author: &Author,
        commit_message: &str,
        force_snapshot: bool,
    ) -> Result<CommitReceipt> {
        self.with_document_lock(doc_id, || {
            let entry = self.retry_out_of_order(doc_id, || {
                self.append_edit(doc_id, new_content, author, commit_message, force_snapshot)
            })?;

            tracing::info!(
                doc_id,
                timestamp = entry.timestamp,
                is_snapshot = entry.is_snapshot,
                "Committed edit"
            );
            Ok(CommitReceipt {
                doc_id: doc_id.to_string(),
                version_name: entry.version_name(),
                timestamp: entry.timestamp,
                is_snapshot: entry.is_snapshot,
            })
        })
    }

    /// One commit attempt, start to finish inside a single write transaction.
    ///
    /// The diff base, the cadence count and the timestamp are all read from
    /// the same transaction that appends, so a retry recomputes every one of
    /// them.
    fn append_edit(
        &self,
        doc_id: &str,
        new_content: &str,
        author: &Author,
        commit_message: &str,
        force_snapshot: bool,
    ) -> Result<VersionEntry> {
        let writer = self.log.write()?;
        let latest = writer.latest_timestamp(doc_id)?;
        let since_snapshot = writer.entries_since_snapshot(doc_id)?;

        // A diff is only valid against the content of the newest entry.
        let base = match (writer.head(doc_id)?, latest) {
            (Some(head), Some(latest)) if head.latest == latest => Some(head.content),
            (Some(head), Some(latest)) => {
                tracing::warn!(
                    doc_id,
                    head_latest = head.latest,
                    latest,
                    "Cached content is behind the log, storing a snapshot"
                );
                None
            }
            _ => None,
        };

        let (is_snapshot, payload) = match (base, since_snapshot) {
            (Some(base), Some(since)) if !force_snapshot => {
                let patch = codec::diff(&base, new_content)
                    .encode()
                    .context("Failed to encode patch")?;
                let input = CadenceInput {
                    entries_since_snapshot: since,
                    patch_len: patch.len(),
                    content_len: new_content.len(),
                };
                if self.policy.should_snapshot(&input) {
                    (true, new_content.to_string())
                } else {
                    (false, patch)
                }
            }
            _ => (true, new_content.to_string()),
        };

        let entry = VersionEntry {
            timestamp: clock::next_timestamp(self.clock.now_millis(), latest),
            author: author.clone(),
            commit_message: commit_message.to_string(),
            is_snapshot,
            payload,
        };
        writer.append(doc_id, &entry)?;
        writer.set_head(
            doc_id,
            &DocumentHead {
                content: new_content.to_string(),
                latest: entry.timestamp,
            },
        )?;
        writer.commit()?;
        Ok(entry)
    }

    /// Runs `attempt` again while it fails with `OutOfOrderTimestamp`, up to
    /// `append_retries` extra times.
    fn retry_out_of_order<T>(
        &self,
        doc_id: &str,
        mut attempt: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(HistoryError::OutOfOrderTimestamp {
                    attempted, latest, ..
                }) if retries < self.config.append_retries => {
                    retries += 1;
                    tracing::warn!(
                        doc_id,
                        attempted,
                        latest,
                        retries,
                        "Out-of-order version timestamp, re-minting"
                    );
                }
                result => return result,
            }
        }
    }

    /// Discards every version after `timestamp` and makes that version current.
    ///
    /// Resetting to the newest version deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns `VersionNotFound` if no version has that timestamp.
    pub fn reset_to_version(&self, doc_id: &str, timestamp: u64) -> Result<ResetOutcome> {
        self.with_document_lock(doc_id, || {
            let reader = self.log.read()?;
            let target = ContentReconstructor::new(&reader).content_at(doc_id, timestamp)?;
            drop(reader);

            let writer = self.log.write()?;
            let deleted = writer.delete_after(doc_id, timestamp)?;
            writer.set_head(
                doc_id,
                &DocumentHead {
                    content: target.content,
                    latest: timestamp,
                },
            )?;
            writer.commit()?;

            tracing::info!(doc_id, timestamp, deleted, "Reset history");
            Ok(ResetOutcome {
                doc_id: doc_id.to_string(),
                deleted_versions_count: deleted,
            })
        })
    }

    /// Folds every version up to `timestamp` into a single snapshot stamped
    /// `timestamp`. Later versions are untouched.
    ///
    /// Squashing to the anchor when it is already a snapshot compresses nothing.
    ///
    /// # Errors
    ///
    /// Returns `VersionNotFound` if no version has that timestamp.
    pub fn squash_to_version(&self, doc_id: &str, timestamp: u64) -> Result<SquashOutcome> {
        self.with_document_lock(doc_id, || {
            let reader = self.log.read()?;
            let target = ContentReconstructor::new(&reader).content_at(doc_id, timestamp)?;
            let first = reader.first_timestamp(doc_id)?;
            drop(reader);

            if target.entry.is_snapshot && first == Some(timestamp) {
                tracing::debug!(doc_id, timestamp, "Squash target is already the anchor");
                return Ok(SquashOutcome {
                    doc_id: doc_id.to_string(),
                    compressed_versions_count: 0,
                });
            }

            let snapshot = VersionEntry {
                timestamp,
                author: target.entry.author,
                commit_message: target.entry.commit_message,
                is_snapshot: true,
                payload: target.content,
            };

            let writer = self.log.write()?;
            let compressed = writer.replace_up_to(doc_id, timestamp, &snapshot)?;
            writer.commit()?;

            tracing::info!(doc_id, timestamp, compressed, "Squashed history");
            Ok(SquashOutcome {
                doc_id: doc_id.to_string(),
                compressed_versions_count: compressed,
            })
        })
    }

    /// Replays a document's whole log and checks it against the cached head.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` for a never-edited document and a
    /// corruption error at the first entry that fails to replay.
    pub fn verify_document(&self, doc_id: &str) -> Result<VerifyReport> {
        let reader = self.log.read()?;
        let entries = reader.entries(doc_id)?;
        let head = reader.head(doc_id)?;
        drop(reader);

        let Some(first) = entries.first() else {
            return match head {
                Some(_) => Err(HistoryError::NoAnchorSnapshot {
                    doc_id: doc_id.to_string(),
                    timestamp: 0,
                }),
                None => Err(HistoryError::DocumentNotFound(doc_id.to_string())),
            };
        };
        if !first.is_snapshot {
            tracing::error!(doc_id, timestamp = first.timestamp, "First version is not a snapshot");
            return Err(HistoryError::NoAnchorSnapshot {
                doc_id: doc_id.to_string(),
                timestamp: first.timestamp,
            });
        }

        let mut content = String::new();
        for entry in &entries {
            content = reconstruct::apply_entry(doc_id, &content, entry)?;
        }

        let latest = entries.last().map(|e| e.timestamp);
        let head_consistent = head
            .as_ref()
            .is_some_and(|h| Some(h.latest) == latest && h.content == content);
        if !head_consistent {
            tracing::error!(doc_id, ?latest, "Cached content does not match newest version");
        }

        Ok(VerifyReport {
            doc_id: doc_id.to_string(),
            entries: entries.len(),
            snapshots: entries.iter().filter(|e| e.is_snapshot).count(),
            latest,
            head_consistent,
        })
    }

    /// All documents that have history.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        self.log.list_documents()
    }

    /// Runs `f` while holding the write lock of `doc_id`.
    fn with_document_lock<T>(&self, doc_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        validate_doc_id(doc_id)?;
        let result = {
            let handle = self.locks.handle(doc_id);
            let _guard = handle.lock();
            f()
        };
        if self.locks.len() > LOCK_REGISTRY_SOFT_CAP {
            self.locks.prune();
        }
        result
    }
}
