/// Durable per-document version log backed by redb.
///
/// Uses a single redb database file with three tables:
/// - `versions`: bincode-serialized `VersionEntry` keyed by `"{doc_id}#{timestamp:020}"`
/// - `version_meta`: bincode-serialized `EntryMeta` under the same keys
/// - `documents`: bincode-serialized `DocumentHead` keyed by `doc_id`
///
/// Listings, stats and cadence counts scan `version_meta` only, so their cost
/// grows with the number of versions and not with the size of the content.
///
/// Reads go through a [`LogReader`] (one read transaction, a consistent
/// snapshot of the database). Mutations go through a [`LogWriter`] (one write
/// transaction), so a log change and the matching head update commit together.
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition,
    WriteTransaction,
};

use crate::entry::{
    DocumentHead, Editor, EntryMeta, HistoryPage, HistoryStats, SortOrder, VersionEntry,
};
use crate::error::{HistoryError, Result};

/// Versions table: composite string key → bincode-serialized VersionEntry.
const VERSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("versions");

/// Metadata table: same keys as `versions` → bincode-serialized EntryMeta.
const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("version_meta");

/// Documents table: doc_id → bincode-serialized DocumentHead.
const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Separator between the document id and the timestamp in version keys.
const KEY_SEPARATOR: char = '#';

/// Formats a version key from doc_id and timestamp.
///
/// The timestamp is zero-padded to 20 digits (the width of `u64::MAX`) so
/// lexicographic order in the B-tree is timestamp order.
fn version_key(doc_id: &str, timestamp: u64) -> String {
    format!("{doc_id}{KEY_SEPARATOR}{timestamp:020}")
}

/// Extracts the timestamp part of a version key.
fn key_timestamp(key: &str) -> Result<u64> {
    key.rsplit_once(KEY_SEPARATOR)
        .and_then(|(_, ts)| ts.parse().ok())
        .ok_or_else(|| anyhow!("Malformed version key: {key}").into())
}

/// Rejects ids that would break the key layout.
pub(crate) fn validate_doc_id(doc_id: &str) -> Result<()> {
    if doc_id.is_empty() || doc_id.contains(KEY_SEPARATOR) {
        return Err(HistoryError::InvalidDocumentId(doc_id.to_string()));
    }
    Ok(())
}

fn encode<T: serde::Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value).with_context(|| format!("Failed to serialize {what}"))?)
}

fn decode_entry(bytes: &[u8]) -> Result<VersionEntry> {
    Ok(bincode::deserialize(bytes).context("Failed to deserialize version entry")?)
}

fn decode_meta(bytes: &[u8]) -> Result<EntryMeta> {
    Ok(bincode::deserialize(bytes).context("Failed to deserialize entry metadata")?)
}

fn decode_head(bytes: &[u8]) -> Result<DocumentHead> {
    Ok(bincode::deserialize(bytes).context("Failed to deserialize document head")?)
}

/// Reads the entries of `doc_id` with `from <= timestamp <= to`, ascending.
fn entries_between<T>(table: &T, doc_id: &str, from: u64, to: u64) -> Result<Vec<VersionEntry>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let start = version_key(doc_id, from);
    let end = version_key(doc_id, to);
    let mut entries = Vec::new();
    for item in table
        .range::<&str>(start.as_str()..=end.as_str())
        .context("Failed to range query versions table")?
    {
        let (_, value) = item.context("Failed to read version entry")?;
        entries.push(decode_entry(value.value())?);
    }
    Ok(entries)
}

/// Reads the metadata of every entry of `doc_id`, ascending.
fn all_meta<T>(table: &T, doc_id: &str) -> Result<Vec<EntryMeta>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let start = version_key(doc_id, 0);
    let end = version_key(doc_id, u64::MAX);
    let mut metas = Vec::new();
    for item in table
        .range::<&str>(start.as_str()..=end.as_str())
        .context("Failed to range query metadata table")?
    {
        let (_, value) = item.context("Failed to read entry metadata")?;
        metas.push(decode_meta(value.value())?);
    }
    Ok(metas)
}

/// Counts the entries after the newest snapshot, scanning metadata backwards.
///
/// `None` for a document with no entries.
fn entries_since_snapshot<T>(table: &T, doc_id: &str) -> Result<Option<usize>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let start = version_key(doc_id, 0);
    let end = version_key(doc_id, u64::MAX);

    let mut seen = 0;
    for item in table
        .range::<&str>(start.as_str()..=end.as_str())
        .context("Failed to range query metadata table")?
        .rev()
    {
        let (_, value) = item.context("Failed to read entry metadata")?;
        if decode_meta(value.value())?.is_snapshot {
            return Ok(Some(seen));
        }
        seen += 1;
    }
    Ok((seen > 0).then_some(seen))
}

/// Collects the keys of `doc_id` with `from <= timestamp <= to`, ascending.
fn keys_between<T>(table: &T, doc_id: &str, from: u64, to: u64) -> Result<Vec<String>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let start = version_key(doc_id, from);
    let end = version_key(doc_id, to);
    let mut keys = Vec::new();
    for item in table
        .range::<&str>(start.as_str()..=end.as_str())
        .context("Failed to range query versions table")?
    {
        let (key, _) = item.context("Failed to read version key")?;
        keys.push(key.value().to_string());
    }
    Ok(keys)
}

fn latest_timestamp<T>(table: &T, doc_id: &str) -> Result<Option<u64>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let start = version_key(doc_id, 0);
    let end = version_key(doc_id, u64::MAX);
    let last = table
        .range::<&str>(start.as_str()..=end.as_str())
        .context("Failed to range query versions table")?
        .next_back();
    match last {
        Some(item) => {
            let (key, _) = item.context("Failed to read version key")?;
            Ok(Some(key_timestamp(key.value())?))
        }
        None => Ok(None),
    }
}

fn entry_at<T>(table: &T, doc_id: &str, timestamp: u64) -> Result<Option<VersionEntry>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let key = version_key(doc_id, timestamp);
    match table
        .get(key.as_str())
        .context("Failed to read version entry")?
    {
        Some(guard) => Ok(Some(decode_entry(guard.value())?)),
        None => Ok(None),
    }
}

/// Builds the aggregate stats of a log given its entries in ascending order.
fn history_stats(entries: &[EntryMeta]) -> HistoryStats {
    let mut seen = HashSet::new();
    let editors = entries
        .iter()
        .filter(|e| seen.insert(e.author.uid.as_str()))
        .map(|e| Editor::from(&e.author))
        .collect();
    HistoryStats {
        total_edits: entries.len(),
        edit_timestamps: entries.iter().map(|e| e.timestamp).collect(),
        editors,
    }
}

/// The nearest snapshot at or before a target plus the diff entries after it,
/// up to and including the target.
#[derive(Debug, Clone)]
pub struct AnchoredChain {
    pub anchor: VersionEntry,
    /// Ascending by timestamp.
    pub tail: Vec<VersionEntry>,
}

impl AnchoredChain {
    /// The newest entry of the chain.
    pub fn last(&self) -> &VersionEntry {
        self.tail.last().unwrap_or(&self.anchor)
    }
}

/// Version log storage.
///
/// Thread-safe: redb supports concurrent readers and serialized writers.
/// Shared across documents via `Arc<VersionLog>`.
pub struct VersionLog {
    db: Database,
}

impl std::fmt::Debug for VersionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionLog").finish()
    }
}

impl VersionLog {
    /// Opens or creates the history database in the given directory.
    ///
    /// Creates the directory and database file if they don't exist.
    /// Initializes tables on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    pub fn open(data_dir: &Path) -> Result<Arc<Self>> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("history.redb");
        let db = Database::create(&db_path)
            .with_context(|| format!("Failed to open history database: {}", db_path.display()))?;

        // Ensure tables exist
        let write_txn = db
            .begin_write()
            .context("Failed to begin initial write transaction")?;
        {
            let _ = write_txn
                .open_table(VERSIONS_TABLE)
                .context("Failed to create versions table")?;
            let _ = write_txn
                .open_table(META_TABLE)
                .context("Failed to create metadata table")?;
            let _ = write_txn
                .open_table(DOCUMENTS_TABLE)
                .context("Failed to create documents table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initial transaction")?;

        tracing::debug!("Opened history database at {}", db_path.display());
        Ok(Arc::new(Self { db }))
    }

    /// Starts a read transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub fn read(&self) -> Result<LogReader> {
        let txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        Ok(LogReader { txn })
    }

    /// Starts a write transaction. Nothing is persisted until
    /// [`LogWriter::commit`]; dropping the writer discards its changes.
    ///
    /// Only the history service writes, so the cached head never drifts from
    /// the log.
    pub(crate) fn write(&self) -> Result<LogWriter> {
        let txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        Ok(LogWriter { txn })
    }

    /// Appends an entry in its own transaction, leaving the head untouched.
    #[cfg(test)]
    pub(crate) fn append(&self, doc_id: &str, entry: &VersionEntry) -> Result<()> {
        let writer = self.write()?;
        writer.append(doc_id, entry)?;
        writer.commit()
    }

    /// Lists one page of version metadata plus whole-log stats.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn list_paged(
        &self,
        doc_id: &str,
        page: usize,
        page_size: usize,
        sort_order: SortOrder,
    ) -> Result<HistoryPage> {
        self.read()?.list_paged(doc_id, page, page_size, sort_order)
    }

    /// Looks up the entry with exactly this timestamp.
    ///
    /// # Errors
    ///
    /// Returns `VersionNotFound` if there is none.
    pub fn get_entry_at(&self, doc_id: &str, timestamp: u64) -> Result<VersionEntry> {
        self.read()?.get_entry_at(doc_id, timestamp)
    }

    /// Returns the nearest snapshot at or before `timestamp` and what follows it.
    ///
    /// # Errors
    ///
    /// Returns `NoAnchorSnapshot` if no snapshot precedes the timestamp.
    pub fn get_snapshot_at_or_before(&self, doc_id: &str, timestamp: u64) -> Result<AnchoredChain> {
        self.read()?.get_snapshot_at_or_before(doc_id, timestamp)
    }

    /// Removes all entries after `timestamp` in its own transaction.
    #[cfg(test)]
    pub(crate) fn delete_after(&self, doc_id: &str, timestamp: u64) -> Result<usize> {
        let writer = self.write()?;
        let removed = writer.delete_after(doc_id, timestamp)?;
        writer.commit()?;
        Ok(removed)
    }

    /// Replaces all entries up to `timestamp` with `snapshot` in its own transaction.
    #[cfg(test)]
    pub(crate) fn replace_up_to(
        &self,
        doc_id: &str,
        timestamp: u64,
        snapshot: &VersionEntry,
    ) -> Result<usize> {
        let writer = self.write()?;
        let removed = writer.replace_up_to(doc_id, timestamp, snapshot)?;
        writer.commit()?;
        Ok(removed)
    }

    /// Loads the cached head of a document, if it has been edited.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn head(&self, doc_id: &str) -> Result<Option<DocumentHead>> {
        self.read()?.head(doc_id)
    }

    /// Lists all document IDs that have a head.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        self.read()?.list_documents()
    }
}

/// A consistent read-only view of the log.
pub struct LogReader {
    txn: ReadTransaction,
}

impl std::fmt::Debug for LogReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogReader").finish()
    }
}

impl LogReader {
    fn versions(&self) -> Result<redb::ReadOnlyTable<&'static str, &'static [u8]>> {
        Ok(self
            .txn
            .open_table(VERSIONS_TABLE)
            .context("Failed to open versions table")?)
    }

    fn meta(&self) -> Result<redb::ReadOnlyTable<&'static str, &'static [u8]>> {
        Ok(self
            .txn
            .open_table(META_TABLE)
            .context("Failed to open metadata table")?)
    }

    fn documents(&self) -> Result<redb::ReadOnlyTable<&'static str, &'static [u8]>> {
        Ok(self
            .txn
            .open_table(DOCUMENTS_TABLE)
            .context("Failed to open documents table")?)
    }

    /// See [`VersionLog::head`].
    pub fn head(&self, doc_id: &str) -> Result<Option<DocumentHead>> {
        validate_doc_id(doc_id)?;
        match self
            .documents()?
            .get(doc_id)
            .context("Failed to read document head")?
        {
            Some(guard) => Ok(Some(decode_head(guard.value())?)),
            None => Ok(None),
        }
    }

    /// See [`VersionLog::get_entry_at`].
    pub fn get_entry_at(&self, doc_id: &str, timestamp: u64) -> Result<VersionEntry> {
        validate_doc_id(doc_id)?;
        entry_at(&self.versions()?, doc_id, timestamp)?.ok_or_else(|| {
            HistoryError::VersionNotFound {
                doc_id: doc_id.to_string(),
                timestamp,
            }
        })
    }

    /// See [`VersionLog::get_snapshot_at_or_before`].
    ///
    /// Walks backwards from `timestamp` until the first snapshot. If no entry
    /// has exactly `timestamp`, the chain ends at the last entry before it.
    pub fn get_snapshot_at_or_before(&self, doc_id: &str, timestamp: u64) -> Result<AnchoredChain> {
        validate_doc_id(doc_id)?;
        let table = self.versions()?;
        let start = version_key(doc_id, 0);
        let end = version_key(doc_id, timestamp);

        let mut newest_first = Vec::new();
        for item in table
            .range::<&str>(start.as_str()..=end.as_str())
            .context("Failed to range query versions table")?
            .rev()
        {
            let (_, value) = item.context("Failed to read version entry")?;
            let entry = decode_entry(value.value())?;
            if entry.is_snapshot {
                newest_first.reverse();
                return Ok(AnchoredChain {
                    anchor: entry,
                    tail: newest_first,
                });
            }
            newest_first.push(entry);
        }

        Err(HistoryError::NoAnchorSnapshot {
            doc_id: doc_id.to_string(),
            timestamp,
        })
    }

    /// Every entry of a document, ascending.
    pub fn entries(&self, doc_id: &str) -> Result<Vec<VersionEntry>> {
        validate_doc_id(doc_id)?;
        entries_between(&self.versions()?, doc_id, 0, u64::MAX)
    }

    /// Timestamp of the newest entry, if any.
    pub fn latest_timestamp(&self, doc_id: &str) -> Result<Option<u64>> {
        validate_doc_id(doc_id)?;
        latest_timestamp(&self.versions()?, doc_id)
    }

    /// Timestamp of the oldest entry (the anchor), if any.
    pub fn first_timestamp(&self, doc_id: &str) -> Result<Option<u64>> {
        validate_doc_id(doc_id)?;
        let table = self.versions()?;
        let start = version_key(doc_id, 0);
        let end = version_key(doc_id, u64::MAX);
        let first = table
            .range::<&str>(start.as_str()..=end.as_str())
            .context("Failed to range query versions table")?
            .next();
        match first {
            Some(item) => {
                let (key, _) = item.context("Failed to read version key")?;
                Ok(Some(key_timestamp(key.value())?))
            }
            None => Ok(None),
        }
    }

    /// Number of diff entries after the newest snapshot.
    ///
    /// Returns `None` for a document with no entries.
    pub fn entries_since_snapshot(&self, doc_id: &str) -> Result<Option<usize>> {
        validate_doc_id(doc_id)?;
        entries_since_snapshot(&self.meta()?, doc_id)
    }

    /// See [`VersionLog::list_paged`].
    ///
    /// Pages are 1-based; page 0 is treated as page 1 and a zero page size
    /// as 1. A page past the end is empty. Reads metadata only.
    pub fn list_paged(
        &self,
        doc_id: &str,
        page: usize,
        page_size: usize,
        sort_order: SortOrder,
    ) -> Result<HistoryPage> {
        validate_doc_id(doc_id)?;
        let entries = all_meta(&self.meta()?, doc_id)?;
        let page = page.max(1);
        let page_size = page_size.max(1);
        let stats = history_stats(&entries);
        let skip = (page - 1).saturating_mul(page_size);

        let versions = match sort_order {
            SortOrder::Asc => entries
                .iter()
                .skip(skip)
                .take(page_size)
                .map(EntryMeta::summary)
                .collect(),
            SortOrder::Desc => entries
                .iter()
                .rev()
                .skip(skip)
                .take(page_size)
                .map(EntryMeta::summary)
                .collect(),
        };

        Ok(HistoryPage {
            versions,
            total: entries.len(),
            page,
            page_size,
            stats,
        })
    }

    /// See [`VersionLog::list_documents`].
    pub fn list_documents(&self) -> Result<Vec<String>> {
        let table = self.documents()?;
        let mut doc_ids = Vec::new();
        for item in table.iter().context("Failed to iterate documents table")? {
            let (key, _) = item.context("Failed to read document key")?;
            doc_ids.push(key.value().to_string());
        }
        Ok(doc_ids)
    }
}

/// A pending set of log mutations, committed atomically.
pub struct LogWriter {
    txn: WriteTransaction,
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter").finish()
    }
}

impl LogWriter {
    /// Latest entry timestamp as seen inside this transaction.
    pub fn latest_timestamp(&self, doc_id: &str) -> Result<Option<u64>> {
        validate_doc_id(doc_id)?;
        let table = self
            .txn
            .open_table(VERSIONS_TABLE)
            .context("Failed to open versions table")?;
        latest_timestamp(&table, doc_id)
    }

    /// Looks up an entry as seen inside this transaction.
    pub fn get_entry_at(&self, doc_id: &str, timestamp: u64) -> Result<VersionEntry> {
        validate_doc_id(doc_id)?;
        let table = self
            .txn
            .open_table(VERSIONS_TABLE)
            .context("Failed to open versions table")?;
        entry_at(&table, doc_id, timestamp)?.ok_or_else(|| HistoryError::VersionNotFound {
            doc_id: doc_id.to_string(),
            timestamp,
        })
    }

    /// Number of diff entries after the newest snapshot, as seen inside this
    /// transaction. See [`LogReader::entries_since_snapshot`].
    pub fn entries_since_snapshot(&self, doc_id: &str) -> Result<Option<usize>> {
        validate_doc_id(doc_id)?;
        let table = self
            .txn
            .open_table(META_TABLE)
            .context("Failed to open metadata table")?;
        entries_since_snapshot(&table, doc_id)
    }

    /// Writes an entry and its metadata under the entry's key.
    fn insert_entry(&self, doc_id: &str, entry: &VersionEntry) -> Result<()> {
        let key = version_key(doc_id, entry.timestamp);
        let bytes = encode(entry, "version entry")?;
        let meta = encode(&EntryMeta::from(entry), "entry metadata")?;

        let mut versions = self
            .txn
            .open_table(VERSIONS_TABLE)
            .context("Failed to open versions table")?;
        versions
            .insert(key.as_str(), bytes.as_slice())
            .context("Failed to insert version entry")?;

        let mut metas = self
            .txn
            .open_table(META_TABLE)
            .context("Failed to open metadata table")?;
        metas
            .insert(key.as_str(), meta.as_slice())
            .context("Failed to insert entry metadata")?;
        Ok(())
    }

    /// Removes entries and their metadata.
    fn remove_keys(&self, keys: &[String]) -> Result<()> {
        let mut versions = self
            .txn
            .open_table(VERSIONS_TABLE)
            .context("Failed to open versions table")?;
        let mut metas = self
            .txn
            .open_table(META_TABLE)
            .context("Failed to open metadata table")?;
        for key in keys {
            versions
                .remove(key.as_str())
                .context("Failed to remove version entry")?;
            metas
                .remove(key.as_str())
                .context("Failed to remove entry metadata")?;
        }
        Ok(())
    }

    fn keys_between(&self, doc_id: &str, from: u64, to: u64) -> Result<Vec<String>> {
        let table = self
            .txn
            .open_table(VERSIONS_TABLE)
            .context("Failed to open versions table")?;
        keys_between(&table, doc_id, from, to)
    }

    /// Appends an entry after the current newest one.
    ///
    /// The first entry of a document must be a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `OutOfOrderTimestamp` if `entry.timestamp` is not strictly
    /// greater than the newest stored timestamp, and `NoAnchorSnapshot` if a
    /// diff would become the first entry.
    pub fn append(&self, doc_id: &str, entry: &VersionEntry) -> Result<()> {
        match self.latest_timestamp(doc_id)? {
            Some(latest) if entry.timestamp <= latest => {
                return Err(HistoryError::OutOfOrderTimestamp {
                    doc_id: doc_id.to_string(),
                    attempted: entry.timestamp,
                    latest,
                });
            }
            None if !entry.is_snapshot => {
                return Err(HistoryError::NoAnchorSnapshot {
                    doc_id: doc_id.to_string(),
                    timestamp: entry.timestamp,
                });
            }
            _ => {}
        }
        self.insert_entry(doc_id, entry)
    }

    /// Removes all entries with a timestamp strictly greater than `timestamp`.
    ///
    /// Returns the number of entries removed.
    pub fn delete_after(&self, doc_id: &str, timestamp: u64) -> Result<usize> {
        validate_doc_id(doc_id)?;
        let Some(from) = timestamp.checked_add(1) else {
            return Ok(0);
        };

        let keys = self.keys_between(doc_id, from, u64::MAX)?;
        self.remove_keys(&keys)?;
        Ok(keys.len())
    }

    /// Removes all entries with a timestamp at or before `timestamp` and
    /// inserts `snapshot` in their place.
    ///
    /// Returns the number of entries removed, not counting an entry at
    /// `timestamp` itself, which `snapshot` replaces.
    ///
    /// # Errors
    ///
    /// Returns an error if `snapshot` is not a snapshot stamped `timestamp`.
    pub fn replace_up_to(
        &self,
        doc_id: &str,
        timestamp: u64,
        snapshot: &VersionEntry,
    ) -> Result<usize> {
        validate_doc_id(doc_id)?;
        if !snapshot.is_snapshot || snapshot.timestamp != timestamp {
            return Err(anyhow!(
                "Replacement for {doc_id} up to {timestamp} must be a snapshot stamped {timestamp}"
            )
            .into());
        }

        let keys = self.keys_between(doc_id, 0, timestamp)?;
        self.remove_keys(&keys)?;
        self.insert_entry(doc_id, snapshot)?;

        let key = version_key(doc_id, timestamp);
        let replaced_target = keys.last().is_some_and(|k| *k == key);
        Ok(keys.len() - usize::from(replaced_target))
    }

    /// Stores the cached head of a document.
    pub fn set_head(&self, doc_id: &str, head: &DocumentHead) -> Result<()> {
        validate_doc_id(doc_id)?;
        let bytes = encode(head, "document head")?;
        let mut table = self
            .txn
            .open_table(DOCUMENTS_TABLE)
            .context("Failed to open documents table")?;
        table
            .insert(doc_id, bytes.as_slice())
            .context("Failed to insert document head")?;
        Ok(())
    }

    /// Loads the cached head as seen inside this transaction.
    pub fn head(&self, doc_id: &str) -> Result<Option<DocumentHead>> {
        validate_doc_id(doc_id)?;
        let table = self
            .txn
            .open_table(DOCUMENTS_TABLE)
            .context("Failed to open documents table")?;
        let head = match table.get(doc_id).context("Failed to read document head")? {
            Some(guard) => Some(decode_head(guard.value())?),
            None => None,
        };
        Ok(head)
    }

    /// Commits every mutation made through this writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing is persisted then.
    pub fn commit(self) -> Result<()> {
        self.txn
            .commit()
            .context("Failed to commit write transaction")?;
        Ok(())
    }
}
