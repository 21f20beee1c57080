use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lock::FileLock;
use crate::semantic::{lexical, rank_by_similarity};
use crate::storage::{BackendLocal, StorageManager};

/// A stored bookmark.
///
/// `embedding` is always the embedding of the current `title` + `content`
/// and is never serialized to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Everything a write carries. A store cannot be handed fields without a vector.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifact {
    pub url: String,
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ScoredArtifact {
    pub artifact: Artifact,
    pub score: f32,
}

/// Display fields of an artifact plus its similarity to the query.
///
/// Lexical-only matches carry similarity `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: u64,
    pub url: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub similarity: f32,
}

impl SearchResult {
    pub fn from_artifact(artifact: Artifact, similarity: f32) -> Self {
        Self {
            id: artifact.id,
            url: artifact.url,
            title: artifact.title,
            content: artifact.content,
            created_at: artifact.created_at,
            similarity,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("artifact {0} not found")]
    NotFound(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Persistence of artifacts together with their vectors.
///
/// Writes are all-or-nothing: a failed `insert` or `replace` leaves the store
/// exactly as it was. Concurrent writers to one id are last-writer-wins.
pub trait ArtifactStore: Send + Sync {
    fn insert(&self, new: NewArtifact) -> Result<Artifact, StoreError>;
    /// Full replace of url, title, content and embedding. Keeps `id` and `created_at`.
    fn replace(&self, id: u64, new: NewArtifact) -> Result<Artifact, StoreError>;
    /// Artifacts scoring strictly above `threshold`, best first, at most `limit`.
    fn similarity_query(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredArtifact>, StoreError>;
    /// Artifacts whose title or content contains `text`, at most `limit`.
    fn lexical_query(&self, text: &str, limit: usize) -> Result<Vec<Artifact>, StoreError>;
    fn get(&self, id: u64) -> Result<Option<Artifact>, StoreError>;
    fn delete(&self, id: u64) -> Result<(), StoreError>;
    /// All artifacts, newest first.
    fn list_all(&self) -> Result<Vec<Artifact>, StoreError>;
    /// Length of the stored vectors; `None` while the store is empty.
    fn dimensions(&self) -> Result<Option<usize>, StoreError>;
}

const CSV_FILE: &str = "artifacts.csv";

const CSV_HEADERS: [&str; 6] = ["id", "url", "title", "content", "created_at", "embedding"];

#[derive(Debug, Default, Clone)]
struct Records {
    list: Vec<Artifact>,
    next_id: u64,
    /// File state the list was read from or last written as
    stamp: Option<FileStamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

/// CSV-file artifact store.
///
/// The whole table lives in memory. Every write takes the directory's
/// [`FileLock`], re-reads the file, applies the change to that fresh copy,
/// and renames the new table over the file before the in-memory copy is
/// swapped. A failed write changes nothing, and writers in other processes
/// (daemon and CLI) are serialized instead of overwriting each other. Reads
/// reload the table when the file changed underneath.
///
/// Each row holds the vector as base64 of little-endian `f32`s, which keeps
/// fields and vector in one commit.
#[derive(Clone)]
pub struct BackendCsv {
    records: Arc<RwLock<Records>>,
    storage: BackendLocal,
}

impl BackendCsv {
    pub fn load(base_dir: &str) -> Result<Self, StoreError> {
        let storage = BackendLocal::new(base_dir)?;

        {
            let _lock = FileLock::acquire(&storage.base_dir)?;
            if !storage.exists(CSV_FILE) {
                log::info!("Creating new database at {base_dir}/{CSV_FILE}");
                storage.write(CSV_FILE, &encode_csv(&[])?)?;
            }
        }

        let store = BackendCsv {
            records: Arc::new(RwLock::new(Records::default())),
            storage,
        };

        let records = store.read_file(1)?;
        *store.records.write().map_err(|_| StoreError::Poisoned)? = records;

        Ok(store)
    }

    fn stamp(&self) -> Result<FileStamp, StoreError> {
        let meta = std::fs::metadata(self.storage.base_dir.join(CSV_FILE))?;
        Ok(FileStamp {
            modified: meta.modified()?,
            len: meta.len(),
        })
    }

    /// Read the table from disk. Ids continue from `min_next_id` at least,
    /// so an id deleted in this process is not handed out again.
    fn read_file(&self, min_next_id: u64) -> Result<Records, StoreError> {
        // stamp first: a write landing after it shows up as a changed stamp
        let stamp = self.stamp()?;

        let now = Instant::now();
        let list = decode_csv(&self.storage.read(CSV_FILE)?)?;
        let next_id = match list.iter().map(|a| a.id).max() {
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| StoreError::Corrupt(format!("id {max} leaves no room for new ids")))?,
            None => 1,
        }
        .max(min_next_id);

        log::debug!(
            "took {}ms to read {} artifacts",
            now.elapsed().as_micros() as f64 / 1000.0,
            list.len()
        );

        Ok(Records {
            list,
            next_id,
            stamp: Some(stamp),
        })
    }

    /// Apply `mutate` to a fresh copy of the table, persist it, then publish it.
    fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut Records) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _lock = FileLock::acquire(&self.storage.base_dir)?;
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;

        let mut next = self.read_file(records.next_id)?;
        let out = mutate(&mut next)?;

        self.storage.write(CSV_FILE, &encode_csv(&next.list)?)?;
        next.stamp = Some(self.stamp()?);
        *records = next;

        Ok(out)
    }

    /// Reload when another process rewrote the file since we last saw it.
    fn refresh(&self) -> Result<(), StoreError> {
        let stamp = self.stamp()?;
        if self.records.read().map_err(|_| StoreError::Poisoned)?.stamp == Some(stamp) {
            return Ok(());
        }

        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        if records.stamp != Some(stamp) {
            log::debug!("{CSV_FILE} changed on disk, reloading");
            *records = self.read_file(records.next_id)?;
        }

        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&[Artifact]) -> T) -> Result<T, StoreError> {
        self.refresh()?;
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&records.list))
    }
}

impl ArtifactStore for BackendCsv {
    fn insert(&self, new: NewArtifact) -> Result<Artifact, StoreError> {
        self.commit(|records| {
            let id = records.next_id;
            records.next_id = id
                .checked_add(1)
                .ok_or_else(|| StoreError::Corrupt("id space exhausted".to_string()))?;

            let artifact = Artifact {
                id,
                url: new.url,
                title: new.title,
                content: new.content,
                embedding: new.embedding,
                created_at: Utc::now(),
            };
            records.list.push(artifact.clone());
            Ok(artifact)
        })
    }

    fn replace(&self, id: u64, new: NewArtifact) -> Result<Artifact, StoreError> {
        self.commit(|records| {
            let artifact = records
                .list
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(StoreError::NotFound(id))?;

            artifact.url = new.url;
            artifact.title = new.title;
            artifact.content = new.content;
            artifact.embedding = new.embedding;

            Ok(artifact.clone())
        })
    }

    fn similarity_query(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredArtifact>, StoreError> {
        self.read(|list| rank_by_similarity(query, list, threshold, limit))
    }

    fn lexical_query(&self, text: &str, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        self.read(|list| lexical::lexical_matches(text, list, limit))
    }

    fn get(&self, id: u64) -> Result<Option<Artifact>, StoreError> {
        self.read(|list| list.iter().find(|a| a.id == id).cloned())
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.commit(|records| {
            let idx = records
                .list
                .iter()
                .position(|a| a.id == id)
                .ok_or(StoreError::NotFound(id))?;
            records.list.remove(idx);
            Ok(())
        })
    }

    fn list_all(&self) -> Result<Vec<Artifact>, StoreError> {
        self.read(|list| {
            let mut all = list.to_vec();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            all
        })
    }

    fn dimensions(&self) -> Result<Option<usize>, StoreError> {
        self.read(|list| list.first().map(|a| a.embedding.len()))
    }
}

fn encode_embedding(embedding: &[f32]) -> String {
    let bytes: Vec<u8> = embedding.iter().flat_map(|v| v.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

fn decode_embedding(encoded: &str) -> Result<Vec<f32>, StoreError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|err| StoreError::Corrupt(format!("embedding is not base64: {err}")))?;

    if bytes.len() % 4 != 0 {
        return Err(StoreError::Corrupt(format!(
            "embedding has {} bytes, not a multiple of 4",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn encode_csv(list: &[Artifact]) -> Result<Vec<u8>, StoreError> {
    let mut csv_wrt = csv::Writer::from_writer(vec![]);
    csv_wrt.write_record(CSV_HEADERS)?;

    for artifact in list {
        csv_wrt.write_record([
            &artifact.id.to_string(),
            &artifact.url,
            &artifact.title,
            &artifact.content,
            &artifact.created_at.to_rfc3339(),
            &encode_embedding(&artifact.embedding),
        ])?;
    }

    csv_wrt
        .into_inner()
        .map_err(|err| StoreError::Io(err.into_error()))
}

fn decode_csv(data: &[u8]) -> Result<Vec<Artifact>, StoreError> {
    let mut csv_reader = csv::Reader::from_reader(data);

    let mut list = vec![];
    for record in csv_reader.records() {
        let record = record?;
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .map(str::to_string)
                .ok_or_else(|| StoreError::Corrupt(format!("couldnt get record {name}")))
        };

        let id = field(0, "id")?
            .parse::<u64>()
            .map_err(|err| StoreError::Corrupt(format!("bad id: {err}")))?;
        let created_at = DateTime::parse_from_rfc3339(&field(4, "created_at")?)
            .map_err(|err| StoreError::Corrupt(format!("bad created_at for {id}: {err}")))?
            .with_timezone(&Utc);

        list.push(Artifact {
            id,
            url: field(1, "url")?,
            title: field(2, "title")?,
            content: field(3, "content")?,
            created_at,
            embedding: decode_embedding(&field(5, "embedding")?)?,
        });
    }

    Ok(list)
}
