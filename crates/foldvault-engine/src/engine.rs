//! Vault engine facade

use crate::auth::AllowAll;
use crate::index::{self, ContentIndex};
use crate::locks::KeyedLocks;
use crate::record::{RecordMetadata, VaultRecord, FORMAT_VERSION};
use crate::request::{
    RangeContent, Retrieved, SearchMatch, SearchResult, StoreReceipt, StoreRequest,
};
use crate::stats::{Catalog, VaultStats};
use crate::storage::MemoryStorage;
use chrono::Utc;
use foldvault_compression::{FoldingPipeline, PatternMemory};
use foldvault_config::{Config, ConfigLoader};
use foldvault_types::{Authorizer, Error, QuarantineSink, RecordId, Result, VaultStorage};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tokio::task::{spawn_blocking, JoinError};
use tracing::{debug, info, warn};

fn join_error(e: JoinError) -> Error {
    Error::other(format!("Worker task failed: {}", e))
}

/// Stores, verifies and queries folded records
///
/// Cloning is cheap and every clone shares storage, pattern memory and the
/// catalog, so one engine can serve many concurrent tasks.
#[derive(Clone)]
pub struct VaultEngine {
    config: Arc<Config>,
    storage: Arc<dyn VaultStorage>,
    authorizer: Arc<dyn Authorizer>,
    quarantine: Option<Arc<dyn QuarantineSink>>,
    pipeline: Arc<FoldingPipeline>,
    memory: Arc<PatternMemory>,
    catalog: Arc<Catalog>,
    locks: Arc<KeyedLocks>,
}

impl fmt::Debug for VaultEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultEngine")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("catalog", &self.catalog.len())
            .field("quarantine", &self.quarantine.is_some())
            .finish_non_exhaustive()
    }
}

impl VaultEngine {
    /// Start building an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create an engine from the default configuration locations
    ///
    /// Records are kept in memory and every request is authorized.
    pub async fn new() -> Result<Self> {
        EngineBuilder::new().build().await
    }

    /// Create an in-memory engine with a custom configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        EngineBuilder::new().with_config(config).build().await
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared pattern memory
    pub fn memory(&self) -> &Arc<PatternMemory> {
        &self.memory
    }

    /// Folding pipeline
    pub fn pipeline(&self) -> &Arc<FoldingPipeline> {
        &self.pipeline
    }

    /// Storage backend
    pub fn storage(&self) -> &Arc<dyn VaultStorage> {
        &self.storage
    }

    /// Fold and persist new content
    pub async fn store(&self, request: StoreRequest) -> Result<StoreReceipt> {
        request.validate(self.config.vault.max_content_size)?;
        let StoreRequest {
            owner_id,
            collection_id,
            name,
            content,
            content_class_hint,
        } = request;

        let record_id = RecordId::new();
        let pipeline = Arc::clone(&self.pipeline);
        let index_config = self.config.index;

        let (outcome, content_index) = spawn_blocking(move || {
            let outcome = pipeline.fold(&content, content_class_hint);
            let content_index = index_config
                .enabled
                .then(|| ContentIndex::build(&content, outcome.content_class, &index_config));
            (outcome, content_index)
        })
        .await
        .map_err(join_error)?;

        let record = VaultRecord {
            format_version: FORMAT_VERSION,
            record_id,
            owner_id,
            collection_id,
            name,
            original_size: outcome.original_size as u64,
            final_size: outcome.payload.len() as u64,
            integrity_hash: outcome.integrity_hash,
            pipeline_trace: outcome.trace,
            payload: outcome.payload,
            content_index,
            content_class: outcome.content_class,
            created_at: Utc::now(),
            access_count: 0,
            last_accessed_at: None,
        };

        self.storage
            .put(&record_id.storage_key(), record.encode()?)
            .await?;
        self.authorizer
            .record_created(&record.owner_id, &record_id)
            .await?;
        self.catalog.insert(&record);

        let metadata = record.metadata();
        info!(
            "Stored record {} ({}): {} -> {} bytes via {}",
            record_id,
            record.name,
            record.original_size,
            record.final_size,
            metadata.pipeline_trace_summary
        );

        Ok(StoreReceipt {
            record_id,
            original_size: metadata.original_size,
            final_size: metadata.final_size,
            ratio: metadata.ratio,
            quality_score: outcome.quality_score,
            content_class: metadata.content_class,
            strategies: metadata.strategies,
            pipeline_trace_summary: metadata.pipeline_trace_summary,
        })
    }

    /// Return the fully verified original content
    ///
    /// Increments the access count under the record's lock. A failed
    /// bookkeeping write is logged and does not fail the read.
    pub async fn retrieve(&self, requester: &str, record_id: &RecordId) -> Result<Retrieved> {
        self.authorize(requester, record_id).await?;
        let record = self.load(record_id).await?;
        let (record, content) = self.unfold(record).await?;
        self.catalog.insert(&record);

        let metadata = match self.record_access(record_id).await {
            Ok(updated) => updated.metadata(),
            Err(e) => {
                warn!("Access bookkeeping failed for record {}: {}", record_id, e);
                record.metadata()
            }
        };

        info!(
            "Retrieved record {} for {}: {} bytes",
            record_id,
            requester,
            content.len()
        );
        Ok(Retrieved {
            content,
            integrity_ok: true,
            metadata,
        })
    }

    /// Return the inclusive lines `start_line..=end_line`
    ///
    /// Unfolded records with a segment table are served by checking only the
    /// xxh3 checksums of the covering segments; the record's SHA-256 hash is
    /// not recomputed on that path. When any covering segment fails its
    /// checksum the whole record is decoded and verified instead, so a
    /// corrupted payload surfaces as an integrity failure and a damaged
    /// segment table alone does not block the read.
    pub async fn retrieve_range(
        &self,
        requester: &str,
        record_id: &RecordId,
        start_line: u64,
        end_line: u64,
    ) -> Result<RangeContent> {
        self.authorize(requester, record_id).await?;
        let record = self.load(record_id).await?;
        self.catalog.insert(&record);

        if let Some(index) = &record.content_index {
            let range = index.line_range(start_line, end_line)?;
            if record.pipeline_trace.is_empty() && index.has_segments() {
                if let Some(content) = slice_segments(&record, index, &range) {
                    debug!(
                        "Served lines {}..={} of {} from segments",
                        start_line, end_line, record_id
                    );
                    return Ok(RangeContent {
                        content,
                        start_line,
                        end_line: end_line.min(index.line_count() - 1),
                        offset: range.start,
                        from_segments: true,
                    });
                }
                warn!(
                    "Segment check failed for {}, verifying the full record",
                    record_id
                );
            }
        }

        let (record, content) = self.unfold(record).await?;
        let line_offsets = match &record.content_index {
            Some(index) => index.line_offsets.clone(),
            None => index::line_offsets(&content),
        };
        let range = index::line_range(&line_offsets, content.len() as u64, start_line, end_line)?;
        let slice = checked_slice(&content, &range, record_id)?.to_vec();

        Ok(RangeContent {
            content: slice,
            start_line,
            end_line: end_line.min(line_offsets.len() as u64 - 1),
            offset: range.start,
            from_segments: false,
        })
    }

    /// Find up to `max_results` occurrences of `term`
    ///
    /// The token map answers when it holds a complete answer. Otherwise the
    /// record is decoded, verified and scanned.
    pub async fn search(
        &self,
        requester: &str,
        record_id: &RecordId,
        term: &str,
        max_results: usize,
    ) -> Result<SearchResult> {
        if term.is_empty() {
            return Err(Error::validation("search term must not be empty"));
        }
        if max_results == 0 {
            return Err(Error::validation("max_results must be greater than 0"));
        }

        self.authorize(requester, record_id).await?;
        let record = self.load(record_id).await?;
        self.catalog.insert(&record);

        if let Some(index) = &record.content_index {
            if let Some(offsets) = index.lookup(term, max_results) {
                debug!("Term '{}' answered from the index of {}", term, record_id);
                return Ok(SearchResult {
                    matches: offsets
                        .into_iter()
                        .map(|offset| SearchMatch {
                            offset,
                            line: index.line_of(offset),
                        })
                        .collect(),
                    used_index: true,
                });
            }
        }

        let (record, content) = self.unfold(record).await?;
        let term = term.to_string();
        let line_offsets = record.content_index.map(|index| index.line_offsets);

        let matches = spawn_blocking(move || {
            let line_offsets = line_offsets.unwrap_or_else(|| index::line_offsets(&content));
            index::scan(&content, &term, max_results)
                .into_iter()
                .map(|offset| SearchMatch {
                    offset,
                    line: index::line_of(&line_offsets, offset),
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(join_error)?;

        debug!("Term scanned in decoded content of {}", record_id);
        Ok(SearchResult {
            matches,
            used_index: false,
        })
    }

    /// Aggregate sizes and strategy usage over cataloged records
    pub fn get_stats(&self, owner_id: Option<&str>) -> VaultStats {
        self.catalog.stats(owner_id)
    }

    /// Metadata without decoding the payload
    pub async fn metadata(&self, requester: &str, record_id: &RecordId) -> Result<RecordMetadata> {
        self.authorize(requester, record_id).await?;
        let record = self.load(record_id).await?;
        self.catalog.insert(&record);
        Ok(record.metadata())
    }

    /// Remove a record
    pub async fn delete(&self, requester: &str, record_id: &RecordId) -> Result<()> {
        self.authorize(requester, record_id).await?;
        {
            let _guard = self.locks.acquire(*record_id).await;
            if !self.storage.delete(&record_id.storage_key()).await? {
                return Err(Error::not_found(record_id.to_string()));
            }
            self.catalog.remove(record_id);
        }
        self.locks.forget(record_id);
        info!("Deleted record {}", record_id);
        Ok(())
    }

    /// Catalog every record the storage backend holds
    ///
    /// Returns the number of records loaded. Unreadable records are logged
    /// and skipped.
    pub async fn refresh_catalog(&self) -> Result<usize> {
        let mut loaded = 0;
        for key in self.storage.keys().await? {
            let record_id: RecordId = match key.parse() {
                Ok(id) => id,
                Err(e) => {
                    warn!("Skipping storage key {}: {}", key, e);
                    continue;
                }
            };
            match self.load(&record_id).await {
                Ok(record) => {
                    self.catalog.insert(&record);
                    loaded += 1;
                }
                Err(e) => warn!("Skipping record {}: {}", record_id, e),
            }
        }
        debug!("Catalog refreshed with {} records", loaded);
        Ok(loaded)
    }

    /// Persist pattern memory to the configured snapshot path
    ///
    /// Returns whether a snapshot path is configured.
    pub async fn save_memory(&self) -> Result<bool> {
        let Some(path) = self.config.memory.snapshot_path.clone() else {
            return Ok(false);
        };
        let memory = Arc::clone(&self.memory);
        spawn_blocking(move || memory.save(&path))
            .await
            .map_err(join_error)??;
        Ok(true)
    }

    async fn authorize(&self, requester: &str, record_id: &RecordId) -> Result<()> {
        if self.authorizer.authorize(requester, record_id).await? {
            Ok(())
        } else {
            warn!("Access denied for {} on record {}", requester, record_id);
            Err(Error::permission_denied(requester, record_id.to_string()))
        }
    }

    async fn load(&self, record_id: &RecordId) -> Result<VaultRecord> {
        let bytes = self
            .storage
            .get(&record_id.storage_key())
            .await?
            .ok_or_else(|| Error::not_found(record_id.to_string()))?;
        let record = VaultRecord::decode(&bytes)?;
        if record.record_id != *record_id {
            let error = Error::integrity(
                record_id.to_string(),
                format!("stored under the key of {}", record.record_id),
            );
            self.flag(record_id, &error);
            return Err(error);
        }
        Ok(record)
    }

    async fn unfold(&self, record: VaultRecord) -> Result<(VaultRecord, Vec<u8>)> {
        let pipeline = Arc::clone(&self.pipeline);
        let (record, result) = spawn_blocking(move || {
            let result = pipeline.unfold(
                &record.pipeline_trace,
                &record.payload,
                &record.integrity_hash,
                &record.record_id.to_string(),
            );
            (record, result)
        })
        .await
        .map_err(join_error)?;

        match result {
            Ok(content) if content.len() as u64 == record.original_size => Ok((record, content)),
            Ok(content) => {
                let error = Error::integrity(
                    record.record_id.to_string(),
                    format!(
                        "restored {} bytes, expected {}",
                        content.len(),
                        record.original_size
                    ),
                );
                self.flag(&record.record_id, &error);
                Err(error)
            }
            Err(error) => {
                self.flag(&record.record_id, &error);
                Err(error)
            }
        }
    }

    async fn record_access(&self, record_id: &RecordId) -> Result<VaultRecord> {
        let _guard = self.locks.acquire(*record_id).await;
        let mut record = self.load(record_id).await?;
        record.access_count += 1;
        record.last_accessed_at = Some(Utc::now());
        self.storage
            .put(&record_id.storage_key(), record.encode()?)
            .await?;
        Ok(record)
    }

    fn flag(&self, record_id: &RecordId, error: &Error) {
        if !error.requires_quarantine() {
            return;
        }
        if let Some(sink) = &self.quarantine {
            sink.quarantine(record_id, &error.to_string());
        }
    }
}

/// Bytes of `range` when every covering segment passes its checksum
///
/// `None` sends the caller to a full decode.
fn slice_segments(record: &VaultRecord, index: &ContentIndex, range: &Range<u64>) -> Option<Vec<u8>> {
    let payload = &record.payload;
    if payload.len() as u64 != index.total_len {
        return None;
    }

    for segment in index.segments_covering(range) {
        let bytes = checked_slice(payload, &segment.range(), &record.record_id).ok()?;
        if !segment.verify(bytes) {
            debug!(
                "Segment at offset {} of {} failed its checksum",
                segment.offset, record.record_id
            );
            return None;
        }
    }

    checked_slice(payload, range, &record.record_id)
        .ok()
        .map(<[u8]>::to_vec)
}

fn checked_slice<'a>(bytes: &'a [u8], range: &Range<u64>, record_id: &RecordId) -> Result<&'a [u8]> {
    let (start, end) = (range.start as usize, range.end as usize);
    if start > end || end > bytes.len() {
        return Err(Error::integrity(
            record_id.to_string(),
            format!(
                "range {}..{} is outside {} bytes",
                range.start,
                range.end,
                bytes.len()
            ),
        ));
    }
    Ok(&bytes[start..end])
}

/// Builder for a [`VaultEngine`] with custom collaborators
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<Config>,
    storage: Option<Arc<dyn VaultStorage>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    quarantine: Option<Arc<dyn QuarantineSink>>,
    memory: Option<Arc<PatternMemory>>,
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("storage", &self.storage.is_some())
            .field("authorizer", &self.authorizer.is_some())
            .field("quarantine", &self.quarantine.is_some())
            .field("memory", &self.memory.is_some())
            .finish()
    }
}

impl EngineBuilder {
    /// Create a new engine builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the storage backend, in-memory by default
    pub fn with_storage(mut self, storage: Arc<dyn VaultStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the authorizer, [`AllowAll`] by default
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Set the sink notified about records failing verification
    pub fn with_quarantine(mut self, sink: Arc<dyn QuarantineSink>) -> Self {
        self.quarantine = Some(sink);
        self
    }

    /// Share an existing pattern memory
    pub fn with_memory(mut self, memory: Arc<PatternMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Build the vault engine
    pub async fn build(self) -> Result<VaultEngine> {
        let config = match self.config {
            Some(config) => config,
            None => ConfigLoader::load_default()?,
        };
        config.validate()?;

        let memory = match self.memory {
            Some(memory) => memory,
            None => Arc::new(match &config.memory.snapshot_path {
                Some(path) if path.exists() => PatternMemory::load(path, &config.memory)?,
                _ => PatternMemory::new(&config.memory),
            }),
        };

        let pipeline = Arc::new(FoldingPipeline::from_configs(
            &config.codecs,
            config.selector,
            config.pipeline,
            Arc::clone(&memory),
        ));

        let excluded = pipeline.registry().excluded();
        if !excluded.is_empty() {
            warn!("Strategies excluded by self-check: {:?}", excluded);
        }
        info!(
            "Vault engine initialized with strategies {:?}",
            pipeline.registry().strategies()
        );

        Ok(VaultEngine {
            config: Arc::new(config),
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            authorizer: self.authorizer.unwrap_or_else(|| Arc::new(AllowAll)),
            quarantine: self.quarantine,
            pipeline,
            memory,
            catalog: Arc::new(Catalog::new()),
            locks: Arc::new(KeyedLocks::new()),
        })
    }
}
