//! Batch loading: files → records → Study → store.
//!
//! A batch either succeeds as a whole or fails as a whole. When any file
//! fails to read or parse, no study is installed and the caller receives the
//! first failure in input order. The store's `loading` flag is released on
//! every exit path by a drop guard.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::state::{Selection, ViewerStateStore};
use crate::study::{assemble, InstanceRecord, Study};

use super::extractor::MetadataExtractor;
use super::source::FileSource;

/// Default number of files read and parsed at the same time.
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 16;

// =============================================================================
// Loading Guard
// =============================================================================

/// Holds the store's `loading` flag for the lifetime of a batch.
struct LoadingGuard<'a> {
    store: &'a ViewerStateStore,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(store: &'a ViewerStateStore) -> Self {
        store.set_loading(true);
        store.set_error(None);
        Self { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

// =============================================================================
// Study Loader
// =============================================================================

/// Loads batches of files into a [`ViewerStateStore`].
///
/// # Example
///
/// ```ignore
/// use dicom_viewer::metadata::{DicomMetadataExtractor, LocalFileSource, StudyLoader};
/// use dicom_viewer::state::ViewerStateStore;
///
/// let store = ViewerStateStore::new();
/// let loader = StudyLoader::new(store.clone(), DicomMetadataExtractor::new());
///
/// let study = loader
///     .load(vec![LocalFileSource::new("ct/1.dcm"), LocalFileSource::new("ct/2.dcm")])
///     .await?;
/// assert_eq!(store.snapshot().study.as_ref(), Some(&study));
/// ```
pub struct StudyLoader<E: MetadataExtractor> {
    store: ViewerStateStore,
    extractor: Arc<E>,
    max_concurrent_reads: usize,
}

impl<E: MetadataExtractor + 'static> StudyLoader<E> {
    pub fn new(store: ViewerStateStore, extractor: E) -> Self {
        Self {
            store,
            extractor: Arc::new(extractor),
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
        }
    }

    /// Limit how many files are read and parsed at once (at least one).
    pub fn with_max_concurrent_reads(mut self, limit: usize) -> Self {
        self.max_concurrent_reads = limit.max(1);
        self
    }

    /// The store this loader installs studies into.
    pub fn store(&self) -> &ViewerStateStore {
        &self.store
    }

    /// Load a batch of files as one study.
    ///
    /// On success the study is installed with its first series and first
    /// instance selected. On failure the error message is written to the
    /// store and returned; the previously installed study is left untouched.
    pub async fn load<S>(&self, sources: Vec<S>) -> Result<Arc<Study>, LoadError>
    where
        S: FileSource + 'static,
    {
        let _loading = LoadingGuard::acquire(&self.store);
        let file_count = sources.len();

        let result = match self.extract_all(sources).await {
            Ok(records) => assemble(records).map_err(LoadError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(study) => {
                let study = Arc::new(study);
                let selection = Selection::first_of(&study);
                self.store
                    .set_study_and_select(Arc::clone(&study), selection);

                info!(
                    study_id = %study.id,
                    files = file_count,
                    series = study.series.len(),
                    "Loaded study"
                );
                Ok(study)
            }
            Err(e) => {
                warn!(files = file_count, error = %e, "Batch load failed");
                self.store.set_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Remove the current study and selection.
    pub fn clear(&self) {
        debug!("Clearing loaded study");
        self.store.clear_study();
    }

    /// Read and extract every source concurrently, keeping input order.
    ///
    /// At most `max_concurrent_reads` sources are open at any time.
    async fn extract_all<S>(&self, sources: Vec<S>) -> Result<Vec<InstanceRecord>, LoadError>
    where
        S: FileSource + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_reads));
        let mut handles = Vec::with_capacity(sources.len());
        for source in sources {
            let source_id = source.identifier().to_string();
            let extractor = Arc::clone(&self.extractor);
            let permits = Arc::clone(&permits);
            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| LoadError::FileRead {
                    source_id: source.identifier().to_string(),
                    message: e.to_string(),
                })?;
                let data = source.read_all().await?;
                extractor.extract(data, &source.pixel_ref()).await
            });
            handles.push((source_id, handle));
        }

        let mut records = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some((source_id, handle)) = pending.next() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(LoadError::MetadataParse {
                    source_id,
                    message: join_error.to_string(),
                }),
            };

            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    for (_, rest) in pending {
                        rest.abort();
                    }
                    return Err(e);
                }
            }
        }

        Ok(records)
    }
}
