//! View counter store.
//!
//! Counters live in a concurrent map. When a backing file is configured the
//! map is loaded from it on open and written back after every increment; an
//! increment that cannot be written back is undone.

use std::{
    collections::{BTreeMap, HashMap},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::{fs, sync::Mutex};
use tracing::{info, warn};

use crate::application::repos::{RepoError, ViewCountsRepo};
use crate::infra::{
    atomic::{discard_staging, replace_file},
    error::InfraError,
};

#[derive(Debug, Default)]
pub struct ViewCounterStore {
    counts: DashMap<String, u64>,
    file: Option<PathBuf>,
    flush_lock: Mutex<()>,
}

impl ViewCounterStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store. A missing file starts every counter at zero.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let counts = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<HashMap<String, u64>>(&bytes).map_err(
                |source| InfraError::CorruptViewFile {
                    path: path.clone(),
                    source,
                },
            )?,
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(InfraError::Io(err)),
        };

        info!(path = %path.display(), posts = counts.len(), "loaded view counters");

        Ok(Self {
            counts: counts.into_iter().collect(),
            file: Some(path),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn increment(&self, slug: &str) -> u64 {
        let mut entry = self.counts.entry(slug.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Undo an increment whose write-back failed.
    fn rollback(&self, slug: &str) {
        if let Some(mut entry) = self.counts.get_mut(slug) {
            let current = *entry;
            *entry = current.saturating_sub(1);
        }
        self.counts.remove_if(slug, |_, views| *views == 0);
    }

    async fn flush_to(&self, path: &Path) -> Result<(), RepoError> {
        let snapshot: BTreeMap<String, u64> = self
            .counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(RepoError::from_persistence)?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(RepoError::from_persistence)?;
        }
        let staging = path.with_extension("json.tmp");
        if let Err(err) = replace_file(&staging, path, &bytes).await {
            discard_staging(&staging).await;
            return Err(RepoError::from_persistence(err));
        }
        Ok(())
    }
}

#[async_trait]
impl ViewCountsRepo for ViewCounterStore {
    async fn views_for(&self, slugs: &[&str]) -> Result<HashMap<String, u64>, RepoError> {
        Ok(slugs
            .iter()
            .filter_map(|slug| {
                self.counts
                    .get(*slug)
                    .map(|views| (slug.to_string(), *views))
            })
            .collect())
    }

    /// With a backing file, the increment only sticks once it is on disk.
    async fn record_view(&self, slug: &str) -> Result<u64, RepoError> {
        let Some(path) = self.file.as_deref() else {
            return Ok(self.increment(slug));
        };

        let _guard = self.flush_lock.lock().await;
        let views = self.increment(slug);
        if let Err(err) = self.flush_to(path).await {
            self.rollback(slug);
            warn!(slug, error = %err, "view not persisted; increment rolled back");
            return Err(err);
        }
        Ok(views)
    }
}
