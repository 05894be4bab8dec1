//! File-backed configuration set repository.
//!
//! Persists every row into a single JSON document holding two lists - all
//! global-set rows and all bounded-context-set rows. The document is loaded
//! into the shared in-memory index; writes rewrite the whole document. A
//! `notify` watcher reloads the index when the file changes on disk from
//! outside (own writes are suppressed through the saving flag).

use crate::index::{self, FamilyIndex};
use async_trait::async_trait;
use cr_core::traits::ConfigSetRepository;
use cr_core::types::{ConfigurationSet, FamilyKey};
use errors::RepositoryError;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataFileStruct {
    global_config_sets: Vec<ConfigurationSet>,
    bounded_context_config_sets: Vec<ConfigurationSet>,
}

pub struct FileConfigSetRepo {
    file_path: PathBuf,
    families: Arc<RwLock<FamilyIndex>>,
    saving: Arc<AtomicBool>,
    watching: AtomicBool,
}

impl FileConfigSetRepo {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            families: Arc::new(RwLock::new(FamilyIndex::new())),
            saving: Arc::new(AtomicBool::new(false)),
            watching: AtomicBool::new(false),
        }
    }

    async fn load_index(path: &Path) -> Result<FamilyIndex, RepositoryError> {
        let contents = tokio::fs::read_to_string(path).await?;
        if contents.is_empty() {
            return Err(RepositoryError::Unavailable {
                reason: format!("data file is empty: {}", path.display()),
            });
        }

        let data: DataFileStruct = serde_json::from_str(&contents)?;

        let mut families = FamilyIndex::new();
        for row in data
            .global_config_sets
            .into_iter()
            .chain(data.bounded_context_config_sets)
        {
            families.entry(row.family_key()).or_default().push(row);
        }
        Ok(families)
    }

    fn snapshot(families: &FamilyIndex) -> DataFileStruct {
        let mut data = DataFileStruct::default();
        for row in families.values().flatten() {
            if row.is_global() {
                data.global_config_sets.push(row.clone());
            } else {
                data.bounded_context_config_sets.push(row.clone());
            }
        }
        data
    }

    async fn save_to_file(&self, contents: String) -> Result<(), RepositoryError> {
        self.saving.store(true, Ordering::SeqCst);
        let result = tokio::fs::write(&self.file_path, contents).await;
        self.saving.store(false, Ordering::SeqCst);
        result?;
        self.ensure_watching();
        Ok(())
    }

    /// Spawn the file watcher once. Reloads the index on external changes,
    /// debouncing bursts and skipping events caused by our own writes.
    fn ensure_watching(&self) {
        if self.watching.swap(true, Ordering::SeqCst) {
            return;
        }

        let path = self.file_path.clone();
        let families = Arc::clone(&self.families);
        let saving = Arc::clone(&self.saving);

        tokio::spawn(async move {
            let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(100);
            let mut watcher = match RecommendedWatcher::new(
                move |res| {
                    let _ = event_tx.blocking_send(res);
                },
                notify::Config::default(),
            ) {
                Ok(w) => w,
                Err(e) => {
                    error!("failed to create data file watcher: {e}");
                    return;
                }
            };

            if let Err(e) = watcher.watch(&path, RecursiveMode::NonRecursive) {
                error!("failed to watch data file {}: {e}", path.display());
                return;
            }

            info!("watching data file: {}", path.display());

            while let Some(event_result) = event_rx.recv().await {
                let Ok(event) = event_result else { continue };
                if !matches!(event.kind, EventKind::Modify(_)) {
                    continue;
                }
                if saving.load(Ordering::SeqCst) {
                    continue;
                }

                info!("data file changed on disk, reloading: {}", path.display());
                match Self::load_index(&path).await {
                    Ok(index) => *families.write() = index,
                    Err(e) => error!("failed to reload data file: {e}"),
                }

                // debounce: one reload per change burst
                tokio::time::sleep(Duration::from_millis(100)).await;
                while event_rx.try_recv().is_ok() {}
            }

            debug!("data file watcher stopped: {}", path.display());
        });
    }
}

#[async_trait]
impl ConfigSetRepository for FileConfigSetRepo {
    async fn init(&self) -> Result<(), RepositoryError> {
        if !self.file_path.exists() {
            warn!(
                "data file does not exist, will be created at first write: {}",
                self.file_path.display()
            );
            return Ok(());
        }

        let index = Self::load_index(&self.file_path).await?;
        let global_count = index.keys().filter(|key| key.is_global()).count();
        let bc_count = index.len() - global_count;
        *self.families.write() = index;

        info!(
            "loaded data file: {} global families, {} bounded-context families",
            global_count, bc_count
        );

        self.ensure_watching();
        Ok(())
    }

    async fn store(&self, set: ConfigurationSet) -> Result<(), RepositoryError> {
        let family = set.family_key();
        let schema_version = set.schema_version.clone();
        let iteration_number = set.iteration_number;

        let contents = {
            let mut families = self.families.write();
            index::append_row(&mut families, set)?;
            serde_json::to_string_pretty(&Self::snapshot(&families))?
        };

        if let Err(e) = self.save_to_file(contents).await {
            // keep the prior state authoritative when persistence fails
            index::remove_row(
                &mut self.families.write(),
                &family,
                &schema_version,
                iteration_number,
            );
            return Err(e);
        }

        info!(
            family = %family,
            schema_version = %schema_version,
            iteration_number,
            "stored configuration set"
        );
        Ok(())
    }

    async fn fetch_all(
        &self,
        family: &FamilyKey,
    ) -> Result<Vec<ConfigurationSet>, RepositoryError> {
        Ok(self.families.read().get(family).cloned().unwrap_or_default())
    }

    async fn fetch_latest(
        &self,
        family: &FamilyKey,
    ) -> Result<Option<ConfigurationSet>, RepositoryError> {
        Ok(index::latest(&self.families.read(), family))
    }

    async fn fetch_version(
        &self,
        family: &FamilyKey,
        schema_version: &str,
    ) -> Result<Option<ConfigurationSet>, RepositoryError> {
        Ok(index::latest_of_version(
            &self.families.read(),
            family,
            schema_version,
        ))
    }

    async fn fetch_environment(
        &self,
        environment_name: &str,
    ) -> Result<Vec<ConfigurationSet>, RepositoryError> {
        Ok(index::environment_rows(
            &self.families.read(),
            environment_name,
        ))
    }
}
