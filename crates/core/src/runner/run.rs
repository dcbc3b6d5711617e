//! The reconciliation driver.
//!
//! Collections are processed one at a time in declaration order. Per
//! library the inventory snapshot is taken once and the persisted match
//! cache is loaded, scoped to the snapshot's generation and saved back.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::acquisition::AcquisitionRegistry;
use crate::collection::{is_due, CollectionSpec, LibrarySpec, ParsedConfig};
use crate::config::Settings;
use crate::filter::{apply_filters, apply_limit};
use crate::inventory::{CollectionMetadata, InventoryCollaborator, InventoryError};
use crate::matcher::{match_all, update_cache, InventoryIndex, MatchCache};
use crate::metrics::{COLLECTIONS_PROCESSED, RUN_DURATION};
use crate::notify::{dispatch, Notifier, NotifyEvent};
use crate::reconcile::{apply_diff, reconcile, ApplyError, SyncOutcome};
use crate::source::{DiscoveryRegistry, SourceResolver};
use crate::state::StateStore;

use super::types::{CollectionReport, CollectionStatus, RunError, RunReport};

/// Clears the running flag when a run ends, however it ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Cloneable handle for observing and cancelling runs from another task.
#[derive(Debug, Clone)]
pub struct RunHandle {
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl RunHandle {
    /// Stop the active run at the next collection boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Drives every collection of a parsed configuration through
/// resolve, filter, match, reconcile and apply.
pub struct CollectionRunner {
    settings: Settings,
    resolver: SourceResolver,
    inventory: Arc<dyn InventoryCollaborator>,
    acquisition: AcquisitionRegistry,
    notifiers: Vec<Arc<dyn Notifier>>,
    state: Arc<dyn StateStore>,

    // Runtime state
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl CollectionRunner {
    pub fn new(
        settings: Settings,
        discovery: DiscoveryRegistry,
        inventory: Arc<dyn InventoryCollaborator>,
        state: Arc<dyn StateStore>,
    ) -> Self {
        let resolver = SourceResolver::new(discovery, settings.discovery.clone());
        Self {
            settings,
            resolver,
            inventory,
            acquisition: AcquisitionRegistry::new(),
            notifiers: Vec::new(),
            state,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_acquisition(mut self, acquisition: AcquisitionRegistry) -> Self {
        self.acquisition = acquisition;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn handle(&self) -> RunHandle {
        RunHandle {
            running: Arc::clone(&self.running),
            cancel: Arc::clone(&self.cancel),
        }
    }

    /// Run every collection of `config` against the current time.
    pub async fn run(&self, config: &ParsedConfig) -> Result<RunReport, RunError> {
        self.run_at(config, Utc::now()).await
    }

    /// Run every collection of `config`, evaluating schedules at `now`.
    pub async fn run_at(
        &self,
        config: &ParsedConfig,
        now: DateTime<Utc>,
    ) -> Result<RunReport, RunError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Run requested while another run is in progress");
            return Err(RunError::AlreadyRunning);
        }
        let _guard = RunGuard(Arc::clone(&self.running));
        self.cancel.store(false, Ordering::SeqCst);

        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(
            "Run {} started: {} libraries, {} collections{}",
            run_id,
            config.libraries.len(),
            config.collection_count(),
            if self.settings.sync.dry_run { " (dry run)" } else { "" }
        );
        dispatch(
            &self.notifiers,
            &NotifyEvent::RunStarted {
                run_id: run_id.clone(),
                libraries: config.libraries.len(),
                collections: config.collection_count(),
            },
        )
        .await;

        let mut collections = Vec::new();
        let mut cancelled = false;
        for library in &config.libraries {
            if self.cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }
            cancelled = self.run_library(library, now, &mut collections).await;
            if cancelled {
                break;
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cancelled,
            collections,
        };
        let summary = report.summary();
        RUN_DURATION
            .with_label_values(&[if cancelled { "cancelled" } else { "completed" }])
            .observe(timer.elapsed().as_secs_f64());
        info!(
            "Run {} {}: {} collections, {} changed, {} skipped, {} failed (+{} -{} requested {})",
            report.run_id,
            if cancelled { "cancelled" } else { "finished" },
            summary.collections,
            summary.changed,
            summary.skipped,
            summary.failed,
            summary.added,
            summary.removed,
            summary.requested
        );
        dispatch(
            &self.notifiers,
            &NotifyEvent::RunFinished {
                run_id: report.run_id.clone(),
                cancelled,
                summary,
            },
        )
        .await;

        Ok(report)
    }

    /// Process one library. Returns true when the run was cancelled.
    async fn run_library(
        &self,
        library: &LibrarySpec,
        now: DateTime<Utc>,
        reports: &mut Vec<CollectionReport>,
    ) -> bool {
        let snapshot = match self.inventory.snapshot(&library.name).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Cannot read library '{}': {}", library.name, e);
                for spec in &library.collections {
                    let mut report =
                        CollectionReport::new(&library.name, &spec.name, CollectionStatus::Failed);
                    report.errors.push(format!(
                        "Library '{}': snapshot failed: {}",
                        library.name, e
                    ));
                    record_status(&report);
                    reports.push(report);
                }
                return false;
            }
        };

        let mut cache = match self.state.load_cache(&library.name) {
            Ok(cache) => cache,
            Err(e) => {
                error!("Failed to load match cache for '{}': {}", library.name, e);
                MatchCache::new()
            }
        };
        let index = InventoryIndex::new(snapshot);
        debug!(
            "Library '{}' generation {} ({} items, {} cached matches)",
            library.name,
            index.generation(),
            index.snapshot().items.len(),
            cache.len()
        );

        let mut cancelled = false;
        for spec in &library.collections {
            if self.cancel.load(Ordering::SeqCst) {
                info!("Run cancelled before collection '{}'", spec.name);
                cancelled = true;
                break;
            }
            let report = self.run_collection(spec, &index, &mut cache, now).await;
            record_status(&report);
            reports.push(report);
        }

        let stats = cache.stats();
        debug!(
            "Match cache for '{}': {} hits, {} misses, {} entries",
            library.name, stats.hits, stats.misses, stats.entries
        );
        if let Err(e) = self.state.save_cache(&library.name, &cache) {
            error!("Failed to save match cache for '{}': {}", library.name, e);
        }
        cancelled
    }

    async fn run_collection(
        &self,
        spec: &CollectionSpec,
        index: &InventoryIndex,
        cache: &mut MatchCache,
        now: DateTime<Utc>,
    ) -> CollectionReport {
        let mut report = CollectionReport::new(&spec.library, &spec.name, CollectionStatus::Unchanged);

        if !self.settings.sync.ignore_schedule {
            let last_run = self
                .state
                .last_run(&spec.library, &spec.name)
                .unwrap_or_else(|e| {
                    error!("Failed to read last run of '{}': {}", spec.name, e);
                    None
                });
            if !is_due(spec.schedule, last_run, now) {
                debug!("Collection '{}' not due ({})", spec.name, spec.schedule);
                report.status = CollectionStatus::NotDue;
                return report;
            }
        }

        let resolution = self.resolver.resolve(spec).await;
        report.candidates = resolution.candidates.len();
        report
            .errors
            .extend(resolution.errors.iter().map(|e| e.to_string()));

        let filtered = apply_filters(resolution.candidates, &spec.filters);
        let kept = apply_limit(filtered.kept, spec.limit);
        report.kept = kept.len();

        let results = match_all(&kept, index, cache);
        update_cache(cache, &results);
        report.matched = results
            .iter()
            .filter_map(|r| r.matched().map(|item| item.handle.as_str()))
            .collect::<HashSet<_>>()
            .len();

        if (report.matched as u64) < u64::from(spec.minimum_items) {
            warn!(
                "Collection '{}': {} matched items, {} required; skipping",
                spec.name, report.matched, spec.minimum_items
            );
            report.status = CollectionStatus::BelowMinimum;
            self.record_run(spec, now);
            return report;
        }

        if self.settings.sync.dry_run {
            return self.plan_collection(spec, &results, report).await;
        }

        let collection = match self
            .inventory
            .find_or_create_collection(&spec.library, &spec.name)
            .await
        {
            Ok(collection) => collection,
            Err(error) => return fail(report, spec, "collection", error),
        };
        if collection.created {
            info!("Created collection '{}' in '{}'", spec.name, spec.library);
        }
        let members = match self.inventory.collection_members(&collection.handle).await {
            Ok(members) => members,
            Err(error) => return fail(report, spec, "members", error),
        };

        let diff = reconcile(&results, &members, spec.sync_mode, spec.order);
        let acquisition = if self.settings.sync.add_missing {
            Some(&self.acquisition)
        } else {
            None
        };
        let mut outcome = apply_diff(
            spec,
            &collection.handle,
            &diff,
            self.inventory.as_ref(),
            acquisition,
        )
        .await;

        if let Err(error) = self
            .inventory
            .update_metadata(&collection.handle, &CollectionMetadata::from_spec(spec))
            .await
        {
            outcome.errors.push(ApplyError::Collection {
                collection: spec.name.clone(),
                operation: "metadata",
                error,
            });
        }
        if let Some(poster) = &spec.poster {
            if let Err(error) = self.sync_artwork(spec, &collection.handle, poster).await {
                warn!("{}", error);
                outcome.errors.push(error);
            }
        }

        report.added = outcome.added.len();
        report.removed = outcome.removed.len();
        report.requested = outcome.requested.len();
        report.unresolved = outcome.unresolved.len();
        report
            .errors
            .extend(outcome.errors.iter().map(|e| e.to_string()));
        report.status = if outcome.changed() {
            CollectionStatus::Changed
        } else {
            CollectionStatus::Unchanged
        };

        if outcome.changed() {
            self.notify_changed(spec, index, &outcome).await;
        }
        self.record_run(spec, now);
        report
    }

    /// Compute the diff against the existing collection without mutating
    /// anything. A collection that does not exist yet has no members.
    async fn plan_collection(
        &self,
        spec: &CollectionSpec,
        results: &[crate::matcher::MatchResult],
        mut report: CollectionReport,
    ) -> CollectionReport {
        let members = match self
            .inventory
            .find_collection(&spec.library, &spec.name)
            .await
        {
            Ok(Some(collection)) => {
                match self.inventory.collection_members(&collection.handle).await {
                    Ok(members) => members,
                    Err(error) => return fail(report, spec, "members", error),
                }
            }
            Ok(None) => Vec::new(),
            Err(error) => return fail(report, spec, "collection", error),
        };

        let diff = reconcile(results, &members, spec.sync_mode, spec.order);
        for item in &diff.to_add {
            debug!("[dry run] '{}': would add '{}'", spec.name, item.title);
        }
        for handle in &diff.to_remove {
            debug!("[dry run] '{}': would remove {}", spec.name, handle);
        }
        info!(
            "[dry run] Collection '{}': +{} -{} missing {}",
            spec.name,
            diff.to_add.len(),
            diff.to_remove.len(),
            diff.missing.len()
        );
        report.added = diff.to_add.len();
        report.removed = diff.to_remove.len();
        report.unresolved = diff.missing.len();
        report.status = CollectionStatus::Planned;
        report
    }

    /// Upload the poster when its digest differs from the last upload.
    async fn sync_artwork(
        &self,
        spec: &CollectionSpec,
        handle: &str,
        poster: &str,
    ) -> Result<(), ApplyError> {
        let path = self.settings.posters_dir.join(poster);
        let image = tokio::fs::read(&path).await.map_err(|e| ApplyError::Poster {
            collection: spec.name.clone(),
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let digest = format!("{:x}", Sha256::digest(&image));

        let previous = self
            .state
            .artwork_digest(&spec.library, &spec.name)
            .unwrap_or_else(|e| {
                error!("Failed to read artwork digest of '{}': {}", spec.name, e);
                None
            });
        if previous.as_deref() == Some(digest.as_str()) {
            debug!("Artwork of '{}' unchanged", spec.name);
            return Ok(());
        }

        self.inventory
            .upload_artwork(handle, &image)
            .await
            .map_err(|error| ApplyError::Collection {
                collection: spec.name.clone(),
                operation: "artwork",
                error,
            })?;
        info!("Uploaded artwork for '{}'", spec.name);
        if let Err(e) = self
            .state
            .set_artwork_digest(&spec.library, &spec.name, &digest)
        {
            error!("Failed to store artwork digest of '{}': {}", spec.name, e);
        }
        Ok(())
    }

    async fn notify_changed(
        &self,
        spec: &CollectionSpec,
        index: &InventoryIndex,
        outcome: &SyncOutcome,
    ) {
        let title = |handle: &String| {
            index
                .snapshot()
                .item(handle)
                .map(|item| item.title.clone())
                .unwrap_or_else(|| handle.clone())
        };
        let event = NotifyEvent::CollectionChanged {
            library: spec.library.clone(),
            collection: spec.name.clone(),
            added: outcome.added.iter().map(title).collect(),
            removed: outcome.removed.iter().map(title).collect(),
            requested: outcome
                .requested
                .iter()
                .map(|c| c.display_title())
                .collect(),
        };
        dispatch(&self.notifiers, &event).await;
    }

    fn record_run(&self, spec: &CollectionSpec, now: DateTime<Utc>) {
        if let Err(e) = self.state.record_run(&spec.library, &spec.name, now) {
            error!("Failed to record run of '{}': {}", spec.name, e);
        }
    }
}

fn fail(
    mut report: CollectionReport,
    spec: &CollectionSpec,
    operation: &'static str,
    error: InventoryError,
) -> CollectionReport {
    let error = ApplyError::Collection {
        collection: spec.name.clone(),
        operation,
        error,
    };
    warn!("{}", error);
    report.errors.push(error.to_string());
    report.status = CollectionStatus::Failed;
    report
}

fn record_status(report: &CollectionReport) {
    COLLECTIONS_PROCESSED
        .with_label_values(&[report.status.as_str()])
        .inc();
}
