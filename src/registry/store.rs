//! Job registry implementation
//!
//! The central registry that owns every open job's broadcaster, pumps
//! segmented streams into them and hands finished content to the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::Result;
use crate::persist::ContentStore;
use crate::segment::{self, FragmentStream, TokenSource};

use super::broadcaster::{Broadcaster, JobStats, SubscriberId, Subscription};
use super::config::RegistryConfig;
use super::error::RegistryError;
use super::fragment::{Fragment, JobId};
use super::handle::{Attachment, JobHandle};
use super::sink::Sink;

/// Central registry for all open jobs
///
/// Each broadcaster sits behind its own lock, so appends and attaches on one
/// job are serialized while independent jobs proceed in parallel.
pub struct JobRegistry<S: ContentStore> {
    /// Map of job id to broadcaster
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Broadcaster>>>>,

    /// Where finished content goes
    store: Arc<S>,

    /// Configuration
    config: RegistryConfig,

    next_job_id: AtomicU64,
}

impl<S: ContentStore> JobRegistry<S> {
    /// Create a registry with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(store: S, config: RegistryConfig) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            store: Arc::new(store),
            config,
            next_job_id: AtomicU64::new(1),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the content store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Start segmenting `source` into a new job
    ///
    /// The job is registered before this returns, so it can be attached to
    /// right away. Fragments flow in on a spawned task.
    pub async fn start_segmented_stream<T: TokenSource>(self: &Arc<Self>, source: T) -> JobHandle {
        let id = self.create_job().await;
        let fragments = segment::open(source, self.config.segmenter.clone());

        let registry = Arc::clone(self);
        let task = tokio::spawn(async move { registry.pump(id, fragments).await });

        JobHandle::new(id, task)
    }

    async fn pump(&self, id: JobId, mut fragments: FragmentStream) -> Result<String> {
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => self.append(id, fragment).await?,
                Err(e) => {
                    self.fail(id, &e.to_string()).await?;
                    return Err(e.into());
                }
            }
        }

        self.finish(id).await
    }

    /// Register a new open job
    pub async fn create_job(&self) -> JobId {
        let id = JobId(self.next_job_id.fetch_add(1, Ordering::Relaxed));
        self.jobs
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(Broadcaster::new())));

        tracing::info!(job = %id, "Job created");
        id
    }

    /// Append a fragment to an open job, delivering it to every subscriber
    pub async fn append(&self, id: JobId, fragment: Fragment) -> std::result::Result<(), RegistryError> {
        let entry = self.entry(id).await?;
        let mut job = entry.lock().await;

        if !job.append(fragment) {
            return Err(RegistryError::JobClosed(id));
        }

        tracing::trace!(
            job = %id,
            fragments = job.log().len(),
            subscribers = job.subscriber_count(),
            "Fragment appended"
        );
        Ok(())
    }

    /// Finish a job and persist its content
    ///
    /// Subscribers get their completion signal before the store is called.
    /// The entry is removed afterwards, whether or not the save succeeded.
    pub async fn finish(&self, id: JobId) -> Result<String> {
        let entry = self.entry(id).await?;

        let (content, fragments) = {
            let mut job = entry.lock().await;
            if !job.is_open() {
                return Err(RegistryError::JobClosed(id).into());
            }
            let log = job.finish();
            (
                Fragment::encode_log(log, &self.config.segmenter.marker),
                log.len(),
            )
        };

        let saved = self.store.save(id, content.clone()).await;
        self.jobs.write().await.remove(&id);

        match saved {
            Ok(()) => {
                tracing::info!(
                    job = %id,
                    fragments = fragments,
                    bytes = content.len(),
                    "Job finished"
                );
                Ok(content)
            }
            Err(e) => {
                tracing::error!(job = %id, error = %e, "Failed to persist job content");
                Err(e.into())
            }
        }
    }

    /// Fail a job, notifying its subscribers, and drop it
    pub async fn fail(&self, id: JobId, reason: &str) -> std::result::Result<(), RegistryError> {
        let entry = self.entry(id).await?;
        entry.lock().await.fail(reason);
        self.jobs.write().await.remove(&id);

        tracing::warn!(job = %id, reason = reason, "Job failed");
        Ok(())
    }

    /// Attach a sink to a job
    ///
    /// An open job replays its log into the sink and keeps it live, or
    /// reports it pruned if the sink failed during replay. A finished job is
    /// answered with its persisted content instead.
    pub async fn attach<K: Sink>(&self, id: JobId, sink: K) -> Result<Attachment> {
        let entry = self.jobs.read().await.get(&id).cloned();

        if let Some(entry) = entry {
            let mut job = entry.lock().await;
            match job.subscribe(Box::new(sink)) {
                Subscription::Live(subscriber) => {
                    tracing::info!(
                        job = %id,
                        subscriber = %subscriber,
                        replayed = job.log().len(),
                        "Sink attached"
                    );
                    return Ok(Attachment::Live(subscriber));
                }
                Subscription::Pruned { delivered } => {
                    tracing::debug!(
                        job = %id,
                        delivered = delivered,
                        "Sink failed during replay, not attached"
                    );
                    return Ok(Attachment::Pruned { delivered });
                }
                Subscription::Finished(log) => {
                    return Ok(Attachment::Finished(Fragment::encode_log(
                        &log,
                        &self.config.segmenter.marker,
                    )));
                }
                Subscription::Failed => return Err(RegistryError::JobNotFound(id).into()),
            }
        }

        match self.store.load(id).await? {
            Some(content) => Ok(Attachment::Finished(content)),
            None => Err(RegistryError::JobNotFound(id).into()),
        }
    }

    /// Detach a live subscriber
    ///
    /// Returns false if the job or subscriber is unknown.
    pub async fn detach(&self, id: JobId, subscriber: SubscriberId) -> bool {
        let Ok(entry) = self.entry(id).await else {
            return false;
        };
        let removed = entry.lock().await.unsubscribe(subscriber);

        if removed {
            tracing::debug!(job = %id, subscriber = %subscriber, "Sink detached");
        }
        removed
    }

    /// Remove an unfinished job
    ///
    /// Live subscribers are told the job failed. Returns false if the job is
    /// not in the table.
    pub async fn discard(&self, id: JobId) -> bool {
        let Some(entry) = self.jobs.write().await.remove(&id) else {
            return false;
        };
        entry.lock().await.fail("job discarded");

        tracing::info!(job = %id, "Job discarded");
        true
    }

    /// Get job statistics
    pub async fn job_stats(&self, id: JobId) -> Option<JobStats> {
        let entry = self.entry(id).await.ok()?;
        let job = entry.lock().await;
        Some(job.stats())
    }

    /// Get the number of jobs in the table
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    async fn entry(&self, id: JobId) -> std::result::Result<Arc<Mutex<Broadcaster>>, RegistryError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::JobNotFound(id))
    }
}
