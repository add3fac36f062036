//! Media upload gateway: upload, wait for readiness, release.
//!
//! The gateway owns no per-request state. Each [`MediaHandle`] it returns
//! belongs to the caller, who must hand it back to [`MediaGateway::release`]
//! once the generation call is done.

use crate::config::ClientConfig;
use crate::error::MediaChatError;
use crate::pipeline::input::MediaInput;
use crate::pipeline::readiness::{MediaHandle, PollStep, ReadinessPoller};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::provider::FileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Uploads blobs to a [`FileStore`] and tracks their readiness.
#[derive(Clone)]
pub struct MediaGateway {
    store: Arc<dyn FileStore>,
    poll_interval: Duration,
    readiness_timeout: Duration,
    release_timeout: Duration,
    progress: ProgressCallback,
}

impl MediaGateway {
    pub fn new(store: Arc<dyn FileStore>, config: &ClientConfig) -> Self {
        Self {
            store,
            poll_interval: config.poll_interval,
            readiness_timeout: config.readiness_timeout,
            release_timeout: config.store_request_timeout,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Send the blob to the remote store.
    ///
    /// The returned handle may still be `Processing`.
    pub async fn upload(&self, input: &MediaInput) -> Result<MediaHandle, MediaChatError> {
        info!(
            "Uploading '{}' ({} bytes, {})",
            input.name,
            input.len(),
            input.mime_type
        );

        let file = self
            .store
            .upload(&input.data, &input.mime_type, &input.name)
            .await
            .map_err(|e| MediaChatError::Upload {
                name: input.name.clone(),
                detail: e.to_string(),
            })?;

        let mut handle = MediaHandle::from_remote(file);
        if handle.mime_type.is_empty() {
            handle.mime_type = input.mime_type.clone();
        }

        debug!("Uploaded as {} ({})", handle.remote_id, handle.readiness);
        self.progress.on_upload_complete(&handle.remote_id, input.len());
        Ok(handle)
    }

    /// Re-fetch the handle's state every poll interval until it is `Ready`.
    ///
    /// Returns the number of re-fetches performed. The handle is updated in
    /// place, so the caller still owns it (and can release it) on error.
    /// The readiness bound covers the status requests too: a re-fetch that
    /// does not answer within the remaining budget ends the wait.
    ///
    /// # Errors
    /// - [`MediaChatError::MediaProcessing`] when the remote marks it `Failed`
    /// - [`MediaChatError::MediaTimeout`] when still `Processing` after the bound
    /// - [`MediaChatError::Upload`] when a status re-fetch itself fails
    pub async fn await_ready(&self, handle: &mut MediaHandle) -> Result<u32, MediaChatError> {
        let start = Instant::now();
        let mut poller = ReadinessPoller::new(self.poll_interval, self.readiness_timeout);

        loop {
            match poller.step(handle, start.elapsed()) {
                PollStep::Ready => {
                    info!("{} is ready after {} polls", handle.remote_id, poller.polls());
                    self.progress.on_ready(&handle.remote_id, poller.polls());
                    return Ok(poller.polls());
                }
                PollStep::Failed(reason) => {
                    warn!("{} failed remote processing: {}", handle.remote_id, reason);
                    return Err(MediaChatError::MediaProcessing {
                        handle: handle.remote_id.clone(),
                        reason,
                    });
                }
                PollStep::TimedOut => {
                    return Err(MediaChatError::MediaTimeout {
                        handle: handle.remote_id.clone(),
                        waited_secs: start.elapsed().as_secs(),
                    });
                }
                PollStep::Wait(delay) => {
                    debug!("{} still processing; checking again in {:?}", handle.remote_id, delay);
                    sleep(delay).await;

                    let budget = poller.remaining(start.elapsed());
                    let file = match timeout(budget, self.store.get(&handle.remote_id)).await {
                        Ok(fetched) => fetched.map_err(|e| MediaChatError::Upload {
                            name: handle.remote_id.clone(),
                            detail: format!("status check failed: {}", e),
                        })?,
                        Err(_) => {
                            warn!("{} status check did not answer in time", handle.remote_id);
                            return Err(MediaChatError::MediaTimeout {
                                handle: handle.remote_id.clone(),
                                waited_secs: start.elapsed().as_secs(),
                            });
                        }
                    };
                    handle.refresh(&file);
                    self.progress.on_poll(
                        &handle.remote_id,
                        poller.polls(),
                        &handle.readiness.to_string(),
                    );
                }
            }
        }
    }

    /// Delete the remote file. Best-effort: failures and deletes that take
    /// longer than the store request timeout are logged, not returned.
    pub async fn release(&self, handle: MediaHandle) {
        match timeout(self.release_timeout, self.store.delete(&handle.remote_id)).await {
            Ok(Ok(())) => {
                info!("Deleted file {}", handle.uri);
                self.progress.on_release(&handle.remote_id, true);
            }
            Ok(Err(e)) => {
                warn!("Could not delete {}: {}", handle.remote_id, e);
                self.progress.on_release(&handle.remote_id, false);
            }
            Err(_) => {
                warn!(
                    "Deleting {} did not finish within {:?}; giving up",
                    handle.remote_id, self.release_timeout
                );
                self.progress.on_release(&handle.remote_id, false);
            }
        }
    }
}
