//! Owns the single in-flight download and the channels to its worker

use std::path::PathBuf;

use tokio::{
    runtime::Handle,
    sync::{
        mpsc::{UnboundedReceiver, error::TryRecvError, unbounded_channel},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::command::build_args;
use crate::config::FolderStore;
use crate::downloader::{WorkerEvent, spawn_download};
use crate::error::{DownloadError, Result};
use crate::model::{DownloadOutcome, DownloadRequest};

/// Result of pressing Stop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopRequest {
    /// The termination request was handed to the running process
    Requested,
    /// A stop is already on its way
    AlreadyRequested,
    /// No download is running, or its process has already exited
    NothingToStop,
}

/// State kept while a worker is alive
struct ActiveDownload {
    destination: PathBuf,
    cancel: Option<oneshot::Sender<()>>,
    events: UnboundedReceiver<WorkerEvent>,
    worker: JoinHandle<()>,
}

/// Runs at most one yt-dlp process at a time and persists the folder of successful runs
pub struct Supervisor {
    runtime: Handle,
    program: Option<PathBuf>,
    store: FolderStore,
    active: Option<ActiveDownload>,
}

impl Supervisor {
    pub fn new(runtime: Handle, program: Option<PathBuf>, store: FolderStore) -> Self {
        Self {
            runtime,
            program,
            store,
            active: None,
        }
    }

    pub fn program(&self) -> Option<&PathBuf> {
        self.program.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Validates `request` and launches yt-dlp for it, returning the arguments used
    pub fn start(&mut self, request: &DownloadRequest) -> Result<Vec<String>> {
        let program = self
            .program
            .clone()
            .ok_or_else(|| DownloadError::ExecutableNotFound("yt-dlp".to_string()))?;
        request.validate()?;
        let args = build_args(request);
        self.start_program(program, args.clone(), request.destination.clone())?;
        Ok(args)
    }

    /// Launches `program` unless a download is already running
    pub(crate) fn start_program(
        &mut self,
        program: PathBuf,
        args: Vec<String>,
        destination: PathBuf,
    ) -> Result<()> {
        if self.is_running() {
            return Err(DownloadError::AlreadyRunning);
        }

        let (events_tx, events) = unbounded_channel();
        let (cancel, cancel_rx) = oneshot::channel();
        info!(program = %program.display(), ?args, "starting download");
        let worker = self
            .runtime
            .spawn(spawn_download(program, args, events_tx, cancel_rx));

        self.active = Some(ActiveDownload {
            destination,
            cancel: Some(cancel),
            events,
            worker,
        });
        Ok(())
    }

    /// Asks the running process to terminate; never blocks
    pub fn stop(&mut self) -> StopRequest {
        let Some(active) = self.active.as_mut() else {
            return StopRequest::NothingToStop;
        };
        // The worker drops its receiver once the child has exited.
        if active.cancel.as_ref().is_some_and(|cancel| cancel.is_closed()) {
            return StopRequest::NothingToStop;
        }
        let Some(cancel) = active.cancel.take() else {
            return StopRequest::AlreadyRequested;
        };
        match cancel.send(()) {
            Ok(()) => StopRequest::Requested,
            Err(()) => StopRequest::NothingToStop,
        }
    }

    /// Drains pending worker events without blocking. When the run has
    /// finished, the folder is saved on success and the supervisor goes idle.
    pub fn poll(&mut self) -> Vec<WorkerEvent> {
        let mut drained = Vec::new();
        let Some(active) = self.active.as_mut() else {
            return drained;
        };

        let finished = loop {
            match active.events.try_recv() {
                Ok(WorkerEvent::Finished(outcome)) => break Some(outcome),
                Ok(event) => drained.push(event),
                Err(TryRecvError::Empty) => break None,
                Err(TryRecvError::Disconnected) => {
                    let reason = if active.worker.is_finished() {
                        "download worker stopped without reporting a result"
                    } else {
                        "download worker closed its channel"
                    };
                    break Some(DownloadOutcome::Error(DownloadError::Unexpected(
                        reason.to_string(),
                    )));
                }
            }
        };

        if let Some(outcome) = finished {
            if let Some(active) = self.active.take() {
                self.finish(&outcome, active.destination);
            }
            drained.push(WorkerEvent::Finished(outcome));
        }
        drained
    }

    fn finish(&self, outcome: &DownloadOutcome, destination: PathBuf) {
        if !outcome.is_success() {
            return;
        }
        match self.store.save(&destination) {
            Ok(()) => info!(folder = %destination.display(), "saved last folder"),
            Err(e) => warn!(path = %self.store.path().display(), "could not save last folder: {e}"),
        }
    }
}
