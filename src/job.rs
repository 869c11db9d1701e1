//! Background rescale runs with progress events and cooperative cancellation.
//!
//! One worker thread runs the page loop; the front end keeps its own thread
//! and reads [`JobEvent`]s from a channel, folding them into a [`JobStatus`].

use crate::file_ops::rescale_pdf_file;
use crate::options::RescaleOptions;
use crate::{PageProgress, RescaleSummary};
use crossbeam_channel::{unbounded, Receiver};
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Shared cancellation flag, checked once per page
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to rescale and where to put it
#[derive(Debug, Clone)]
pub struct RescaleRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: RescaleOptions,
}

/// Messages posted by the worker
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started { total: usize },
    Progress(PageProgress),
    Finished(RescaleSummary),
    Cancelled,
    Failed(String),
}

/// Front-end view of a run: idle -> processing -> done | cancelled | failed
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Processing { done: usize, total: usize },
    Done(RescaleSummary),
    Cancelled,
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Done(_) | JobStatus::Cancelled | JobStatus::Failed(_)
        )
    }

    /// Fold one worker event into the status. Terminal states are final.
    pub fn apply(&mut self, event: &JobEvent) {
        if self.is_terminal() {
            return;
        }

        *self = match event {
            JobEvent::Started { total } => JobStatus::Processing {
                done: 0,
                total: *total,
            },
            JobEvent::Progress(progress) => JobStatus::Processing {
                done: progress.page,
                total: progress.total,
            },
            JobEvent::Finished(summary) => JobStatus::Done(summary.clone()),
            JobEvent::Cancelled => JobStatus::Cancelled,
            JobEvent::Failed(message) => JobStatus::Failed(message.clone()),
        };
    }

    /// Completion in percent, for progress bars.
    pub fn percent(&self) -> f32 {
        match self {
            JobStatus::Processing { done, total } if *total > 0 => {
                *done as f32 * 100.0 / *total as f32
            }
            JobStatus::Done(_) => 100.0,
            _ => 0.0,
        }
    }
}

/// Handle to a running job
pub struct JobHandle {
    events: Receiver<JobEvent>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl JobHandle {
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Ask the worker to stop before its next page.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the worker exits, calling `on_event` for every event
    /// with the status it produced.
    pub fn wait_with<F>(mut self, mut on_event: F) -> JobStatus
    where
        F: FnMut(&JobEvent, &JobStatus),
    {
        let mut status = JobStatus::Idle;
        for event in self.events.iter() {
            status.apply(&event);
            on_event(&event, &status);
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Rescale worker panicked");
                if !status.is_terminal() {
                    status = JobStatus::Failed("worker thread panicked".to_string());
                }
            }
        }

        status
    }

    pub fn wait(self) -> JobStatus {
        self.wait_with(|_, _| {})
    }
}

/// Spawns rescale runs on a background thread
pub struct RescaleJob;

impl RescaleJob {
    pub fn spawn(request: RescaleRequest) -> io::Result<JobHandle> {
        Self::spawn_with_token(request, CancelToken::new())
    }

    /// Spawn with a caller-owned token, so the run can be cancelled from
    /// anywhere that holds a clone.
    pub fn spawn_with_token(request: RescaleRequest, cancel: CancelToken) -> io::Result<JobHandle> {
        let (tx, rx) = unbounded();
        let token = cancel.clone();

        let worker = thread::Builder::new()
            .name("rescale-worker".to_string())
            .spawn(move || {
                let progress_tx = tx.clone();
                let result = rescale_pdf_file(
                    &request.input,
                    &request.output,
                    &request.options,
                    &token,
                    |progress| {
                        let event = if progress.is_start() {
                            JobEvent::Started {
                                total: progress.total,
                            }
                        } else {
                            JobEvent::Progress(progress)
                        };
                        // A closed channel only means nobody is watching
                        let _ = progress_tx.send(event);
                    },
                );

                let final_event = match result {
                    Ok(summary) => JobEvent::Finished(summary),
                    Err(e) if e.is_cancelled() => {
                        info!("Rescale of {:?} cancelled", request.input);
                        JobEvent::Cancelled
                    }
                    Err(e) => {
                        error!("Rescale of {:?} failed: {}", request.input, e);
                        JobEvent::Failed(e.to_string())
                    }
                };
                let _ = tx.send(final_event);
            })?;

        Ok(JobHandle {
            events: rx,
            cancel,
            worker: Some(worker),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RescaleSummary {
        RescaleSummary {
            pages: 2,
            input_bytes: 10,
            output_bytes: 20,
        }
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn status_walks_through_processing_to_done() {
        let mut status = JobStatus::default();
        assert_eq!(status, JobStatus::Idle);
        assert_eq!(status.percent(), 0.0);

        status.apply(&JobEvent::Started { total: 4 });
        assert_eq!(status, JobStatus::Processing { done: 0, total: 4 });

        status.apply(&JobEvent::Progress(PageProgress { page: 1, total: 4 }));
        assert_eq!(status.percent(), 25.0);

        status.apply(&JobEvent::Finished(summary()));
        assert_eq!(status, JobStatus::Done(summary()));
        assert_eq!(status.percent(), 100.0);
    }

    #[test]
    fn terminal_states_ignore_late_events() {
        let mut status = JobStatus::Idle;
        status.apply(&JobEvent::Cancelled);
        status.apply(&JobEvent::Progress(PageProgress { page: 3, total: 4 }));
        status.apply(&JobEvent::Finished(summary()));
        assert_eq!(status, JobStatus::Cancelled);

        let mut failed = JobStatus::Idle;
        failed.apply(&JobEvent::Failed("boom".to_string()));
        failed.apply(&JobEvent::Started { total: 1 });
        assert_eq!(failed, JobStatus::Failed("boom".to_string()));
    }

    #[test]
    fn missing_input_reports_failure() {
        let request = RescaleRequest {
            input: PathBuf::from("/nonexistent/dir/input.pdf"),
            output: PathBuf::from("/nonexistent/dir/output.pdf"),
            options: RescaleOptions::default(),
        };

        let status = RescaleJob::spawn(request).unwrap().wait();
        match status {
            JobStatus::Failed(message) => assert!(message.contains("not found")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
