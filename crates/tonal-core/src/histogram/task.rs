//! Background histogram computation with observable state transitions.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::histogram::engine::Histogram;
use crate::image::PixelBuffer;
use crate::transform::progress::CancelToken;

/// Lifecycle of one histogram computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    Scheduled,
    Running,
    Done,
    Cancelled,
    Failed,
}

impl TaskState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }
}

/// Transition reported to the task's observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramEvent {
    /// Raised on the calling thread before the worker is scheduled.
    AboutToStart,
    /// Raised on the worker once it runs.
    Started,
    /// Raised on the worker when it ends. `success` is false for cancelled
    /// and failed runs.
    Finished { success: bool },
}

pub type EventCallback = Arc<dyn Fn(HistogramEvent) + Send + Sync>;

#[derive(Default)]
struct Shared {
    state: Mutex<TaskState>,
    result: Mutex<Option<Arc<Histogram>>>,
}

/// Computes the histogram of a shared pixel buffer on a dedicated thread.
///
/// Each `start` discards the previous result. The result becomes visible
/// only once the worker has finished the whole pass. Dropping the task
/// cancels and joins the worker.
pub struct HistogramTask {
    source: Arc<PixelBuffer>,
    shared: Arc<Shared>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
    observer: Option<EventCallback>,
}

impl HistogramTask {
    pub fn new(source: Arc<PixelBuffer>) -> Self {
        Self {
            source,
            shared: Arc::default(),
            cancel: CancelToken::new(),
            worker: None,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl Fn(HistogramEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn source(&self) -> &Arc<PixelBuffer> {
        &self.source
    }

    pub fn state(&self) -> TaskState {
        *self.shared.state.lock()
    }

    /// True once a run has completed without cancellation.
    pub fn is_valid(&self) -> bool {
        self.shared.result.lock().is_some()
    }

    pub fn histogram(&self) -> Option<Arc<Histogram>> {
        self.shared.result.lock().clone()
    }

    /// Schedule a computation. A run already in flight is cancelled and
    /// joined first.
    pub fn start(&mut self) -> Result<()> {
        self.stop();
        *self.shared.result.lock() = None;
        self.cancel = CancelToken::new();

        if let Some(observer) = &self.observer {
            observer(HistogramEvent::AboutToStart);
        }
        *self.shared.state.lock() = TaskState::Scheduled;

        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let observer = self.observer.clone();
        let notify = move |event| {
            if let Some(observer) = &observer {
                observer(event);
            }
        };

        let spawned = thread::Builder::new()
            .name("histogram".into())
            .spawn(move || {
                *shared.state.lock() = TaskState::Running;
                notify(HistogramEvent::Started);

                let outcome = if source.pixel_count() == 0 {
                    warn!("histogram source has no pixels");
                    TaskState::Failed
                } else {
                    match Histogram::accumulate(&source, &cancel) {
                        Some(histogram) => {
                            *shared.result.lock() = Some(Arc::new(histogram));
                            TaskState::Done
                        }
                        None => TaskState::Cancelled,
                    }
                };
                debug!(?outcome, pixels = source.pixel_count(), "histogram pass ended");

                *shared.state.lock() = outcome;
                notify(HistogramEvent::Finished {
                    success: outcome == TaskState::Done,
                });
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                *self.shared.state.lock() = TaskState::Failed;
                Err(e.into())
            }
        }
    }

    /// Ask the running worker to stop. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the current worker has finished and return the final
    /// state.
    pub fn wait(&mut self) -> TaskState {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("histogram worker panicked");
                *self.shared.state.lock() = TaskState::Failed;
                // The worker died before it could report the end of the run.
                if let Some(observer) = &self.observer {
                    observer(HistogramEvent::Finished { success: false });
                }
            }
        }
        self.state()
    }

    /// Run a computation to completion on the worker and return its result.
    pub fn compute(&mut self) -> Result<Option<Arc<Histogram>>> {
        self.start()?;
        self.wait();
        Ok(self.histogram())
    }

    fn stop(&mut self) {
        if self.worker.is_some() {
            self.cancel();
            self.wait();
        }
    }
}

impl Drop for HistogramTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::image::BitDepth;
    use std::sync::mpsc;

    fn recorder() -> (Arc<Mutex<Vec<HistogramEvent>>>, impl Fn(HistogramEvent) + Send + Sync + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (events, move |e| sink.lock().push(e))
    }

    #[test]
    fn test_compute_reports_transitions() {
        let image = Arc::new(PixelBuffer::from_u8(1, 2, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap());
        let (events, observer) = recorder();
        let mut task = HistogramTask::new(image).with_observer(observer);
        assert_eq!(task.state(), TaskState::Idle);
        assert!(!task.is_valid());

        let histogram = task.compute().unwrap().unwrap();
        assert_eq!(task.state(), TaskState::Done);
        assert!(task.is_valid());
        assert_eq!(histogram.count(Channel::Red, 0, 255), 2.0);
        assert_eq!(
            *events.lock(),
            vec![
                HistogramEvent::AboutToStart,
                HistogramEvent::Started,
                HistogramEvent::Finished { success: true },
            ]
        );
    }

    #[test]
    fn test_cancel_leaves_no_result() {
        let image = Arc::new(PixelBuffer::new(64, 64, BitDepth::U16).unwrap());
        let (go, wait_for_go) = mpsc::channel::<()>();
        let wait_for_go = Mutex::new(wait_for_go);
        let mut task = HistogramTask::new(image).with_observer(move |e| {
            if e == HistogramEvent::Started {
                let _ = wait_for_go.lock().recv();
            }
        });

        task.start().unwrap();
        task.cancel();
        go.send(()).unwrap();
        assert_eq!(task.wait(), TaskState::Cancelled);
        assert!(!task.is_valid());
        assert!(task.histogram().is_none());
    }

    #[test]
    fn test_empty_source_fails() {
        let image = Arc::new(PixelBuffer::new(0, 0, BitDepth::U8).unwrap());
        let (events, observer) = recorder();
        let mut task = HistogramTask::new(image).with_observer(observer);
        assert!(task.compute().unwrap().is_none());
        assert_eq!(task.state(), TaskState::Failed);
        assert_eq!(events.lock().last(), Some(&HistogramEvent::Finished { success: false }));
    }

    #[test]
    fn test_panicking_worker_reports_failure() {
        let image = Arc::new(PixelBuffer::new(4, 4, BitDepth::U8).unwrap());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut task = HistogramTask::new(image).with_observer(move |e| {
            if e == HistogramEvent::Started {
                panic!("observer failed");
            }
            sink.lock().push(e);
        });

        task.start().unwrap();
        assert_eq!(task.wait(), TaskState::Failed);
        assert!(task.histogram().is_none());
        assert_eq!(
            *events.lock(),
            vec![HistogramEvent::AboutToStart, HistogramEvent::Finished { success: false }]
        );
    }

    #[test]
    fn test_restart_replaces_result() {
        let image = Arc::new(PixelBuffer::new(4, 4, BitDepth::U8).unwrap());
        let mut task = HistogramTask::new(image);
        task.compute().unwrap();
        task.start().unwrap();
        assert_eq!(task.wait(), TaskState::Done);
        assert_eq!(task.histogram().unwrap().pixel_count(), 16);
    }
}
