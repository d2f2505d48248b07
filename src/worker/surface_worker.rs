//! Producer thread running the surface pipeline.
//!
//! Each cycle drains the action queue (applied on this thread, outside the
//! queue lock), waits for the next sensor frame, runs the pipeline and
//! publishes the filtered frame, the gradient field, a grayscale depth view
//! and the color frame through their single-slot handoffs.
use super::actions::{ActionQueue, FilterAction, FilterControl};
use super::handoff::{Handoff, Published};
use crate::diagnostics::CycleReport;
use crate::gradient::GradientField;
use crate::image::{ColorFrame, GrayFrame, ImageF32, SensorFrame};
use crate::pipeline::SurfacePipeline;
use crate::types::{Resolution, Roi};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Receive timeout; bounds how long shutdown and queued actions wait when no
/// frames arrive.
const RECV_TIMEOUT: Duration = Duration::from_millis(20);

/// State shared between the producer thread and its consumers.
#[derive(Default)]
struct WorkerShared {
    actions: ActionQueue,
    filtered: Handoff<Published<ImageF32>>,
    gradient: Handoff<Published<GradientField>>,
    depth_view: Handoff<Published<GrayFrame>>,
    color: Handoff<Published<ColorFrame>>,
    reports: Handoff<CycleReport>,
    stabilized: AtomicBool,
    applied_epoch: AtomicU64,
    shutdown: AtomicBool,
    finished: AtomicBool,
}

pub struct SurfaceWorker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
    resolution: Resolution,
    initial_roi: Roi,
}

impl SurfaceWorker {
    /// Move `pipeline` onto a new producer thread fed by `frames`.
    ///
    /// The thread stops when [`shutdown`](Self::shutdown) is called, the
    /// worker is dropped, or every frame sender is gone.
    pub fn spawn(pipeline: SurfacePipeline, frames: Receiver<SensorFrame>) -> Self {
        let shared = Arc::new(WorkerShared::default());
        let resolution = pipeline.resolution();
        let initial_roi = pipeline.roi();
        let handle = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("surface-producer".into())
                .spawn(move || run(pipeline, frames, &shared))
                .ok()
        };
        if handle.is_none() {
            error!("SurfaceWorker: failed to spawn producer thread");
            shared.finished.store(true, Ordering::Release);
        }
        Self {
            shared,
            handle,
            resolution,
            initial_roi,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// ROI the pipeline was created with.
    pub fn initial_roi(&self) -> Roi {
        self.initial_roi
    }

    pub fn try_receive_filtered(&self) -> Option<Published<ImageF32>> {
        self.shared.filtered.try_receive()
    }

    pub fn try_receive_gradient(&self) -> Option<Published<GradientField>> {
        self.shared.gradient.try_receive()
    }

    /// Grayscale render of the latest filtered frame.
    pub fn try_receive_depth_view(&self) -> Option<Published<GrayFrame>> {
        self.shared.depth_view.try_receive()
    }

    pub fn try_receive_color(&self) -> Option<Published<ColorFrame>> {
        self.shared.color.try_receive()
    }

    pub fn try_receive_report(&self) -> Option<CycleReport> {
        self.shared.reports.try_receive()
    }

    /// Readiness of the surface as of the last completed cycle.
    pub fn is_stabilized(&self) -> bool {
        self.shared.stabilized.load(Ordering::Acquire)
    }

    /// Number of actions the producer has applied so far.
    pub fn applied_epoch(&self) -> u64 {
        self.shared.applied_epoch.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        !self.shared.finished.load(Ordering::Acquire)
    }

    /// Stop the producer thread and wait for it.
    pub fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("SurfaceWorker: producer thread panicked");
            }
        }
    }
}

impl FilterControl for SurfaceWorker {
    fn perform(&self, action: FilterAction) -> u64 {
        self.shared.actions.push(action)
    }
}

impl Drop for SurfaceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut pipeline: SurfacePipeline, frames: Receiver<SensorFrame>, shared: &WorkerShared) {
    info!(
        "SurfaceWorker: producer started ({} roi {})",
        pipeline.resolution(),
        pipeline.roi()
    );
    let mut epoch = 0u64;
    while !shared.shutdown.load(Ordering::Acquire) {
        let (actions, requested) = shared.actions.drain();
        if !actions.is_empty() {
            for action in actions {
                action.apply(&mut pipeline);
            }
            epoch = requested;
            shared.applied_epoch.store(epoch, Ordering::Release);
            shared
                .stabilized
                .store(pipeline.is_stabilized(), Ordering::Release);
        }

        let frame = match frames.recv_timeout(RECV_TIMEOUT) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("SurfaceWorker: frame source disconnected");
                break;
            }
        };

        let report = pipeline.process(frame.depth.as_view());
        let stabilized = pipeline.is_stabilized();
        shared.stabilized.store(stabilized, Ordering::Release);
        if report.processed {
            let cycle = report.cycle;
            shared.gradient.send(Published {
                cycle,
                epoch,
                stabilized,
                value: pipeline.gradient().clone(),
            });
            shared.depth_view.send(Published {
                cycle,
                epoch,
                stabilized,
                value: pipeline.depth_view(),
            });
            if let Some(color) = frame.color {
                shared.color.send(Published {
                    cycle,
                    epoch,
                    stabilized,
                    value: color,
                });
            }
            // Last, so whoever sees cycle `n` here finds the other artifacts
            // of cycle `n` or later already published.
            shared.filtered.send(Published {
                cycle,
                epoch,
                stabilized,
                value: pipeline.filtered().clone(),
            });
        } else {
            debug!("SurfaceWorker: cycle {} dropped", report.cycle);
        }
        shared.reports.send(report);
    }
    shared.finished.store(true, Ordering::Release);
    info!("SurfaceWorker: producer stopped after {} cycles", pipeline.cycle());
}
