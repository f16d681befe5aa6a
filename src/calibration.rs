//! Interactive discovery of a touch panel's raw coordinate range.
//!
//! The user touches the top-left corner, then the bottom-right one. The job listens to
//! pad data on its own short-lived socket and reports each step as it happens.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use tracing::{debug, error, info};

use crate::{
    constants::CALIBRATION_THRESHOLD,
    event::Event,
    protocol::response::TouchPad,
    socket::{ConnectionParams, Socket, SocketCallback, SocketWorker},
    status::CalibrationData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    Initialized,
    /// The server is streaming; waiting for the first touch.
    Ready,
    /// The minimum corner is recorded; waiting for the opposite corner.
    Stage1Completed,
    Completed,
}

/// Outcome of feeding one sample to a [`Calibrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: CalibrationStatus,
    /// States entered while handling the sample, in order.
    pub entered: Vec<CalibrationStatus>,
    pub result: Option<CalibrationData>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        !self.entered.is_empty()
    }
}

/// Pure calibration state machine fed one pad-data sample at a time.
///
/// A single sample may pass through several states: the very first packet both
/// confirms the link and, when it carries a touch, records the minimum corner.
#[derive(Debug, Clone)]
pub struct Calibrator {
    status: CalibrationStatus,
    min_x: u16,
    min_y: u16,
    threshold: u16,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::with_threshold(CALIBRATION_THRESHOLD)
    }
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(threshold: u16) -> Self {
        Self {
            status: CalibrationStatus::Initialized,
            min_x: u16::MAX,
            min_y: u16::MAX,
            threshold,
        }
    }

    pub fn status(&self) -> CalibrationStatus {
        self.status
    }

    pub fn advance(&mut self, touch: &TouchPad) -> Transition {
        let mut entered = Vec::new();
        let mut result = None;

        // Any packet at all proves the link is up.
        if self.status == CalibrationStatus::Initialized {
            self.status = CalibrationStatus::Ready;
            entered.push(self.status);
        }

        if self.status != CalibrationStatus::Completed && touch.is_active != 0 {
            debug!("Current touch: {} {}", touch.x, touch.y);
            self.min_x = self.min_x.min(touch.x);
            self.min_y = self.min_y.min(touch.y);

            if self.status == CalibrationStatus::Ready {
                self.status = CalibrationStatus::Stage1Completed;
                entered.push(self.status);
            }
            if touch.x - self.min_x > self.threshold && touch.y - self.min_y > self.threshold {
                result = Some(CalibrationData {
                    min_x: self.min_x,
                    min_y: self.min_y,
                    max_x: touch.x,
                    max_y: touch.y,
                });
                self.status = CalibrationStatus::Completed;
                entered.push(self.status);
            }
        }

        Transition {
            status: self.status,
            entered,
            result,
        }
    }
}

/// Runs a [`Calibrator`] against live pad data until it completes or is stopped.
///
/// A cancelled job simply never calls the data callback.
pub struct CalibrationConfigurationJob {
    complete: Arc<Event>,
    thread: Option<JoinHandle<()>>,
}

impl CalibrationConfigurationJob {
    pub fn new(
        params: &ConnectionParams,
        mut status_callback: impl FnMut(CalibrationStatus) + Send + 'static,
        mut data_callback: impl FnMut(CalibrationData) + Send + 'static,
    ) -> Self {
        let complete = Arc::new(Event::new());
        let params = params.clone();

        let signal = complete.clone();
        let mut calibrator = Calibrator::new();
        let callback = SocketCallback::pad_data_only(move |data| {
            let step = calibrator.advance(&data.touch_1);
            if let Some(result) = step.result {
                info!("Touch calibration finished: {result:?}");
                data_callback(result);
            }
            for status in &step.entered {
                status_callback(*status);
            }
            if step.status == CalibrationStatus::Completed {
                signal.set();
            }
        });

        let waiter = complete.clone();
        let thread = thread::Builder::new()
            .name("dsu-calibration".into())
            .spawn(move || {
                let mut worker = SocketWorker::spawn(Socket::new(&params, callback));
                waiter.wait();
                worker.stop_and_join();
            })
            .map_err(|e| error!("Failed to spawn calibration thread: {e}"))
            .ok();

        Self { complete, thread }
    }

    /// Cancels the job; a finished job is unaffected.
    pub fn stop(&self) {
        self.complete.set();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for CalibrationConfigurationJob {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Calibration thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(x: u16, y: u16) -> TouchPad {
        TouchPad {
            is_active: 1,
            id: 0,
            x,
            y,
        }
    }

    const IDLE: TouchPad = TouchPad {
        is_active: 0,
        id: 0,
        x: 0,
        y: 0,
    };

    #[test]
    fn test_first_packet_with_touch_records_minimum() {
        let t = CALIBRATION_THRESHOLD;
        let mut calibrator = Calibrator::new();
        let step = calibrator.advance(&touch(100, 100));
        assert_eq!(step.status, CalibrationStatus::Stage1Completed);
        assert_eq!(
            step.entered,
            vec![CalibrationStatus::Ready, CalibrationStatus::Stage1Completed]
        );
        assert_eq!(step.result, None);

        let step = calibrator.advance(&touch(100 + t + 1, 100 + t + 1));
        assert_eq!(step.entered, vec![CalibrationStatus::Completed]);
        assert_eq!(
            step.result,
            Some(CalibrationData {
                min_x: 100,
                min_y: 100,
                max_x: 100 + t + 1,
                max_y: 100 + t + 1,
            })
        );
    }

    #[test]
    fn test_first_idle_packet_only_readies() {
        let mut calibrator = Calibrator::new();
        let step = calibrator.advance(&IDLE);
        assert_eq!(step.status, CalibrationStatus::Ready);
        assert_eq!(step.entered, vec![CalibrationStatus::Ready]);
        assert_eq!(step.result, None);
    }

    #[test]
    fn test_inactive_touch_keeps_ready() {
        let mut calibrator = Calibrator::new();
        calibrator.advance(&IDLE);
        let step = calibrator.advance(&IDLE);
        assert_eq!(step.status, CalibrationStatus::Ready);
        assert!(!step.changed());
    }

    #[test]
    fn test_full_sequence() {
        let t = CALIBRATION_THRESHOLD;
        let mut calibrator = Calibrator::new();
        calibrator.advance(&IDLE);

        let step = calibrator.advance(&touch(100, 100));
        assert_eq!(step.status, CalibrationStatus::Stage1Completed);
        assert!(step.changed());

        // Resting on the same spot must not complete.
        let step = calibrator.advance(&touch(100 + t, 100 + t));
        assert_eq!(step.status, CalibrationStatus::Stage1Completed);
        assert!(!step.changed());

        let step = calibrator.advance(&touch(100 + t + 1, 100 + t + 1));
        assert_eq!(step.status, CalibrationStatus::Completed);
        assert_eq!(
            step.result,
            Some(CalibrationData {
                min_x: 100,
                min_y: 100,
                max_x: 100 + t + 1,
                max_y: 100 + t + 1,
            })
        );
    }

    #[test]
    fn test_minimum_tracks_lower_samples() {
        let mut calibrator = Calibrator::with_threshold(10);
        calibrator.advance(&IDLE);
        calibrator.advance(&touch(50, 50));
        calibrator.advance(&touch(20, 30));
        let step = calibrator.advance(&touch(45, 45));
        assert_eq!(
            step.result,
            Some(CalibrationData {
                min_x: 20,
                min_y: 30,
                max_x: 45,
                max_y: 45,
            })
        );
    }

    #[test]
    fn test_one_axis_past_threshold_is_not_enough() {
        let mut calibrator = Calibrator::with_threshold(10);
        calibrator.advance(&IDLE);
        calibrator.advance(&touch(0, 0));
        let step = calibrator.advance(&touch(500, 5));
        assert_eq!(step.status, CalibrationStatus::Stage1Completed);
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut calibrator = Calibrator::with_threshold(0);
        calibrator.advance(&IDLE);
        calibrator.advance(&touch(0, 0));
        assert!(calibrator.advance(&touch(1, 1)).result.is_some());
        let step = calibrator.advance(&touch(900, 900));
        assert_eq!(step.status, CalibrationStatus::Completed);
        assert!(!step.changed());
        assert_eq!(step.result, None);
    }

    #[test]
    fn test_drop_cancels_and_joins() {
        // Nothing listens here, so the job can only end through cancellation.
        let params = ConnectionParams::new("127.0.0.1", 9, 0, 1);
        let job = CalibrationConfigurationJob::new(&params, |_| {}, |_| {});
        assert!(!job.is_finished());
        drop(job);
    }

    #[test]
    fn test_stop_finishes_job() {
        let params = ConnectionParams::new("127.0.0.1", 9, 0, 1);
        let job = CalibrationConfigurationJob::new(&params, |_| {}, |_| {});
        job.stop();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !job.is_finished() && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(job.is_finished());
    }
}
