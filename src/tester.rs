use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{info, warn};

use crate::{
    constants::CONNECTIVITY_TIMEOUT,
    event::Event,
    socket::{ConnectionParams, Socket, SocketCallback, SocketWorker},
};

/// One-shot check that a server answers with pad data. Touches no shared status.
#[derive(Debug, Clone)]
pub struct ConnectivityTester {
    params: ConnectionParams,
    timeout: Duration,
}

impl ConnectivityTester {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            timeout: CONNECTIVITY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Blocks until pad data arrives or the timeout elapses.
    pub fn run_blocking(&self) -> bool {
        let success = Arc::new(Event::new());
        let signal = success.clone();
        let socket = Socket::new(
            &self.params,
            SocketCallback::pad_data_only(move |_| signal.set()),
        );
        let mut worker = SocketWorker::spawn(socket);
        let result = success.wait_for(self.timeout);
        worker.stop_and_join();

        if result {
            info!(
                "Connectivity test to {}:{} succeeded",
                self.params.host, self.params.port
            );
        } else {
            warn!(
                "Connectivity test to {}:{} timed out after {:?}",
                self.params.host, self.params.port, self.timeout
            );
        }
        result
    }

    /// Runs the test on a background thread and reports through exactly one callback.
    pub fn run(
        self,
        on_success: impl FnOnce() + Send + 'static,
        on_failure: impl FnOnce() + Send + 'static,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            if self.run_blocking() {
                on_success();
            } else {
                on_failure();
            }
        })
    }
}

/// Tests `params` with the default timeout. The returned handle may be dropped to detach.
pub fn test_communication(
    params: &ConnectionParams,
    on_success: impl FnOnce() + Send + 'static,
    on_failure: impl FnOnce() + Send + 'static,
) -> JoinHandle<()> {
    ConnectivityTester::new(params.clone()).run(on_success, on_failure)
}
