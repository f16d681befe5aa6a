// cli_app.rs
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use anyhow::Context;
use dsu_input_bridge::{
    AppConfig, CalibrationConfigurationJob, CalibrationStatus, ConnectionParams,
    ConnectivityTester, DeviceRegistry, ParamPackage, UdpInput,
    constants::{CONNECTIVITY_TIMEOUT, ENGINE_NAME},
};
use tracing::warn;

use crate::Cli;

const PRINT_INTERVAL: Duration = Duration::from_millis(500);

/// Drives the library from the terminal until Ctrl+C or the command finishes.
pub struct CliApp {
    cfg: AppConfig,
    params: ConnectionParams,
    running_signal: Arc<AtomicBool>,
}

impl CliApp {
    /// Loads the config and applies command-line overrides.
    pub fn new(cli: &Cli) -> Self {
        let cfg = AppConfig::load().unwrap_or_else(|e| {
            warn!("Using default config: {e}");
            AppConfig::default()
        });

        let mut params = cfg.connection_params();
        if let Some(host) = &cli.host {
            params.host = host.clone();
        }
        if let Some(port) = cli.port {
            params.port = port;
        }
        if let Some(pad) = cli.pad {
            params.pad_index = pad;
        }
        if let Some(id) = cli.client_id {
            params.client_id = id;
        }

        println!("DSU Input Bridge - CLI");
        println!("----------------------------------------");
        println!("Server: {}:{}", params.host, params.port);
        println!("Pad index: {}", params.pad_index);
        println!("Client id: {}", params.client_id);

        Self {
            cfg,
            params,
            running_signal: Arc::new(AtomicBool::new(true)),
        }
    }

    fn install_ctrlc(&self) -> anyhow::Result<()> {
        let r = self.running_signal.clone();
        ctrlc::set_handler(move || {
            if r.load(Ordering::SeqCst) {
                println!("\nCtrl+C pressed. Stopping...");
                r.store(false, Ordering::SeqCst);
            } else {
                println!("\nCtrl+C pressed again. Already stopping.");
            }
        })
        .context("installing Ctrl+C handler")
    }

    /// Streams into a live status and prints samples as the emulator's devices would see them.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.install_ctrlc()?;

        let mut registry = DeviceRegistry::new();
        let input = UdpInput::init(&mut registry, &self.params);
        let touch = registry
            .create_touch(&self.cfg.touch_params())
            .context("touch factory not registered")?;
        let motion = registry
            .create_motion(&ParamPackage::new().with("engine", ENGINE_NAME))
            .context("motion factory not registered")?;

        println!("Streaming. Press Ctrl+C to stop.");
        while self.running_signal.load(Ordering::SeqCst) {
            let m = motion.status();
            let t = touch.status();
            println!(
                "accel ({:+.3}, {:+.3}, {:+.3})  gyro ({:+8.2}, {:+8.2}, {:+8.2})  touch {}",
                m.accel.x,
                m.accel.y,
                m.accel.z,
                m.gyro.x,
                m.gyro.y,
                m.gyro.z,
                if t.active {
                    format!("({:.3}, {:.3})", t.x, t.y)
                } else {
                    "-".into()
                }
            );
            thread::sleep(PRINT_INTERVAL);
        }

        input.shutdown(&mut registry);
        println!("\nStopped CLI app.");
        Ok(())
    }

    pub fn test(&mut self) -> anyhow::Result<()> {
        println!(
            "Testing connection (up to {} seconds)...",
            CONNECTIVITY_TIMEOUT.as_secs()
        );
        if ConnectivityTester::new(self.params.clone()).run_blocking() {
            println!("Success: the server is sending pad data.");
            Ok(())
        } else {
            anyhow::bail!(
                "no pad data received from {}:{}",
                self.params.host,
                self.params.port
            )
        }
    }

    /// Walks the user through both corners and persists the discovered bounds.
    pub fn calibrate(&mut self) -> anyhow::Result<()> {
        self.install_ctrlc()?;

        let (tx, rx) = mpsc::channel();
        let job = CalibrationConfigurationJob::new(
            &self.params,
            |status| match status {
                CalibrationStatus::Initialized => {}
                CalibrationStatus::Ready => println!("Connected. Touch the top-left corner."),
                CalibrationStatus::Stage1Completed => {
                    println!("Now touch the bottom-right corner.")
                }
                CalibrationStatus::Completed => println!("Calibration complete."),
            },
            move |data| {
                let _ = tx.send(data);
            },
        );
        println!("Waiting for the server...");

        let result = loop {
            if !self.running_signal.load(Ordering::SeqCst) {
                job.stop();
                break None;
            }
            match rx.recv_timeout(PRINT_INTERVAL) {
                Ok(data) => break Some(data),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break None,
            }
        };
        drop(job);

        let Some(data) = result else {
            println!("Calibration cancelled.");
            return Ok(());
        };
        println!(
            "Touch range: x {}..{}, y {}..{}",
            data.min_x, data.max_x, data.min_y, data.max_y
        );
        self.cfg.touch_calibration = Some(data);
        self.cfg.save().context("saving calibration")?;
        println!("Saved.");
        Ok(())
    }
}
