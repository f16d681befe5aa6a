//! In-process DSU server on loopback for integration tests.
#![allow(dead_code)]

use std::{
    net::{SocketAddr, UdpSocket},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use dsu_input_bridge::{
    ConnectionParams,
    constants::CLIENT_MAGIC,
    protocol::{
        Type,
        response::{self, Accelerometer, PadData, TouchPad},
    },
};

pub fn pad_data(counter: u32, touch: Option<(u16, u16)>) -> PadData {
    PadData {
        packet_counter: counter,
        accel: Accelerometer {
            x: 0.5,
            y: 1.0,
            z: -0.25,
        },
        touch_1: match touch {
            Some((x, y)) => TouchPad {
                is_active: 1,
                id: 0,
                x,
                y,
            },
            None => TouchPad::default(),
        },
        ..Default::default()
    }
}

/// Socket addresses bound to 0.0.0.0 are reached through loopback.
pub fn loopback(addr: SocketAddr) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], addr.port()))
}

pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

/// A request seen by the server: its type and who sent it.
#[derive(Debug, Clone, Copy)]
pub struct Seen {
    pub ty: Type,
    pub from: SocketAddr,
}

/// Records every client request and optionally answers pad-data requests with a script.
pub struct FakeServer {
    sock: Arc<UdpSocket>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    pub requests: mpsc::Receiver<Seen>,
}

impl FakeServer {
    /// `replies` are sent, in order, each time a pad-data request arrives.
    pub fn start(replies: Vec<PadData>) -> Self {
        let sock = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
        sock.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, requests) = mpsc::channel();

        let thread = {
            let sock = sock.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 128];
                while !stop.load(Ordering::SeqCst) {
                    let Ok((len, from)) = sock.recv_from(&mut buf) else {
                        continue;
                    };
                    if len < 20 || u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) != CLIENT_MAGIC {
                        continue;
                    }
                    let raw = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
                    let Some(ty) = Type::from_u32(raw) else {
                        continue;
                    };
                    let _ = tx.send(Seen { ty, from });
                    if ty == Type::PadData {
                        for reply in &replies {
                            let _ = sock.send_to(&response::create(reply, 1), from);
                            thread::sleep(Duration::from_millis(5));
                        }
                    }
                }
            })
        };

        Self {
            sock,
            stop,
            thread: Some(thread),
            requests,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.sock.local_addr().unwrap()
    }

    pub fn params(&self) -> ConnectionParams {
        ConnectionParams::new("127.0.0.1", self.addr().port(), 0, 24872)
    }

    pub fn send(&self, to: SocketAddr, data: &PadData) {
        self.sock
            .send_to(&response::create(data, 1), loopback(to))
            .unwrap();
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
