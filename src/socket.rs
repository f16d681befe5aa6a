//! One UDP endpoint driven by a single-threaded loop.
//!
//! The loop owns exactly one pending read and one keep-alive deadline. Every
//! [`SEND_INTERVAL`] it renews the subscription with a port-info and a pad-data request;
//! in between it blocks on the socket for at most the time left until that deadline.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{error, info, trace, warn};

use crate::{
    constants::*,
    protocol::{
        request,
        response::{self, Message},
    },
};

/// Where to reach the server and which pad to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub pad_index: u8,
    pub client_id: u32,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            pad_index: DEFAULT_PAD_INDEX,
            client_id: DEFAULT_CLIENT_ID,
        }
    }
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16, pad_index: u8, client_id: u32) -> Self {
        Self {
            host: host.into(),
            port,
            pad_index,
            client_id,
        }
    }
}

type Handler<T> = Box<dyn FnMut(T) + Send>;

/// Handlers invoked on the socket thread, one per response type.
pub struct SocketCallback {
    pub version: Handler<response::Version>,
    pub port_info: Handler<response::PortInfo>,
    pub pad_data: Handler<response::PadData>,
}

impl SocketCallback {
    /// Ignores everything except pad data.
    pub fn pad_data_only(pad_data: impl FnMut(response::PadData) + Send + 'static) -> Self {
        Self {
            version: Box::new(|_| {}),
            port_info: Box::new(|_| {}),
            pad_data: Box::new(pad_data),
        }
    }
}

/// Cloneable request to end a socket loop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Socket {
    sock: Option<UdpSocket>,
    send_endpoint: SocketAddr,
    client_id: u32,
    pad_index: u8,
    callback: SocketCallback,
    stop: StopHandle,
    send_deadline: Option<Instant>,
    receive_buffer: [u8; MAX_PACKET_SIZE],
}

impl Socket {
    /// Never fails: a bad address or bind error leaves a socket that simply never hears back.
    pub fn new(params: &ConnectionParams, callback: SocketCallback) -> Self {
        let ip = params.host.parse::<Ipv4Addr>().unwrap_or_else(|_| {
            error!("Invalid IPv4 address \"{}\" provided to socket", params.host);
            Ipv4Addr::UNSPECIFIED
        });

        let sock = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)) {
            Ok(sock) => Some(sock),
            Err(e) => {
                error!("Failed to bind UDP socket: {e}");
                None
            }
        };

        Self {
            sock,
            send_endpoint: SocketAddr::V4(SocketAddrV4::new(ip, params.port)),
            client_id: params.client_id,
            pad_index: params.pad_index,
            callback,
            stop: StopHandle::default(),
            send_deadline: None,
            receive_buffer: [0u8; MAX_PACKET_SIZE],
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.sock.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Arms the keep-alive deadline one interval after `from`.
    pub fn start_send(&mut self, from: Instant) {
        self.send_deadline = Some(from + SEND_INTERVAL);
    }

    pub fn send_deadline(&self) -> Option<Instant> {
        self.send_deadline
    }

    /// Runs until stopped. Unless [`start_send`](Self::start_send) armed it already,
    /// the first renewal goes out one interval after entry.
    pub fn run(&mut self) {
        if self.send_deadline.is_none() {
            self.start_send(Instant::now());
        }
        while !self.stop.is_stopped() {
            let now = Instant::now();
            let deadline = *self.send_deadline.get_or_insert(now);
            if now >= deadline {
                self.handle_send(deadline);
                continue;
            }
            let wait = (deadline - now).min(RECEIVE_POLL);
            self.receive(wait);
        }
    }

    fn handle_send(&mut self, deadline: Instant) {
        if let Some(sock) = &self.sock {
            let port_message =
                request::create(&request::PortInfo::single(self.pad_index), self.client_id);
            let pad_message =
                request::create(&request::PadData::by_id(self.pad_index), self.client_id);
            for message in [port_message, pad_message] {
                if let Err(e) = sock.send_to(&message, self.send_endpoint) {
                    trace!("Failed to send request to {}: {e}", self.send_endpoint);
                }
            }
        }
        // Re-arm from the previous deadline so send latency does not drift the cadence.
        self.start_send(deadline);
    }

    fn receive(&mut self, wait: Duration) {
        let Some(sock) = &self.sock else {
            thread::sleep(wait);
            return;
        };
        if let Err(e) = sock.set_read_timeout(Some(wait.max(Duration::from_millis(1)))) {
            warn!("Failed to set socket read timeout: {e}");
            thread::sleep(wait);
            return;
        }

        match sock.recv_from(&mut self.receive_buffer) {
            Ok((len, from)) => {
                trace!("Received {len} bytes from {from}");
                self.dispatch(len);
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            // ICMP port-unreachable shows up here on some platforms; keep listening.
            Err(e) => trace!("Receive failed: {e}"),
        }
    }

    fn dispatch(&mut self, len: usize) {
        match response::parse(&self.receive_buffer[..len]) {
            Some(Message::Version(version)) => (self.callback.version)(version),
            Some(Message::PortInfo(info)) => (self.callback.port_info)(info),
            Some(Message::PadData(data)) => (self.callback.pad_data)(data),
            None => {}
        }
    }
}

/// A socket running on its own thread. Dropping it stops the loop and joins the thread.
pub struct SocketWorker {
    stop: StopHandle,
    local_addr: Option<SocketAddr>,
    thread: Option<JoinHandle<()>>,
}

impl SocketWorker {
    pub fn spawn(mut socket: Socket) -> Self {
        let stop = socket.stop_handle();
        let local_addr = socket.local_addr();
        let thread = thread::Builder::new()
            .name("dsu-socket".into())
            .spawn(move || socket.run())
            .map_err(|e| error!("Failed to spawn socket thread: {e}"))
            .ok();

        Self {
            stop,
            local_addr,
            thread,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signals the loop and blocks until its thread has exited.
    pub fn stop_and_join(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Socket thread panicked");
            } else {
                info!("Socket thread joined");
            }
        }
    }
}

impl Drop for SocketWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::response::PadData;
    use std::sync::mpsc;

    fn loopback_params(port: u16) -> ConnectionParams {
        ConnectionParams::new("127.0.0.1", port, 0, 7)
    }

    #[test]
    fn test_stop_and_join() {
        let socket = Socket::new(&loopback_params(1), SocketCallback::pad_data_only(|_| {}));
        let mut worker = SocketWorker::spawn(socket);
        assert!(worker.local_addr().is_some());
        worker.stop_and_join();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_invalid_host_degrades_gracefully() {
        let bad = Socket::new(
            &ConnectionParams::new("not-an-ip", 26760, 0, 0),
            SocketCallback::pad_data_only(|_| {}),
        );
        assert_eq!(
            bad.send_endpoint,
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 26760))
        );
    }

    #[test]
    fn test_dispatches_pad_data() {
        let (tx, rx) = mpsc::channel();
        let socket = Socket::new(
            &loopback_params(1),
            SocketCallback::pad_data_only(move |data| {
                let _ = tx.send(data.packet_counter);
            }),
        );
        let addr = socket.local_addr().unwrap();
        let worker = SocketWorker::spawn(socket);

        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = SocketAddr::from(([127, 0, 0, 1], addr.port()));
        // Garbage first: it must be dropped without disturbing the loop.
        server.send_to(&[1, 2, 3], target).unwrap();
        let data = PadData {
            packet_counter: 9,
            ..Default::default()
        };
        server
            .send_to(&response::create(&data, 0), target)
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 9);
        drop(worker);
    }

    #[test]
    fn test_send_deadline_rearms_from_previous_expiry() {
        let mut socket = Socket::new(&loopback_params(1), SocketCallback::pad_data_only(|_| {}));
        let start = Instant::now();
        assert_eq!(socket.send_deadline(), None);
        socket.start_send(start);
        assert_eq!(socket.send_deadline(), Some(start + SEND_INTERVAL));
        socket.handle_send(start + SEND_INTERVAL);
        assert_eq!(socket.send_deadline(), Some(start + SEND_INTERVAL * 2));
    }

    #[test]
    fn test_run_keeps_armed_deadline() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = server.local_addr().unwrap().port();

        let mut socket = Socket::new(&loopback_params(port), SocketCallback::pad_data_only(|_| {}));
        // Already expired: the loop must send right away instead of waiting a full interval.
        socket.start_send(Instant::now() - SEND_INTERVAL);
        let worker = SocketWorker::spawn(socket);

        let mut buf = [0u8; MAX_PACKET_SIZE];
        let started = Instant::now();
        let (len, _) = server.recv_from(&mut buf).expect("keep-alive sent immediately");
        assert!(started.elapsed() < SEND_INTERVAL);
        assert!(len > crate::protocol::HEADER_SIZE);
        assert_eq!(crate::protocol::Header::decode(&buf[..len]).magic, CLIENT_MAGIC);
        drop(worker);
    }
}
