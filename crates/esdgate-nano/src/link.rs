//! Serial link lifecycle and command writer.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use esdgate_core::types::FootState;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::error::{LinkError, Result};
use crate::protocol::{self, LineEvent};

/// Poll interval of the blocking read loop. The serial port read timeout is
/// set to this value so the reader wakes regularly to check for shutdown.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Inbound lines longer than this are dropped; bounds memory on a
/// chattering port.
const MAX_LINE_LENGTH: usize = 256;

/// Connection state of the link.
///
/// Transitions are driven only by inbound line data and explicit
/// [`NanoLink::disconnect`]. There is no re-entry from `Connected` back to
/// `Handshaking`; construct a new link to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No reader running; commands are dropped.
    Disconnected,

    /// Reader running, waiting for the handshake banner.
    Handshaking,

    /// Handshake banner received; commands are delivered.
    Connected,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "Disconnected"),
            LinkState::Handshaking => write!(f, "Handshaking"),
            LinkState::Connected => write!(f, "Connected"),
        }
    }
}

/// Line-protocol link to the ESD test-hardware controller.
///
/// Opening a link spawns one long-lived background reader for the life of
/// the connection. The reader assembles lines on `\n`, updates the link
/// state on the handshake banner, and publishes foot status over a watch
/// channel. Transient read or decode faults are swallowed; a single bad
/// byte never terminates the link.
pub struct NanoLink {
    writer: Mutex<Box<dyn Write + Send>>,
    state_tx: Arc<watch::Sender<LinkState>>,
    state_rx: watch::Receiver<LinkState>,
    feet_rx: watch::Receiver<FootState>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    reader: Option<thread::JoinHandle<()>>,
}

impl NanoLink {
    /// Open the serial port and start the background reader.
    ///
    /// The returned link is still [`LinkState::Handshaking`]; call
    /// [`handshake`](Self::handshake) to wait for the controller's banner.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Open`] if the port cannot be opened or cloned
    /// for writing.
    pub fn open(port: &str, baud: u32) -> Result<Self> {
        let serial = serialport::new(port, baud)
            .timeout(READ_POLL_INTERVAL)
            .open()
            .map_err(|e| LinkError::open(port, e.to_string()))?;
        let writer = serial
            .try_clone()
            .map_err(|e| LinkError::open(port, e.to_string()))?;
        info!(port, baud, "serial port opened");
        Ok(Self::from_transport(serial, writer))
    }

    /// Build a link over an arbitrary transport. Used by tests and by
    /// alternative transports; [`open`](Self::open) is the production path.
    ///
    /// The reader must either return `TimedOut`/`WouldBlock` periodically
    /// (as a serial port with a read timeout does) or reach end-of-stream;
    /// a reader that blocks forever delays [`disconnect`](Self::disconnect).
    pub fn from_transport<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(LinkState::Handshaking);
        let (feet_tx, feet_rx) = watch::channel(FootState::default());
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let state_tx = Arc::new(state_tx);
        let reader_state = Arc::clone(&state_tx);
        let handle = thread::spawn(move || read_loop(reader, &reader_state, &feet_tx, &shutdown_rx));

        Self {
            writer: Mutex::new(Box::new(writer)),
            state_tx,
            state_rx,
            feet_rx,
            shutdown_tx: Some(shutdown_tx),
            reader: Some(handle),
        }
    }

    /// Wait for the controller's handshake banner.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::HandshakeTimeout`] if the banner does not
    /// arrive in time. The link is then disconnected and every command
    /// becomes a no-op; construct a new link to retry.
    pub async fn handshake(&mut self, timeout: Duration) -> Result<()> {
        let mut state_rx = self.state_rx.clone();
        let connected = async {
            loop {
                if *state_rx.borrow_and_update() == LinkState::Connected {
                    return true;
                }
                if state_rx.changed().await.is_err() {
                    return false;
                }
            }
        };

        match tokio::time::timeout(timeout, connected).await {
            Ok(true) => {
                info!("controller handshake complete");
                Ok(())
            }
            _ => {
                warn!(?timeout, "controller handshake timed out");
                self.disconnect();
                Err(LinkError::HandshakeTimeout(timeout))
            }
        }
    }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        *self.state_rx.borrow()
    }

    /// True once the handshake banner has been observed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Last foot status reported by the controller.
    #[must_use]
    pub fn foot_state(&self) -> FootState {
        *self.feet_rx.borrow()
    }

    /// Subscribe to foot status updates.
    #[must_use]
    pub fn feet_watch(&self) -> watch::Receiver<FootState> {
        self.feet_rx.clone()
    }

    /// Ask the controller to begin a test.
    pub fn begin_test(&self) {
        self.send(protocol::CMD_BEGIN_TEST);
    }

    /// Ask the controller to end the running test.
    pub fn end_test(&self) {
        self.send(protocol::CMD_END_TEST);
    }

    /// Ask the controller to hold the gate open for `seconds`.
    pub fn trigger_gate(&self, seconds: u64) {
        self.send(&protocol::gate_command(seconds));
    }

    /// Fire-and-forget command write. Dropped with a log line unless the
    /// link is connected; write faults are logged, never propagated.
    fn send(&self, command: &str) {
        if !self.is_connected() {
            debug!(command, state = %self.state(), "link not connected; command dropped");
            return;
        }
        match self.writer.lock() {
            Ok(mut writer) => {
                if let Err(error) = writer
                    .write_all(command.as_bytes())
                    .and_then(|()| writer.flush())
                {
                    warn!(command, %error, "serial write failed");
                }
            }
            Err(_) => warn!(command, "serial writer lock poisoned; command dropped"),
        }
    }

    /// Stop the background reader and mark the link disconnected.
    ///
    /// Reachable from any state and idempotent.
    pub fn disconnect(&mut self) {
        if let Some(shutdown) = self.shutdown_tx.take() {
            shutdown.send(()).ok();
        }
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("serial reader thread panicked");
            }
        }
        if self.state() != LinkState::Disconnected {
            self.state_tx.send(LinkState::Disconnected).ok();
            debug!("serial link disconnected");
        }
    }
}

impl Drop for NanoLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Blocking read loop run on the reader thread.
///
/// Characters are assembled into lines on `\n` (`\r` is discarded). The
/// loop exits on an explicit shutdown signal or end-of-stream; every other
/// read fault is swallowed and the loop continues.
fn read_loop<R: Read>(
    mut reader: R,
    state: &watch::Sender<LinkState>,
    feet: &watch::Sender<FootState>,
    shutdown: &mpsc::Receiver<()>,
) {
    let mut line = String::new();
    let mut buf = [0u8; 1];

    loop {
        match shutdown.try_recv() {
            Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        match reader.read(&mut buf) {
            Ok(0) => {
                trace!("serial reader reached end of stream");
                break;
            }
            Ok(_) => match buf[0] {
                b'\n' => {
                    handle_line(&line, state, feet);
                    line.clear();
                }
                b'\r' => {}
                byte => {
                    line.push(byte as char);
                    if line.len() > MAX_LINE_LENGTH {
                        trace!("oversized line dropped");
                        line.clear();
                    }
                }
            },
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(error) => trace!(%error, "serial read fault ignored"),
        }
    }
}

fn handle_line(line: &str, state: &watch::Sender<LinkState>, feet: &watch::Sender<FootState>) {
    match protocol::parse_line(line) {
        LineEvent::Handshake => {
            debug!("handshake banner received");
            state.send(LinkState::Connected).ok();
        }
        LineEvent::Status(sample) => {
            trace!(left = ?sample.left, right = ?sample.right, "foot status");
            feet.send(sample).ok();
        }
        LineEvent::Unrecognized => {
            if *state.borrow() == LinkState::Connected {
                trace!(line, "unrecognized line; feet reset");
                feet.send(FootState::contact(false, false)).ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};

    /// Read half backed by a channel of byte chunks, emulating a serial
    /// port with a read timeout. Dropping the sender is end-of-stream.
    struct ChannelReader {
        rx: Receiver<Vec<u8>>,
        pending: VecDeque<u8>,
    }

    impl Read for ChannelReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            loop {
                if let Some(byte) = self.pending.pop_front() {
                    buf[0] = byte;
                    return Ok(1);
                }
                match self.rx.recv_timeout(Duration::from_millis(5)) {
                    Ok(chunk) => self.pending.extend(chunk),
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "poll"));
                    }
                    Err(RecvTimeoutError::Disconnected) => return Ok(0),
                }
            }
        }
    }

    /// Write half capturing everything sent to the controller.
    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl SharedWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_link() -> (NanoLink, Sender<Vec<u8>>, SharedWriter) {
        let (tx, rx) = channel();
        let reader = ChannelReader {
            rx,
            pending: VecDeque::new(),
        };
        let writer = SharedWriter::default();
        let link = NanoLink::from_transport(reader, writer.clone());
        (link, tx, writer)
    }

    async fn next_feet(rx: &mut watch::Receiver<FootState>) -> FootState {
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("foot update not received")
            .expect("feet channel closed");
        *rx.borrow()
    }

    #[tokio::test]
    async fn connects_only_after_the_banner() {
        let (mut link, tx, _writer) = test_link();
        assert_eq!(link.state(), LinkState::Handshaking);

        tx.send(b"Connected\n".to_vec()).unwrap();
        link.handshake(Duration::from_secs(2)).await.unwrap();
        assert!(link.is_connected());
    }

    #[tokio::test]
    async fn status_lines_do_not_complete_the_handshake() {
        let (mut link, tx, _writer) = test_link();

        tx.send(b"LP,RP\n".to_vec()).unwrap();
        let result = link.handshake(Duration::from_millis(200)).await;
        assert!(matches!(result, Err(LinkError::HandshakeTimeout(_))));
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn handshake_timeout_disables_commands() {
        let (mut link, _tx, writer) = test_link();

        let result = link.handshake(Duration::from_millis(100)).await;
        assert!(result.is_err());

        link.begin_test();
        link.trigger_gate(7);
        assert_eq!(writer.contents(), "");
    }

    #[tokio::test]
    async fn status_lines_update_feet_and_garbage_resets_them() {
        let (mut link, tx, _writer) = test_link();
        let mut feet = link.feet_watch();

        tx.send(b"Connected\n".to_vec()).unwrap();
        link.handshake(Duration::from_secs(2)).await.unwrap();

        tx.send(b"LP,RF\n".to_vec()).unwrap();
        assert_eq!(next_feet(&mut feet).await, FootState::contact(true, false));

        tx.send(b"garbage\n".to_vec()).unwrap();
        assert_eq!(next_feet(&mut feet).await, FootState::contact(false, false));

        tx.send(b"LP,RP\n".to_vec()).unwrap();
        assert_eq!(next_feet(&mut feet).await, FootState::contact(true, true));
        assert_eq!(link.foot_state(), FootState::contact(true, true));
    }

    #[tokio::test]
    async fn commands_are_plain_ascii_writes() {
        let (mut link, tx, writer) = test_link();

        tx.send(b"Connected\n".to_vec()).unwrap();
        link.handshake(Duration::from_secs(2)).await.unwrap();

        link.begin_test();
        link.end_test();
        link.trigger_gate(7);
        assert_eq!(writer.contents(), "TEO,7");
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_reachable_from_any_state() {
        let (mut link, tx, _writer) = test_link();

        tx.send(b"Connected\n".to_vec()).unwrap();
        link.handshake(Duration::from_secs(2)).await.unwrap();

        link.disconnect();
        assert_eq!(link.state(), LinkState::Disconnected);
        link.disconnect();
        assert_eq!(link.state(), LinkState::Disconnected);

        link.begin_test();
    }

    #[tokio::test]
    async fn reader_survives_split_chunks_and_bad_bytes() {
        let (mut link, tx, _writer) = test_link();
        let mut feet = link.feet_watch();

        tx.send(b"Conn".to_vec()).unwrap();
        tx.send(b"ected\n".to_vec()).unwrap();
        link.handshake(Duration::from_secs(2)).await.unwrap();

        tx.send(vec![0xFF, 0xFE]).unwrap();
        tx.send(b"\nLP,RP\n".to_vec()).unwrap();
        // the garbage line resets, then the status line lands
        let first = next_feet(&mut feet).await;
        let sample = if first == FootState::contact(true, true) {
            first
        } else {
            next_feet(&mut feet).await
        };
        assert_eq!(sample, FootState::contact(true, true));
    }
}
