//! The cooperative control loop wiring every component together.
//!
//! One task drives the station: a fixed 10 ms tick polls the sensors,
//! enforces the gate timeout and steps the state machine; events from the
//! badge reader, the authentication tasks and the face batcher arrive over
//! channels. The loop never blocks on network I/O — authentication and
//! result saves run on spawned tasks and come back as events, and the face
//! batcher runs as its own task with its own flush cadence. A slow backend
//! therefore cannot stall sensor polling or gate-timeout enforcement.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use esdgate_core::constants::TICK_INTERVAL;
use esdgate_core::types::{FootState, MatchResult, Mode};
use esdgate_face::{FaceMatchBatcher, FlushOutcome};
use esdgate_hardware::SensorPoller;
use esdgate_hardware::traits::{DigitalInput, DigitalOutput};
use esdgate_nano::NanoLink;
use esdgate_net::{AuthClient, ResultRecorder, StationBackend};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::machine::{StationAction, StationEvent, StationStateMachine};

/// How often the batcher task polls its flush timer.
const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Channel capacities. Events are small and bursty; frames are large and
/// safely droppable under backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 64;
const FRAME_CHANNEL_CAPACITY: usize = 16;

/// Senders the outside world (GUI layer, signal handler) uses to reach the
/// running station.
#[derive(Clone)]
pub struct StationHandle {
    /// Badge input, shutdown requests, camera faults.
    pub events: mpsc::Sender<StationEvent>,

    /// Raw JPEG camera frames for the face classifier.
    pub frames: mpsc::Sender<Bytes>,
}

/// The assembled station: state machine, sensors, serial link and network
/// clients under one control loop.
pub struct Station<M, L, R, G, B> {
    machine: StationStateMachine,
    poller: SensorPoller<M, L, R, G>,
    nano: Option<NanoLink>,
    auth: Arc<AuthClient<B>>,
    recorder: Arc<ResultRecorder<B>>,
    events_tx: mpsc::Sender<StationEvent>,
    events_rx: mpsc::Receiver<StationEvent>,
    winners_rx: mpsc::Receiver<Option<MatchResult>>,
    mode_tx: watch::Sender<Mode>,
    batcher: JoinHandle<()>,
}

impl<M, L, R, G, B> Station<M, L, R, G, B>
where
    M: DigitalInput,
    L: DigitalInput,
    R: DigitalInput,
    G: DigitalOutput,
    B: StationBackend + 'static,
{
    /// Assemble a station and spawn its face-batcher task.
    ///
    /// `nano` is `None` when the test controller is unavailable; foot state
    /// then comes from the GPIO sensors only and serial commands are
    /// skipped.
    pub fn new(
        station_id: impl Into<String>,
        poller: SensorPoller<M, L, R, G>,
        nano: Option<NanoLink>,
        backend: Arc<B>,
        fallback_path: impl Into<PathBuf>,
    ) -> (Self, StationHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (winners_tx, winners_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (mode_tx, mode_rx) = watch::channel(Mode::BarcodeScan);

        let batcher = spawn_batcher(Arc::clone(&backend), frames_rx, winners_tx, mode_rx);

        let station = Self {
            machine: StationStateMachine::new(station_id),
            poller,
            nano,
            auth: Arc::new(AuthClient::new(Arc::clone(&backend))),
            recorder: Arc::new(ResultRecorder::new(backend, fallback_path)),
            events_tx: events_tx.clone(),
            events_rx,
            winners_rx,
            mode_tx,
            batcher,
        };
        let handle = StationHandle {
            events: events_tx,
            frames: frames_tx,
        };
        (station, handle)
    }

    /// Run the control loop until a shutdown request lands.
    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("station control loop running");

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    // gate timeout enforcement runs every tick, whatever
                    // the mode
                    self.poller.close_gate_if_due();

                    if self.poller.poll_motion() {
                        let actions = self.machine.apply(StationEvent::MotionDetected);
                        self.dispatch(actions);
                    }

                    let feet = (self.machine.mode() == Mode::EsdTest)
                        .then(|| self.sample_feet());
                    let actions = self.machine.tick(feet);
                    self.dispatch(actions);
                }
                Some(event) = self.events_rx.recv() => {
                    let actions = self.machine.apply(event);
                    self.dispatch(actions);
                }
                Some(winner) = self.winners_rx.recv() => {
                    let actions = self.machine.apply(StationEvent::FaceFlush(winner));
                    self.dispatch(actions);
                }
            }

            let mode = self.machine.mode();
            self.mode_tx.send_if_modified(|current| {
                if *current == mode {
                    false
                } else {
                    *current = mode;
                    true
                }
            });
            if mode == Mode::Quit {
                break;
            }
        }

        self.shutdown().await;
    }

    /// Foot state source merge: the serial controller wins while its link
    /// is up, the GPIO sensors cover for it otherwise.
    fn sample_feet(&mut self) -> FootState {
        match &self.nano {
            Some(link) if link.is_connected() => link.foot_state(),
            _ => self.poller.poll_feet(),
        }
    }

    fn dispatch(&mut self, actions: Vec<StationAction>) {
        for action in actions {
            match action {
                StationAction::Authenticate { username } => {
                    let auth = Arc::clone(&self.auth);
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let outcome = auth.authenticate(Some(&username)).await;
                        if events.send(StationEvent::AuthResolved(outcome)).await.is_err() {
                            debug!("event channel closed before auth result delivery");
                        }
                    });
                }
                StationAction::BeginTest => {
                    if let Some(link) = &self.nano {
                        link.begin_test();
                    }
                }
                StationAction::EndTest => {
                    if let Some(link) = &self.nano {
                        link.end_test();
                    }
                }
                StationAction::OpenGate { seconds } => {
                    self.poller.open_gate();
                    if let Some(link) = &self.nano {
                        link.trigger_gate(seconds);
                    }
                }
                StationAction::Record(record) => {
                    let recorder = Arc::clone(&self.recorder);
                    tokio::spawn(async move {
                        recorder.save(&record).await;
                    });
                }
            }
        }
    }

    async fn shutdown(mut self) {
        if let Some(mut link) = self.nano.take() {
            link.disconnect();
        }
        // the batcher observes the Quit mode; give it a moment, then drop it
        if tokio::time::timeout(Duration::from_secs(1), &mut self.batcher)
            .await
            .is_err()
        {
            self.batcher.abort();
        }
        info!("station stopped");
    }
}

/// The face batcher task: admits frames while no ESD test is running,
/// flushes on its own cadence and reports each window's winner back to the
/// control loop.
fn spawn_batcher<B: StationBackend + 'static>(
    backend: Arc<B>,
    mut frames_rx: mpsc::Receiver<Bytes>,
    winners_tx: mpsc::Sender<Option<MatchResult>>,
    mut mode_rx: watch::Receiver<Mode>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut batcher = FaceMatchBatcher::new(backend);
        let mut cadence = tokio::time::interval(FLUSH_POLL_INTERVAL);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe_frame = frames_rx.recv() => {
                    match maybe_frame {
                        Some(frame) => {
                            let mode = *mode_rx.borrow();
                            if !matches!(mode, Mode::EsdTest | Mode::Quit) {
                                batcher.admit_frame(&frame);
                            }
                        }
                        None => break,
                    }
                }
                _ = cadence.tick() => {
                    if let FlushOutcome::Winner(winner) = batcher.maybe_flush().await
                        && winners_tx.send(winner).await.is_err()
                    {
                        break;
                    }
                }
                changed = mode_rx.changed() => {
                    if changed.is_err() || *mode_rx.borrow() == Mode::Quit {
                        break;
                    }
                }
            }
        }
        debug!("face batcher task stopped");
    })
}
