//! The station mode state machine.
//!
//! Owns the [`Mode`], the active [`Session`] and the display state. The
//! runtime feeds it events and fixed-cadence ticks; it answers with
//! [`StationAction`]s for the runtime to execute. It performs no I/O of
//! its own, which keeps every transition unit-testable under paused time.
//!
//! # Transitions
//!
//! - `BarcodeScan` → `EsdTest` once a scanned username authenticates.
//! - `BarcodeScan`/`Idle` → `FaceRecognize` when the face classifier
//!   reports an unidentified presence.
//! - `FaceRecognize` → `EsdTest` on match + authentication, or back to
//!   `BarcodeScan` when the recognition budget expires.
//! - `EsdTest` → record passed, open gate, refresh to `BarcodeScan`; or on
//!   test timeout record failed → `Idle` → refresh to `BarcodeScan`.
//! - Any state → `Quit` on a shutdown request.
//!
//! The ESD pass rule is debounced: both feet must report contact and stay
//! in contact for a full [`CONTACT_HOLD`] measured from the first moment
//! of double contact. A single-instant reading never passes.

use chrono::Utc;
use esdgate_core::Timer;
use esdgate_core::constants::{
    CAMERA_REOPEN_HOLDOFF, CAMERA_TIMEOUT, CONTACT_HOLD, ESD_TEST_TIMEOUT, GATE_TIMEOUT,
    MSG_CAMERA_FAILED, MSG_IDLE, MSG_RECOGNIZING, MSG_SCAN_CODE, MSG_TEST_FAILED, MSG_TEST_PASSED,
    MSG_WELCOME, RECOGNIZE_TIMEOUT, REFRESH_DELAY, UNAUTHORIZED_DELAY,
};
use esdgate_core::types::{FootState, MatchResult, Mode, Session, TestOutcome, TestRecord, TestType};
use esdgate_net::AuthOutcome;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Input to the state machine, delivered by the runtime.
#[derive(Debug)]
pub enum StationEvent {
    /// A full username arrived from the badge scanner.
    UsernameEntered(String),

    /// An authentication attempt resolved.
    AuthResolved(AuthOutcome),

    /// A face-match flush window closed with this winner.
    FaceFlush(Option<MatchResult>),

    /// The IR sensor reported presence.
    MotionDetected,

    /// The frame source could not deliver (camera fault).
    CameraFault,

    /// Shutdown was requested.
    ShutdownRequested,
}

/// Effect for the runtime to execute. The machine never performs I/O.
#[derive(Debug, PartialEq)]
pub enum StationAction {
    /// Start an authentication request for `username`.
    Authenticate { username: String },

    /// Tell the test controller a test begins.
    BeginTest,

    /// Tell the test controller the test ended.
    EndTest,

    /// Energize the gate relay (and mirror to the test controller).
    OpenGate { seconds: u64 },

    /// Persist a completed test exactly once.
    Record(TestRecord),
}

/// Read-only snapshot consumed by the GUI layer.
#[derive(Debug, Clone)]
pub struct StationView {
    pub mode: Mode,
    pub message: String,
    pub session: Session,
    pub feet: FootState,
    /// Render the "present your verification card" hint.
    pub show_card: bool,
    /// The frame source should keep the camera running.
    pub camera_on: bool,
}

/// Mode state machine driving the whole station.
pub struct StationStateMachine {
    mode: Mode,
    session: Session,
    station_id: String,
    message: String,
    feet: FootState,
    cycle_id: Option<Uuid>,

    esd_timer: Timer,
    contact_timer: Timer,
    contact_held: bool,
    esd_testing: bool,

    recog_timer: Timer,
    recognizing: bool,

    refresh_timer: Timer,
    refresh_pending: bool,

    auth_in_flight: bool,

    camera_on: bool,
    camera_holdoff: Timer,
    camera_keepalive: Timer,
}

impl StationStateMachine {
    /// New machine in `BarcodeScan` with an empty session.
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            mode: Mode::BarcodeScan,
            session: Session::new(),
            station_id: station_id.into(),
            message: MSG_WELCOME.to_string(),
            feet: FootState::default(),
            cycle_id: None,
            esd_timer: Timer::new(ESD_TEST_TIMEOUT),
            contact_timer: Timer::new(CONTACT_HOLD),
            contact_held: false,
            esd_testing: false,
            recog_timer: Timer::new(RECOGNIZE_TIMEOUT),
            recognizing: false,
            refresh_timer: Timer::new(Duration::ZERO),
            refresh_pending: false,
            auth_in_flight: false,
            camera_on: false,
            camera_holdoff: Timer::new(CAMERA_REOPEN_HOLDOFF),
            camera_keepalive: Timer::new(CAMERA_TIMEOUT),
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The active session, read-only.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Snapshot for the GUI layer.
    #[must_use]
    pub fn view(&self) -> StationView {
        StationView {
            mode: self.mode,
            message: self.message.clone(),
            session: self.session.clone(),
            feet: self.feet,
            show_card: self.mode == Mode::BarcodeScan,
            camera_on: self.camera_on,
        }
    }

    /// One fast-cadence tick. `feet` is sampled by the runtime only while
    /// the mode is `EsdTest`.
    pub fn tick(&mut self, feet: Option<FootState>) -> Vec<StationAction> {
        let mut actions = Vec::new();
        if self.mode == Mode::Quit {
            return actions;
        }

        if self.refresh_pending && self.refresh_timer.is_timeout() {
            self.refresh();
        }

        if self.mode == Mode::EsdTest {
            if let Some(sample) = feet {
                self.step_esd(sample, &mut actions);
            }
        }

        if self.recognizing && self.recog_timer.is_timeout() {
            self.abort_recognition();
        }

        if self.camera_on && self.camera_keepalive.is_timeout() {
            self.close_camera();
        }

        actions
    }

    /// Apply one event.
    pub fn apply(&mut self, event: StationEvent) -> Vec<StationAction> {
        let mut actions = Vec::new();
        if self.mode == Mode::Quit {
            return actions;
        }

        match event {
            StationEvent::UsernameEntered(text) => self.on_username(text, &mut actions),
            StationEvent::AuthResolved(outcome) => self.on_auth(outcome, &mut actions),
            StationEvent::FaceFlush(winner) => self.on_face_flush(winner, &mut actions),
            StationEvent::MotionDetected => self.on_motion(),
            StationEvent::CameraFault => self.on_camera_fault(),
            StationEvent::ShutdownRequested => {
                info!("shutdown requested");
                self.set_mode(Mode::Quit);
            }
        }
        actions
    }

    fn set_mode(&mut self, target: Mode) {
        if self.mode == target {
            return;
        }
        if !self.mode.can_transition_to(&target) {
            warn!(from = %self.mode, to = %target, "unexpected mode transition");
        }
        debug!(from = %self.mode, to = %target, "mode change");
        self.mode = target;
    }

    fn on_username(&mut self, text: String, actions: &mut Vec<StationAction>) {
        let username = text.trim().to_string();
        if username.is_empty() || self.mode != Mode::BarcodeScan || self.auth_in_flight {
            return;
        }

        // a badge carries no display name; echo the input until the
        // backend replies
        self.session.username = Some(username.clone());
        self.session.fullname = Some(username.clone());
        self.session.test_type = TestType::Barcode;
        self.session.result = Some(true);
        self.session.started_at = Some(Utc::now());
        self.auth_in_flight = true;
        actions.push(StationAction::Authenticate { username });
    }

    fn on_auth(&mut self, outcome: AuthOutcome, actions: &mut Vec<StationAction>) {
        self.auth_in_flight = false;
        match outcome {
            AuthOutcome::Granted { identity } => {
                if let Some(identity) = identity {
                    self.session.apply_identity(identity);
                }
                self.start_esd_test(actions);
            }
            AuthOutcome::Denied { unauthorized } => {
                if unauthorized {
                    let username = self.session.username.take().unwrap_or_default();
                    self.message = format!("Unauthorized {username}");
                    self.schedule_refresh(UNAUTHORIZED_DELAY);
                }
            }
        }
    }

    fn start_esd_test(&mut self, actions: &mut Vec<StationAction>) {
        self.cycle_id = Some(Uuid::new_v4());
        self.recognizing = false;
        self.set_mode(Mode::EsdTest);
        self.message = format!("Xin chào, {}!\nMời bạn test ESD!", self.session.display_name());
        self.esd_timer.reset();
        self.contact_held = false;
        self.esd_testing = true;
        self.feet = FootState::default();
        info!(
            cycle = ?self.cycle_id,
            username = ?self.session.username,
            test_type = %self.session.test_type,
            "esd test started"
        );
        actions.push(StationAction::BeginTest);
    }

    fn step_esd(&mut self, sample: FootState, actions: &mut Vec<StationAction>) {
        self.feet = sample;
        if !self.esd_testing {
            return;
        }

        if self.session.username.is_some() && sample.both_grounded() {
            if !self.contact_held {
                self.contact_held = true;
                self.contact_timer.reset();
            } else if self.contact_timer.is_timeout() {
                self.finish_test(TestOutcome::Passed, actions);
                return;
            }
        } else {
            self.contact_held = false;
        }

        if self.esd_timer.is_timeout() {
            self.finish_test(TestOutcome::Failed, actions);
        }
    }

    fn finish_test(&mut self, outcome: TestOutcome, actions: &mut Vec<StationAction>) {
        self.esd_testing = false;
        let record = TestRecord {
            username: self.session.username.clone().unwrap_or_default(),
            fullname: self.session.fullname.clone().unwrap_or_default(),
            test_type: self.session.test_type,
            duration: self.esd_timer.elapsed_secs(),
            outcome,
            station_id: self.station_id.clone(),
        };
        info!(
            cycle = ?self.cycle_id,
            outcome = %outcome,
            duration = record.duration,
            "esd test finished"
        );
        actions.push(StationAction::Record(record));
        actions.push(StationAction::EndTest);

        match outcome {
            TestOutcome::Passed => {
                self.message = MSG_TEST_PASSED.to_string();
                actions.push(StationAction::OpenGate {
                    seconds: GATE_TIMEOUT.as_secs(),
                });
            }
            TestOutcome::Failed => {
                self.message = MSG_TEST_FAILED.to_string();
                self.set_mode(Mode::Idle);
            }
        }
        self.schedule_refresh(REFRESH_DELAY);
    }

    fn on_face_flush(&mut self, winner: Option<MatchResult>, actions: &mut Vec<StationAction>) {
        // the classifier stream is ignored while a test runs
        if self.mode == Mode::EsdTest {
            return;
        }
        let Some(result) = winner else { return };

        if result.matched && result.username != self.session.username && !self.auth_in_flight {
            self.session.test_type = TestType::FaceId;
            self.session.result = Some(true);
            self.session.username = result.username.clone();
            self.session.fullname = result.fullname.clone();
            self.session.started_at = Some(Utc::now());
            if let Some(username) = result.username.clone() {
                self.auth_in_flight = true;
                actions.push(StationAction::Authenticate { username });
            }
        }

        if result.username.is_some() {
            // someone is in front of the camera; keep it running
            self.camera_keepalive.reset();
            if !self.recognizing && result.username.as_deref() == Some("") {
                self.recognizing = true;
                self.recog_timer.reset();
                self.set_mode(Mode::FaceRecognize);
                self.message = MSG_RECOGNIZING.to_string();
            }
        }
    }

    fn abort_recognition(&mut self) {
        self.recognizing = false;
        self.session.test_type = TestType::Barcode;
        self.set_mode(Mode::BarcodeScan);
        self.message = MSG_SCAN_CODE.to_string();
        self.schedule_refresh(REFRESH_DELAY);
        debug!("recognition timed out; falling back to barcode");
    }

    fn on_motion(&mut self) {
        if self.camera_on || !self.camera_holdoff.is_timeout() {
            return;
        }
        self.camera_on = true;
        self.camera_keepalive.reset();
        debug!("camera wake on motion");
        if self.mode == Mode::Idle {
            self.set_mode(Mode::MotionDetect);
        }
    }

    fn close_camera(&mut self) {
        self.camera_on = false;
        self.camera_holdoff.reset();
        debug!("camera keepalive expired");
        if self.mode == Mode::MotionDetect {
            self.set_mode(Mode::Idle);
            self.message = MSG_IDLE.to_string();
        }
    }

    fn on_camera_fault(&mut self) {
        self.camera_on = false;
        self.camera_holdoff.reset();
        warn!("camera fault reported");
        if self.mode == Mode::BarcodeScan {
            self.message = MSG_CAMERA_FAILED.to_string();
        }
    }

    fn schedule_refresh(&mut self, delay: Duration) {
        self.refresh_timer.set_interval(delay);
        self.refresh_pending = true;
    }

    fn refresh(&mut self) {
        self.refresh_pending = false;
        if self.esd_testing {
            return;
        }
        self.session.clear();
        self.feet = FootState::default();
        self.recognizing = false;
        self.contact_held = false;
        self.cycle_id = None;
        self.set_mode(Mode::BarcodeScan);
        self.message = MSG_WELCOME.to_string();
        debug!("station refreshed");
    }
}
