use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Station mode. Exactly one is active at a time; the state machine owns it
/// and every other component receives it read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Idling between users, camera off.
    Idle,

    /// Motion was sensed; the camera is warming up, nobody identified yet.
    MotionDetect,

    /// A face is in front of the camera and recognition is running.
    FaceRecognize,

    /// Waiting for a badge scan. This is the initial mode.
    BarcodeScan,

    /// An identified user is standing on the foot sensors.
    EsdTest,

    /// Terminal: shutdown was requested.
    Quit,
}

impl Mode {
    /// Check whether the station flow permits moving to `target`.
    ///
    /// Used to flag unexpected transitions in logs; `Quit` is reachable
    /// from every state.
    #[must_use]
    pub fn can_transition_to(&self, target: &Mode) -> bool {
        if *target == Mode::Quit {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Mode::Idle, Mode::BarcodeScan | Mode::MotionDetect | Mode::FaceRecognize)
                | (Mode::MotionDetect, Mode::Idle | Mode::FaceRecognize | Mode::BarcodeScan)
                | (Mode::FaceRecognize, Mode::BarcodeScan | Mode::EsdTest)
                | (Mode::BarcodeScan, Mode::FaceRecognize | Mode::EsdTest)
                | (Mode::EsdTest, Mode::Idle | Mode::BarcodeScan)
        )
    }

    /// True for the terminal `Quit` mode.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Mode::Quit)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "Idle",
            Mode::MotionDetect => "MotionDetect",
            Mode::FaceRecognize => "FaceRecognize",
            Mode::BarcodeScan => "BarcodeScan",
            Mode::EsdTest => "EsdTest",
            Mode::Quit => "Quit",
        };
        write!(f, "{name}")
    }
}

/// How the active user was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    #[default]
    Barcode,
    FaceId,
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestType::Barcode => write!(f, "barcode"),
            TestType::FaceId => write!(f, "face_id"),
        }
    }
}

/// Outcome of a completed ESD test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Passed => write!(f, "passed"),
            TestOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Identity fields returned by the backend on successful authentication.
///
/// `gender` and `date_of_birth` are opaque pass-through values; the station
/// stores and forwards them without interpreting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub username: String,
    pub fullname: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
}

/// The active subject of a test cycle.
///
/// Created empty on station start, populated by authentication or a face
/// match, cleared whenever the station refreshes back to BarcodeScan. The
/// state machine owns it exclusively; everything else reads snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub username: Option<String>,
    pub fullname: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub test_type: TestType,
    /// Last authentication/match outcome.
    pub result: Option<bool>,
    /// Wall-clock start of the current cycle, for audit correlation.
    pub started_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every field to the empty state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Merge identity fields from a backend reply.
    pub fn apply_identity(&mut self, identity: UserIdentity) {
        self.username = Some(identity.username);
        self.fullname = identity.fullname;
        self.gender = identity.gender;
        self.date_of_birth = identity.date_of_birth;
    }

    /// Name to greet the user with; empty until an identity is known.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.fullname.as_deref().unwrap_or("")
    }
}

/// Debounced foot sensor reading. `None` means "not yet sampled".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootState {
    pub left: Option<bool>,
    pub right: Option<bool>,
}

impl FootState {
    /// Build a fully-sampled state from two contact flags.
    #[must_use]
    pub fn contact(left: bool, right: bool) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }

    /// True iff both feet are sampled and grounded.
    #[must_use]
    pub fn both_grounded(&self) -> bool {
        self.left == Some(true) && self.right == Some(true)
    }
}

/// One logical face-match decision per flush window.
///
/// `username` carries the recognized identity when `matched`, an empty
/// string when someone is visible but not identified, and `None` when the
/// response carried no identity at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub username: Option<String>,
    pub fullname: Option<String>,
}

/// Immutable record of one completed test.
///
/// Either transmitted to the backend or appended verbatim, comma-joined, to
/// the local fallback log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub username: String,
    pub fullname: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    /// Test duration in seconds, rounded to two decimals.
    pub duration: f64,
    #[serde(rename = "result")]
    pub outcome: TestOutcome,
    #[serde(rename = "machine")]
    pub station_id: String,
}

impl TestRecord {
    /// The comma-joined line appended to the local fallback log.
    #[must_use]
    pub fn fallback_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.username, self.fullname, self.test_type, self.duration, self.outcome, self.station_id
        )
    }
}
