//! Scriptable backend for testing and development.
//!
//! The mock is controlled programmatically: replies are queued per
//! endpoint, call counts are observable, and an optional artificial delay
//! simulates a slow classifier for throttle/flush tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use esdgate_core::types::TestRecord;
use tokio::sync::Mutex;

use crate::backend::{AuthReply, FaceReply, StationBackend};
use crate::error::{NetError, Result};

/// Scriptable [`StationBackend`] implementation.
///
/// Unscripted calls get benign defaults: authentication fails with a
/// transport error, face matching reports "no face", saves succeed.
#[derive(Default)]
pub struct MockBackend {
    auth_replies: Mutex<VecDeque<Result<AuthReply>>>,
    face_replies: Mutex<VecDeque<Result<FaceReply>>>,
    face_delay: Mutex<Option<Duration>>,
    save_failing: AtomicBool,
    saved: Mutex<Vec<TestRecord>>,
    auth_calls: AtomicUsize,
    face_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful authentication reply.
    pub async fn push_auth_ok(&self, username: &str, fullname: Option<&str>) {
        self.auth_replies.lock().await.push_back(Ok(AuthReply {
            username: username.to_string(),
            fullname: fullname.map(str::to_string),
            gender: None,
            date_of_birth: None,
        }));
    }

    /// Queue an authentication failure.
    pub async fn push_auth_error(&self, error: NetError) {
        self.auth_replies.lock().await.push_back(Err(error));
    }

    /// Queue a face classification reply.
    pub async fn push_face(&self, reply: FaceReply) {
        self.face_replies.lock().await.push_back(Ok(reply));
    }

    /// Queue a face classification failure.
    pub async fn push_face_error(&self, error: NetError) {
        self.face_replies.lock().await.push_back(Err(error));
    }

    /// Delay every face call by `delay` (simulates a slow classifier).
    pub async fn set_face_delay(&self, delay: Option<Duration>) {
        *self.face_delay.lock().await = delay;
    }

    /// Make every save call fail with a timeout.
    pub fn set_save_failing(&self, failing: bool) {
        self.save_failing.store(failing, Ordering::SeqCst);
    }

    /// Records accepted by `save_result`.
    pub async fn saved_records(&self) -> Vec<TestRecord> {
        self.saved.lock().await.clone()
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn face_calls(&self) -> usize {
        self.face_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

impl StationBackend for MockBackend {
    async fn authenticate(&self, _username: &str) -> Result<AuthReply> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        match self.auth_replies.lock().await.pop_front() {
            Some(reply) => reply,
            None => Err(NetError::Transport("no scripted auth reply".to_string())),
        }
    }

    async fn match_face(&self, _frame_b64: String) -> Result<FaceReply> {
        self.face_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.face_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.face_replies.lock().await.pop_front() {
            Some(reply) => reply,
            None => Ok(FaceReply {
                result: false,
                username: None,
                fullname: None,
            }),
        }
    }

    async fn save_result(&self, record: &TestRecord) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.save_failing.load(Ordering::SeqCst) {
            return Err(NetError::Timeout);
        }
        self.saved.lock().await.push(record.clone());
        Ok(())
    }
}
