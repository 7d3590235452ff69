//! Frame admission, concurrent dispatch and flush ranking.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use esdgate_core::Timer;
use esdgate_core::constants::{FLUSH_GROUP_CEILING, FLUSH_INTERVAL, FRAME_THROTTLE};
use esdgate_core::types::MatchResult;
use esdgate_net::{FaceReply, StationBackend};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Result of one [`FaceMatchBatcher::maybe_flush`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The flush window has not elapsed yet.
    NotDue,

    /// The window elapsed with nothing in flight.
    Empty,

    /// The window closed; this is its ranked winner (`None` when every
    /// entry in the window failed or timed out).
    Winner(Option<MatchResult>),
}

/// Buffers camera frames and resolves one match decision per flush window.
///
/// Frame admission: a frame is queued only if the in-flight list is empty,
/// or every [`FRAME_THROTTLE`]-th frame otherwise, bounding the outbound
/// request rate under sustained frame arrival. Admitted frames are base64
/// encoded and sent as spawned requests; nothing here blocks the caller.
///
/// Flushing gathers all in-flight requests concurrently under the group
/// ceiling and clears the list wholesale. Nothing is retried: a late or
/// failed request is simply dropped from its cycle, and requests still
/// pending at the ceiling are abandoned (their eventual results ignored),
/// not cancelled.
pub struct FaceMatchBatcher<B> {
    backend: Arc<B>,
    in_flight: Vec<JoinHandle<Option<FaceReply>>>,
    frame_count: u32,
    flush_timer: Timer,
}

impl<B: StationBackend + 'static> FaceMatchBatcher<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            in_flight: Vec::new(),
            frame_count: 0,
            flush_timer: Timer::new(FLUSH_INTERVAL),
        }
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Offer one JPEG frame. Returns whether it was admitted.
    pub fn admit_frame(&mut self, frame: &Bytes) -> bool {
        self.frame_count += 1;
        if !self.in_flight.is_empty() && self.frame_count % FRAME_THROTTLE != 0 {
            trace!(frame_count = self.frame_count, "frame skipped by throttle");
            return false;
        }
        self.frame_count = 0;

        let payload = STANDARD.encode(frame);
        let backend = Arc::clone(&self.backend);
        self.in_flight.push(tokio::spawn(async move {
            match backend.match_face(payload).await {
                Ok(reply) => Some(reply),
                Err(error) => {
                    debug!(%error, "face request failed");
                    None
                }
            }
        }));
        true
    }

    /// Close the flush window if it is due and rank its responses.
    ///
    /// Gathers every in-flight request with a bounded wait and clears the
    /// list regardless of outcome. Failed entries participate in the
    /// ranking as `None` and only affect ordering; they never raise.
    pub async fn maybe_flush(&mut self) -> FlushOutcome {
        if !self.flush_timer.is_timeout() {
            return FlushOutcome::NotDue;
        }
        self.flush_timer.reset();

        if self.in_flight.is_empty() {
            return FlushOutcome::Empty;
        }

        let handles = std::mem::take(&mut self.in_flight);
        let count = handles.len();
        let responses: Vec<Option<FaceReply>> =
            match tokio::time::timeout(FLUSH_GROUP_CEILING, join_all(handles)).await {
                Ok(joined) => joined.into_iter().map(|r| r.unwrap_or_default()).collect(),
                Err(_) => {
                    warn!(count, "flush group ceiling expired; abandoning requests");
                    Vec::new()
                }
            };

        trace!(count, "flush window closed");
        FlushOutcome::Winner(select_winner(&responses))
    }
}

/// Tie-break rank; ascending, first minimum wins.
///
/// A confirmed match outranks a "someone is there but unidentified"
/// signal, which outranks an empty-but-successful response, which outranks
/// outright request failure.
fn rank(response: &Option<FaceReply>) -> u8 {
    match response {
        Some(reply) if reply.result => 0,
        Some(reply) if reply.username.is_some() => 1,
        Some(_) => 2,
        None => 3,
    }
}

fn select_winner(responses: &[Option<FaceReply>]) -> Option<MatchResult> {
    let best = responses.iter().min_by_key(|response| rank(response))?;
    best.as_ref().map(|reply| MatchResult {
        matched: reply.result,
        username: reply.username.clone(),
        fullname: reply.fullname.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use esdgate_net::mock::MockBackend;
    use rstest::rstest;
    use std::time::Duration;
    use tokio::time::advance;

    fn reply(result: bool, username: Option<&str>) -> FaceReply {
        FaceReply {
            result,
            username: username.map(str::to_string),
            fullname: None,
        }
    }

    #[rstest]
    #[case(Some(reply(true, Some("bob"))), 0)]
    #[case(Some(reply(false, Some("bob"))), 1)]
    #[case(Some(reply(false, Some(""))), 1)]
    #[case(Some(reply(false, None)), 2)]
    #[case(None, 3)]
    fn rank_order(#[case] response: Option<FaceReply>, #[case] expected: u8) {
        assert_eq!(rank(&response), expected);
    }

    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, item.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn tie_break_is_total_over_every_input_order() {
        let responses = vec![
            None,
            Some(reply(false, Some(""))),
            Some(reply(false, Some("bob"))),
            Some(reply(true, Some("bob"))),
        ];

        for order in permutations(&responses) {
            let winner = select_winner(&order).expect("winner expected");
            assert!(winner.matched);
            assert_eq!(winner.username.as_deref(), Some("bob"));
        }
    }

    #[test]
    fn all_failures_yield_no_winner() {
        assert_eq!(select_winner(&[None, None]), None);
        assert_eq!(select_winner(&[]), None);
    }

    #[test]
    fn unidentified_presence_outranks_empty_success() {
        let winner = select_winner(&[
            Some(reply(false, None)),
            Some(reply(false, Some(""))),
            None,
        ])
        .expect("winner expected");
        assert!(!winner.matched);
        assert_eq!(winner.username.as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_admits_every_second_frame_while_busy() {
        let backend = Arc::new(MockBackend::new());
        // keep requests pending so the in-flight list stays non-empty
        backend.set_face_delay(Some(Duration::from_secs(3600))).await;
        let mut batcher = FaceMatchBatcher::new(backend);

        let frame = Bytes::from_static(b"\xff\xd8jpeg");
        let admitted: Vec<bool> = (0..6).map(|_| batcher.admit_frame(&frame)).collect();
        assert_eq!(admitted, vec![true, false, true, false, true, false]);
        assert_eq!(batcher.in_flight(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_is_gated_by_the_window_timer() {
        let backend = Arc::new(MockBackend::new());
        let mut batcher = FaceMatchBatcher::new(backend);

        assert_eq!(batcher.maybe_flush().await, FlushOutcome::NotDue);
        advance(FLUSH_INTERVAL).await;
        assert_eq!(batcher.maybe_flush().await, FlushOutcome::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_ranks_the_window_and_clears_in_flight() {
        let backend = Arc::new(MockBackend::new());
        backend.push_face(reply(false, Some(""))).await;
        backend.push_face(reply(true, Some("bob"))).await;
        let mut batcher = FaceMatchBatcher::new(Arc::clone(&backend));

        let frame = Bytes::from_static(b"\xff\xd8jpeg");
        assert!(batcher.admit_frame(&frame));
        assert!(!batcher.admit_frame(&frame)); // throttled
        assert!(batcher.admit_frame(&frame));
        // yield so the spawned requests resolve against the mock
        tokio::task::yield_now().await;

        advance(FLUSH_INTERVAL).await;
        match batcher.maybe_flush().await {
            FlushOutcome::Winner(Some(winner)) => {
                assert!(winner.matched);
                assert_eq!(winner.username.as_deref(), Some("bob"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(batcher.in_flight(), 0);
        assert_eq!(backend.face_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn group_ceiling_abandons_pending_requests() {
        let backend = Arc::new(MockBackend::new());
        backend.set_face_delay(Some(Duration::from_secs(3600))).await;
        let mut batcher = FaceMatchBatcher::new(backend);

        let frame = Bytes::from_static(b"\xff\xd8jpeg");
        assert!(batcher.admit_frame(&frame));

        advance(FLUSH_INTERVAL).await;
        let outcome = batcher.maybe_flush().await;
        assert_eq!(outcome, FlushOutcome::Winner(None));
        assert_eq!(batcher.in_flight(), 0);
    }
}
