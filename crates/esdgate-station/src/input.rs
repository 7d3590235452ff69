//! Badge scanner input.
//!
//! The scanner behaves as a keyboard: characters followed by a newline.
//! The reader task assembles complete lines from any byte stream (the real
//! scanner device, stdin on a dev box) and forwards each non-empty line as
//! a [`StationEvent::UsernameEntered`].

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::machine::StationEvent;

/// Spawn a task reading usernames off `input` until end of stream.
pub fn spawn_badge_reader<I>(input: I, events: mpsc::Sender<StationEvent>) -> JoinHandle<()>
where
    I: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let username = line.trim();
                    if username.is_empty() {
                        continue;
                    }
                    if events
                        .send(StationEvent::UsernameEntered(username.to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "badge input read failed");
                    break;
                }
            }
        }
        debug!("badge reader stopped");
    })
}
