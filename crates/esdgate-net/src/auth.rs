//! Username authentication against the backend.

use std::sync::Arc;

use esdgate_core::types::UserIdentity;
use tracing::{error, info, warn};

use crate::backend::{AuthReply, StationBackend};
use crate::error::NetError;

/// Resolution of one authentication attempt.
///
/// The state machine owns the `Session`; it applies the outcome rather
/// than having the client mutate session state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The user may proceed to the ESD test. `identity` is present on a
    /// verified 200 reply and absent on the fail-open path.
    Granted { identity: Option<UserIdentity> },

    /// The user may not proceed. `unauthorized` distinguishes an explicit
    /// 401 from a missing username.
    Denied { unauthorized: bool },
}

impl AuthOutcome {
    /// True when the user may proceed to testing.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthOutcome::Granted { .. })
    }
}

/// Client for `POST /esd/authenticate`.
pub struct AuthClient<B> {
    backend: Arc<B>,
}

impl<B: StationBackend> AuthClient<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Exchange a username for a verified identity.
    ///
    /// - `None` resolves to `Denied` immediately, without a network call.
    /// - HTTP 200 resolves to `Granted` with the identity fields.
    /// - HTTP 401 resolves to `Denied { unauthorized: true }`.
    /// - Timeout/transport errors resolve to `Granted` without an identity:
    ///   the station fails open rather than blocking the line on backend
    ///   unavailability.
    pub async fn authenticate(&self, username: Option<&str>) -> AuthOutcome {
        let Some(username) = username else {
            return AuthOutcome::Denied { unauthorized: false };
        };

        match self.backend.authenticate(username).await {
            Ok(reply) => {
                info!(username, "user authenticated");
                AuthOutcome::Granted {
                    identity: Some(identity_from(reply)),
                }
            }
            Err(NetError::Unauthorized) => {
                warn!(username, "backend rejected user");
                AuthOutcome::Denied { unauthorized: true }
            }
            Err(error) => {
                // fail-open on transport errors
                error!(username, %error, "authentication request failed; proceeding");
                AuthOutcome::Granted { identity: None }
            }
        }
    }
}

fn identity_from(reply: AuthReply) -> UserIdentity {
    UserIdentity {
        username: reply.username,
        fullname: reply.fullname,
        gender: reply.gender,
        date_of_birth: reply.date_of_birth,
    }
}
