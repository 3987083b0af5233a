//! `SessionClient` - token request plus session connection in one place.

use crate::activity_log::{ActivityLog, Severity};
use crate::actors::messages::ConnectionState;
use crate::actors::session::{SessionConnectionActor, SessionConnectionHandle};
use crate::config::ClientConfig;
use crate::errors::SessionError;
use crate::platform::RealtimePlatform;
use crate::token_client::{JoinCredential, TokenClient};
use common::grant::SessionGrant;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub struct SessionClient {
    token_client: TokenClient,
    connection: SessionConnectionHandle,
    cancel_token: CancellationToken,
}

impl SessionClient {
    /// Spawn the session actor and build the token client.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: &ClientConfig,
        platform: Arc<dyn RealtimePlatform>,
    ) -> Result<Self, SessionError> {
        let token_client = TokenClient::from_config(config)?;
        let activity = ActivityLog::new(config.activity_log_capacity);
        let cancel_token = CancellationToken::new();

        let (connection, _task) =
            SessionConnectionActor::spawn(platform, activity, cancel_token.child_token());

        Ok(Self {
            token_client,
            connection,
            cancel_token,
        })
    }

    /// Request a credential and connect with it.
    ///
    /// Returns the credential actually issued, including any defaults the
    /// token service filled in.
    #[instrument(skip_all, name = "sc.client.join")]
    pub async fn join(
        &self,
        session_name: Option<&str>,
        participant_name: Option<&str>,
    ) -> Result<JoinCredential, SessionError> {
        let state = self.connection.state().await?;
        if state != ConnectionState::Disconnected {
            let err = SessionError::InvalidState {
                operation: "join",
                state,
            };
            self.activity_log()
                .append(format!("Connection error: {err}"), Severity::Error);
            return Err(err);
        }

        self.activity_log()
            .append("Generating token...", Severity::Info);

        let credential = match self
            .token_client
            .request_token(session_name, participant_name)
            .await
        {
            Ok(credential) => credential,
            Err(e) => {
                self.activity_log()
                    .append(format!("Connection error: {e}"), Severity::Error);
                return Err(e);
            }
        };

        self.activity_log()
            .append("Token generated successfully", Severity::Success);

        let grant = match SessionGrant::from_token(&credential.token) {
            Ok(grant) => grant,
            Err(e) => {
                let err = SessionError::from(e);
                self.activity_log()
                    .append(format!("Connection error: {err}"), Severity::Error);
                return Err(err);
            }
        };

        info!(
            target: "sc.client",
            session = %credential.room_name,
            identity = %credential.participant_name,
            "Joining session"
        );

        self.connection
            .connect(grant, credential.livekit_url.clone())
            .await?;

        Ok(credential)
    }

    /// Leave the current session, if any.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.connection.disconnect().await
    }

    /// Direct access to the session connection (toggles, roster, events).
    #[must_use]
    pub fn connection(&self) -> &SessionConnectionHandle {
        &self.connection
    }

    #[must_use]
    pub fn activity_log(&self) -> &ActivityLog {
        self.connection.activity_log()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
