use std::time::SystemTime;

use jiff::Timestamp;
use tracing::{debug, error, info};

use crate::{
    AuthGateway,
    errors::{Error, ErrorPayload, RefreshFailure},
    telemetry::refresh::RefreshTelemetry,
    token::{Admission, Credential, RefreshCycle},
    types::RefreshResponse,
};

impl AuthGateway {
    /// Waits for a fresh token after a 401: starts the refresh cycle when none
    /// is in flight, otherwise suspends until the running one settles.
    pub(super) async fn await_refresh(&self) -> Result<String, Error> {
        match self.context.gate().enter("unauthorized") {
            Admission::Initiator(cycle) => {
                let telemetry = cycle.telemetry().clone();
                let outcome = self.obtain_credential(&telemetry).await;
                self.conclude(cycle, &telemetry, outcome, true)
            }
            Admission::Follower {
                telemetry,
                position,
                receiver,
            } => {
                telemetry.emit_queued(position);
                match receiver.await {
                    Ok(Ok(token)) => Ok(token),
                    Ok(Err(failure)) => Err(Error::Refresh(failure)),
                    Err(_) => Err(Error::Refresh(RefreshFailure::abandoned())),
                }
            }
        }
    }

    /// Refreshes ahead of expiry when the stored credential is inside the
    /// proactive threshold. Returns whether a refresh happened.
    ///
    /// Never starts a second cycle: returns `Ok(false)` while one is in flight.
    /// A failure with nobody queued leaves the credential in place; the next
    /// 401 decides what happens to the session.
    pub async fn refresh_if_expiring(&self) -> Result<bool, Error> {
        let now = Timestamp::now();
        let Some(credential) = self.context.vault().load() else {
            return Ok(false);
        };
        if !credential.needs_refresh(now, self.context.policy().proactive_threshold) {
            return Ok(false);
        }
        let Some(cycle) = self.context.gate().try_begin("proactive") else {
            debug!("proactive refresh skipped: cycle already in flight");
            return Ok(false);
        };

        info!(
            "proactive refresh: remaining={:?}",
            credential.remaining(now)
        );
        let telemetry = cycle.telemetry().clone();
        let outcome = self.obtain_credential(&telemetry).await;
        self.conclude(cycle, &telemetry, outcome, false)
            .map(|_| true)
    }

    async fn obtain_credential(
        &self,
        telemetry: &RefreshTelemetry,
    ) -> Result<Credential, RefreshFailure> {
        telemetry.emit_start(SystemTime::now());
        let response = self.call_refresh_endpoint().await?;
        let previous = self.context.vault().load();
        let credential = Credential::issue(
            response.access_token,
            response
                .token_type
                .or_else(|| previous.as_ref().map(|c| c.token_type.clone())),
            response
                .user_role
                .or_else(|| previous.as_ref().map(|c| c.role.clone())),
            Timestamp::now(),
            self.context.policy().refresh_window,
        )
        .map_err(|e| RefreshFailure::new(None, e.to_string()))?;
        if let Err(err) = self.context.vault().persist(&credential) {
            error!("refreshed credential could not be persisted: {}", err);
        }
        Ok(credential)
    }

    async fn call_refresh_endpoint(&self) -> Result<RefreshResponse, RefreshFailure> {
        let response = self
            .context
            .http_client()
            .post(self.context.refresh_url())
            .send()
            .await
            .map_err(|e| RefreshFailure::new(None, e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RefreshFailure::new(Some(status), e.to_string()))?;
        if !status.is_success() {
            return Err(RefreshFailure::new(
                Some(status),
                ErrorPayload::from_bytes(&body).to_string(),
            ));
        }
        serde_json::from_slice(&body).map_err(|e| {
            RefreshFailure::new(Some(status), format!("invalid refresh response: {}", e))
        })
    }

    /// Settles the cycle and applies the failure side effects. On failure the
    /// session is ended when `always_end_session` is set or someone is queued.
    /// The queue is taken in the same step that clears the flag, so a waiter
    /// can never receive the failure without the session having ended.
    fn conclude(
        &self,
        cycle: RefreshCycle,
        telemetry: &RefreshTelemetry,
        outcome: Result<Credential, RefreshFailure>,
        always_end_session: bool,
    ) -> Result<String, Error> {
        match outcome {
            Ok(credential) => {
                let token = credential.access_token;
                let released = cycle.settle(Ok(token.clone()));
                telemetry.emit_success(released, SystemTime::now());
                info!("refresh ok: released {} queued request(s)", released);
                Ok(token)
            }
            Err(failure) => {
                let pending = cycle.close();
                if always_end_session || !pending.is_empty() {
                    self.end_session();
                }
                let released = pending.broadcast(Err(failure.clone()));
                telemetry.emit_failure(&failure, released, SystemTime::now());
                Err(Error::Refresh(failure))
            }
        }
    }

    /// Wipes every credential slot and sends the client to the login page.
    fn end_session(&self) {
        if let Err(err) = self.context.vault().clear() {
            error!("credential wipe failed: {}", err);
        }
        let target = self.context.login_redirect();
        error!("refresh failed; redirecting to '{}'", target);
        self.context.navigator().redirect(target);
    }
}
