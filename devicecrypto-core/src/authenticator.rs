//! User-presence challenges and single-use authorization.
//!
//! Each challenge walks a fixed state machine:
//!
//! ```text
//! Idle -> Presenting -> { Authorized, Rejected, Cancelled, TimedOut }
//! ```
//!
//! `Authorized` yields an [`AuthorizationContext`]; the other terminal
//! states surface as `AuthenticationFailed`, `UserCancelled`, and
//! `AuthenticationTimeout` respectively. At most one challenge per alias
//! is ever presenting: a concurrent second request fails fast with
//! `ChallengeInProgress` instead of queueing, because two simultaneous
//! prompts are undefined behavior on most hardware.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{CryptoResult, DeviceCryptoError};
use crate::locks::AliasLocks;
use crate::platform::{DeviceMonitor, PromptOutcome, PromptPresenter, PromptRequest};
use crate::types::PromptSpec;

/// Timing configuration for the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Bounded wait for the user to answer a prompt.
    pub prompt_timeout: Duration,
    /// Validity window of an issued authorization.
    pub authorization_ttl: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(30),
            authorization_ttl: Duration::from_secs(60),
        }
    }
}

/// Single-use proof that a user-presence challenge succeeded.
///
/// Bound to the alias it was issued for and consumed by the first
/// operation attempt — successful or not. Not persisted, not clonable.
#[derive(Debug)]
pub struct AuthorizationContext {
    token: Uuid,
    alias: String,
}

impl AuthorizationContext {
    /// Alias this authorization is bound to.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

struct IssuedToken {
    alias: String,
    issued_at: Instant,
}

/// Orchestrates biometric/credential challenges and tracks the
/// authorizations they produce.
pub struct AuthenticationGate {
    presenter: Arc<dyn PromptPresenter>,
    monitor: Arc<dyn DeviceMonitor>,
    locks: Arc<AliasLocks>,
    config: GateConfig,
    in_flight: Mutex<HashSet<String>>,
    issued: Mutex<HashMap<Uuid, IssuedToken>>,
}

/// Clears the in-flight marker when a challenge reaches a terminal state.
struct InFlightGuard<'a> {
    gate: &'a AuthenticationGate,
    alias: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gate
            .in_flight
            .lock()
            .expect("in-flight registry poisoned")
            .remove(&self.alias);
    }
}

impl AuthenticationGate {
    pub(crate) fn new(
        presenter: Arc<dyn PromptPresenter>,
        monitor: Arc<dyn DeviceMonitor>,
        locks: Arc<AliasLocks>,
        config: GateConfig,
    ) -> Self {
        Self {
            presenter,
            monitor,
            locks,
            config,
            in_flight: Mutex::new(HashSet::new()),
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Runs a user-presence challenge for `alias` and returns a fresh
    /// authorization bound to it.
    ///
    /// Serializes with create/delete operations on the same alias; the
    /// wait for the user is bounded by the configured prompt timeout, and
    /// on timeout the prompt is torn down and the alias is immediately
    /// available for a new attempt.
    ///
    /// # Errors
    ///
    /// `ChallengeInProgress` when a challenge for `alias` is already
    /// presenting, `AuthenticationFailed` on rejection (or nothing
    /// enrolled to check against), `UserCancelled` on dismissal,
    /// `AuthenticationTimeout` when the bounded wait elapses,
    /// `InvalidInput` for an empty alias.
    pub async fn challenge(
        &self,
        alias: &str,
        prompt: &PromptSpec,
    ) -> CryptoResult<AuthorizationContext> {
        if alias.is_empty() {
            return Err(DeviceCryptoError::invalid_input(
                "alias",
                "must not be empty",
            ));
        }
        let _in_flight = self.begin(alias)?;
        let _alias_guard = self.locks.acquire(alias).await;
        self.run_prompt(alias, prompt).await?;
        Ok(self.issue(alias))
    }

    /// Runs a standalone user-presence check with no key involved.
    ///
    /// Standalone checks serialize among themselves but not with
    /// per-alias challenges.
    ///
    /// # Errors
    ///
    /// As for [`Self::challenge`], without the alias-specific cases.
    pub async fn authenticate(&self, prompt: &PromptSpec) -> CryptoResult<()> {
        // The empty alias is rejected by every keyed operation, so it is
        // free to serialize standalone checks.
        let _in_flight = self.begin("")?;
        self.run_prompt("", prompt).await
    }

    /// Consumes `context` for one operation on `alias`.
    ///
    /// The token is invalidated no matter how the operation that follows
    /// turns out; reuse, expiry, and alias mismatch all report the same
    /// `AuthorizationExpired`.
    ///
    /// # Errors
    ///
    /// `AuthorizationExpired` as above.
    pub(crate) fn redeem(&self, context: &AuthorizationContext, alias: &str) -> CryptoResult<()> {
        let entry = self
            .issued
            .lock()
            .expect("token registry poisoned")
            .remove(&context.token);
        let Some(entry) = entry else {
            return Err(DeviceCryptoError::AuthorizationExpired);
        };
        if entry.alias != alias || entry.issued_at.elapsed() > self.config.authorization_ttl {
            return Err(DeviceCryptoError::AuthorizationExpired);
        }
        Ok(())
    }

    fn begin(&self, alias: &str) -> CryptoResult<InFlightGuard<'_>> {
        let mut in_flight = self.in_flight.lock().expect("in-flight registry poisoned");
        if !in_flight.insert(alias.to_owned()) {
            return Err(DeviceCryptoError::ChallengeInProgress {
                alias: alias.to_owned(),
            });
        }
        drop(in_flight);
        Ok(InFlightGuard {
            gate: self,
            alias: alias.to_owned(),
        })
    }

    async fn run_prompt(&self, alias: &str, prompt: &PromptSpec) -> CryptoResult<()> {
        if !self.monitor.is_biometry_enrolled()? && !self.monitor.has_device_credential()? {
            return Err(DeviceCryptoError::authentication_failed(
                "no biometry or device credential enrolled",
            ));
        }

        let challenge_id = Uuid::new_v4();
        tracing::debug!(%challenge_id, alias, "presenting user-presence prompt");
        let receiver = self.presenter.present(PromptRequest {
            challenge_id,
            alias: alias.to_owned(),
            prompt: prompt.clone(),
        });

        match tokio::time::timeout(self.config.prompt_timeout, receiver).await {
            Err(_elapsed) => {
                self.presenter.dismiss(challenge_id);
                tracing::warn!(%challenge_id, alias, "user-presence prompt timed out");
                Err(DeviceCryptoError::AuthenticationTimeout)
            }
            // The prompt was torn down without an answer.
            Ok(Err(_closed)) => Err(DeviceCryptoError::UserCancelled),
            Ok(Ok(PromptOutcome::Confirmed)) => {
                tracing::debug!(%challenge_id, alias, "user-presence prompt confirmed");
                Ok(())
            }
            Ok(Ok(PromptOutcome::Rejected)) => Err(DeviceCryptoError::authentication_failed(
                "user failed the presence check",
            )),
            Ok(Ok(PromptOutcome::Dismissed)) => Err(DeviceCryptoError::UserCancelled),
        }
    }

    fn issue(&self, alias: &str) -> AuthorizationContext {
        let token = Uuid::new_v4();
        self.issued
            .lock()
            .expect("token registry poisoned")
            .insert(
                token,
                IssuedToken {
                    alias: alias.to_owned(),
                    issued_at: Instant::now(),
                },
            );
        AuthorizationContext {
            token,
            alias: alias.to_owned(),
        }
    }
}
