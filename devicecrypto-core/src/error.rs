//! Error taxonomy for device crypto operations.
//!
//! Every failure surfaces to the caller of the failing operation with a
//! stable, inspectable kind; the engine never swallows a failure or retries
//! on its own. Retries (for example re-prompting biometry) are always
//! caller-initiated.

use thiserror::Error;

/// Result type alias for device crypto operations.
pub type CryptoResult<T> = Result<T, DeviceCryptoError>;

/// Error outputs from the device crypto engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceCryptoError {
    /// The trust boundary rejected the operation, for example key
    /// generation requiring an isolated element the device does not have.
    #[error("hardware_unavailable: {reason}")]
    HardwareUnavailable {
        /// What the boundary reported.
        reason: String,
    },

    /// The requested key configuration is incompatible with the device,
    /// for example `AuthenticationRequired` with nothing enrolled.
    #[error("invalid_configuration: {reason}")]
    InvalidConfiguration {
        /// Which requirement the device cannot meet.
        reason: String,
    },

    /// No usable key exists under the alias.
    #[error("key_not_found: {alias}")]
    KeyNotFound {
        /// The alias that was looked up.
        alias: String,
    },

    /// The key exists but was terminally invalidated by a biometric
    /// enrollment change. It must be deleted and recreated.
    #[error("key_invalidated: {alias}")]
    KeyInvalidated {
        /// The alias of the invalidated key.
        alias: String,
    },

    /// The key is only usable while the device is unlocked.
    #[error("device_locked")]
    DeviceLocked,

    /// The user failed or was denied the presence check.
    #[error("authentication_failed: {reason}")]
    AuthenticationFailed {
        /// Why the challenge ended unauthorized.
        reason: String,
    },

    /// The user dismissed the prompt.
    #[error("user_cancelled")]
    UserCancelled,

    /// The prompt was not answered within the bounded wait.
    #[error("authentication_timeout")]
    AuthenticationTimeout,

    /// A challenge for the alias is already being presented.
    #[error("challenge_in_progress: {alias}")]
    ChallengeInProgress {
        /// The alias whose challenge is still pending.
        alias: String,
    },

    /// The authorization is missing, already consumed, expired, or bound
    /// to a different alias.
    #[error("authorization_expired")]
    AuthorizationExpired,

    /// Authentication-tag verification failed. No detail is reported and
    /// no partial plaintext is exposed.
    #[error("decryption_failed")]
    DecryptionFailed,

    /// A caller-supplied parameter is not valid for the operation.
    #[error("invalid_input '{parameter}': {reason}")]
    InvalidInput {
        /// Name of the offending parameter.
        parameter: String,
        /// Description of the issue.
        reason: String,
    },

    /// A read-only platform query failed transiently.
    #[error("platform_query_failed: {reason}")]
    PlatformQueryFailed {
        /// What the platform reported.
        reason: String,
    },

    /// The trust boundary failed while performing a key operation.
    #[error("hardware_operation_failed: {reason}")]
    HardwareOperationFailed {
        /// What the boundary reported.
        reason: String,
    },
}

impl DeviceCryptoError {
    /// Creates a [`DeviceCryptoError::HardwareUnavailable`] error.
    pub fn hardware_unavailable<S: Into<String>>(reason: S) -> Self {
        Self::HardwareUnavailable { reason: reason.into() }
    }

    /// Creates a [`DeviceCryptoError::InvalidConfiguration`] error.
    pub fn invalid_configuration<S: Into<String>>(reason: S) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }

    /// Creates a [`DeviceCryptoError::KeyNotFound`] error.
    pub fn key_not_found<S: Into<String>>(alias: S) -> Self {
        Self::KeyNotFound { alias: alias.into() }
    }

    /// Creates a [`DeviceCryptoError::KeyInvalidated`] error.
    pub fn key_invalidated<S: Into<String>>(alias: S) -> Self {
        Self::KeyInvalidated { alias: alias.into() }
    }

    /// Creates a [`DeviceCryptoError::AuthenticationFailed`] error.
    pub fn authentication_failed<S: Into<String>>(reason: S) -> Self {
        Self::AuthenticationFailed { reason: reason.into() }
    }

    /// Creates a [`DeviceCryptoError::InvalidInput`] error.
    pub fn invalid_input<P: Into<String>, R: Into<String>>(parameter: P, reason: R) -> Self {
        Self::InvalidInput {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`DeviceCryptoError::PlatformQueryFailed`] error.
    pub fn platform_query<S: Into<String>>(reason: S) -> Self {
        Self::PlatformQueryFailed { reason: reason.into() }
    }

    /// Creates a [`DeviceCryptoError::HardwareOperationFailed`] error.
    pub fn hardware_op<S: Into<String>>(reason: S) -> Self {
        Self::HardwareOperationFailed { reason: reason.into() }
    }
}
