//! Access decisions for key use.
//!
//! The decision function is pure and deterministic: identical inputs always
//! produce the identical decision. The challenge itself runs in the
//! [`AuthenticationGate`](crate::AuthenticationGate); this module only
//! decides whether it must run.

use crate::types::AccessLevel;

/// Snapshot of the device conditions a decision is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConditions {
    /// Whether the device is currently locked.
    pub device_locked: bool,
    /// Whether any biometry is enrolled. Not consulted by the decision
    /// table; callers staging a challenge read it to pick a flow.
    pub biometry_enrolled: bool,
}

/// Outcome of an access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The operation may proceed directly.
    Permit,
    /// A fresh user-presence authorization must be obtained first.
    RequireAuthentication,
    /// The operation is not permitted in the current device state. There
    /// is no retry path; the caller must change the state (unlock) and
    /// retry.
    Deny,
}

/// Evaluates whether a key with `access_level` may be used under
/// `conditions`.
///
/// `AuthenticationRequired` keys demand authentication regardless of lock
/// state; the gating itself happens in the gate, not here.
#[must_use]
pub const fn evaluate(access_level: AccessLevel, conditions: DeviceConditions) -> PolicyDecision {
    match access_level {
        AccessLevel::Always => PolicyDecision::Permit,
        AccessLevel::UnlockedDevice => {
            if conditions.device_locked {
                PolicyDecision::Deny
            } else {
                PolicyDecision::Permit
            }
        }
        AccessLevel::AuthenticationRequired => PolicyDecision::RequireAuthentication,
    }
}
