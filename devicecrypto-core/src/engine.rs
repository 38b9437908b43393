//! Cryptographic operations against boundary-held keys.
//!
//! Signing uses the boundary's elliptic curve with DER/Base64 output;
//! encryption is AES-GCM with a boundary-generated IV per call. Access
//! policy is evaluated immediately before key use, and a required
//! authorization is consumed whether or not the operation succeeds.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::authenticator::{AuthenticationGate, AuthorizationContext};
use crate::error::{CryptoResult, DeviceCryptoError};
use crate::platform::{DeviceMonitor, TrustBoundary};
use crate::policy::{self, DeviceConditions, PolicyDecision};
use crate::types::{EncryptionOutput, KeyDescriptor, KeyState, KeyType, IV_SIZE};

/// Executes sign/encrypt/decrypt against keys behind the trust boundary.
pub struct CryptoEngine {
    boundary: Arc<dyn TrustBoundary>,
    monitor: Arc<dyn DeviceMonitor>,
    gate: Arc<AuthenticationGate>,
}

impl CryptoEngine {
    pub(crate) fn new(
        boundary: Arc<dyn TrustBoundary>,
        monitor: Arc<dyn DeviceMonitor>,
        gate: Arc<AuthenticationGate>,
    ) -> Self {
        Self {
            boundary,
            monitor,
            gate,
        }
    }

    /// Signs `message` with the asymmetric key under `alias`, returning
    /// the Base64-encoded DER signature.
    ///
    /// An authentication-gated key requires a fresh [`AuthorizationContext`]
    /// for this alias; the context is consumed by this attempt either way.
    ///
    /// # Errors
    ///
    /// `KeyNotFound`, `KeyInvalidated`, `DeviceLocked`,
    /// `AuthorizationExpired` (missing, reused, expired, or mismatched
    /// context), `HardwareOperationFailed`, and `InvalidInput` when the
    /// alias holds a symmetric key.
    pub async fn sign(
        &self,
        alias: &str,
        message: &[u8],
        auth: Option<&AuthorizationContext>,
    ) -> CryptoResult<String> {
        let descriptor = self.describe_active(alias, KeyType::Asymmetric)?;
        self.authorize(&descriptor, alias, auth)?;
        let signature = self.boundary.sign(alias, message)?;
        Ok(STANDARD.encode(signature))
    }

    /// Encrypts `plaintext` under the symmetric key for `alias`.
    ///
    /// The IV is generated inside the boundary, fresh for every call;
    /// callers can never supply one. Authorization semantics are the same
    /// as for [`Self::sign`].
    ///
    /// # Errors
    ///
    /// As for [`Self::sign`].
    pub async fn encrypt(
        &self,
        alias: &str,
        plaintext: &[u8],
        auth: Option<&AuthorizationContext>,
    ) -> CryptoResult<EncryptionOutput> {
        let descriptor = self.describe_active(alias, KeyType::Symmetric)?;
        self.authorize(&descriptor, alias, auth)?;
        self.boundary.encrypt(alias, plaintext)
    }

    /// Decrypts a ciphertext/IV pair previously produced by
    /// [`Self::encrypt`] under `alias`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `iv` does not have the AEAD's IV length,
    /// `DecryptionFailed` when authentication-tag verification fails (no
    /// partial plaintext is ever exposed), otherwise as for [`Self::sign`].
    pub async fn decrypt(
        &self,
        alias: &str,
        ciphertext: &[u8],
        iv: &[u8],
        auth: Option<&AuthorizationContext>,
    ) -> CryptoResult<Vec<u8>> {
        let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| {
            DeviceCryptoError::invalid_input("iv", "must be exactly 12 bytes")
        })?;
        let descriptor = self.describe_active(alias, KeyType::Symmetric)?;
        self.authorize(&descriptor, alias, auth)?;
        self.boundary.decrypt(alias, &iv, ciphertext)
    }

    fn describe_active(&self, alias: &str, expected: KeyType) -> CryptoResult<KeyDescriptor> {
        let Some(descriptor) = self.boundary.describe_key(alias)? else {
            return Err(DeviceCryptoError::key_not_found(alias));
        };
        if descriptor.state == KeyState::Invalidated {
            return Err(DeviceCryptoError::key_invalidated(alias));
        }
        if descriptor.key_type != expected {
            return Err(DeviceCryptoError::invalid_input(
                "alias",
                "key type does not support this operation",
            ));
        }
        Ok(descriptor)
    }

    fn authorize(
        &self,
        descriptor: &KeyDescriptor,
        alias: &str,
        auth: Option<&AuthorizationContext>,
    ) -> CryptoResult<()> {
        let conditions = DeviceConditions {
            device_locked: self.monitor.is_device_locked()?,
            biometry_enrolled: self.monitor.is_biometry_enrolled()?,
        };
        match policy::evaluate(descriptor.access_level, conditions) {
            PolicyDecision::Permit => Ok(()),
            PolicyDecision::Deny => Err(DeviceCryptoError::DeviceLocked),
            PolicyDecision::RequireAuthentication => {
                let context = auth.ok_or(DeviceCryptoError::AuthorizationExpired)?;
                self.gate.redeem(context, alias)
            }
        }
    }
}
