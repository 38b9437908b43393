//! Entry point tying the engine components together.
//!
//! [`DeviceCrypto`] mirrors the surface a mobile binding layer calls into:
//! text in, text out (PEM public keys, Base64 signatures and
//! ciphertext/IV pairs, UTF-8 plaintext), with the user-presence challenge
//! run automatically whenever the key's policy demands one. Components are
//! also reachable individually for callers that stage challenges
//! themselves.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::authenticator::{AuthenticationGate, AuthorizationContext, GateConfig};
use crate::device::DeviceInspector;
use crate::engine::CryptoEngine;
use crate::error::{CryptoResult, DeviceCryptoError};
use crate::keystore::KeyStore;
use crate::locks::AliasLocks;
use crate::platform::{DeviceMonitor, PromptPresenter, TrustBoundary};
use crate::policy::{self, DeviceConditions, PolicyDecision};
use crate::types::{
    BiometryType, EncryptedPayload, KeyConfig, KeyState, KeyType, PromptSpec, SecurityLevel,
};

/// Device-backed key custody and cryptographic operations over one
/// platform.
pub struct DeviceCrypto {
    keystore: KeyStore,
    engine: CryptoEngine,
    gate: Arc<AuthenticationGate>,
    inspector: DeviceInspector,
    boundary: Arc<dyn TrustBoundary>,
    monitor: Arc<dyn DeviceMonitor>,
}

impl DeviceCrypto {
    /// Creates an engine over the given platform with default gate timing.
    #[must_use]
    pub fn new(
        boundary: Arc<dyn TrustBoundary>,
        monitor: Arc<dyn DeviceMonitor>,
        presenter: Arc<dyn PromptPresenter>,
    ) -> Self {
        Self::with_config(boundary, monitor, presenter, GateConfig::default())
    }

    /// Creates an engine with explicit gate timing.
    #[must_use]
    pub fn with_config(
        boundary: Arc<dyn TrustBoundary>,
        monitor: Arc<dyn DeviceMonitor>,
        presenter: Arc<dyn PromptPresenter>,
        config: GateConfig,
    ) -> Self {
        tracing::debug!(curve = ?boundary.signature_curve(), "initializing device crypto");
        let locks = Arc::new(AliasLocks::new());
        let gate = Arc::new(AuthenticationGate::new(
            presenter,
            Arc::clone(&monitor),
            Arc::clone(&locks),
            config,
        ));
        Self {
            keystore: KeyStore::new(Arc::clone(&boundary), Arc::clone(&monitor), locks),
            engine: CryptoEngine::new(
                Arc::clone(&boundary),
                Arc::clone(&monitor),
                Arc::clone(&gate),
            ),
            inspector: DeviceInspector::new(Arc::clone(&monitor)),
            gate,
            boundary,
            monitor,
        }
    }

    /// The key registry.
    #[must_use]
    pub const fn key_store(&self) -> &KeyStore {
        &self.keystore
    }

    /// The operation engine, for callers that stage challenges themselves.
    #[must_use]
    pub const fn crypto_engine(&self) -> &CryptoEngine {
        &self.engine
    }

    /// The authentication gate.
    #[must_use]
    pub fn authentication_gate(&self) -> &AuthenticationGate {
        &self.gate
    }

    /// The capability inspector.
    #[must_use]
    pub const fn device_inspector(&self) -> &DeviceInspector {
        &self.inspector
    }

    /// Creates (or returns) the EC key pair under `alias` and yields its
    /// PEM-encoded public key.
    ///
    /// # Errors
    ///
    /// See [`KeyStore::get_or_create_asymmetric_key`].
    pub async fn get_or_create_asymmetric_key(
        &self,
        alias: &str,
        config: KeyConfig,
    ) -> CryptoResult<String> {
        self.keystore.get_or_create_asymmetric_key(alias, config).await
    }

    /// Creates the AES key under `alias` if absent; `true` means it
    /// pre-existed.
    ///
    /// # Errors
    ///
    /// See [`KeyStore::get_or_create_symmetric_key`].
    pub async fn get_or_create_symmetric_key(
        &self,
        alias: &str,
        config: KeyConfig,
    ) -> CryptoResult<bool> {
        self.keystore.get_or_create_symmetric_key(alias, config).await
    }

    /// Deletes the key under `alias`; `false` when nothing existed.
    ///
    /// # Errors
    ///
    /// See [`KeyStore::delete_key`].
    pub async fn delete_key(&self, alias: &str) -> CryptoResult<bool> {
        self.keystore.delete_key(alias).await
    }

    /// PEM-encoded public key under `alias`.
    ///
    /// # Errors
    ///
    /// See [`KeyStore::get_public_key`].
    pub async fn get_public_key(&self, alias: &str) -> CryptoResult<String> {
        self.keystore.get_public_key(alias).await
    }

    /// Whether a usable key of `key_type` exists under `alias`.
    ///
    /// # Errors
    ///
    /// See [`KeyStore::is_key_exists`].
    pub async fn is_key_exists(&self, alias: &str, key_type: KeyType) -> CryptoResult<bool> {
        self.keystore.is_key_exists(alias, key_type).await
    }

    /// Signs `message`, challenging the user first when the key's policy
    /// requires it. Returns the Base64-encoded signature.
    ///
    /// # Errors
    ///
    /// Challenge failures (`AuthenticationFailed`, `UserCancelled`,
    /// `AuthenticationTimeout`, `ChallengeInProgress`) plus everything
    /// [`CryptoEngine::sign`] reports.
    pub async fn sign(
        &self,
        alias: &str,
        message: &str,
        prompt: &PromptSpec,
    ) -> CryptoResult<String> {
        let auth = self.prepare_authorization(alias, prompt).await?;
        self.engine.sign(alias, message.as_bytes(), auth.as_ref()).await
    }

    /// Encrypts `plaintext`, challenging the user first when required.
    /// Returns the Base64 ciphertext/IV pair.
    ///
    /// # Errors
    ///
    /// As for [`Self::sign`].
    pub async fn encrypt(
        &self,
        alias: &str,
        plaintext: &str,
        prompt: &PromptSpec,
    ) -> CryptoResult<EncryptedPayload> {
        let auth = self.prepare_authorization(alias, prompt).await?;
        let output = self
            .engine
            .encrypt(alias, plaintext.as_bytes(), auth.as_ref())
            .await?;
        Ok(EncryptedPayload {
            encrypted_text: STANDARD.encode(&output.ciphertext),
            iv: STANDARD.encode(output.iv),
        })
    }

    /// Decrypts a Base64 ciphertext/IV pair produced by [`Self::encrypt`],
    /// challenging the user first when required.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for malformed Base64, a wrong-length IV, or
    /// non-UTF-8 plaintext; otherwise as for [`Self::sign`], with
    /// `DecryptionFailed` on tag failure.
    pub async fn decrypt(
        &self,
        alias: &str,
        encrypted_text: &str,
        iv: &str,
        prompt: &PromptSpec,
    ) -> CryptoResult<String> {
        let ciphertext = STANDARD
            .decode(encrypted_text)
            .map_err(|_| DeviceCryptoError::invalid_input("encrypted_text", "not valid Base64"))?;
        let iv = STANDARD
            .decode(iv)
            .map_err(|_| DeviceCryptoError::invalid_input("iv", "not valid Base64"))?;
        let auth = self.prepare_authorization(alias, prompt).await?;
        let plaintext = self
            .engine
            .decrypt(alias, &ciphertext, &iv, auth.as_ref())
            .await?;
        String::from_utf8(plaintext).map_err(|_| {
            DeviceCryptoError::invalid_input("encrypted_text", "plaintext is not valid UTF-8")
        })
    }

    /// Whether any biometric credential is enrolled.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` on a transient platform error.
    pub async fn is_biometry_enrolled(&self) -> CryptoResult<bool> {
        self.inspector.is_biometry_enrolled().await
    }

    /// How the device is protected.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` on a transient platform error.
    pub async fn device_security_level(&self) -> CryptoResult<SecurityLevel> {
        self.inspector.device_security_level().await
    }

    /// The biometry kind enrolled on the device.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` on a transient platform error.
    pub async fn get_biometry_type(&self) -> CryptoResult<BiometryType> {
        self.inspector.get_biometry_type().await
    }

    /// Runs a standalone user-presence check.
    ///
    /// # Errors
    ///
    /// See [`AuthenticationGate::authenticate`].
    pub async fn authenticate_with_biometry(&self, prompt: &PromptSpec) -> CryptoResult<()> {
        self.gate.authenticate(prompt).await
    }

    /// Stages the authorization an operation on `alias` needs: none for
    /// permitted keys, a fresh challenge for authentication-gated ones.
    /// Doomed operations (missing or invalidated key, locked device) are
    /// reported before any prompt reaches the user.
    async fn prepare_authorization(
        &self,
        alias: &str,
        prompt: &PromptSpec,
    ) -> CryptoResult<Option<AuthorizationContext>> {
        let Some(descriptor) = self.boundary.describe_key(alias)? else {
            return Err(DeviceCryptoError::key_not_found(alias));
        };
        if descriptor.state == KeyState::Invalidated {
            return Err(DeviceCryptoError::key_invalidated(alias));
        }
        let conditions = DeviceConditions {
            device_locked: self.monitor.is_device_locked()?,
            biometry_enrolled: self.monitor.is_biometry_enrolled()?,
        };
        match policy::evaluate(descriptor.access_level, conditions) {
            PolicyDecision::Permit => Ok(None),
            PolicyDecision::Deny => Err(DeviceCryptoError::DeviceLocked),
            PolicyDecision::RequireAuthentication => {
                Ok(Some(self.gate.challenge(alias, prompt).await?))
            }
        }
    }
}
