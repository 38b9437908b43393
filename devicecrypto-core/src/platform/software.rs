//! Software implementations of the platform traits.
//!
//! Keys live in process memory and operations use software cryptography
//! (ECDSA P-256, AES-256-GCM). This backend stands in for a hardware
//! keystore in tests and on platforms without an isolated element: it
//! keeps the full observable contract — opaque material, lock-state
//! gating, terminal invalidation on biometric enrollment change — without
//! the hardware guarantees.

// Lock poisoning can only follow a panic elsewhere; not documented per method.
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::EncodePublicKey;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoResult, DeviceCryptoError};
use crate::types::{
    AccessLevel, BiometryType, EncryptionOutput, KeyConfig, KeyDescriptor, KeyState, KeyType,
    SignatureCurve, IV_SIZE,
};

use super::{DeviceMonitor, KeySpec, PromptOutcome, PromptPresenter, PromptRequest, TrustBoundary};

// =============================================================================
// Simulated device
// =============================================================================

#[derive(Debug, Clone)]
struct DeviceState {
    locked: bool,
    biometry: BiometryType,
    device_credential: bool,
    secure_element: bool,
    enrollment_generation: u64,
}

/// Mutable stand-in for the device the engine runs on.
///
/// Shared between [`SoftwareBoundary`] (which derives key invalidation
/// from the enrollment generation) and the [`DeviceMonitor`] queries.
/// Starts out unlocked with touch biometry, a device credential, and an
/// isolated element; degrade it with the setters.
pub struct SimulatedDevice {
    state: RwLock<DeviceState>,
}

impl SimulatedDevice {
    /// Creates a fully equipped, unlocked device.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DeviceState {
                locked: false,
                biometry: BiometryType::Touch,
                device_credential: true,
                secure_element: true,
                enrollment_generation: 0,
            }),
        }
    }

    /// Locks or unlocks the device.
    pub fn set_locked(&self, locked: bool) {
        self.write().locked = locked;
    }

    /// Sets whether a PIN, pattern, or password protects the device.
    pub fn set_device_credential(&self, present: bool) {
        self.write().device_credential = present;
    }

    /// Sets whether an isolated secure element is available.
    pub fn set_secure_element(&self, present: bool) {
        self.write().secure_element = present;
    }

    /// Enrolls `biometry`, advancing the enrollment generation. Keys
    /// created with enrollment-change invalidation become unusable.
    pub fn enroll_biometry(&self, biometry: BiometryType) {
        let mut state = self.write();
        state.biometry = biometry;
        state.enrollment_generation += 1;
    }

    /// Removes all enrolled biometry, advancing the enrollment generation.
    pub fn remove_biometry(&self) {
        self.enroll_biometry(BiometryType::None);
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, DeviceState> {
        self.state.write().expect("device state poisoned")
    }

    fn snapshot(&self) -> DeviceState {
        self.state.read().expect("device state poisoned").clone()
    }

    fn is_locked(&self) -> bool {
        self.snapshot().locked
    }

    fn has_secure_element(&self) -> bool {
        self.snapshot().secure_element
    }

    fn enrollment_generation(&self) -> u64 {
        self.snapshot().enrollment_generation
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceMonitor for SimulatedDevice {
    fn is_device_locked(&self) -> CryptoResult<bool> {
        Ok(self.snapshot().locked)
    }

    fn biometry_type(&self) -> CryptoResult<BiometryType> {
        Ok(self.snapshot().biometry)
    }

    fn is_biometry_enrolled(&self) -> CryptoResult<bool> {
        Ok(self.snapshot().biometry != BiometryType::None)
    }

    fn has_device_credential(&self) -> CryptoResult<bool> {
        Ok(self.snapshot().device_credential)
    }
}

// =============================================================================
// Software trust boundary
// =============================================================================

/// 256-bit AES key material, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SymmetricMaterial([u8; 32]);

impl SymmetricMaterial {
    fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricMaterial")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

enum Material {
    Signing(SigningKey),
    Aead(SymmetricMaterial),
}

struct SoftKey {
    key_type: KeyType,
    config: KeyConfig,
    material: Material,
    created_generation: u64,
}

/// In-process trust boundary backed by software cryptography.
///
/// Asymmetric keys are ECDSA over NIST P-256 with DER signatures;
/// symmetric keys are AES-256-GCM with a boundary-generated 12-byte IV.
/// Material is held only in this struct and never exported.
pub struct SoftwareBoundary {
    device: Arc<SimulatedDevice>,
    keys: RwLock<HashMap<String, SoftKey>>,
}

impl SoftwareBoundary {
    /// Creates an empty boundary observing `device` for lock state and
    /// enrollment changes.
    #[must_use]
    pub fn new(device: Arc<SimulatedDevice>) -> Self {
        Self {
            device,
            keys: RwLock::new(HashMap::new()),
        }
    }

    fn is_invalidated(&self, key: &SoftKey) -> bool {
        key.config.invalidate_on_new_biometry
            && key.config.access_level == AccessLevel::AuthenticationRequired
            && key.created_generation != self.device.enrollment_generation()
    }

    fn with_key<R>(
        &self,
        alias: &str,
        f: impl FnOnce(&SoftKey) -> CryptoResult<R>,
    ) -> CryptoResult<R> {
        let keys = self.keys.read().expect("key table poisoned");
        let Some(key) = keys.get(alias) else {
            return Err(DeviceCryptoError::key_not_found(alias));
        };
        if self.is_invalidated(key) {
            return Err(DeviceCryptoError::key_invalidated(alias));
        }
        f(key)
    }

    fn with_usable_key<R>(
        &self,
        alias: &str,
        f: impl FnOnce(&SoftKey) -> CryptoResult<R>,
    ) -> CryptoResult<R> {
        self.with_key(alias, |key| {
            if key.config.access_level == AccessLevel::UnlockedDevice && self.device.is_locked() {
                return Err(DeviceCryptoError::DeviceLocked);
            }
            f(key)
        })
    }
}

/// Short hex fingerprint of a DER-encoded public key, for log lines.
fn spki_fingerprint(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    hex::encode(&digest[..8])
}

impl TrustBoundary for SoftwareBoundary {
    fn generate_key(&self, spec: &KeySpec) -> CryptoResult<()> {
        if spec.config.access_level == AccessLevel::AuthenticationRequired
            && !self.device.has_secure_element()
        {
            return Err(DeviceCryptoError::hardware_unavailable(
                "authentication-bound keys require an isolated secure element",
            ));
        }

        let material = match spec.key_type {
            KeyType::Asymmetric => Material::Signing(SigningKey::random(&mut OsRng)),
            KeyType::Symmetric => Material::Aead(SymmetricMaterial::generate()),
        };
        let fingerprint = match &material {
            Material::Signing(signing) => signing
                .verifying_key()
                .to_public_key_der()
                .ok()
                .map(|der| spki_fingerprint(der.as_bytes())),
            Material::Aead(_) => None,
        };

        let soft_key = SoftKey {
            key_type: spec.key_type,
            config: spec.config,
            material,
            created_generation: self.device.enrollment_generation(),
        };
        self.keys
            .write()
            .expect("key table poisoned")
            .insert(spec.alias.clone(), soft_key);

        tracing::debug!(
            alias = %spec.alias,
            key_type = ?spec.key_type,
            fingerprint = fingerprint.as_deref().unwrap_or("-"),
            "generated key material"
        );
        Ok(())
    }

    fn delete_key(&self, alias: &str) -> CryptoResult<bool> {
        let removed = self
            .keys
            .write()
            .expect("key table poisoned")
            .remove(alias)
            .is_some();
        Ok(removed)
    }

    fn describe_key(&self, alias: &str) -> CryptoResult<Option<KeyDescriptor>> {
        let keys = self.keys.read().expect("key table poisoned");
        Ok(keys.get(alias).map(|key| KeyDescriptor {
            alias: alias.to_owned(),
            key_type: key.key_type,
            access_level: key.config.access_level,
            invalidate_on_new_biometry: key.config.invalidate_on_new_biometry,
            state: if self.is_invalidated(key) {
                KeyState::Invalidated
            } else {
                KeyState::Active
            },
        }))
    }

    fn attest_public_key(&self, alias: &str) -> CryptoResult<Vec<u8>> {
        self.with_key(alias, |key| match &key.material {
            Material::Signing(signing) => signing
                .verifying_key()
                .to_public_key_der()
                .map(p256::pkcs8::Document::into_vec)
                .map_err(|_| DeviceCryptoError::hardware_op("public key encoding failed")),
            Material::Aead(_) => Err(DeviceCryptoError::invalid_input(
                "alias",
                "not an asymmetric key",
            )),
        })
    }

    fn sign(&self, alias: &str, message: &[u8]) -> CryptoResult<Vec<u8>> {
        self.with_usable_key(alias, |key| match &key.material {
            Material::Signing(signing) => {
                let signature: Signature = signing.sign(message);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            Material::Aead(_) => Err(DeviceCryptoError::invalid_input(
                "alias",
                "not an asymmetric key",
            )),
        })
    }

    fn encrypt(&self, alias: &str, plaintext: &[u8]) -> CryptoResult<EncryptionOutput> {
        self.with_usable_key(alias, |key| match &key.material {
            Material::Aead(material) => {
                let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(material.as_bytes()));
                let mut iv = [0u8; IV_SIZE];
                OsRng.fill_bytes(&mut iv);
                let ciphertext = cipher
                    .encrypt(Nonce::from_slice(&iv), plaintext)
                    .map_err(|_| DeviceCryptoError::hardware_op("AES-GCM encryption failed"))?;
                Ok(EncryptionOutput { ciphertext, iv })
            }
            Material::Signing(_) => Err(DeviceCryptoError::invalid_input(
                "alias",
                "not a symmetric key",
            )),
        })
    }

    fn decrypt(
        &self,
        alias: &str,
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        self.with_usable_key(alias, |key| match &key.material {
            Material::Aead(material) => {
                let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(material.as_bytes()));
                cipher
                    .decrypt(Nonce::from_slice(iv), ciphertext)
                    .map_err(|_| DeviceCryptoError::DecryptionFailed)
            }
            Material::Signing(_) => Err(DeviceCryptoError::invalid_input(
                "alias",
                "not a symmetric key",
            )),
        })
    }

    fn signature_curve(&self) -> SignatureCurve {
        SignatureCurve::NistP256
    }
}

// =============================================================================
// Scripted presenter
// =============================================================================

/// How the scripted presenter answers prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterScript {
    /// Resolve immediately as passed.
    Confirm,
    /// Resolve immediately as a failed biometric match.
    Reject,
    /// Resolve immediately as dismissed by the user.
    Dismiss,
    /// Keep the prompt pending until [`ScriptedPresenter::resolve_next`],
    /// dismissal, or the gate's bounded wait elapses.
    Hold,
}

/// Prompt presenter driven by a script instead of platform UI.
pub struct ScriptedPresenter {
    script: Mutex<PresenterScript>,
    pending: Mutex<Vec<(Uuid, oneshot::Sender<PromptOutcome>)>>,
}

impl ScriptedPresenter {
    /// Creates a presenter with the given script.
    #[must_use]
    pub fn new(script: PresenterScript) -> Self {
        Self {
            script: Mutex::new(script),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Changes the script for subsequent prompts.
    pub fn set_script(&self, script: PresenterScript) {
        *self.script.lock().expect("presenter script poisoned") = script;
    }

    /// Resolves the oldest pending prompt with `outcome`. Returns whether
    /// one was pending.
    pub fn resolve_next(&self, outcome: PromptOutcome) -> bool {
        let mut pending = self.pending.lock().expect("pending prompts poisoned");
        if pending.is_empty() {
            return false;
        }
        let (_, sender) = pending.remove(0);
        // A receiver dropped by the gate (timeout race) is not an error.
        let _ = sender.send(outcome);
        true
    }

    /// Number of prompts currently held pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("pending prompts poisoned").len()
    }
}

impl Default for ScriptedPresenter {
    fn default() -> Self {
        Self::new(PresenterScript::Confirm)
    }
}

impl PromptPresenter for ScriptedPresenter {
    fn present(&self, request: PromptRequest) -> oneshot::Receiver<PromptOutcome> {
        let (sender, receiver) = oneshot::channel();
        let script = *self.script.lock().expect("presenter script poisoned");
        match script {
            PresenterScript::Confirm => {
                let _ = sender.send(PromptOutcome::Confirmed);
            }
            PresenterScript::Reject => {
                let _ = sender.send(PromptOutcome::Rejected);
            }
            PresenterScript::Dismiss => {
                let _ = sender.send(PromptOutcome::Dismissed);
            }
            PresenterScript::Hold => {
                self.pending
                    .lock()
                    .expect("pending prompts poisoned")
                    .push((request.challenge_id, sender));
            }
        }
        receiver
    }

    fn dismiss(&self, challenge_id: Uuid) {
        self.pending
            .lock()
            .expect("pending prompts poisoned")
            .retain(|(id, _)| *id != challenge_id);
    }
}

// =============================================================================
// Platform bundle
// =============================================================================

/// Bundles the software implementations for one simulated device.
///
/// # Example
///
/// ```
/// use devicecrypto_core::platform::SoftwarePlatform;
/// use devicecrypto_core::DeviceCrypto;
///
/// let platform = SoftwarePlatform::new();
/// let crypto = DeviceCrypto::new(platform.boundary, platform.device, platform.presenter);
/// ```
pub struct SoftwarePlatform {
    /// Simulated device state shared by boundary and monitor.
    pub device: Arc<SimulatedDevice>,
    /// Software trust boundary.
    pub boundary: Arc<SoftwareBoundary>,
    /// Scripted prompt presenter, confirming by default.
    pub presenter: Arc<ScriptedPresenter>,
}

impl SoftwarePlatform {
    /// Creates a platform around a fully equipped simulated device.
    #[must_use]
    pub fn new() -> Self {
        let device = Arc::new(SimulatedDevice::new());
        let boundary = Arc::new(SoftwareBoundary::new(Arc::clone(&device)));
        let presenter = Arc::new(ScriptedPresenter::default());
        Self {
            device,
            boundary,
            presenter,
        }
    }
}

impl Default for SoftwarePlatform {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::VerifyingKey;
    use p256::pkcs8::DecodePublicKey;

    use crate::types::KeyConfig;

    use super::*;

    fn boundary() -> (Arc<SimulatedDevice>, SoftwareBoundary) {
        let device = Arc::new(SimulatedDevice::new());
        let boundary = SoftwareBoundary::new(Arc::clone(&device));
        (device, boundary)
    }

    fn spec(alias: &str, key_type: KeyType, config: KeyConfig) -> KeySpec {
        KeySpec {
            alias: alias.to_owned(),
            key_type,
            config,
        }
    }

    #[test]
    fn sign_verifies_against_attested_public_key() {
        let (_, boundary) = boundary();
        boundary
            .generate_key(&spec("signer", KeyType::Asymmetric, KeyConfig::default()))
            .unwrap();

        let message = b"challenge to be signed";
        let signature_der = boundary.sign("signer", message).unwrap();
        let spki = boundary.attest_public_key("signer").unwrap();

        let verifying_key = VerifyingKey::from_public_key_der(&spki).unwrap();
        let signature = Signature::from_der(&signature_der).unwrap();
        verifying_key.verify(message, &signature).unwrap();
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let (_, boundary) = boundary();
        boundary
            .generate_key(&spec("aead", KeyType::Symmetric, KeyConfig::default()))
            .unwrap();

        let plaintext = b"secret device data";
        let output = boundary.encrypt("aead", plaintext).unwrap();
        assert_ne!(&output.ciphertext[..plaintext.len()], plaintext);
        assert_eq!(output.ciphertext.len(), plaintext.len() + 16);

        let decrypted = boundary
            .decrypt("aead", &output.iv, &output.ciphertext)
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn fresh_iv_per_encryption() {
        let (_, boundary) = boundary();
        boundary
            .generate_key(&spec("aead", KeyType::Symmetric, KeyConfig::default()))
            .unwrap();

        let first = boundary.encrypt("aead", b"same plaintext").unwrap();
        let second = boundary.encrypt("aead", b"same plaintext").unwrap();
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let (_, boundary) = boundary();
        boundary
            .generate_key(&spec("aead", KeyType::Symmetric, KeyConfig::default()))
            .unwrap();

        let mut output = boundary.encrypt("aead", b"payload").unwrap();
        output.ciphertext[0] ^= 0xFF;
        assert_eq!(
            boundary.decrypt("aead", &output.iv, &output.ciphertext),
            Err(DeviceCryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn enrollment_change_invalidates_auth_bound_keys() {
        let (device, boundary) = boundary();
        boundary
            .generate_key(&spec(
                "gated",
                KeyType::Asymmetric,
                KeyConfig::new(AccessLevel::AuthenticationRequired),
            ))
            .unwrap();
        boundary
            .generate_key(&spec("open", KeyType::Asymmetric, KeyConfig::default()))
            .unwrap();

        device.enroll_biometry(BiometryType::Face);

        let gated = boundary.describe_key("gated").unwrap().unwrap();
        assert_eq!(gated.state, KeyState::Invalidated);
        assert_eq!(
            boundary.sign("gated", b"message"),
            Err(DeviceCryptoError::key_invalidated("gated"))
        );

        // Keys outside the invalidation contract stay usable.
        let open = boundary.describe_key("open").unwrap().unwrap();
        assert_eq!(open.state, KeyState::Active);
        boundary.sign("open", b"message").unwrap();
    }

    #[test]
    fn lock_gated_key_unusable_while_locked() {
        let (device, boundary) = boundary();
        boundary
            .generate_key(&spec(
                "lockbound",
                KeyType::Symmetric,
                KeyConfig::new(AccessLevel::UnlockedDevice),
            ))
            .unwrap();

        device.set_locked(true);
        assert_eq!(
            boundary.encrypt("lockbound", b"data"),
            Err(DeviceCryptoError::DeviceLocked)
        );

        device.set_locked(false);
        boundary.encrypt("lockbound", b"data").unwrap();
    }

    #[test]
    fn auth_bound_generation_requires_secure_element() {
        let (device, boundary) = boundary();
        device.set_secure_element(false);

        let result = boundary.generate_key(&spec(
            "gated",
            KeyType::Asymmetric,
            KeyConfig::new(AccessLevel::AuthenticationRequired),
        ));
        assert!(matches!(
            result,
            Err(DeviceCryptoError::HardwareUnavailable { .. })
        ));
        assert!(boundary.describe_key("gated").unwrap().is_none());
    }

    #[test]
    fn boundary_reports_its_curve() {
        let (_, boundary) = boundary();
        assert_eq!(boundary.signature_curve(), SignatureCurve::NistP256);
    }

    #[test]
    fn delete_reports_absence() {
        let (_, boundary) = boundary();
        assert!(!boundary.delete_key("ghost").unwrap());

        boundary
            .generate_key(&spec("real", KeyType::Symmetric, KeyConfig::default()))
            .unwrap();
        assert!(boundary.delete_key("real").unwrap());
        assert!(!boundary.delete_key("real").unwrap());
    }

    #[test]
    fn key_type_mismatch_is_rejected() {
        let (_, boundary) = boundary();
        boundary
            .generate_key(&spec("signer", KeyType::Asymmetric, KeyConfig::default()))
            .unwrap();

        assert!(matches!(
            boundary.encrypt("signer", b"data"),
            Err(DeviceCryptoError::InvalidInput { .. })
        ));
        assert!(matches!(
            boundary.attest_public_key("missing"),
            Err(DeviceCryptoError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn scripted_presenter_follows_script() {
        let presenter = ScriptedPresenter::new(PresenterScript::Reject);
        let mut rx = presenter.present(PromptRequest {
            challenge_id: Uuid::new_v4(),
            alias: "key".to_owned(),
            prompt: crate::types::PromptSpec::default(),
        });
        assert!(matches!(rx.try_recv(), Ok(PromptOutcome::Rejected)));
    }

    #[test]
    fn scripted_presenter_holds_and_resolves() {
        let presenter = ScriptedPresenter::new(PresenterScript::Hold);
        let challenge_id = Uuid::new_v4();
        let mut rx = presenter.present(PromptRequest {
            challenge_id,
            alias: "key".to_owned(),
            prompt: crate::types::PromptSpec::default(),
        });

        assert_eq!(presenter.pending_count(), 1);
        assert!(rx.try_recv().is_err());

        assert!(presenter.resolve_next(PromptOutcome::Confirmed));
        assert!(matches!(rx.try_recv(), Ok(PromptOutcome::Confirmed)));
        assert_eq!(presenter.pending_count(), 0);
        assert!(!presenter.resolve_next(PromptOutcome::Confirmed));
    }

    #[test]
    fn scripted_presenter_dismiss_drops_prompt() {
        let presenter = ScriptedPresenter::new(PresenterScript::Hold);
        let challenge_id = Uuid::new_v4();
        let mut rx = presenter.present(PromptRequest {
            challenge_id,
            alias: "key".to_owned(),
            prompt: crate::types::PromptSpec::default(),
        });

        presenter.dismiss(challenge_id);
        assert_eq!(presenter.pending_count(), 0);
        // Sender dropped: the channel reports closure, which the gate
        // treats as dismissal.
        assert!(rx.try_recv().is_err());
    }
}
