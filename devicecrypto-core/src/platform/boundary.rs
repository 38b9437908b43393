//! Trust boundary trait for hardware-backed key operations.

use crate::error::CryptoResult;
use crate::types::{EncryptionOutput, KeyConfig, KeyDescriptor, KeyType, SignatureCurve, IV_SIZE};

/// Creation request passed to the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    /// Caller-chosen unique name for the key.
    pub alias: String,
    /// Kind of key material to generate.
    pub key_type: KeyType,
    /// Access policy baked into the key at creation.
    pub config: KeyConfig,
}

/// Isolated holder of raw key material.
///
/// Material referenced by an alias never leaves the boundary; callers only
/// ever observe metadata, derived public material, and operation results.
/// Implementations map onto a hardware keystore (Android Keystore,
/// Secure Enclave) or the bundled software backend.
///
/// The boundary does not serialize callers; the engine serializes mutating
/// calls per alias before reaching it.
pub trait TrustBoundary: Send + Sync {
    /// Generates key material for `spec.alias` inside the boundary.
    ///
    /// Generation is atomic: on failure no material is retained under the
    /// alias. Any existing material under the alias is replaced; callers
    /// check for existing keys first.
    ///
    /// # Errors
    ///
    /// `HardwareUnavailable` when the boundary cannot generate a key of
    /// this configuration (for example no isolated element for an
    /// authentication-bound key), `HardwareOperationFailed` for other
    /// generation failures.
    fn generate_key(&self, spec: &KeySpec) -> CryptoResult<()>;

    /// Destroys the material under `alias`.
    ///
    /// Returns `false` (not an error) when the alias holds nothing.
    ///
    /// # Errors
    ///
    /// `HardwareOperationFailed` when the boundary fails to erase material
    /// that exists.
    fn delete_key(&self, alias: &str) -> CryptoResult<bool>;

    /// Metadata for `alias`, or `None` when no key is present.
    ///
    /// Invalidation by biometric enrollment change is reported through the
    /// descriptor's state; implementations must re-derive it per call
    /// rather than trust a cached value, since the platform's enrollment
    /// events are delivered at unspecified times.
    ///
    /// # Errors
    ///
    /// `HardwareOperationFailed` when the boundary cannot be queried.
    fn describe_key(&self, alias: &str) -> CryptoResult<Option<KeyDescriptor>>;

    /// DER-encoded `SubjectPublicKeyInfo` of an asymmetric key.
    ///
    /// # Errors
    ///
    /// `KeyNotFound`/`KeyInvalidated` for unusable aliases, `InvalidInput`
    /// when the alias holds symmetric material.
    fn attest_public_key(&self, alias: &str) -> CryptoResult<Vec<u8>>;

    /// Signs `message` with the private key under `alias`, returning the
    /// DER-encoded ECDSA signature.
    ///
    /// # Errors
    ///
    /// `KeyNotFound`/`KeyInvalidated`/`InvalidInput` as for
    /// [`Self::attest_public_key`], `DeviceLocked` for lock-gated keys on
    /// a locked device, `HardwareOperationFailed` for signing failures.
    fn sign(&self, alias: &str, message: &[u8]) -> CryptoResult<Vec<u8>>;

    /// AEAD-encrypts `plaintext` under `alias` with a boundary-generated
    /// IV.
    ///
    /// The IV is always generated inside the boundary, fresh per call;
    /// there is deliberately no way to supply one.
    ///
    /// # Errors
    ///
    /// As for [`Self::sign`].
    fn encrypt(&self, alias: &str, plaintext: &[u8]) -> CryptoResult<EncryptionOutput>;

    /// AEAD-decrypts `ciphertext` produced by [`Self::encrypt`] under
    /// `alias` with the IV of the same pair.
    ///
    /// # Errors
    ///
    /// `DecryptionFailed` when authentication-tag verification fails;
    /// otherwise as for [`Self::sign`].
    fn decrypt(&self, alias: &str, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Named curve this boundary generates asymmetric keys on.
    ///
    /// A per-platform configuration fact; signatures are not portable
    /// across boundaries on different curves.
    fn signature_curve(&self) -> SignatureCurve;
}
