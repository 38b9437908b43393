//! Core type definitions for the device crypto engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of key material held behind the trust boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    /// Elliptic-curve signing key pair. The private half never leaves the
    /// boundary; the public half is exportable as PEM.
    Asymmetric,
    /// AES-256 key for authenticated encryption. Never exportable.
    Symmetric,
}

/// Policy gating when a key may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    /// Usable regardless of device state.
    Always,
    /// Usable only while the device is unlocked.
    UnlockedDevice,
    /// Every use requires a fresh user-presence authorization.
    AuthenticationRequired,
}

/// Creation-time key configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// When the key may be used.
    pub access_level: AccessLevel,
    /// Whether a biometric enrollment change terminally invalidates the
    /// key. Only effective together with
    /// [`AccessLevel::AuthenticationRequired`].
    pub invalidate_on_new_biometry: bool,
}

impl KeyConfig {
    /// Creates a configuration with the given access level and
    /// enrollment-change invalidation enabled.
    #[must_use]
    pub const fn new(access_level: AccessLevel) -> Self {
        Self {
            access_level,
            invalidate_on_new_biometry: true,
        }
    }

    /// Sets whether a biometric enrollment change invalidates the key.
    #[must_use]
    pub const fn invalidate_on_new_biometry(mut self, invalidate: bool) -> Self {
        self.invalidate_on_new_biometry = invalidate;
        self
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::new(AccessLevel::Always)
    }
}

/// Biometry kind enrolled on the device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BiometryType {
    /// No biometry enrolled.
    None,
    /// Fingerprint sensor.
    Touch,
    /// Face recognition.
    Face,
    /// Iris recognition.
    Iris,
}

/// How the device itself is protected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityLevel {
    /// No lock screen credential of any kind.
    NotProtected,
    /// PIN, pattern, or password set.
    PinOrPattern,
    /// Biometry enrolled (implies a device credential fallback).
    Biometry,
}

/// Lifecycle state of a key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    /// Usable, subject to its access level.
    Active,
    /// Terminally unusable after a biometric enrollment change. Detected
    /// and reported by every operation; never silently bypassed.
    Invalidated,
}

/// Metadata describing a key held behind the trust boundary.
///
/// The material handle itself stays inside the boundary; this descriptor
/// only carries what is observable from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Caller-chosen unique name of the key.
    pub alias: String,
    /// Kind of key material.
    pub key_type: KeyType,
    /// When the key may be used.
    pub access_level: AccessLevel,
    /// Whether enrollment changes invalidate the key.
    pub invalidate_on_new_biometry: bool,
    /// Current lifecycle state.
    pub state: KeyState,
}

/// Named curve a trust boundary generates asymmetric keys on.
///
/// Platforms differ (Secure Enclave and StrongBox do not share a curve);
/// the curve is a configuration fact of the boundary adapter, and
/// signatures are not portable across devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureCurve {
    /// NIST P-256 (secp256r1).
    NistP256,
    /// secp256k1.
    Secp256k1,
}

/// Display strings for the user-presence prompt. Presentation only, no
/// behavioral effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Prompt title.
    pub title: String,
    /// Prompt subtitle.
    pub subtitle: String,
    /// Prompt description.
    pub description: String,
}

impl Default for PromptSpec {
    fn default() -> Self {
        Self {
            title: "Biometric Authentication".to_owned(),
            subtitle: "Authentication required".to_owned(),
            description: String::new(),
        }
    }
}

/// AES-GCM IV length in bytes.
pub const IV_SIZE: usize = 12;

/// Output of a symmetric encryption: ciphertext (including the
/// authentication tag) and the IV that was generated for it.
///
/// The IV is fresh per encryption and never repeats under the same key;
/// callers must keep the pair together for decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionOutput {
    /// Ciphertext with appended authentication tag.
    pub ciphertext: Vec<u8>,
    /// The boundary-generated IV.
    pub iv: [u8; IV_SIZE],
}

/// Base64 ciphertext/IV pair exchanged at the text interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Base64-encoded ciphertext.
    pub encrypted_text: String,
    /// Base64-encoded IV.
    pub iv: String,
}
