//! Device-backed key custody and cryptographic operations.
//!
//! `devicecrypto-core` manages keys that live inside a hardware trust
//! boundary (Android Keystore/StrongBox, iOS Secure Enclave, or the
//! bundled software backend), evaluates access policy atomically with key
//! use, and gates sensitive operations behind user-presence challenges.
//!
//! # Architecture
//!
//! - [`KeyStore`] — alias-keyed registry of hardware-bound keys
//! - [`policy`] — pure access decisions from key policy and device state
//! - [`AuthenticationGate`] — user-presence challenges yielding
//!   single-use, alias-bound [`AuthorizationContext`]s
//! - [`CryptoEngine`] — ECDSA signing and AES-GCM encryption against
//!   boundary-held keys
//! - [`DeviceInspector`] — read-only capability discovery
//! - [`DeviceCrypto`] — facade wiring the components over one platform
//!
//! Everything platform-specific sits behind the traits in [`platform`];
//! the [`platform::software`] backend implements them with software
//! cryptography for tests and for platforms without an isolated element.
//!
//! # Example
//!
//! ```
//! use devicecrypto_core::platform::SoftwarePlatform;
//! use devicecrypto_core::{AccessLevel, DeviceCrypto, KeyConfig, PromptSpec};
//!
//! # async fn demo() -> Result<(), devicecrypto_core::DeviceCryptoError> {
//! let platform = SoftwarePlatform::new();
//! let crypto = DeviceCrypto::new(platform.boundary, platform.device, platform.presenter);
//!
//! let public_key_pem = crypto
//!     .get_or_create_asymmetric_key("login", KeyConfig::new(AccessLevel::UnlockedDevice))
//!     .await?;
//! let signature = crypto.sign("login", "challenge", &PromptSpec::default()).await?;
//! # let _ = (public_key_pem, signature);
//! # Ok(())
//! # }
//! ```

mod authenticator;
mod device;
mod device_crypto;
mod engine;
mod error;
mod keystore;
mod locks;
pub mod platform;
pub mod policy;
mod types;

pub use authenticator::{AuthenticationGate, AuthorizationContext, GateConfig};
pub use device::DeviceInspector;
pub use device_crypto::DeviceCrypto;
pub use engine::CryptoEngine;
pub use error::{CryptoResult, DeviceCryptoError};
pub use keystore::KeyStore;
pub use policy::{DeviceConditions, PolicyDecision};
pub use types::{
    AccessLevel, BiometryType, EncryptedPayload, EncryptionOutput, KeyConfig, KeyDescriptor,
    KeyState, KeyType, PromptSpec, SecurityLevel, SignatureCurve, IV_SIZE,
};
