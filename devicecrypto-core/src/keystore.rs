//! Hardware-backed key registry.
//!
//! Maps caller-chosen aliases to key material held behind the trust
//! boundary. Creation is idempotent per alias; deletion is idempotent per
//! call; invalidated keys are reported, never silently bypassed.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{CryptoResult, DeviceCryptoError};
use crate::locks::AliasLocks;
use crate::platform::{DeviceMonitor, KeySpec, TrustBoundary};
use crate::types::{AccessLevel, KeyConfig, KeyState, KeyType};

const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----\n";
const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";
const PEM_LINE_WIDTH: usize = 64;

/// Persistent registry of device-bound keys.
///
/// Every mutating operation for one alias is serialized; operations on
/// different aliases proceed in parallel.
pub struct KeyStore {
    boundary: Arc<dyn TrustBoundary>,
    monitor: Arc<dyn DeviceMonitor>,
    locks: Arc<AliasLocks>,
}

impl KeyStore {
    pub(crate) fn new(
        boundary: Arc<dyn TrustBoundary>,
        monitor: Arc<dyn DeviceMonitor>,
        locks: Arc<AliasLocks>,
    ) -> Self {
        Self {
            boundary,
            monitor,
            locks,
        }
    }

    /// Creates an EC signing key pair under `alias`, or returns the
    /// existing pair's public key. Either way the result is the PEM-encoded
    /// public key, identical across repeated calls.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the device cannot meet `config`,
    /// `HardwareUnavailable` when the boundary rejects generation,
    /// `KeyInvalidated` when the alias holds a terminally invalidated key
    /// (delete and recreate), `InvalidInput` for an empty alias or an
    /// alias already bound to a symmetric key.
    pub async fn get_or_create_asymmetric_key(
        &self,
        alias: &str,
        config: KeyConfig,
    ) -> CryptoResult<String> {
        require_alias(alias)?;
        self.ensure_compatible(config)?;

        let _guard = self.locks.acquire(alias).await;
        if let Some(descriptor) = self.boundary.describe_key(alias)? {
            if descriptor.key_type != KeyType::Asymmetric {
                return Err(DeviceCryptoError::invalid_input(
                    "alias",
                    "already holds a symmetric key",
                ));
            }
            if descriptor.state == KeyState::Invalidated {
                return Err(DeviceCryptoError::key_invalidated(alias));
            }
            return self.export_pem(alias);
        }

        self.boundary.generate_key(&KeySpec {
            alias: alias.to_owned(),
            key_type: KeyType::Asymmetric,
            config,
        })?;
        match self.export_pem(alias) {
            Ok(pem) => {
                tracing::info!(alias, "created asymmetric key");
                Ok(pem)
            }
            Err(err) => {
                // A failed creation leaves no orphaned material behind.
                let _ = self.boundary.delete_key(alias);
                Err(err)
            }
        }
    }

    /// Creates an AES key under `alias` if none exists. Returns whether the
    /// key pre-existed; `true` does not imply usability — operations still
    /// report invalidation and policy denials themselves.
    ///
    /// # Errors
    ///
    /// As for [`Self::get_or_create_asymmetric_key`], with `InvalidInput`
    /// for an alias already bound to an asymmetric key.
    pub async fn get_or_create_symmetric_key(
        &self,
        alias: &str,
        config: KeyConfig,
    ) -> CryptoResult<bool> {
        require_alias(alias)?;
        self.ensure_compatible(config)?;

        let _guard = self.locks.acquire(alias).await;
        if let Some(descriptor) = self.boundary.describe_key(alias)? {
            if descriptor.key_type != KeyType::Symmetric {
                return Err(DeviceCryptoError::invalid_input(
                    "alias",
                    "already holds an asymmetric key",
                ));
            }
            if descriptor.state == KeyState::Invalidated {
                return Err(DeviceCryptoError::key_invalidated(alias));
            }
            return Ok(true);
        }

        self.boundary.generate_key(&KeySpec {
            alias: alias.to_owned(),
            key_type: KeyType::Symmetric,
            config,
        })?;
        tracing::info!(alias, "created symmetric key");
        Ok(false)
    }

    /// Destroys the key under `alias`. Idempotent: returns `false` (not an
    /// error) when the alias never existed.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty alias, `HardwareOperationFailed` when
    /// the boundary fails to erase existing material.
    pub async fn delete_key(&self, alias: &str) -> CryptoResult<bool> {
        require_alias(alias)?;
        let _guard = self.locks.acquire(alias).await;
        let removed = self.boundary.delete_key(alias)?;
        if removed {
            tracing::info!(alias, "deleted key");
        }
        Ok(removed)
    }

    /// PEM-encoded public key of the asymmetric key under `alias`.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` when the alias is absent, invalidated, or does not
    /// hold an asymmetric key.
    pub async fn get_public_key(&self, alias: &str) -> CryptoResult<String> {
        require_alias(alias)?;
        match self.boundary.describe_key(alias)? {
            Some(descriptor)
                if descriptor.key_type == KeyType::Asymmetric
                    && descriptor.state == KeyState::Active =>
            {
                self.export_pem(alias)
            }
            _ => Err(DeviceCryptoError::key_not_found(alias)),
        }
    }

    /// Whether a usable key of `key_type` exists under `alias`.
    ///
    /// Invalidated keys report as non-existent: an invalidated key cannot
    /// be used, and callers recover the same way as from absence.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty alias, `HardwareOperationFailed` when
    /// the boundary cannot be queried.
    pub async fn is_key_exists(&self, alias: &str, key_type: KeyType) -> CryptoResult<bool> {
        require_alias(alias)?;
        Ok(self
            .boundary
            .describe_key(alias)?
            .is_some_and(|descriptor| {
                descriptor.key_type == key_type && descriptor.state == KeyState::Active
            }))
    }

    fn ensure_compatible(&self, config: KeyConfig) -> CryptoResult<()> {
        let biometry = self.monitor.is_biometry_enrolled()?;
        let credential = self.monitor.has_device_credential()?;
        match config.access_level {
            AccessLevel::Always => {}
            AccessLevel::UnlockedDevice => {
                if !credential && !biometry {
                    return Err(DeviceCryptoError::invalid_configuration(
                        "UNLOCKED_DEVICE requires a device credential or enrolled biometry",
                    ));
                }
            }
            AccessLevel::AuthenticationRequired => {
                if !biometry && !credential {
                    return Err(DeviceCryptoError::invalid_configuration(
                        "AUTHENTICATION_REQUIRED requires enrolled biometry or a device credential",
                    ));
                }
                if config.invalidate_on_new_biometry && !biometry {
                    return Err(DeviceCryptoError::invalid_configuration(
                        "enrollment-change invalidation requires enrolled biometry",
                    ));
                }
            }
        }
        Ok(())
    }

    fn export_pem(&self, alias: &str) -> CryptoResult<String> {
        let der = self.boundary.attest_public_key(alias)?;
        Ok(pem_encode(&der))
    }
}

fn require_alias(alias: &str) -> CryptoResult<()> {
    if alias.is_empty() {
        return Err(DeviceCryptoError::invalid_input(
            "alias",
            "must not be empty",
        ));
    }
    Ok(())
}

/// Wraps DER `SubjectPublicKeyInfo` bytes in the PEM container exchanged
/// at the interface.
fn pem_encode(der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = String::with_capacity(PEM_HEADER.len() + PEM_FOOTER.len() + body.len() + 8);
    pem.push_str(PEM_HEADER);
    for chunk in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        pem.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        pem.push('\n');
    }
    pem.push_str(PEM_FOOTER);
    pem
}

#[cfg(test)]
mod tests {
    use crate::platform::software::{SimulatedDevice, SoftwareBoundary};
    use crate::types::BiometryType;

    use super::*;

    fn keystore() -> (Arc<SimulatedDevice>, KeyStore) {
        let device = Arc::new(SimulatedDevice::new());
        let boundary = Arc::new(SoftwareBoundary::new(Arc::clone(&device)));
        let store = KeyStore::new(boundary, device.clone(), Arc::new(AliasLocks::new()));
        (device, store)
    }

    #[tokio::test]
    async fn asymmetric_creation_is_idempotent() {
        let (_, store) = keystore();
        let config = KeyConfig::default();

        let first = store
            .get_or_create_asymmetric_key("signer", config)
            .await
            .unwrap();
        let second = store
            .get_or_create_asymmetric_key("signer", config)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("-----BEGIN PUBLIC KEY-----\n"));
        assert!(first.ends_with("-----END PUBLIC KEY-----"));
        assert_eq!(store.get_public_key("signer").await.unwrap(), first);
    }

    #[tokio::test]
    async fn symmetric_creation_reports_pre_existence() {
        let (_, store) = keystore();
        let config = KeyConfig::default();

        assert!(!store
            .get_or_create_symmetric_key("aead", config)
            .await
            .unwrap());
        assert!(store
            .get_or_create_symmetric_key("aead", config)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_, store) = keystore();
        assert!(!store.delete_key("ghost").await.unwrap());

        store
            .get_or_create_symmetric_key("aead", KeyConfig::default())
            .await
            .unwrap();
        assert!(store.delete_key("aead").await.unwrap());
        assert!(!store.delete_key("aead").await.unwrap());
        assert!(!store.is_key_exists("aead", KeyType::Symmetric).await.unwrap());
    }

    #[tokio::test]
    async fn alias_cannot_change_key_type() {
        let (_, store) = keystore();
        store
            .get_or_create_asymmetric_key("signer", KeyConfig::default())
            .await
            .unwrap();

        let result = store
            .get_or_create_symmetric_key("signer", KeyConfig::default())
            .await;
        assert!(matches!(result, Err(DeviceCryptoError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn incompatible_configuration_is_rejected() {
        let (device, store) = keystore();
        device.remove_biometry();
        device.set_device_credential(false);

        let result = store
            .get_or_create_asymmetric_key(
                "gated",
                KeyConfig::new(AccessLevel::AuthenticationRequired),
            )
            .await;
        assert!(matches!(
            result,
            Err(DeviceCryptoError::InvalidConfiguration { .. })
        ));

        // Credential alone is enough once invalidation is not requested.
        device.set_device_credential(true);
        store
            .get_or_create_asymmetric_key(
                "gated",
                KeyConfig::new(AccessLevel::AuthenticationRequired)
                    .invalidate_on_new_biometry(false),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalidated_keys_report_as_missing() {
        let (device, store) = keystore();
        store
            .get_or_create_asymmetric_key(
                "gated",
                KeyConfig::new(AccessLevel::AuthenticationRequired),
            )
            .await
            .unwrap();
        assert!(store
            .is_key_exists("gated", KeyType::Asymmetric)
            .await
            .unwrap());

        device.enroll_biometry(BiometryType::Face);

        assert!(!store
            .is_key_exists("gated", KeyType::Asymmetric)
            .await
            .unwrap());
        assert!(matches!(
            store.get_public_key("gated").await,
            Err(DeviceCryptoError::KeyNotFound { .. })
        ));
        assert!(matches!(
            store
                .get_or_create_asymmetric_key(
                    "gated",
                    KeyConfig::new(AccessLevel::AuthenticationRequired),
                )
                .await,
            Err(DeviceCryptoError::KeyInvalidated { .. })
        ));

        // Deleting the invalidated key clears the alias for reuse.
        assert!(store.delete_key("gated").await.unwrap());
        store
            .get_or_create_asymmetric_key(
                "gated",
                KeyConfig::new(AccessLevel::AuthenticationRequired),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_alias_is_rejected() {
        let (_, store) = keystore();
        assert!(matches!(
            store.get_public_key("").await,
            Err(DeviceCryptoError::InvalidInput { .. })
        ));
    }

    #[test]
    fn pem_encoding_wraps_lines() {
        let pem = pem_encode(&[0xAB; 100]);
        assert!(pem.starts_with(PEM_HEADER));
        assert!(pem.ends_with(PEM_FOOTER));
        let body: Vec<&str> = pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect();
        assert!(body.iter().all(|line| line.len() <= PEM_LINE_WIDTH));
        assert!(body.len() > 1);
    }
}
