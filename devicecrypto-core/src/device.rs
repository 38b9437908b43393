//! Device capability discovery.

use std::sync::Arc;

use crate::error::CryptoResult;
use crate::platform::DeviceMonitor;
use crate::types::{BiometryType, SecurityLevel};

/// Read-only view of the device's security capabilities.
///
/// Callers use these queries to decide which flows are available before
/// touching any keys; nothing here mutates state.
pub struct DeviceInspector {
    monitor: Arc<dyn DeviceMonitor>,
}

impl DeviceInspector {
    pub(crate) fn new(monitor: Arc<dyn DeviceMonitor>) -> Self {
        Self { monitor }
    }

    /// Whether any biometric credential is enrolled.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` on a transient platform error.
    pub async fn is_biometry_enrolled(&self) -> CryptoResult<bool> {
        self.monitor.is_biometry_enrolled()
    }

    /// The biometry kind enrolled on the device.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` on a transient platform error.
    pub async fn get_biometry_type(&self) -> CryptoResult<BiometryType> {
        self.monitor.biometry_type()
    }

    /// How the device is protected: enrolled biometry beats a bare
    /// credential, which beats nothing.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` on a transient platform error.
    pub async fn device_security_level(&self) -> CryptoResult<SecurityLevel> {
        if self.monitor.is_biometry_enrolled()? {
            return Ok(SecurityLevel::Biometry);
        }
        if self.monitor.has_device_credential()? {
            return Ok(SecurityLevel::PinOrPattern);
        }
        Ok(SecurityLevel::NotProtected)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DeviceCryptoError;
    use crate::platform::software::SimulatedDevice;

    use super::*;

    /// Monitor whose every query fails, for propagation checks.
    struct FlakyMonitor;

    impl DeviceMonitor for FlakyMonitor {
        fn is_device_locked(&self) -> CryptoResult<bool> {
            Err(DeviceCryptoError::platform_query("keyguard unreachable"))
        }

        fn biometry_type(&self) -> CryptoResult<BiometryType> {
            Err(DeviceCryptoError::platform_query("biometry unreachable"))
        }

        fn is_biometry_enrolled(&self) -> CryptoResult<bool> {
            Err(DeviceCryptoError::platform_query("biometry unreachable"))
        }

        fn has_device_credential(&self) -> CryptoResult<bool> {
            Err(DeviceCryptoError::platform_query("keyguard unreachable"))
        }
    }

    #[tokio::test]
    async fn security_level_resolution_order() {
        let device = Arc::new(SimulatedDevice::new());
        let inspector = DeviceInspector::new(device.clone());

        assert_eq!(
            inspector.device_security_level().await.unwrap(),
            SecurityLevel::Biometry
        );

        device.remove_biometry();
        assert_eq!(
            inspector.device_security_level().await.unwrap(),
            SecurityLevel::PinOrPattern
        );

        device.set_device_credential(false);
        assert_eq!(
            inspector.device_security_level().await.unwrap(),
            SecurityLevel::NotProtected
        );
    }

    #[tokio::test]
    async fn biometry_queries_follow_enrollment() {
        let device = Arc::new(SimulatedDevice::new());
        let inspector = DeviceInspector::new(device.clone());

        assert!(inspector.is_biometry_enrolled().await.unwrap());
        assert_eq!(
            inspector.get_biometry_type().await.unwrap(),
            BiometryType::Touch
        );

        device.enroll_biometry(BiometryType::Face);
        assert_eq!(
            inspector.get_biometry_type().await.unwrap(),
            BiometryType::Face
        );

        device.remove_biometry();
        assert!(!inspector.is_biometry_enrolled().await.unwrap());
        assert_eq!(
            inspector.get_biometry_type().await.unwrap(),
            BiometryType::None
        );
    }

    #[tokio::test]
    async fn transient_platform_errors_propagate() {
        let inspector = DeviceInspector::new(Arc::new(FlakyMonitor));
        assert!(matches!(
            inspector.device_security_level().await,
            Err(DeviceCryptoError::PlatformQueryFailed { .. })
        ));
        assert!(matches!(
            inspector.get_biometry_type().await,
            Err(DeviceCryptoError::PlatformQueryFailed { .. })
        ));
    }
}
