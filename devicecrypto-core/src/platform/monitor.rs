//! Read-only device state queries.

use crate::error::CryptoResult;
use crate::types::BiometryType;

/// Lock-state and enrollment queries against the platform.
///
/// All queries are side-effect free. The only failure mode is
/// `PlatformQueryFailed` for transient platform errors.
pub trait DeviceMonitor: Send + Sync {
    /// Whether the device is currently locked.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` when the platform cannot be queried.
    fn is_device_locked(&self) -> CryptoResult<bool>;

    /// The biometry kind enrolled on the device, [`BiometryType::None`]
    /// when nothing is enrolled.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` when the platform cannot be queried.
    fn biometry_type(&self) -> CryptoResult<BiometryType>;

    /// Whether any biometric credential is enrolled.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` when the platform cannot be queried.
    fn is_biometry_enrolled(&self) -> CryptoResult<bool>;

    /// Whether a PIN, pattern, or password protects the device.
    ///
    /// # Errors
    ///
    /// `PlatformQueryFailed` when the platform cannot be queried.
    fn has_device_credential(&self) -> CryptoResult<bool>;
}
