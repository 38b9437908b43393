//! Platform abstraction for the hardware trust boundary.
//!
//! The engine is platform-agnostic: everything that touches key material,
//! device state, or prompt UI is behind a trait here.
//!
//! - [`TrustBoundary`] — key generation and use inside isolated hardware
//! - [`DeviceMonitor`] — read-only lock-state and enrollment queries
//! - [`PromptPresenter`] — biometric/credential prompt presentation
//!
//! # Platform implementations
//!
//! - **Android**: Android Keystore (StrongBox where present),
//!   `BiometricManager`/`KeyguardManager`, `BiometricPrompt`
//! - **iOS**: Secure Enclave via Keychain Services, `LAContext`
//! - **Anywhere**: the bundled [`software`] backend, which keeps the same
//!   observable contract with software cryptography and a scripted prompt
//!
//! Hardware adapters are out of tree; the software backend is what tests
//! and platforms without an isolated element run against.

mod boundary;
mod monitor;
mod presenter;
pub mod software;

pub use boundary::{KeySpec, TrustBoundary};
pub use monitor::DeviceMonitor;
pub use presenter::{PromptOutcome, PromptPresenter, PromptRequest};
pub use software::SoftwarePlatform;
