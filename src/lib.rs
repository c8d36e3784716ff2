//! Camera Explorer: a uniform, observable model of camera capture parameters
//!
//! Phone and embedded cameras expose their controls in two shapes: a bounded
//! numeric range (exposure compensation, flash power, Kelvin white balance)
//! or an explicit set of values (ISO steps, shutter speeds, flash and scene
//! modes, resolutions). This crate hides both behind one contract so a
//! settings screen can list, display, change and reset every control the
//! current camera offers without knowing which property it is talking to.
//!
//! # Features
//! - Range and enumerated parameters with labelled options and overlay icons
//! - Default-selection rules per property, applied when a device opens
//! - Change notification over Tokio channels
//! - Asynchronous resolution changes with write suspension while pending
//! - In-memory simulated device and TOML device profiles for testing
//!
//! # Usage
//! ```rust,ignore
//! use camera_explorer::{testing, CameraSession, ExplorerConfig, SharedDevice, SimulatedDevice};
//!
//! let device = SharedDevice::new(SimulatedDevice::from_profile(&testing::full_profile()));
//! let session = CameraSession::open(device, ExplorerConfig::load_or_default()).await?;
//! for parameter in session.parameters()? {
//!     println!("{}", parameter.name());
//! }
//! ```
pub mod catalog;
pub mod config;
pub mod device;
pub mod errors;
pub mod invariant_ppt;
pub mod notify;
pub mod parameter;
pub mod registry;
pub mod session;
pub mod types;

// Canned hardware profiles for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::ExplorerConfig;
pub use device::{CaptureDevice, DeviceProfile, SharedDevice, SimulatedDevice};
pub use errors::CameraError;
pub use notify::{ParameterChange, ParameterField, RegistryEvent};
pub use parameter::{
    CameraParameter, EnumeratedControl, EnumeratedParameter, ParameterKind, ParameterSnapshot,
    RangeControl, RangeParameter, WriteOutcome,
};
pub use registry::SettingsRegistry;
pub use session::CameraSession;
pub use types::{PropertyKey, RawValue, Resolution, ResolutionKind, SensorLocation};

/// Initialize logging for the camera explorer
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camera_explorer=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        parameters: catalog::entries(&ExplorerConfig::default())
            .iter()
            .map(|e| e.name.to_string())
            .collect(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Every parameter the catalog knows, in display order
    pub parameters: Vec<String>,
}
