use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Parameter not supported: {0}")]
    NotSupported(String),
    #[error("Parameter not modifiable: {0}")]
    NotModifiable(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Device rejected write to {parameter}: {message}")]
    WriteRejected { parameter: String, message: String },
    #[error("Device error: {0}")]
    DeviceError(String),
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Async runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Lock poisoned by previous panic: {0}")]
    PoisonedLock(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CameraError {
    pub fn write_rejected(parameter: &str, message: impl Into<String>) -> Self {
        CameraError::WriteRejected {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }

    /// True for failures the UI recovers from by keeping the previous value
    /// on screen. Everything else aborts the operation that raised it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CameraError::NotSupported(_)
                | CameraError::NotModifiable(_)
                | CameraError::InvalidValue(_)
                | CameraError::WriteRejected { .. }
                | CameraError::RuntimeUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_rejected_display() {
        let error = CameraError::write_rejected("ISO", "busy");
        assert_eq!(error.to_string(), "Device rejected write to ISO: busy");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(CameraError::write_rejected("Flash mode", "nope").is_recoverable());
        assert!(CameraError::NotModifiable("Capture resolution".into()).is_recoverable());
        assert!(!CameraError::DeviceUnavailable("closed".into()).is_recoverable());
        assert!(!CameraError::PoisonedLock("device".into()).is_recoverable());
    }
}
