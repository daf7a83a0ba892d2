//! # Error Handling
//!
//! Error types for the barcode preview core, with classification traits and
//! rich context.
//!
//! ## Error Classification
//!
//! The taxonomy mirrors how each failure is treated by a session:
//!
//! - `DeviceUnavailable`: the capture device cannot be acquired. Fatal to the
//!   session; the host must tear it down.
//! - `Detection`: a detection step failed. Recovered locally by the frame gate,
//!   which drops the result and clears its busy flag.
//! - `Conversion`: a raw frame could not be turned into a still image. Handled
//!   like a detection failure.
//! - `State`: the host drove the session through an invalid transition.
//!
//! An empty candidate set is not an error; preview-size selection simply
//! returns `None`. Nothing in this crate retries.
//!
//! ## Usage
//!
//! ```rust
//! use barcode_preview::error::{ErrorSeverity, HasSeverity, Recoverable, ScanError};
//!
//! let error = ScanError::detection("qr", "symbol checksum mismatch")
//!     .with_context("decoding frame 42");
//! assert!(error.is_recoverable());
//! assert_eq!(error.severity(), ErrorSeverity::Warning);
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Debug-level errors that don't affect operation
    Debug,
    /// Informational errors
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that affect operation but can be recovered from
    Error,
    /// Critical errors that require immediate attention
    Critical,
    /// Fatal errors that cannot be recovered from
    Fatal,
}

/// When and where an error was raised, plus host-facing hints.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs
    pub metadata: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            metadata: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a preset severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Errors raised by the scan core.
#[derive(Debug)]
pub enum ScanError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// The capture device could not be acquired or configured
    DeviceUnavailable {
        device: String,
        reason: String,
        context: ErrorContext,
    },
    /// Frame delivery failures
    FrameCapture {
        reason: String,
        context: ErrorContext,
    },
    /// Raw frame to still image conversion errors
    Conversion {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Detection step failures
    Detection {
        detector: String,
        reason: String,
        context: ErrorContext,
    },
    /// Invalid session state transitions
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// Validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
}

impl ScanError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Create a device-unavailable error
    pub fn device_unavailable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create a frame capture error
    pub fn frame_capture(reason: impl Into<String>) -> Self {
        Self::FrameCapture {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a conversion error
    pub fn conversion(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a detection error
    pub fn detection(detector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Detection {
            detector: detector.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. }
            | Self::DeviceUnavailable { context, .. }
            | Self::FrameCapture { context, .. }
            | Self::Conversion { context, .. }
            | Self::Detection { context, .. }
            | Self::State { context, .. }
            | Self::External { context, .. }
            | Self::Validation { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. }
            | Self::DeviceUnavailable { context, .. }
            | Self::FrameCapture { context, .. }
            | Self::Conversion { context, .. }
            | Self::Detection { context, .. }
            | Self::State { context, .. }
            | Self::External { context, .. }
            | Self::Validation { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::DeviceUnavailable { .. } => "device_unavailable",
            Self::FrameCapture { .. } => "frame_capture",
            Self::Conversion { .. } => "conversion",
            Self::Detection { .. } => "detection",
            Self::State { .. } => "state",
            Self::External { .. } => "external",
            Self::Validation { .. } => "validation",
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Config {
                field,
                value,
                reason,
                ..
            } => write!(
                f,
                "Configuration error in '{}': {} (value: {})",
                field, reason, value
            ),
            ScanError::DeviceUnavailable { device, reason, .. } => {
                write!(f, "Capture device '{}' unavailable: {}", device, reason)
            }
            ScanError::FrameCapture { reason, .. } => {
                write!(f, "Frame capture failed: {}", reason)
            }
            ScanError::Conversion {
                operation, reason, ..
            } => write!(f, "Frame conversion failed during {}: {}", operation, reason),
            ScanError::Detection {
                detector, reason, ..
            } => write!(f, "Detection failed in {}: {}", detector, reason),
            ScanError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => write!(
                f,
                "Invalid state transition from '{}' when attempting '{}': {}",
                current_state, attempted_operation, reason
            ),
            ScanError::External {
                library, source, ..
            } => write!(f, "External library error in {}: {}", library, source),
            ScanError::Validation {
                field,
                constraint,
                value,
                ..
            } => write!(
                f,
                "Validation failed for '{}': {} (value: {})",
                field, constraint, value
            ),
        }
    }
}

impl StdError for ScanError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result of scan core operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that say how a session should react to them.
pub trait Recoverable {
    /// Whether the session survives this error.
    fn is_recoverable(&self) -> bool;

    /// Get recovery strategies for this error
    fn recovery_strategies(&self) -> Vec<RecoveryStrategy>;
}

/// Recovery strategies for handling errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Use a fallback value or method
    Fallback { description: String },
    /// Tear down and rebuild the component
    Reinitialize { component: String },
    /// Skip the current operation
    Skip { reason: String },
}

impl Recoverable for ScanError {
    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Detection { .. } | Self::Conversion { .. } | Self::FrameCapture { .. }
        )
    }

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy> {
        match self {
            Self::Detection { .. } | Self::Conversion { .. } => vec![RecoveryStrategy::Skip {
                reason: "Drop the current frame and wait for the next one".to_string(),
            }],
            Self::FrameCapture { .. } => vec![RecoveryStrategy::Skip {
                reason: "Skip the missing frame".to_string(),
            }],
            Self::DeviceUnavailable { .. } => vec![RecoveryStrategy::Reinitialize {
                component: "scan_session".to_string(),
            }],
            Self::Config { .. } => vec![RecoveryStrategy::Fallback {
                description: "Configure a default preview resolution".to_string(),
            }],
            _ => vec![],
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for ScanError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for ScanError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error ends the session it occurred in
    pub fn is_fatal(error: &ScanError) -> bool {
        matches!(
            error,
            ScanError::DeviceUnavailable { .. } | ScanError::Validation { .. }
        ) || error.severity() == ErrorSeverity::Fatal
    }

    /// Check if an error requires user intervention
    pub fn requires_user_intervention(error: &ScanError) -> bool {
        error.severity() >= ErrorSeverity::Critical
    }

    /// Get error priority (higher numbers = higher priority)
    pub fn priority(error: &ScanError) -> u8 {
        match error.severity() {
            ErrorSeverity::Debug => 0,
            ErrorSeverity::Info => 1,
            ErrorSeverity::Warning => 2,
            ErrorSeverity::Error => 3,
            ErrorSeverity::Critical => 4,
            ErrorSeverity::Fatal => 5,
        }
    }
}

impl From<image::ImageError> for ScanError {
    fn from(error: image::ImageError) -> Self {
        Self::external("image", error)
    }
}

impl From<frame_scale::cpu::ScaleError> for ScanError {
    fn from(error: frame_scale::cpu::ScaleError) -> Self {
        Self::conversion("downscale", error.to_string())
    }
}
