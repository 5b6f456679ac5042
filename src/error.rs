// MIT License - Copyright (c) 2026 Peter Wright

//! Error types for the jablotron-serial-bridge library.

/// All errors that can occur in the jablotron-serial-bridge library.
///
/// Protocol-level anomalies (unknown packet prefixes, unmapped state
/// combinations, undecodable info text) are deliberately *not* errors: they
/// are logged and skipped, because a single garbled read must never take the
/// engine down. The variants here cover startup failures and invalid API use.
#[derive(Debug, thiserror::Error)]
pub enum JablotronError {
    /// The serial device is missing, not accessible, or disappeared.
    #[error("serial port unavailable: {0}")]
    ServiceUnavailable(#[from] std::io::Error),

    /// The model probe got no decodable model reply within the bound.
    #[error("central unit model not detected")]
    ModelNotDetected,

    /// The central unit answered with a model outside the JA-100 family.
    #[error("model {model} is not supported")]
    ModelNotSupported { model: String },

    /// The identity or sections probe got no matching reply within the bound.
    #[error("no response from central unit")]
    DetectionTimeout,

    /// Detection finished without producing a result object. Defensive;
    /// indicates a bug rather than a device condition.
    #[error("detection finished without a result")]
    ShouldNotHappen,

    /// A command referenced a section that was not discovered at startup.
    #[error("unknown section: {section}")]
    InvalidSection { section: u8 },

    /// The operation requires a code but none was given and prompting is
    /// enabled for it.
    #[error("a code is required for this operation")]
    CodeRequired,

    /// Codes must be 4 to 8 decimal digits to survive the packing into the
    /// 4-byte code packet.
    #[error("code must be 4 to 8 digits")]
    InvalidCode,

    /// The stored-states file could not be parsed or serialized.
    #[error("stored state file error: {0}")]
    Storage(#[from] serde_json::Error),
}

impl JablotronError {
    /// Whether this error ends the startup sequence. Mid-session the read
    /// and keepalive loops never surface errors at all; they degrade the
    /// availability flag and retry.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            JablotronError::ServiceUnavailable(_)
                | JablotronError::ModelNotDetected
                | JablotronError::ModelNotSupported { .. }
                | JablotronError::DetectionTimeout
                | JablotronError::ShouldNotHappen
        )
    }
}

pub type Result<T> = std::result::Result<T, JablotronError>;
