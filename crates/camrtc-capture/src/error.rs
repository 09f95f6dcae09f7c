//! Error types for capture protocol operations

use thiserror::Error;

/// Result type alias for capture protocol operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// A single configuration rule that was broken.
///
/// Raised while building a channel configuration or encoding a request,
/// always before anything is handed to the coprocessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigViolation {
    /// Address must be non-zero
    #[error("{field} must be non-zero")]
    ZeroAddress {
        /// Offending field
        field: &'static str,
    },

    /// Address or size is not a multiple of the required alignment
    #[error("{field} = {value:#x} is not a multiple of {align}")]
    Misaligned {
        /// Offending field
        field: &'static str,
        /// Value supplied
        value: u64,
        /// Required alignment in bytes
        align: u64,
    },

    /// Ring entry smaller than the record it must hold
    #[error("{field} = {size} is smaller than the {min}-byte record")]
    EntryTooSmall {
        /// Offending field
        field: &'static str,
        /// Size supplied
        size: u32,
        /// Minimum size
        min: u32,
    },

    /// Queue depth outside its legal range
    #[error("{field} = {depth} is outside [{min}, {max}]")]
    QueueDepthOutOfRange {
        /// Offending field
        field: &'static str,
        /// Depth supplied
        depth: u32,
        /// Smallest legal depth
        min: u32,
        /// Largest legal depth
        max: u32,
    },

    /// More Grid-of-Semaphores tables than the record can carry
    #[error("{count} GoS tables exceed the limit of {max}")]
    TooManyGosTables {
        /// Tables supplied
        count: usize,
        /// Table slots in the record
        max: usize,
    },

    /// Scalar field above its documented maximum
    #[error("{field} = {value} exceeds {max}")]
    FieldOutOfRange {
        /// Offending field
        field: &'static str,
        /// Value supplied
        value: u64,
        /// Largest legal value
        max: u64,
    },

    /// Fields that are individually legal but contradict each other
    #[error("inconsistent configuration: {reason}")]
    Inconsistent {
        /// What contradicts what
        reason: String,
    },
}

impl ConfigViolation {
    /// Create a range violation
    pub fn out_of_range(field: &'static str, value: impl Into<u64>, max: impl Into<u64>) -> Self {
        Self::FieldOutOfRange {
            field,
            value: value.into(),
            max: max.into(),
        }
    }

    /// Create an inconsistency violation
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self::Inconsistent {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during capture protocol operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Configuration rejected before handoff
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(#[from] ConfigViolation),

    /// The coprocessor has not completed this request yet
    #[error("request {sequence} not ready: status is still UNKNOWN")]
    NotReady {
        /// Sequence number of the request
        sequence: u32,
    },

    /// Versioned record carries an unexpected magic or version
    #[error(
        "unsupported {record}: id {found_id:#010x} version {found_version} \
         (expected id {expected_id:#010x} version {expected_version})"
    )]
    UnsupportedVersion {
        /// Record kind
        record: &'static str,
        /// Magic found in memory
        found_id: u32,
        /// Version found in memory
        found_version: u16,
        /// Magic this library understands
        expected_id: u32,
        /// Version this library understands
        expected_version: u16,
    },

    /// ISP program targets a generation this library does not model
    #[error("unsupported ISP type {raw}")]
    UnsupportedIspType {
        /// Raw `isp_type` field
        raw: u16,
    },

    /// Buffer size does not match the record layout
    #[error("{record} layout mismatch: need {expected} bytes, have {actual}")]
    LayoutMismatch {
        /// Record kind
        record: &'static str,
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Status word outside the known catalog
    #[error("invalid {record} status code {raw}")]
    InvalidStatusCode {
        /// Record kind
        record: &'static str,
        /// Raw status word
        raw: u32,
    },

    /// Ring slot still owned by the coprocessor
    #[error("slot {index} busy with request {sequence}")]
    SlotBusy {
        /// Slot index
        index: usize,
        /// Sequence occupying the slot
        sequence: u32,
    },

    /// Completion notice does not belong to the token it was paired with
    #[error("completion notice for request {notice} paired with request {token}")]
    NoticeMismatch {
        /// Sequence carried by the token
        token: u32,
        /// Sequence carried by the notice
        notice: u32,
    },

    /// Descriptor in the slot no longer carries the submitted sequence
    #[error("slot {index} holds sequence {found}, expected {expected}")]
    SequenceMismatch {
        /// Slot index
        index: usize,
        /// Submitted sequence
        expected: u32,
        /// Sequence read back from memory
        found: u32,
    },

    /// Channel reset in progress; no new submissions
    #[error("channel reset in progress ({in_flight} requests in flight)")]
    ChannelResetting {
        /// Requests still owned by the coprocessor
        in_flight: usize,
    },

    /// Name does not resolve to a CSI data type
    #[error("unknown CSI data type: {name}")]
    UnknownDataType {
        /// Name supplied
        name: String,
    },
}

impl CaptureError {
    /// Create a layout mismatch error
    pub fn layout_mismatch(record: &'static str, expected: usize, actual: usize) -> Self {
        Self::LayoutMismatch {
            record,
            expected,
            actual,
        }
    }

    /// Create an invalid status code error
    pub fn invalid_status(record: &'static str, raw: u32) -> Self {
        Self::InvalidStatusCode { record, raw }
    }

    /// Create an unknown data type error
    pub fn unknown_data_type(name: impl Into<String>) -> Self {
        Self::UnknownDataType { name: name.into() }
    }

    /// True for errors that make further sharing of memory unsafe.
    pub const fn is_fatal_to_channel(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion { .. }
                | Self::UnsupportedIspType { .. }
                | Self::LayoutMismatch { .. }
                | Self::SequenceMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_wraps_into_configuration_invalid() {
        let err: CaptureError = ConfigViolation::ZeroAddress { field: "requests" }.into();
        assert!(matches!(
            err,
            CaptureError::ConfigurationInvalid(ConfigViolation::ZeroAddress { field: "requests" })
        ));
        assert_eq!(err.to_string(), "invalid configuration: requests must be non-zero");
    }

    #[test]
    fn fatal_classification() {
        assert!(CaptureError::layout_mismatch("capture_descriptor", 384, 100).is_fatal_to_channel());
        assert!(!CaptureError::NotReady { sequence: 3 }.is_fatal_to_channel());
        assert!(!CaptureError::invalid_status("capture_status", 99).is_fatal_to_channel());
    }

    #[test]
    fn messages_name_the_field() {
        let v = ConfigViolation::out_of_range("embed_x", 200_000u32, 131_071u32);
        assert_eq!(v.to_string(), "embed_x = 200000 exceeds 131071");
    }
}
