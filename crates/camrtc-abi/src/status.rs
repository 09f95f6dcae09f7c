//! Completion status codes.
//!
//! A status code of zero (`Unknown`) means the coprocessor has not yet
//! completed the request. Any other value is final for that sequence
//! number.

/// VI capture status code (`capture_status::status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    /// Not executed yet, or still in progress. Other fields are undefined.
    Unknown = 0,
    /// Frame captured. Notify bits may still carry non-corrupting errors.
    Success = 1,
    /// Error at frame boundary, or a CSI error carried with the FE packet.
    CsimuxFrame = 2,
    /// Error in the CSIMUX stream interface.
    CsimuxStream = 3,
    /// Deprecated: reported as `FalconError`.
    ChanselFault = 4,
    /// Deprecated: reported as `FalconError`.
    ChanselFaultFe = 5,
    /// Start-of-frame matched a channel already in frame.
    ChanselCollision = 6,
    /// Deprecated: reported as `FalconError`.
    ChanselShortFrame = 7,
    /// ATOMP surface packer overflow.
    AtompPackerOverflow = 8,
    /// Frame truncated while writing to memory.
    AtompFrameTruncated = 9,
    /// Frame discarded while writing to memory.
    AtompFrameTossed = 10,
    /// Deprecated: ISPBUF FIFOs are unused.
    IspbufFifoOverflow = 11,
    /// Stale error from a past frame; frames may have been lost.
    SyncFailure = 12,
    /// Deprecated.
    NotifierBackendDown = 13,
    /// Error reported by the VI falcon; see notify bits.
    FalconError = 14,
    /// Incoming frame matched no active channel.
    ChanselNomatch = 15,
    /// VI driver rejected the capture settings.
    InvalidCapSettings = 16,
}

impl StatusCode {
    /// Every defined code, in wire order.
    pub const ALL: [Self; 17] = [
        Self::Unknown,
        Self::Success,
        Self::CsimuxFrame,
        Self::CsimuxStream,
        Self::ChanselFault,
        Self::ChanselFaultFe,
        Self::ChanselCollision,
        Self::ChanselShortFrame,
        Self::AtompPackerOverflow,
        Self::AtompFrameTruncated,
        Self::AtompFrameTossed,
        Self::IspbufFifoOverflow,
        Self::SyncFailure,
        Self::NotifierBackendDown,
        Self::FalconError,
        Self::ChanselNomatch,
        Self::InvalidCapSettings,
    ];

    /// Decode a raw status word. `None` for values outside the catalog.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw < Self::ALL.len() as u32 {
            Some(Self::ALL[raw as usize])
        } else {
            None
        }
    }

    /// Raw wire value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// True once the coprocessor has written a final status.
    #[must_use]
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Codes the firmware no longer emits.
    #[must_use]
    pub const fn is_deprecated(self) -> bool {
        matches!(
            self,
            Self::ChanselFault
                | Self::ChanselFaultFe
                | Self::ChanselShortFrame
                | Self::IspbufFifoOverflow
                | Self::NotifierBackendDown
        )
    }

    /// Upper-case name as used in firmware logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Success => "SUCCESS",
            Self::CsimuxFrame => "CSIMUX_FRAME",
            Self::CsimuxStream => "CSIMUX_STREAM",
            Self::ChanselFault => "CHANSEL_FAULT",
            Self::ChanselFaultFe => "CHANSEL_FAULT_FE",
            Self::ChanselCollision => "CHANSEL_COLLISION",
            Self::ChanselShortFrame => "CHANSEL_SHORT_FRAME",
            Self::AtompPackerOverflow => "ATOMP_PACKER_OVERFLOW",
            Self::AtompFrameTruncated => "ATOMP_FRAME_TRUNCATED",
            Self::AtompFrameTossed => "ATOMP_FRAME_TOSSED",
            Self::IspbufFifoOverflow => "ISPBUF_FIFO_OVERFLOW",
            Self::SyncFailure => "SYNC_FAILURE",
            Self::NotifierBackendDown => "NOTIFIER_BACKEND_DOWN",
            Self::FalconError => "FALCON_ERROR",
            Self::ChanselNomatch => "CHANSEL_NOMATCH",
            Self::InvalidCapSettings => "INVALID_CAP_SETTINGS",
        }
    }
}

/// ISP process request status (`capture_isp_status::status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum IspStatusCode {
    /// Not processed yet.
    Unknown = 0,
    /// Frame processed.
    Success = 1,
    /// Processing failed; see the error mask.
    Error = 2,
}

impl IspStatusCode {
    /// Decode a raw status word.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Unknown),
            1 => Some(Self::Success),
            2 => Some(Self::Error),
            _ => None,
        }
    }
}

/// ISP program status (`capture_isp_program_status::status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum IspProgramStatusCode {
    /// Not used yet.
    Unknown = 0,
    /// Used successfully for frame processing.
    Success = 1,
    /// The program hit an error.
    Error = 2,
    /// Expired; no active process request uses it.
    Stale = 3,
}

impl IspProgramStatusCode {
    /// Decode a raw status word.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Unknown),
            1 => Some(Self::Success),
            2 => Some(Self::Error),
            3 => Some(Self::Stale),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_round_trip() {
        for code in StatusCode::ALL {
            assert_eq!(StatusCode::from_raw(code.raw()), Some(code));
        }
        assert_eq!(StatusCode::from_raw(17), None);
        assert_eq!(StatusCode::from_raw(u32::MAX), None);
    }

    #[test]
    fn only_unknown_is_not_final() {
        assert!(!StatusCode::Unknown.is_final());
        assert!(StatusCode::Success.is_final());
        assert!(StatusCode::ChanselNomatch.is_final());
    }

    #[test]
    fn isp_codes() {
        assert_eq!(IspStatusCode::from_raw(2), Some(IspStatusCode::Error));
        assert_eq!(IspStatusCode::from_raw(3), None);
        assert_eq!(IspProgramStatusCode::from_raw(3), Some(IspProgramStatusCode::Stale));
    }
}
