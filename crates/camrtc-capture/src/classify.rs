//! Frame verdicts.
//!
//! The status code and notify bits are read together. A frame is good only
//! when the status is `SUCCESS` and every notify bit set is documented as
//! non-corrupting. Bits outside the catalog count as corrupting. NVCSI
//! receiver errors never change the verdict; they are attached as
//! advisory diagnostics.

use std::fmt;

use camrtc_abi::notify::{FrameImpact, NotifyBit};
use camrtc_abi::status::StatusCode;
use tracing::warn;

use crate::status::{CaptureStatus, NvcsiBlock};
use crate::{CaptureError, Result};

/// What the host may do with a completed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Deliver the frame.
    FrameGood,
    /// Drop the frame; pixel data may be lost or damaged.
    FrameCorrupted,
    /// The coprocessor has not completed the request.
    FrameUnknown,
}

/// One reason behind a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Final status other than `SUCCESS`.
    Status(StatusCode),
    /// A catalogued notify bit.
    Notify(NotifyBit),
    /// Notify bits outside the catalog.
    UnknownNotify(u64),
    /// The channel entered the error state on this frame.
    ChannelInError,
    /// NVCSI receiver error, advisory only.
    Nvcsi {
        block: NvcsiBlock,
        name: Option<&'static str>,
        bits: u32,
    },
}

impl Diagnostic {
    /// True if this diagnostic alone makes the frame unusable.
    #[must_use]
    pub const fn is_corrupting(&self) -> bool {
        match self {
            Self::Status(_) | Self::UnknownNotify(_) => true,
            Self::Notify(bit) => matches!(bit.impact(), FrameImpact::Corrupting),
            Self::ChannelInError | Self::Nvcsi { .. } => false,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "status {}", code.name()),
            Self::Notify(bit) => f.write_str(bit.name()),
            Self::UnknownNotify(bits) => write!(f, "unrecognised notify bits {bits:#018x}"),
            Self::ChannelInError => f.write_str("channel in error"),
            Self::Nvcsi { block, name: Some(name), .. } => write!(f, "nvcsi {}: {name}", block.name()),
            Self::Nvcsi { block, name: None, bits } => {
                write!(f, "nvcsi {}: unrecognised bits {bits:#010x}", block.name())
            }
        }
    }
}

/// Verdict plus everything that contributed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    verdict: Verdict,
    diagnostics: Vec<Diagnostic>,
    channel_in_error: bool,
}

impl Classification {
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Status first, then notify bits lowest first, then advisory entries.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub const fn channel_in_error(&self) -> bool {
        self.channel_in_error
    }

    #[must_use]
    pub const fn is_good(&self) -> bool {
        matches!(self.verdict, Verdict::FrameGood)
    }

    fn unknown() -> Self {
        Self {
            verdict: Verdict::FrameUnknown,
            diagnostics: Vec::new(),
            channel_in_error: false,
        }
    }
}

/// Classify a status code and notify word.
///
/// Deterministic and total over every `(code, bits)` pair.
pub fn classify(status: StatusCode, notify_bits: u64) -> Classification {
    if !status.is_final() {
        return Classification::unknown();
    }

    let mut diagnostics = Vec::new();
    if status != StatusCode::Success {
        diagnostics.push(Diagnostic::Status(status));
    }
    diagnostics.extend(NotifyBit::iter_set(notify_bits).map(Diagnostic::Notify));
    let unknown = notify_bits & !NotifyBit::KNOWN_MASK;
    if unknown != 0 {
        diagnostics.push(Diagnostic::UnknownNotify(unknown));
    }

    let verdict = if diagnostics.iter().any(Diagnostic::is_corrupting) {
        Verdict::FrameCorrupted
    } else {
        Verdict::FrameGood
    };

    Classification {
        verdict,
        diagnostics,
        channel_in_error: false,
    }
}

/// Classify a raw status word.
///
/// # Errors
///
/// `InvalidStatusCode` if `raw` is outside the catalog.
pub fn classify_raw(raw: u32, notify_bits: u64) -> Result<Classification> {
    let status = StatusCode::from_raw(raw).ok_or_else(|| CaptureError::invalid_status("capture_status", raw))?;
    Ok(classify(status, notify_bits))
}

/// Classify a decoded status record, attaching channel and NVCSI
/// diagnostics. Corrupted frames are logged at `warn`.
pub fn classify_status(status: &CaptureStatus) -> Classification {
    let mut c = classify(status.status, status.notify_bits);
    if c.verdict == Verdict::FrameUnknown {
        return c;
    }

    if status.channel_in_error() {
        c.channel_in_error = true;
        c.diagnostics.push(Diagnostic::ChannelInError);
    }
    c.diagnostics.extend(
        status
            .nvcsi
            .named()
            .into_iter()
            .map(|(block, name, bits)| Diagnostic::Nvcsi { block, name, bits }),
    );

    if c.verdict == Verdict::FrameCorrupted {
        let reasons: Vec<String> = c
            .diagnostics
            .iter()
            .filter(|d| d.is_corrupting())
            .map(ToString::to_string)
            .collect();
        warn!(
            frame_id = status.frame_id,
            channel_in_error = c.channel_in_error,
            "frame corrupted: {}",
            reasons.join(", ")
        );
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::NvcsiErrorStatus;
    use crate::StatusFlags;
    use camrtc_abi::nvcsi::vc_error;

    const SINGLE_BIT_ECC: u64 = 1 << 16;
    const PD_CRC: u64 = 1 << 17;

    #[test]
    fn success_without_bits_is_good() {
        let c = classify(StatusCode::Success, 0);
        assert_eq!(c.verdict(), Verdict::FrameGood);
        assert!(c.diagnostics().is_empty());
    }

    #[test]
    fn corrected_ecc_is_non_corrupting() {
        let c = classify(StatusCode::Success, SINGLE_BIT_ECC);
        assert_eq!(c.verdict(), Verdict::FrameGood);
        assert_eq!(
            c.diagnostics(),
            &[Diagnostic::Notify(NotifyBit::CsiFaultPhEccSingleBitErr)]
        );
    }

    #[test]
    fn crc_error_corrupts_a_successful_frame() {
        let c = classify(StatusCode::Success, PD_CRC);
        assert_eq!(c.verdict(), Verdict::FrameCorrupted);
    }

    #[test]
    fn unknown_status_ignores_bits() {
        for bits in [0, SINGLE_BIT_ECC, PD_CRC, u64::MAX] {
            assert_eq!(classify(StatusCode::Unknown, bits).verdict(), Verdict::FrameUnknown);
        }
    }

    #[test]
    fn unlisted_bits_fail_closed() {
        let c = classify(StatusCode::Success, 1 << 0);
        assert_eq!(c.verdict(), Verdict::FrameCorrupted);
        assert_eq!(c.diagnostics(), &[Diagnostic::UnknownNotify(1)]);
    }

    #[test]
    fn error_status_corrupts() {
        for code in StatusCode::ALL {
            let expected = match code {
                StatusCode::Unknown => Verdict::FrameUnknown,
                StatusCode::Success => Verdict::FrameGood,
                _ => Verdict::FrameCorrupted,
            };
            assert_eq!(classify(code, 0).verdict(), expected, "{}", code.name());
        }
    }

    #[test]
    fn verdict_is_deterministic() {
        let bits = SINGLE_BIT_ECC | PD_CRC | (1 << 40);
        assert_eq!(classify(StatusCode::FalconError, bits), classify(StatusCode::FalconError, bits));
    }

    #[test]
    fn raw_status_outside_catalog() {
        assert!(matches!(
            classify_raw(200, 0),
            Err(CaptureError::InvalidStatusCode { raw: 200, .. })
        ));
        assert_eq!(classify_raw(1, 0).map(|c| c.verdict()), Ok(Verdict::FrameGood));
    }

    #[test]
    fn nvcsi_errors_are_advisory() {
        let status = CaptureStatus {
            status: StatusCode::Success,
            flags: StatusFlags::CHANNEL_IN_ERROR,
            nvcsi: NvcsiErrorStatus {
                virtual_channel_bits: vc_error::PD_CRC_ERR,
                ..NvcsiErrorStatus::default()
            },
            ..CaptureStatus::default()
        };
        let c = classify_status(&status);
        assert_eq!(c.verdict(), Verdict::FrameGood);
        assert!(c.channel_in_error());
        assert_eq!(c.diagnostics().len(), 2);
        assert_eq!(c.diagnostics()[1].to_string(), "nvcsi virtual channel: PD_CRC_ERR");
    }
}
