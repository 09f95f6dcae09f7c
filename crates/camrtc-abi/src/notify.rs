//! VI notify-bit catalog (`capture_status::notify_bits`).
//!
//! The notify word aggregates every VI error logged on the channel since
//! the previous capture. It is orthogonal to the status code: several
//! bits are documented as non-corrupting and routinely show up on a
//! request whose status is `SUCCESS`. Each variant therefore carries its
//! own [`FrameImpact`] so that callers never have to re-derive the
//! classification from prose.
//!
//! ```text
//! bits  2..5    CSIMUX frame faults
//! bits 15..20   CSI faults forwarded with the FE packet
//! bits 21..24   CSIMUX stream faults
//! bits 25..26   falcon timeouts
//! bits 30..48   channel selector faults
//! bits 49..51   ATOMP (memory writer) faults
//! bit  63       unclassified
//! ```
//!
//! Bit 63 was historically also spelled `NON_CLASSIFIED_0`; only the
//! `UNCLASSIFIED_ERROR` spelling is modelled.

/// Whether a condition, on its own, invalidates the frame it is reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameImpact {
    /// Pixel data may be lost or damaged.
    Corrupting,
    /// Logged for telemetry; the frame is still usable.
    NonCorrupting,
}

/// Hardware block that raised a notify bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifySource {
    CsimuxFrame,
    CsiFault,
    CsimuxStream,
    Falcon,
    Chansel,
    Atomp,
    Unclassified,
}

/// One named notify bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NotifyBit {
    /// FS received while in frame; an FE packet was lost.
    CsimuxFrameFsFault = 2,
    /// FE forced by stream reset or stream timeout.
    CsimuxFrameForceFeFault = 3,
    /// FE frame id does not match the FS frame id.
    CsimuxFrameFeFrameIdFault = 4,
    /// Illegal pixel-enable encoding in a long packet.
    CsimuxFramePxlEnableFault = 5,
    /// Pixel parser FSM timeout; a line arrived late.
    CsiFaultPpfsmTimeout = 15,
    /// Single-bit header error corrected by ECC.
    CsiFaultPhEccSingleBitErr = 16,
    /// Payload CRC mismatch.
    CsiFaultPdCrcErr = 17,
    /// Payload word count short; line incomplete.
    CsiFaultPdWcShortErr = 18,
    /// One of two CPHY header CRCs mismatched.
    CsiFaultPhSingleCrcErr = 19,
    /// Embedded data line CRC error.
    CsiFaultEmbeddedLineCrcErr = 20,
    /// Spurious data between frames.
    CsimuxStreamSpuriousData = 21,
    /// Stream FIFO overflow. Unrecoverable.
    CsimuxStreamFifoOverflow = 22,
    /// Stream loss of frame after FIFO overflow. Unrecoverable.
    CsimuxStreamFifoLof = 23,
    /// Illegal packet dropped by CSIMUX.
    CsimuxStreamFifoBadpkt = 24,
    /// Frame start did not arrive within `frame_start_timeout`.
    FrameStartTimeout = 25,
    /// Frame did not complete within `frame_completion_timeout`.
    FrameCompletionTimeout = 26,
    ChanselPixelMissingLe = 30,
    ChanselPixelRunaway = 31,
    ChanselPixelSpurious = 32,
    ChanselPixelLongLine = 33,
    ChanselPixelShortLine = 34,
    ChanselEmbedMissingLe = 35,
    ChanselEmbedRunaway = 36,
    ChanselEmbedSpurious = 37,
    ChanselEmbedLongLine = 38,
    /// Embedded data received when not programmed to expect it.
    ChanselEmbedInfringe = 39,
    ChanselDtypeMismatch = 40,
    /// Too few pixel lines.
    ChanselPixShort = 42,
    /// Too few embedded data lines.
    ChanselEmbShort = 43,
    /// Permanent-fault diagnostics detected a VI failure.
    PfsdFault = 44,
    /// Frame truncated by timeout, channel reset or channel release.
    ChanselFaultFe = 45,
    /// Incoming frame matched no channel and was dropped.
    ChanselNoMatch = 46,
    /// More than one channel matched the same frame.
    ChanselCollision = 47,
    /// Channel reconfigured while in frame. Deprecated, not an error.
    ChanselLoadFramed = 48,
    AtompPackerOverflow = 49,
    /// Frame truncated under memory back-pressure.
    AtompFrameTruncated = 50,
    /// Frame dropped under memory back-pressure.
    AtompFrameTossed = 51,
    /// Should not happen.
    UnclassifiedError = 63,
}

impl NotifyBit {
    /// Every catalogued bit, lowest position first.
    pub const ALL: [Self; 38] = [
        Self::CsimuxFrameFsFault,
        Self::CsimuxFrameForceFeFault,
        Self::CsimuxFrameFeFrameIdFault,
        Self::CsimuxFramePxlEnableFault,
        Self::CsiFaultPpfsmTimeout,
        Self::CsiFaultPhEccSingleBitErr,
        Self::CsiFaultPdCrcErr,
        Self::CsiFaultPdWcShortErr,
        Self::CsiFaultPhSingleCrcErr,
        Self::CsiFaultEmbeddedLineCrcErr,
        Self::CsimuxStreamSpuriousData,
        Self::CsimuxStreamFifoOverflow,
        Self::CsimuxStreamFifoLof,
        Self::CsimuxStreamFifoBadpkt,
        Self::FrameStartTimeout,
        Self::FrameCompletionTimeout,
        Self::ChanselPixelMissingLe,
        Self::ChanselPixelRunaway,
        Self::ChanselPixelSpurious,
        Self::ChanselPixelLongLine,
        Self::ChanselPixelShortLine,
        Self::ChanselEmbedMissingLe,
        Self::ChanselEmbedRunaway,
        Self::ChanselEmbedSpurious,
        Self::ChanselEmbedLongLine,
        Self::ChanselEmbedInfringe,
        Self::ChanselDtypeMismatch,
        Self::ChanselPixShort,
        Self::ChanselEmbShort,
        Self::PfsdFault,
        Self::ChanselFaultFe,
        Self::ChanselNoMatch,
        Self::ChanselCollision,
        Self::ChanselLoadFramed,
        Self::AtompPackerOverflow,
        Self::AtompFrameTruncated,
        Self::AtompFrameTossed,
        Self::UnclassifiedError,
    ];

    /// Mask of every catalogued bit.
    pub const KNOWN_MASK: u64 = mask_of(&Self::ALL, false);

    /// Mask of every catalogued bit that corrupts the frame.
    pub const CORRUPTING_MASK: u64 = mask_of(&Self::ALL, true);

    /// Bit position within the notify word.
    #[must_use]
    pub const fn position(self) -> u8 {
        self as u8
    }

    /// Single-bit mask for this condition.
    #[must_use]
    pub const fn mask(self) -> u64 {
        1u64 << self.position()
    }

    /// Look up the catalogued bit at `position`.
    #[must_use]
    pub const fn from_position(position: u8) -> Option<Self> {
        let mut i = 0;
        while i < Self::ALL.len() {
            if Self::ALL[i] as u8 == position {
                return Some(Self::ALL[i]);
            }
            i += 1;
        }
        None
    }

    /// Whether this condition alone invalidates the frame.
    #[must_use]
    pub const fn impact(self) -> FrameImpact {
        match self {
            Self::CsimuxFrameFsFault
            | Self::CsiFaultPhEccSingleBitErr
            | Self::CsiFaultPhSingleCrcErr
            | Self::CsimuxStreamSpuriousData
            | Self::CsimuxStreamFifoBadpkt
            | Self::ChanselNoMatch
            | Self::ChanselLoadFramed => FrameImpact::NonCorrupting,
            _ => FrameImpact::Corrupting,
        }
    }

    /// Hardware block that raised the condition.
    #[must_use]
    pub const fn source(self) -> NotifySource {
        match self.position() {
            2..=5 => NotifySource::CsimuxFrame,
            15..=20 => NotifySource::CsiFault,
            21..=24 => NotifySource::CsimuxStream,
            25 | 26 => NotifySource::Falcon,
            30..=48 => NotifySource::Chansel,
            49..=51 => NotifySource::Atomp,
            _ => NotifySource::Unclassified,
        }
    }

    /// Firmware name, without the `CAPTURE_STATUS_NOTIFY_BIT_` prefix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CsimuxFrameFsFault => "CSIMUX_FRAME_FS_FAULT",
            Self::CsimuxFrameForceFeFault => "CSIMUX_FRAME_FORCE_FE_FAULT",
            Self::CsimuxFrameFeFrameIdFault => "CSIMUX_FRAME_FE_FRAME_ID_FAULT",
            Self::CsimuxFramePxlEnableFault => "CSIMUX_FRAME_PXL_ENABLE_FAULT",
            Self::CsiFaultPpfsmTimeout => "CSIMUX_FRAME_CSI_FAULT_PPFSM_TIMEOUT",
            Self::CsiFaultPhEccSingleBitErr => "CSIMUX_FRAME_CSI_FAULT_PH_ECC_SINGLE_BIT_ERR",
            Self::CsiFaultPdCrcErr => "CSIMUX_FRAME_CSI_FAULT_PD_CRC_ERR",
            Self::CsiFaultPdWcShortErr => "CSIMUX_FRAME_CSI_FAULT_PD_WC_SHORT_ERR",
            Self::CsiFaultPhSingleCrcErr => "CSIMUX_FRAME_CSI_FAULT_PH_SINGLE_CRC_ERR",
            Self::CsiFaultEmbeddedLineCrcErr => "CSIMUX_FRAME_CSI_FAULT_EMBEDDED_LINE_CRC_ERR",
            Self::CsimuxStreamSpuriousData => "CSIMUX_STREAM_SPURIOUS_DATA",
            Self::CsimuxStreamFifoOverflow => "CSIMUX_STREAM_FIFO_OVERFLOW",
            Self::CsimuxStreamFifoLof => "CSIMUX_STREAM_FIFO_LOF",
            Self::CsimuxStreamFifoBadpkt => "CSIMUX_STREAM_FIFO_BADPKT",
            Self::FrameStartTimeout => "FRAME_START_TIMEOUT",
            Self::FrameCompletionTimeout => "FRAME_COMPLETION_TIMEOUT",
            Self::ChanselPixelMissingLe => "CHANSEL_PIXEL_MISSING_LE",
            Self::ChanselPixelRunaway => "CHANSEL_PIXEL_RUNAWAY",
            Self::ChanselPixelSpurious => "CHANSEL_PIXEL_SPURIOUS",
            Self::ChanselPixelLongLine => "CHANSEL_PIXEL_LONG_LINE",
            Self::ChanselPixelShortLine => "CHANSEL_PIXEL_SHORT_LINE",
            Self::ChanselEmbedMissingLe => "CHANSEL_EMBED_MISSING_LE",
            Self::ChanselEmbedRunaway => "CHANSEL_EMBED_RUNAWAY",
            Self::ChanselEmbedSpurious => "CHANSEL_EMBED_SPURIOUS",
            Self::ChanselEmbedLongLine => "CHANSEL_EMBED_LONG_LINE",
            Self::ChanselEmbedInfringe => "CHANSEL_EMBED_INFRINGE",
            Self::ChanselDtypeMismatch => "CHANSEL_DTYPE_MISMATCH",
            Self::ChanselPixShort => "CHANSEL_PIX_SHORT",
            Self::ChanselEmbShort => "CHANSEL_EMB_SHORT",
            Self::PfsdFault => "PFSD_FAULT",
            Self::ChanselFaultFe => "CHANSEL_FAULT_FE",
            Self::ChanselNoMatch => "CHANSEL_NO_MATCH",
            Self::ChanselCollision => "CHANSEL_COLLISION",
            Self::ChanselLoadFramed => "CHANSEL_LOAD_FRAMED",
            Self::AtompPackerOverflow => "ATOMP_PACKER_OVERFLOW",
            Self::AtompFrameTruncated => "ATOMP_FRAME_TRUNCATED",
            Self::AtompFrameTossed => "ATOMP_FRAME_TOSSED",
            Self::UnclassifiedError => "UNCLASSIFIED_ERROR",
        }
    }

    /// Look up a bit by firmware name, with or without the
    /// `CAPTURE_STATUS_NOTIFY_BIT_` prefix. Accepts the historical
    /// `NON_CLASSIFIED_0` alias for bit 63.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("CAPTURE_STATUS_NOTIFY_BIT_").unwrap_or(name);
        if name == "NON_CLASSIFIED_0" {
            return Some(Self::UnclassifiedError);
        }
        Self::ALL.into_iter().find(|bit| bit.name() == name)
    }

    /// Iterate the catalogued bits set in `bits`, lowest first.
    pub fn iter_set(bits: u64) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |bit| bits & bit.mask() != 0)
    }
}

const fn mask_of(bits: &[NotifyBit], corrupting_only: bool) -> u64 {
    let mut mask = 0u64;
    let mut i = 0;
    while i < bits.len() {
        let keep = !corrupting_only || matches!(bits[i].impact(), FrameImpact::Corrupting);
        if keep {
            mask |= bits[i].mask();
        }
        i += 1;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_match_firmware() {
        assert_eq!(NotifyBit::CsiFaultPhEccSingleBitErr.mask(), 1 << 16);
        assert_eq!(NotifyBit::AtompFrameTruncated.mask(), 1 << 50);
        assert_eq!(NotifyBit::UnclassifiedError.mask(), 1 << 63);
    }

    #[test]
    fn catalog_is_sorted_and_unique() {
        for pair in NotifyBit::ALL.windows(2) {
            assert!(pair[0].position() < pair[1].position());
        }
        assert_eq!(NotifyBit::KNOWN_MASK.count_ones() as usize, NotifyBit::ALL.len());
    }

    #[test]
    fn documented_benign_bits_are_non_corrupting() {
        for bit in [
            NotifyBit::CsimuxFrameFsFault,
            NotifyBit::CsiFaultPhEccSingleBitErr,
            NotifyBit::CsiFaultPhSingleCrcErr,
            NotifyBit::CsimuxStreamSpuriousData,
            NotifyBit::ChanselNoMatch,
        ] {
            assert_eq!(bit.impact(), FrameImpact::NonCorrupting, "{}", bit.name());
            assert_eq!(NotifyBit::CORRUPTING_MASK & bit.mask(), 0);
        }
    }

    #[test]
    fn truncation_collision_timeout_and_fifo_loss_corrupt() {
        for bit in [
            NotifyBit::AtompFrameTruncated,
            NotifyBit::AtompFrameTossed,
            NotifyBit::ChanselCollision,
            NotifyBit::FrameStartTimeout,
            NotifyBit::FrameCompletionTimeout,
            NotifyBit::CsimuxStreamFifoOverflow,
            NotifyBit::CsimuxStreamFifoLof,
        ] {
            assert_eq!(bit.impact(), FrameImpact::Corrupting, "{}", bit.name());
        }
    }

    #[test]
    fn name_lookup() {
        assert_eq!(
            NotifyBit::from_name("CAPTURE_STATUS_NOTIFY_BIT_ATOMP_FRAME_TOSSED"),
            Some(NotifyBit::AtompFrameTossed)
        );
        assert_eq!(NotifyBit::from_name("NON_CLASSIFIED_0"), Some(NotifyBit::UnclassifiedError));
        assert_eq!(NotifyBit::from_name("NOT_A_BIT"), None);
        assert_eq!(NotifyBit::from_position(41), None);
        assert_eq!(NotifyBit::from_position(47), Some(NotifyBit::ChanselCollision));
    }

    #[test]
    fn sources() {
        assert_eq!(NotifyBit::CsiFaultPdCrcErr.source(), NotifySource::CsiFault);
        assert_eq!(NotifyBit::FrameStartTimeout.source(), NotifySource::Falcon);
        assert_eq!(NotifyBit::AtompFrameTossed.source(), NotifySource::Atomp);
    }
}
