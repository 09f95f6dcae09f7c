//! Completion status records.

use bytes::{Buf, BufMut};
use camrtc_abi::layout::{self, descriptor};
use camrtc_abi::nvcsi::{self, cil_error, stream_error, vc_error};
use camrtc_abi::status::StatusCode;

use crate::flags::StatusFlags;
use crate::{wire, CaptureError, Result};

/// NVCSI receiver error words reported alongside a frame.
///
/// These are advisory. They explain what the receiver saw, but the frame
/// verdict comes from the status code and notify bits alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NvcsiErrorStatus {
    pub stream_bits: u32,
    pub virtual_channel_bits: u32,
    pub cil_a_bits: u32,
    pub cil_b_bits: u32,
}

impl NvcsiErrorStatus {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stream_bits == 0 && self.virtual_channel_bits == 0 && self.cil_a_bits == 0 && self.cil_b_bits == 0
    }

    /// Named errors in report order, each with the block that raised it.
    /// Bits outside the catalog are reported as `(block, None, bits)`.
    pub fn named(&self) -> Vec<(NvcsiBlock, Option<&'static str>, u32)> {
        let blocks: [(NvcsiBlock, u32, &'static [(u32, &'static str)]); 4] = [
            (NvcsiBlock::Stream, self.stream_bits, &stream_error::NAMES),
            (NvcsiBlock::VirtualChannel, self.virtual_channel_bits, &vc_error::NAMES),
            (NvcsiBlock::CilA, self.cil_a_bits, &cil_error::NAMES),
            (NvcsiBlock::CilB, self.cil_b_bits, &cil_error::NAMES),
        ];
        let mut out = Vec::new();
        for (block, bits, table) in blocks {
            let (names, unknown) = nvcsi::named_bits(bits, table);
            out.extend(names.map(|name| (block, Some(name), 0)));
            if unknown != 0 {
                out.push((block, None, unknown));
            }
        }
        out
    }
}

/// NVCSI block an error word came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NvcsiBlock {
    Stream,
    VirtualChannel,
    CilA,
    CilB,
}

impl NvcsiBlock {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::VirtualChannel => "virtual channel",
            Self::CilA => "CIL A",
            Self::CilB => "CIL B",
        }
    }
}

/// `capture_status`, written by the coprocessor into each descriptor.
///
/// When `status` is [`StatusCode::Unknown`] every other field is
/// undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStatus {
    pub src_stream: u8,
    pub virtual_channel: u8,
    pub frame_id: u16,
    pub status: StatusCode,
    /// Start-of-frame time in nanoseconds.
    pub sof_timestamp: u64,
    /// End-of-frame time in nanoseconds.
    pub eof_timestamp: u64,
    pub err_data: u32,
    pub flags: StatusFlags,
    pub notify_bits: u64,
    pub nvcsi: NvcsiErrorStatus,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        Self {
            src_stream: 0,
            virtual_channel: 0,
            frame_id: 0,
            status: StatusCode::Unknown,
            sof_timestamp: 0,
            eof_timestamp: 0,
            err_data: 0,
            flags: StatusFlags::empty(),
            notify_bits: 0,
            nvcsi: NvcsiErrorStatus::default(),
        }
    }
}

impl CaptureStatus {
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.status.is_final()
    }

    #[must_use]
    pub const fn channel_in_error(&self) -> bool {
        self.flags.contains(StatusFlags::CHANNEL_IN_ERROR)
    }

    /// Frame duration in nanoseconds, if both timestamps are sane.
    #[must_use]
    pub const fn duration_ns(&self) -> Option<u64> {
        self.eof_timestamp.checked_sub(self.sof_timestamp)
    }

    /// Require a final status for request `sequence`.
    ///
    /// # Errors
    ///
    /// `NotReady` while the status is still `UNKNOWN`.
    pub fn require_final(self, sequence: u32) -> Result<Self> {
        if self.is_final() {
            Ok(self)
        } else {
            Err(CaptureError::NotReady { sequence })
        }
    }

    /// Decode a bare 56-byte `capture_status` record.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` on a short buffer; `InvalidStatusCode` for a status
    /// word outside the catalog.
    pub fn decode_record(bytes: &[u8]) -> Result<Self> {
        let mut rd = wire::record(bytes, 0, layout::status::SIZE, "capture_status")?;
        let src_stream = rd.get_u8();
        let virtual_channel = rd.get_u8();
        let frame_id = rd.get_u16_le();
        let raw = rd.get_u32_le();
        let status = StatusCode::from_raw(raw).ok_or_else(|| CaptureError::invalid_status("capture_status", raw))?;
        let sof_timestamp = rd.get_u64_le();
        let eof_timestamp = rd.get_u64_le();
        let err_data = rd.get_u32_le();
        let flags = StatusFlags::from_bits_retain(rd.get_u32_le());
        let notify_bits = rd.get_u64_le();
        let nvcsi = NvcsiErrorStatus {
            stream_bits: rd.get_u32_le(),
            virtual_channel_bits: rd.get_u32_le(),
            cil_a_bits: rd.get_u32_le(),
            cil_b_bits: rd.get_u32_le(),
        };
        Ok(Self {
            src_stream,
            virtual_channel,
            frame_id,
            status,
            sof_timestamp,
            eof_timestamp,
            err_data,
            flags,
            notify_bits,
            nvcsi,
        })
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.src_stream);
        buf.put_u8(self.virtual_channel);
        buf.put_u16_le(self.frame_id);
        buf.put_u32_le(self.status.raw());
        buf.put_u64_le(self.sof_timestamp);
        buf.put_u64_le(self.eof_timestamp);
        buf.put_u32_le(self.err_data);
        buf.put_u32_le(self.flags.bits());
        buf.put_u64_le(self.notify_bits);
        buf.put_u32_le(self.nvcsi.stream_bits);
        buf.put_u32_le(self.nvcsi.virtual_channel_bits);
        buf.put_u32_le(self.nvcsi.cil_a_bits);
        buf.put_u32_le(self.nvcsi.cil_b_bits);
    }
}

/// Decode the status embedded in a descriptor slot.
///
/// A status of `UNKNOWN` decodes successfully; use
/// [`CaptureStatus::require_final`] to turn it into `NotReady`.
///
/// # Errors
///
/// `LayoutMismatch` if the slot is shorter than a descriptor;
/// `InvalidStatusCode` for a status word outside the catalog.
pub fn decode_status(slot: &[u8]) -> Result<CaptureStatus> {
    let record = wire::record(slot, descriptor::STATUS, layout::status::SIZE, "capture_descriptor")?;
    CaptureStatus::decode_record(record)
}

/// Write `status` into the descriptor in `slot`, as the coprocessor does
/// on completion.
///
/// # Errors
///
/// `LayoutMismatch` if the slot is shorter than a descriptor.
pub fn write_status(slot: &mut [u8], status: &CaptureStatus) -> Result<()> {
    let mut out = wire::record_mut(slot, descriptor::STATUS, layout::status::SIZE, "capture_descriptor")?;
    status.put(&mut out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camrtc_abi::layout::status as off;

    fn completed() -> CaptureStatus {
        CaptureStatus {
            src_stream: 2,
            virtual_channel: 1,
            frame_id: 77,
            status: StatusCode::Success,
            sof_timestamp: 1_000,
            eof_timestamp: 34_000,
            notify_bits: 1 << 16,
            nvcsi: NvcsiErrorStatus {
                virtual_channel_bits: vc_error::PH_ECC_SINGLE_BIT_ERR,
                ..NvcsiErrorStatus::default()
            },
            ..CaptureStatus::default()
        }
    }

    #[test]
    fn written_status_reads_back() {
        let mut slot = vec![0u8; descriptor::SIZE];
        write_status(&mut slot, &completed()).unwrap();
        assert_eq!(slot[descriptor::STATUS + off::FRAME_ID], 77);
        assert_eq!(decode_status(&slot).unwrap(), completed());
        assert_eq!(completed().duration_ns(), Some(33_000));
    }

    #[test]
    fn zeroed_slot_is_unknown_and_not_ready() {
        let slot = vec![0u8; descriptor::SIZE];
        let status = decode_status(&slot).unwrap();
        assert_eq!(status.status, StatusCode::Unknown);
        assert_eq!(status.require_final(9), Err(CaptureError::NotReady { sequence: 9 }));
    }

    #[test]
    fn status_outside_catalog() {
        let mut slot = vec![0u8; descriptor::SIZE];
        slot[descriptor::STATUS + off::STATUS] = 17;
        assert_eq!(
            decode_status(&slot),
            Err(CaptureError::invalid_status("capture_status", 17))
        );
    }

    #[test]
    fn decoding_is_a_pure_read() {
        let mut slot = vec![0u8; descriptor::SIZE];
        write_status(&mut slot, &completed()).unwrap();
        let before = slot.clone();
        let a = decode_status(&slot).unwrap();
        let b = decode_status(&slot).unwrap();
        assert_eq!(a, b);
        assert_eq!(slot, before);
    }

    #[test]
    fn nvcsi_names() {
        let e = NvcsiErrorStatus {
            stream_bits: stream_error::PH_BOTH_CRC_ERR,
            cil_b_bits: cil_error::DPHY_LANE_ALIGN_ERR | (1 << 31),
            ..NvcsiErrorStatus::default()
        };
        let named = e.named();
        assert_eq!(named[0], (NvcsiBlock::Stream, Some("PH_BOTH_CRC_ERR"), 0));
        assert_eq!(named[1], (NvcsiBlock::CilB, Some("DPHY_LANE_ALIGN_ERR"), 0));
        assert_eq!(named[2], (NvcsiBlock::CilB, None, 1 << 31));
    }
}
