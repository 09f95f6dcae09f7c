//! Capture descriptor codec.
//!
//! One descriptor occupies the first 384 bytes of each request ring slot.
//! The host writes the request fields; the coprocessor writes the embedded
//! [`CaptureStatus`](crate::CaptureStatus) at offset 272 when the frame
//! completes. Encoding always leaves the status region zeroed (`UNKNOWN`).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use camrtc_abi::layout::{self, descriptor as off};

use crate::flags::{CaptureFlags, ChannelFlags, ViChannelFlags};
use crate::vi::{PfsdConfig, ViChannelConfig};
use crate::{validate, wire, ChannelConfig, ConfigViolation, Result};

/// Per-frame watermark: where the coprocessor writes the frame's
/// watermark inside the watermark surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatermarkOffset {
    pub buff_idx: u32,
    pub size: u32,
}

/// Host-written fields of one capture descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureRequest {
    /// Stamped by the ring on submit.
    pub sequence: u32,
    pub capture_flags: CaptureFlags,
    /// Milliseconds to wait for start of frame; 0 waits forever.
    pub frame_start_timeout: u16,
    /// Milliseconds to wait for frame completion; 0 waits forever.
    pub frame_completion_timeout: u16,
    pub vi_channel: ViChannelConfig,
    /// Present only on channels set up with `ENABLE_VI_PFSD`. An all-zero
    /// record on the wire means "no PFSD", so `Some` must differ from the
    /// default.
    pub pfsd: Option<PfsdConfig>,
    /// Offset of the engine status record inside its surface.
    pub engine_status_offset: u64,
    /// Opaque tag echoed back by the coprocessor.
    pub output_buffer_id: u64,
    pub watermark: WatermarkOffset,
}

impl CaptureRequest {
    /// Check the request against the channel it will be submitted on.
    ///
    /// # Errors
    ///
    /// Any field-range violation, or a per-frame feature the channel was
    /// not set up for.
    pub fn validate_for(&self, config: &ChannelConfig) -> Result<()> {
        validate::entry_size("request_size", config.request_size(), off::SIZE)?;
        self.vi_channel.validate()?;

        let channel = config.flags();
        if let Some(pfsd) = &self.pfsd {
            if !channel.contains(ChannelFlags::ENABLE_VI_PFSD) {
                return Err(ConfigViolation::inconsistent("PFSD requested on a channel without ENABLE_VI_PFSD").into());
            }
            if *pfsd == PfsdConfig::default() {
                return Err(ConfigViolation::inconsistent("empty PFSD settings would decode as no PFSD").into());
            }
            pfsd.validate()?;
        }
        let vi = self.vi_channel.flags;
        if vi.contains(ViChannelFlags::EMBDATA_ENABLE) && !channel.contains(ChannelFlags::EMBDATA) {
            return Err(ConfigViolation::inconsistent("EMBDATA_ENABLE on a channel without EMBDATA").into());
        }
        if vi.contains(ViChannelFlags::LINE_TIMER_ENABLE) && !channel.contains(ChannelFlags::LINETIMER) {
            return Err(ConfigViolation::inconsistent("LINE_TIMER_ENABLE on a channel without LINETIMER").into());
        }
        Ok(())
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.sequence);
        buf.put_u32_le(self.capture_flags.bits());
        buf.put_u16_le(self.frame_start_timeout);
        buf.put_u16_le(self.frame_completion_timeout);
        // Pre-fences are no longer honoured; count and slots stay zero.
        buf.put_bytes(0, off::VI_CHANNEL_CONFIG - off::PREFENCE_COUNT);

        self.vi_channel.put(buf);
        match &self.pfsd {
            Some(pfsd) => pfsd.put(buf),
            None => PfsdConfig::default().put(buf),
        }

        buf.put_u32_le(self.engine_status_offset as u32);
        buf.put_u32_le((self.engine_status_offset >> 32) as u32);

        buf.put_bytes(0, layout::status::SIZE);

        buf.put_u64_le(self.output_buffer_id);
        buf.put_u32_le(self.watermark.buff_idx);
        buf.put_u32_le(self.watermark.size);
        buf.put_bytes(0, off::SIZE - off::RESERVED);
    }
}

/// Encode `request` into a full ring slot of `config.request_size()` bytes.
///
/// # Errors
///
/// `ConfigurationInvalid` if the request does not fit the channel.
pub fn encode_request(config: &ChannelConfig, request: &CaptureRequest) -> Result<Bytes> {
    request.validate_for(config)?;
    let slot = config.request_size() as usize;
    let mut buf = BytesMut::with_capacity(slot);
    request.put(&mut buf);
    buf.put_bytes(0, slot - off::SIZE);
    wire::finish(buf, slot, "capture_descriptor")
}

/// Write `request` into an existing slot, clearing its status.
pub(crate) fn write_request(config: &ChannelConfig, request: &CaptureRequest, slot: &mut [u8]) -> Result<()> {
    request.validate_for(config)?;
    slot.fill(0);
    let mut out = wire::record_mut(slot, 0, off::SIZE, "capture_descriptor")?;
    request.put(&mut out);
    Ok(())
}

/// Decode the host-written fields of a descriptor. The status region is
/// ignored; see [`decode_status`](crate::decode_status).
///
/// # Errors
///
/// `LayoutMismatch` on a short buffer, or an out-of-range PFSD count.
pub fn decode_request(bytes: &[u8]) -> Result<CaptureRequest> {
    let mut rd = wire::record(bytes, 0, off::SIZE, "capture_descriptor")?;

    let sequence = rd.get_u32_le();
    let capture_flags = CaptureFlags::from_bits_retain(rd.get_u32_le());
    let frame_start_timeout = rd.get_u16_le();
    let frame_completion_timeout = rd.get_u16_le();
    rd.advance(off::VI_CHANNEL_CONFIG - off::PREFENCE_COUNT);

    let vi_channel = ViChannelConfig::get(&mut rd);
    let pfsd = PfsdConfig::get(&mut rd)?;
    let pfsd = (pfsd != PfsdConfig::default()).then_some(pfsd);

    let lo = u64::from(rd.get_u32_le());
    let hi = u64::from(rd.get_u32_le());
    rd.advance(layout::status::SIZE);

    let output_buffer_id = rd.get_u64_le();
    let watermark = WatermarkOffset {
        buff_idx: rd.get_u32_le(),
        size: rd.get_u32_le(),
    };

    Ok(CaptureRequest {
        sequence,
        capture_flags,
        frame_start_timeout,
        frame_completion_timeout,
        vi_channel,
        pfsd,
        engine_status_offset: hi << 32 | lo,
        output_buffer_id,
        watermark,
    })
}

/// Sequence number stored in a descriptor slot.
///
/// # Errors
///
/// `LayoutMismatch` if fewer than four bytes are supplied.
pub fn descriptor_sequence(slot: &[u8]) -> Result<u32> {
    let mut rd = wire::record(slot, off::SEQUENCE, 4, "capture_descriptor")?;
    Ok(rd.get_u32_le())
}
