//! ISP program ring: program descriptors and program buffers.
//!
//! Each program slot holds an `isp_program_descriptor` followed, at
//! `isp_program_offset`, by an `isp5_program`. The program buffer is a
//! versioned record. Its magic and version are checked before any other
//! byte is read, and a mismatch fails closed.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use camrtc_abi::isp::{
    program as off, IspType, StatsLayout, MAX_OUTPUTS, PROGRAM_MAX_SIZE, PROGRAM_PB_SIZE,
    PROGRAM_STRUCT_ID, PROGRAM_STRUCT_VERSION,
};
use camrtc_abi::layout::{self, program_descriptor as desc};
use camrtc_abi::status::IspProgramStatusCode;
use tracing::error;

use crate::flags::ActivateFlags;
use crate::isp::IspProgramStatus;
use crate::{validate, wire, CaptureError, ConfigViolation, Result};

/// Push buffer capacity in 32-bit words.
pub const PUSHBUFFER_WORDS: usize = PROGRAM_PB_SIZE / 4;

// ── Program descriptor ───────────────────────────────────────────────────────

/// `isp_program_descriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramDescriptor {
    /// Identifies the program to process requests.
    pub settings_id: u8,
    /// Bound VI channel; `None` for memory-to-memory processing.
    pub vi_channel_id: Option<u8>,
    /// First frame the program applies to.
    pub sequence: u32,
    /// Offset of the program buffer from the descriptor.
    pub isp_program_offset: u32,
    pub isp_program_size: u32,
    /// PB1 base; must be 64-byte aligned.
    pub isp_pb1_mem: u64,
    /// Written by the coprocessor.
    pub program_status: Option<IspProgramStatus>,
    pub stats_buffer_id: u64,
    pub program_buffer_id: u64,
    pub activate_flags: ActivateFlags,
}

impl Default for ProgramDescriptor {
    fn default() -> Self {
        Self {
            settings_id: 0,
            vi_channel_id: None,
            sequence: 0,
            isp_program_offset: desc::SIZE as u32,
            isp_program_size: PROGRAM_MAX_SIZE as u32,
            isp_pb1_mem: 0,
            program_status: None,
            stats_buffer_id: 0,
            program_buffer_id: 0,
            activate_flags: ActivateFlags::empty(),
        }
    }
}

impl ProgramDescriptor {
    /// Check offsets and sizes.
    ///
    /// # Errors
    ///
    /// `ConfigurationInvalid` for a program placed inside its descriptor,
    /// a misaligned offset or PB1 address, or an oversized program.
    pub fn validate(&self) -> Result<()> {
        validate::aligned(
            "isp_program_offset",
            self.isp_program_offset.into(),
            layout::DESCRIPTOR_ALIGN as u64,
        )?;
        if (self.isp_program_offset as usize) < desc::SIZE {
            return Err(ConfigViolation::inconsistent("ISP program overlaps its descriptor").into());
        }
        if self.isp_program_size == 0 {
            return Err(ConfigViolation::inconsistent("ISP program size is zero").into());
        }
        validate::at_most("isp_program_size", self.isp_program_size.into(), PROGRAM_MAX_SIZE as u64)?;
        validate::aligned("isp_pb1_mem", self.isp_pb1_mem, layout::DESCRIPTOR_ALIGN as u64)?;
        Ok(())
    }

    /// Encode the 64-byte record with an empty program status.
    ///
    /// # Errors
    ///
    /// Anything [`validate`](Self::validate) rejects.
    pub fn encode(&self) -> Result<Bytes> {
        self.validate()?;
        let mut buf = BytesMut::with_capacity(desc::SIZE);
        buf.put_u8(self.settings_id);
        buf.put_u8(self.vi_channel_id.unwrap_or(desc::NO_VI_BINDING));
        buf.put_u16_le(0);
        buf.put_u32_le(self.sequence);
        buf.put_u32_le(self.isp_program_offset);
        buf.put_u32_le(self.isp_program_size);
        buf.put_u64_le(self.isp_pb1_mem);
        match &self.program_status {
            Some(st) => st.put(&mut buf),
            None => buf.put_bytes(0, layout::isp_status::SIZE),
        }
        buf.put_u64_le(self.stats_buffer_id);
        buf.put_u64_le(self.program_buffer_id);
        buf.put_u32_le(self.activate_flags.bits());
        buf.put_u32_le(0);
        wire::finish(buf, desc::SIZE, "isp_program_descriptor")
    }

    /// Decode a 64-byte record. An `UNKNOWN` program status decodes as
    /// `None`.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` or `InvalidStatusCode`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut rd = wire::record(bytes, 0, desc::SIZE, "isp_program_descriptor")?;
        let settings_id = rd.get_u8();
        let vi_channel_id = Some(rd.get_u8()).filter(|&id| id != desc::NO_VI_BINDING);
        rd.advance(2);
        let sequence = rd.get_u32_le();
        let isp_program_offset = rd.get_u32_le();
        let isp_program_size = rd.get_u32_le();
        let isp_pb1_mem = rd.get_u64_le();

        let status = IspProgramStatus::decode(&rd[..layout::isp_status::SIZE])?;
        rd.advance(layout::isp_status::SIZE);
        let program_status = (status.status != IspProgramStatusCode::Unknown).then_some(status);

        Ok(Self {
            settings_id,
            vi_channel_id,
            sequence,
            isp_program_offset,
            isp_program_size,
            isp_pb1_mem,
            program_status,
            stats_buffer_id: rd.get_u64_le(),
            program_buffer_id: rd.get_u64_le(),
            activate_flags: ActivateFlags::from_bits_retain(rd.get_u32_le()),
        })
    }
}

// ── Program buffer ───────────────────────────────────────────────────────────

/// `isp_overfetch`: extra pixels a tile needs around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overfetch {
    pub left: u8,
    pub right: u8,
    pub top: u8,
    pub bottom: u8,
    pub pru_ovf_h: u8,
    pub alignment: u8,
}

/// `isp_crop_rect`, inclusive edges relative to the MW input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRect {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

/// Decoded `isp5_program`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IspProgram {
    pub isp_type: IspType,
    pub xbsrc: [u32; 4],
    pub enables_config: u32,
    pub afm_ctrl: u32,
    pub stats_aidx_flag: u32,
    pub ds_pixel_incr_h: [u32; 3],
    pub overfetch: Overfetch,
    pub mw_crop: [CropRect; MAX_OUTPUTS],
    /// Used part of the push buffer.
    pub pushbuffer: Vec<u32>,
}

impl IspProgram {
    /// Empty program for `isp_type`.
    #[must_use]
    pub fn new(isp_type: IspType) -> Self {
        Self {
            isp_type,
            xbsrc: [0; 4],
            enables_config: 0,
            afm_ctrl: 0,
            stats_aidx_flag: 0,
            ds_pixel_incr_h: [0; 3],
            overfetch: Overfetch::default(),
            mw_crop: [CropRect::default(); MAX_OUTPUTS],
            pushbuffer: Vec::new(),
        }
    }

    /// Statistics surface layout this program's ISP generation writes.
    #[must_use]
    pub const fn stats_layout(&self) -> StatsLayout {
        self.isp_type.stats_layout()
    }

    /// Check the magic and version of a program buffer.
    ///
    /// Only the first eight bytes are read.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` below eight bytes; `UnsupportedVersion` on any
    /// magic or version other than the supported pair.
    pub fn check_header(bytes: &[u8]) -> Result<()> {
        let mut rd = wire::record(bytes, off::STRUCT_ID, off::ISP_TYPE, "isp5_program")?;
        let id = rd.get_u32_le();
        let version = rd.get_u16_le();
        if id != PROGRAM_STRUCT_ID || version != PROGRAM_STRUCT_VERSION {
            error!(
                "Rejecting ISP program: id {id:#010x} version {version}, \
                 expected {PROGRAM_STRUCT_ID:#010x} version {PROGRAM_STRUCT_VERSION}"
            );
            return Err(CaptureError::UnsupportedVersion {
                record: "isp5_program",
                found_id: id,
                found_version: version,
                expected_id: PROGRAM_STRUCT_ID,
                expected_version: PROGRAM_STRUCT_VERSION,
            });
        }
        Ok(())
    }

    /// Decode a program buffer, checking its header first.
    ///
    /// # Errors
    ///
    /// - `UnsupportedVersion` from [`check_header`](Self::check_header);
    ///   nothing past the version is read in that case
    /// - `UnsupportedIspType` for an unknown ISP generation
    /// - `ConfigurationInvalid` if the push buffer fill exceeds capacity
    /// - `LayoutMismatch` if the buffer ends before the used push buffer
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::check_header(bytes)?;

        let mut rd = wire::record(bytes, off::ISP_TYPE, off::HEADER_SIZE - off::ISP_TYPE, "isp5_program")?;
        let raw_type = rd.get_u16_le();
        let isp_type = IspType::from_raw(raw_type).ok_or(CaptureError::UnsupportedIspType { raw: raw_type })?;

        let mut xbsrc = [0u32; 4];
        for x in &mut xbsrc {
            *x = rd.get_u32_le();
        }
        let enables_config = rd.get_u32_le();
        let afm_ctrl = rd.get_u32_le();
        let stats_aidx_flag = rd.get_u32_le();
        let words = rd.get_u32_le() as usize;
        validate::at_most("pushbuffer_size", words as u64, PUSHBUFFER_WORDS as u64)?;

        let mut ds_pixel_incr_h = [0u32; 3];
        for d in &mut ds_pixel_incr_h {
            *d = rd.get_u32_le();
        }
        let overfetch = Overfetch {
            left: rd.get_u8(),
            right: rd.get_u8(),
            top: rd.get_u8(),
            bottom: rd.get_u8(),
            pru_ovf_h: rd.get_u8(),
            alignment: rd.get_u8(),
        };
        rd.advance(2);
        let mut mw_crop = [CropRect::default(); MAX_OUTPUTS];
        for c in &mut mw_crop {
            *c = CropRect {
                top: rd.get_u16_le(),
                bottom: rd.get_u16_le(),
                left: rd.get_u16_le(),
                right: rd.get_u16_le(),
            };
        }

        let mut pb = wire::record(bytes, off::PUSHBUFFER, words * 4, "isp5_program")?;
        let pushbuffer = (0..words).map(|_| pb.get_u32_le()).collect();

        Ok(Self {
            isp_type,
            xbsrc,
            enables_config,
            afm_ctrl,
            stats_aidx_flag,
            ds_pixel_incr_h,
            overfetch,
            mw_crop,
            pushbuffer,
        })
    }

    /// Encode the full 16512-byte record.
    ///
    /// # Errors
    ///
    /// `ConfigurationInvalid` if the push buffer exceeds capacity.
    pub fn encode(&self) -> Result<Bytes> {
        validate::at_most("pushbuffer_size", self.pushbuffer.len() as u64, PUSHBUFFER_WORDS as u64)?;
        let mut buf = BytesMut::with_capacity(PROGRAM_MAX_SIZE);
        buf.put_u32_le(PROGRAM_STRUCT_ID);
        buf.put_u16_le(PROGRAM_STRUCT_VERSION);
        buf.put_u16_le(self.isp_type.raw());
        for x in self.xbsrc {
            buf.put_u32_le(x);
        }
        buf.put_u32_le(self.enables_config);
        buf.put_u32_le(self.afm_ctrl);
        buf.put_u32_le(self.stats_aidx_flag);
        buf.put_u32_le(self.pushbuffer.len() as u32);
        for d in self.ds_pixel_incr_h {
            buf.put_u32_le(d);
        }
        let o = &self.overfetch;
        buf.put_slice(&[o.left, o.right, o.top, o.bottom, o.pru_ovf_h, o.alignment, 0, 0]);
        for c in &self.mw_crop {
            buf.put_u16_le(c.top);
            buf.put_u16_le(c.bottom);
            buf.put_u16_le(c.left);
            buf.put_u16_le(c.right);
        }
        buf.put_bytes(0, off::PUSHBUFFER - off::RESERVED);
        for w in &self.pushbuffer {
            buf.put_u32_le(*w);
        }
        buf.put_bytes(0, (PUSHBUFFER_WORDS - self.pushbuffer.len()) * 4);
        wire::finish(buf, PROGRAM_MAX_SIZE, "isp5_program")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::IspErrorMask;

    fn program() -> IspProgram {
        let mut p = IspProgram::new(IspType::Isp7);
        p.xbsrc = [1, 2, 3, 4];
        p.stats_aidx_flag = 0x3;
        p.overfetch.left = 8;
        p.mw_crop[0] = CropRect { top: 0, bottom: 1079, left: 0, right: 1919 };
        p.pushbuffer = vec![0xCAFE_0001, 0xCAFE_0002, 0xCAFE_0003];
        p
    }

    #[test]
    fn program_encodes_to_full_size_and_back() {
        let bytes = program().encode().unwrap();
        assert_eq!(bytes.len(), PROGRAM_MAX_SIZE);
        assert_eq!(&bytes[..4], b"ISPP");
        assert_eq!(&bytes[off::PUSHBUFFER_SIZE..off::PUSHBUFFER_SIZE + 4], &3u32.to_le_bytes());
        assert_eq!(&bytes[off::PUSHBUFFER..off::PUSHBUFFER + 4], &0xCAFE_0001u32.to_le_bytes());
        assert_eq!(IspProgram::decode(&bytes).unwrap(), program());
    }

    #[test]
    fn wrong_magic_fails_closed() {
        let mut bytes = program().encode().unwrap().to_vec();
        bytes[0] ^= 0xFF;
        assert!(matches!(
            IspProgram::decode(&bytes),
            Err(CaptureError::UnsupportedVersion { expected_version: 3, .. })
        ));
    }

    #[test]
    fn wrong_version_fails_before_reading_payload() {
        // Version 4 with a header truncated right after it: the version
        // error wins because nothing else is read.
        let mut bytes = vec![0u8; 8];
        bytes[..4].copy_from_slice(&PROGRAM_STRUCT_ID.to_le_bytes());
        bytes[4..6].copy_from_slice(&4u16.to_le_bytes());
        assert_eq!(
            IspProgram::decode(&bytes),
            Err(CaptureError::UnsupportedVersion {
                record: "isp5_program",
                found_id: PROGRAM_STRUCT_ID,
                found_version: 4,
                expected_id: PROGRAM_STRUCT_ID,
                expected_version: PROGRAM_STRUCT_VERSION,
            })
        );
    }

    #[test]
    fn unknown_isp_type() {
        let mut bytes = program().encode().unwrap().to_vec();
        bytes[off::ISP_TYPE] = 9;
        assert_eq!(IspProgram::decode(&bytes), Err(CaptureError::UnsupportedIspType { raw: 9 }));
    }

    #[test]
    fn pushbuffer_fill_over_capacity() {
        let mut bytes = program().encode().unwrap().to_vec();
        bytes[off::PUSHBUFFER_SIZE..off::PUSHBUFFER_SIZE + 4].copy_from_slice(&4097u32.to_le_bytes());
        assert!(matches!(IspProgram::decode(&bytes), Err(CaptureError::ConfigurationInvalid(_))));
    }

    #[test]
    fn header_only_buffer_with_empty_pushbuffer() {
        let bytes = IspProgram::new(IspType::Isp5).encode().unwrap();
        let p = IspProgram::decode(&bytes[..off::HEADER_SIZE]).unwrap();
        assert!(p.pushbuffer.is_empty());
        assert_eq!(p.stats_layout(), StatsLayout::ISP5);
    }

    #[test]
    fn descriptor_round_trip_and_binding() {
        let d = ProgramDescriptor {
            settings_id: 7,
            vi_channel_id: Some(2),
            sequence: 100,
            isp_pb1_mem: 0x7000_0040,
            stats_buffer_id: 11,
            program_buffer_id: 12,
            activate_flags: ActivateFlags::ON_SEQUENCE_ID,
            ..ProgramDescriptor::default()
        };
        let bytes = d.encode().unwrap();
        assert_eq!(bytes.len(), desc::SIZE);
        assert_eq!(bytes[desc::VI_CHANNEL_ID], 2);
        assert_eq!(ProgramDescriptor::decode(&bytes).unwrap(), d);

        let m2m = ProgramDescriptor::default().encode().unwrap();
        assert_eq!(m2m[desc::VI_CHANNEL_ID], desc::NO_VI_BINDING);
        assert_eq!(ProgramDescriptor::decode(&m2m).unwrap().vi_channel_id, None);
    }

    #[test]
    fn descriptor_reads_program_status() {
        let mut d = ProgramDescriptor::default();
        d.program_status = Some(IspProgramStatus {
            chan_id: 0,
            settings_id: 7,
            status: IspProgramStatusCode::Error,
            error_mask: IspErrorMask::DMA_PBUF_ERR,
        });
        let bytes = d.encode().unwrap();
        assert_eq!(ProgramDescriptor::decode(&bytes).unwrap().program_status, d.program_status);
    }

    #[test]
    fn descriptor_rules() {
        let d = ProgramDescriptor { isp_program_offset: 32, ..ProgramDescriptor::default() };
        assert!(d.validate().is_err());
        let d = ProgramDescriptor { isp_pb1_mem: 0x7000_0010, ..ProgramDescriptor::default() };
        assert!(d.validate().is_err());
        let d = ProgramDescriptor { isp_program_size: 16513, ..ProgramDescriptor::default() };
        assert_eq!(
            d.validate(),
            Err(CaptureError::ConfigurationInvalid(ConfigViolation::FieldOutOfRange {
                field: "isp_program_size",
                value: 16513,
                max: PROGRAM_MAX_SIZE as u64,
            }))
        );
        let d = ProgramDescriptor { isp_program_size: PROGRAM_MAX_SIZE as u32, ..ProgramDescriptor::default() };
        assert!(d.validate().is_ok());
        let d = ProgramDescriptor { isp_program_size: 0, ..ProgramDescriptor::default() };
        assert!(d.validate().is_err());
    }
}
