//! ISP channel configuration and ISP status records.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use camrtc_abi::flags::unit;
use camrtc_abi::isp::PROGRAM_MAX_SIZE;
use camrtc_abi::layout::{self, isp_channel_config as off, isp_status};
use camrtc_abi::status::{IspProgramStatusCode, IspStatusCode};
use tracing::debug;

use crate::config::{Iova, QueueDepth};
use crate::flags::{IspChannelFlags, IspErrorMask};
use crate::syncpoint::SyncpointInfo;
use crate::{validate, wire, CaptureError, Result};

/// Smallest program ring slot: a program descriptor followed by its
/// program buffer.
pub const MIN_PROGRAM_SIZE: u32 = (layout::program_descriptor::SIZE + PROGRAM_MAX_SIZE) as u32;

/// `capture_channel_isp_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IspChannelConfig {
    flags: IspChannelFlags,
    requests: Iova,
    request_queue_depth: QueueDepth,
    request_size: u32,
    programs: Iova,
    program_queue_depth: QueueDepth,
    program_size: u32,
    progress_sp: SyncpointInfo,
    stats_progress_sp: SyncpointInfo,
    requests_memoryinfo: Iova,
    programs_memoryinfo: Iova,
    request_memoryinfo_size: u32,
    program_memoryinfo_size: u32,
    isp_unit_id: u32,
    isp_gos_tables: Vec<Iova>,
}

impl IspChannelConfig {
    #[must_use]
    pub fn builder() -> IspChannelConfigBuilder {
        IspChannelConfigBuilder::default()
    }

    #[must_use]
    pub const fn flags(&self) -> IspChannelFlags {
        self.flags
    }

    #[must_use]
    pub const fn requests(&self) -> Iova {
        self.requests
    }

    #[must_use]
    pub const fn request_queue_depth(&self) -> QueueDepth {
        self.request_queue_depth
    }

    #[must_use]
    pub const fn request_size(&self) -> u32 {
        self.request_size
    }

    #[must_use]
    pub const fn programs(&self) -> Iova {
        self.programs
    }

    #[must_use]
    pub const fn program_queue_depth(&self) -> QueueDepth {
        self.program_queue_depth
    }

    #[must_use]
    pub const fn program_size(&self) -> u32 {
        self.program_size
    }

    #[must_use]
    pub const fn progress_sp(&self) -> &SyncpointInfo {
        &self.progress_sp
    }

    #[must_use]
    pub const fn stats_progress_sp(&self) -> &SyncpointInfo {
        &self.stats_progress_sp
    }

    #[must_use]
    pub const fn isp_unit_id(&self) -> u32 {
        self.isp_unit_id
    }

    #[must_use]
    pub fn isp_gos_tables(&self) -> &[Iova] {
        &self.isp_gos_tables
    }

    /// Serialize into the 184-byte ISP channel setup payload.
    ///
    /// # Errors
    ///
    /// Only on an internal layout mismatch.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(off::SIZE);
        buf.put_u32_le(0); // channel_id (deprecated) + pad
        buf.put_u32_le(self.flags.bits());
        buf.put_u64_le(self.requests.get());
        buf.put_u32_le(self.request_queue_depth.get());
        buf.put_u32_le(self.request_size);
        buf.put_u64_le(self.programs.get());
        buf.put_u32_le(self.program_queue_depth.get());
        buf.put_u32_le(self.program_size);
        self.progress_sp.put(&mut buf);
        self.stats_progress_sp.put(&mut buf);
        buf.put_u64_le(self.requests_memoryinfo.get());
        buf.put_u64_le(self.programs_memoryinfo.get());
        buf.put_u32_le(self.request_memoryinfo_size);
        buf.put_u32_le(self.program_memoryinfo_size);
        buf.put_u32_le(self.isp_unit_id);
        buf.put_u32_le(self.isp_gos_tables.len() as u32);
        for slot in 0..layout::ISP_NUM_GOS_TABLES {
            buf.put_u64_le(self.isp_gos_tables.get(slot).map_or(0, |t| t.get()));
        }
        wire::finish(buf, off::SIZE, "capture_channel_isp_config")
    }

    /// Parse an ISP channel setup payload and re-run validation.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` on short input, `ConfigurationInvalid` for any
    /// broken rule.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut rd = wire::record(bytes, 0, off::SIZE, "capture_channel_isp_config")?;
        rd.advance(4);
        let mut b = IspChannelConfigBuilder {
            flags: IspChannelFlags::from_bits_retain(rd.get_u32_le()),
            requests: rd.get_u64_le(),
            request_queue_depth: rd.get_u32_le(),
            request_size: rd.get_u32_le(),
            programs: rd.get_u64_le(),
            program_queue_depth: rd.get_u32_le(),
            program_size: rd.get_u32_le(),
            progress_sp: SyncpointInfo::get(&mut rd)?,
            stats_progress_sp: SyncpointInfo::get(&mut rd)?,
            requests_memoryinfo: rd.get_u64_le(),
            programs_memoryinfo: rd.get_u64_le(),
            request_memoryinfo_size: rd.get_u32_le(),
            program_memoryinfo_size: rd.get_u32_le(),
            isp_unit_id: rd.get_u32_le(),
            isp_gos_tables: Vec::new(),
        };
        let count = rd.get_u32_le() as usize;
        validate::at_most("num_isp_gos_tables", count as u64, layout::ISP_NUM_GOS_TABLES as u64)?;
        for slot in 0..layout::ISP_NUM_GOS_TABLES {
            let table = rd.get_u64_le();
            if slot < count {
                b.isp_gos_tables.push(table);
            }
        }
        b.build()
    }
}

/// Builder for [`IspChannelConfig`].
#[derive(Debug, Clone)]
pub struct IspChannelConfigBuilder {
    flags: IspChannelFlags,
    requests: u64,
    request_queue_depth: u32,
    request_size: u32,
    programs: u64,
    program_queue_depth: u32,
    program_size: u32,
    progress_sp: SyncpointInfo,
    stats_progress_sp: SyncpointInfo,
    requests_memoryinfo: u64,
    programs_memoryinfo: u64,
    request_memoryinfo_size: u32,
    program_memoryinfo_size: u32,
    isp_unit_id: u32,
    isp_gos_tables: Vec<u64>,
}

impl Default for IspChannelConfigBuilder {
    fn default() -> Self {
        Self {
            flags: IspChannelFlags::empty(),
            requests: 0,
            request_queue_depth: 0,
            request_size: 0,
            programs: 0,
            program_queue_depth: 0,
            program_size: MIN_PROGRAM_SIZE,
            progress_sp: SyncpointInfo::UNUSED,
            stats_progress_sp: SyncpointInfo::UNUSED,
            requests_memoryinfo: 0,
            programs_memoryinfo: 0,
            request_memoryinfo_size: 0,
            program_memoryinfo_size: layout::DESCRIPTOR_ALIGN as u32,
            isp_unit_id: unit::ISP,
            isp_gos_tables: Vec::new(),
        }
    }
}

impl IspChannelConfigBuilder {
    #[must_use]
    pub fn flags(mut self, flags: IspChannelFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Process request ring: base IOVA, depth and slot size.
    #[must_use]
    pub const fn requests(mut self, iova: u64, depth: u32, size: u32) -> Self {
        self.requests = iova;
        self.request_queue_depth = depth;
        self.request_size = size;
        self
    }

    /// Program ring: base IOVA, depth and slot size.
    #[must_use]
    pub const fn programs(mut self, iova: u64, depth: u32, size: u32) -> Self {
        self.programs = iova;
        self.program_queue_depth = depth;
        self.program_size = size;
        self
    }

    /// Memory-info rings for requests and programs.
    #[must_use]
    pub const fn memoryinfo(mut self, requests: u64, request_size: u32, programs: u64, program_size: u32) -> Self {
        self.requests_memoryinfo = requests;
        self.request_memoryinfo_size = request_size;
        self.programs_memoryinfo = programs;
        self.program_memoryinfo_size = program_size;
        self
    }

    #[must_use]
    pub const fn progress_sp(mut self, sp: SyncpointInfo) -> Self {
        self.progress_sp = sp;
        self
    }

    #[must_use]
    pub const fn stats_progress_sp(mut self, sp: SyncpointInfo) -> Self {
        self.stats_progress_sp = sp;
        self
    }

    #[must_use]
    pub const fn isp_unit_id(mut self, id: u32) -> Self {
        self.isp_unit_id = id;
        self
    }

    #[must_use]
    pub fn isp_gos_table(mut self, iova: u64) -> Self {
        self.isp_gos_tables.push(iova);
        self
    }

    /// Run every rule and produce the configuration.
    ///
    /// # Errors
    ///
    /// The first broken rule, as `ConfigurationInvalid`.
    pub fn build(self) -> Result<IspChannelConfig> {
        validate::ring_base("requests", self.requests)?;
        let request_queue_depth = QueueDepth::new(self.request_queue_depth)?;
        validate::entry_size("request_size", self.request_size, layout::DESCRIPTOR_ALIGN)?;

        validate::ring_base("programs", self.programs)?;
        let program_queue_depth = QueueDepth::programs(self.program_queue_depth)?;
        validate::entry_size("program_size", self.program_size, MIN_PROGRAM_SIZE as usize)?;

        validate::ring_base("requests_memoryinfo", self.requests_memoryinfo)?;
        validate::ring_base("programs_memoryinfo", self.programs_memoryinfo)?;
        validate::entry_size("request_memoryinfo_size", self.request_memoryinfo_size, layout::DESCRIPTOR_ALIGN)?;
        validate::entry_size(
            "program_memoryinfo_size",
            self.program_memoryinfo_size,
            layout::memoryinfo::SURFACE_SIZE,
        )?;

        validate::ring_bytes("request ring", request_queue_depth.get(), self.request_size)?;
        validate::ring_bytes("program ring", program_queue_depth.get(), self.program_size)?;
        validate::ring_bytes("request memoryinfo ring", request_queue_depth.get(), self.request_memoryinfo_size)?;
        validate::ring_bytes("program memoryinfo ring", program_queue_depth.get(), self.program_memoryinfo_size)?;

        validate::at_most("isp_unit_id", self.isp_unit_id.into(), unit::ISP2.into())?;
        validate::gos_tables("isp_gos_tables", &self.isp_gos_tables, layout::ISP_NUM_GOS_TABLES)?;

        debug!(
            "ISP channel config ok: {} requests x {} B, {} programs x {} B",
            request_queue_depth.get(),
            self.request_size,
            program_queue_depth.get(),
            self.program_size
        );

        Ok(IspChannelConfig {
            flags: self.flags,
            requests: Iova::new(self.requests),
            request_queue_depth,
            request_size: self.request_size,
            programs: Iova::new(self.programs),
            program_queue_depth,
            program_size: self.program_size,
            progress_sp: self.progress_sp,
            stats_progress_sp: self.stats_progress_sp,
            requests_memoryinfo: Iova::new(self.requests_memoryinfo),
            programs_memoryinfo: Iova::new(self.programs_memoryinfo),
            request_memoryinfo_size: self.request_memoryinfo_size,
            program_memoryinfo_size: self.program_memoryinfo_size,
            isp_unit_id: self.isp_unit_id,
            isp_gos_tables: self.isp_gos_tables.into_iter().map(Iova::new).collect(),
        })
    }
}

// ── Status ───────────────────────────────────────────────────────────────────

/// `capture_isp_status`: result of one ISP process request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspStatus {
    pub chan_id: u8,
    pub frame_id: u16,
    pub status: IspStatusCode,
    pub error_mask: IspErrorMask,
}

impl IspStatus {
    /// Decode a 16-byte record.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` or `InvalidStatusCode`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut rd = wire::record(bytes, 0, isp_status::SIZE, "capture_isp_status")?;
        let chan_id = rd.get_u8();
        rd.advance(1);
        let frame_id = rd.get_u16_le();
        let raw = rd.get_u32_le();
        let status = IspStatusCode::from_raw(raw).ok_or_else(|| CaptureError::invalid_status("capture_isp_status", raw))?;
        Ok(Self {
            chan_id,
            frame_id,
            status,
            error_mask: IspErrorMask::from_bits_retain(rd.get_u32_le()),
        })
    }

    /// Require a final status for request `sequence`.
    ///
    /// # Errors
    ///
    /// `NotReady` while the status is `UNKNOWN`.
    pub fn require_final(self, sequence: u32) -> Result<Self> {
        match self.status {
            IspStatusCode::Unknown => Err(CaptureError::NotReady { sequence }),
            _ => Ok(self),
        }
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.chan_id);
        buf.put_u8(0);
        buf.put_u16_le(self.frame_id);
        buf.put_u32_le(self.status as u32);
        buf.put_u32_le(self.error_mask.bits());
        buf.put_u32_le(0);
    }
}

/// `capture_isp_program_status`: result of the last request that used a
/// program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspProgramStatus {
    pub chan_id: u8,
    pub settings_id: u8,
    pub status: IspProgramStatusCode,
    pub error_mask: IspErrorMask,
}

impl IspProgramStatus {
    /// Decode a 16-byte record.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` or `InvalidStatusCode`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut rd = wire::record(bytes, 0, isp_status::SIZE, "capture_isp_program_status")?;
        let chan_id = rd.get_u8();
        let settings_id = rd.get_u8();
        rd.advance(2);
        let raw = rd.get_u32_le();
        let status = IspProgramStatusCode::from_raw(raw)
            .ok_or_else(|| CaptureError::invalid_status("capture_isp_program_status", raw))?;
        Ok(Self {
            chan_id,
            settings_id,
            status,
            error_mask: IspErrorMask::from_bits_retain(rd.get_u32_le()),
        })
    }

    /// A stale program is no longer referenced and its slot may be reused.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self.status, IspProgramStatusCode::Stale)
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.chan_id);
        buf.put_u8(self.settings_id);
        buf.put_u16_le(0);
        buf.put_u32_le(self.status as u32);
        buf.put_u32_le(self.error_mask.bits());
        buf.put_u32_le(0);
    }
}
