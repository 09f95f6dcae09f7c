//! VI capture channel configuration.
//!
//! Built once per channel through [`ChannelConfig::builder`]; `build()`
//! runs every alignment and sizing rule, so a `ChannelConfig` value is
//! always safe to hand to the coprocessor. Changing it requires a channel
//! reset, which here means building a new one.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use camrtc_abi::flags::unit;
use camrtc_abi::layout::{self, channel_config as off};
use camrtc_abi::notify::NotifyBit;
use tracing::{debug, warn};

use crate::csi::CsiStreamBinding;
use crate::flags::{ChannelErrorMask, ChannelFlags};
use crate::syncpoint::SyncpointInfo;
use crate::{validate, wire, ConfigViolation, Result};

/// Largest VI channel mask (36 hardware channels).
pub const VI_CHANNEL_MASK_MAX: u64 = 0xF_FFFF_FFFF;

// ── Scalars ──────────────────────────────────────────────────────────────────

/// I/O virtual address as seen by the coprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Iova(u64);

impl Iova {
    /// Null address.
    pub const NULL: Self = Self(0);

    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Address that must be non-zero and a multiple of `align`.
    ///
    /// # Errors
    ///
    /// `ZeroAddress` or `Misaligned`.
    pub fn aligned(field: &'static str, addr: u64, align: u64) -> Result<Self> {
        if addr == 0 {
            return Err(ConfigViolation::ZeroAddress { field }.into());
        }
        validate::aligned(field, addr, align)?;
        Ok(Self(addr))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address `bytes` further on.
    #[must_use]
    pub const fn offset(self, bytes: u64) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Display for Iova {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Number of slots in a request ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueDepth(u32);

impl QueueDepth {
    /// Request ring depth, `1..=240`.
    ///
    /// # Errors
    ///
    /// `QueueDepthOutOfRange`.
    pub fn new(depth: u32) -> Result<Self> {
        validate::queue_depth("queue_depth", depth, layout::MAX_QUEUE_DEPTH)?;
        Ok(Self(depth))
    }

    /// ISP program ring depth, `1..=32`.
    ///
    /// # Errors
    ///
    /// `QueueDepthOutOfRange`.
    pub fn programs(depth: u32) -> Result<Self> {
        validate::queue_depth("program_queue_depth", depth, layout::MAX_PROGRAM_QUEUE_DEPTH)?;
        Ok(Self(depth))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn slots(self) -> usize {
        self.0 as usize
    }
}

// ── Channel configuration ────────────────────────────────────────────────────

/// `capture_channel_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    flags: ChannelFlags,
    vi_unit_id: u32,
    vi_channel_mask: u64,
    vi2_channel_mask: u64,
    csi_stream: Option<CsiStreamBinding>,
    requests: Iova,
    requests_memoryinfo: Iova,
    queue_depth: QueueDepth,
    request_size: u32,
    request_memoryinfo_size: u32,
    slvsec_stream_main: u8,
    slvsec_stream_sub: u8,
    vi_gos_tables: Vec<Iova>,
    progress_sp: SyncpointInfo,
    embdata_sp: SyncpointInfo,
    linetimer_sp: SyncpointInfo,
    error_mask_uncorrectable: ChannelErrorMask,
    error_mask_correctable: ChannelErrorMask,
    stop_on_error_notify_bits: u64,
}

impl ChannelConfig {
    /// Start a configuration with descriptor-sized slots and no resources.
    #[must_use]
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::default()
    }

    #[must_use]
    pub const fn flags(&self) -> ChannelFlags {
        self.flags
    }

    #[must_use]
    pub const fn vi_unit_id(&self) -> u32 {
        self.vi_unit_id
    }

    #[must_use]
    pub const fn vi_channel_mask(&self) -> u64 {
        self.vi_channel_mask
    }

    #[must_use]
    pub const fn vi2_channel_mask(&self) -> u64 {
        self.vi2_channel_mask
    }

    #[must_use]
    pub const fn csi_stream(&self) -> Option<CsiStreamBinding> {
        self.csi_stream
    }

    #[must_use]
    pub const fn requests(&self) -> Iova {
        self.requests
    }

    #[must_use]
    pub const fn requests_memoryinfo(&self) -> Iova {
        self.requests_memoryinfo
    }

    #[must_use]
    pub const fn queue_depth(&self) -> QueueDepth {
        self.queue_depth
    }

    #[must_use]
    pub const fn request_size(&self) -> u32 {
        self.request_size
    }

    #[must_use]
    pub const fn request_memoryinfo_size(&self) -> u32 {
        self.request_memoryinfo_size
    }

    #[must_use]
    pub fn vi_gos_tables(&self) -> &[Iova] {
        &self.vi_gos_tables
    }

    #[must_use]
    pub const fn progress_sp(&self) -> &SyncpointInfo {
        &self.progress_sp
    }

    #[must_use]
    pub const fn embdata_sp(&self) -> &SyncpointInfo {
        &self.embdata_sp
    }

    #[must_use]
    pub const fn linetimer_sp(&self) -> &SyncpointInfo {
        &self.linetimer_sp
    }

    #[must_use]
    pub const fn error_mask_uncorrectable(&self) -> ChannelErrorMask {
        self.error_mask_uncorrectable
    }

    #[must_use]
    pub const fn error_mask_correctable(&self) -> ChannelErrorMask {
        self.error_mask_correctable
    }

    /// Raw stop-on-error notify mask.
    #[must_use]
    pub const fn stop_on_error_notify_bits(&self) -> u64 {
        self.stop_on_error_notify_bits
    }

    /// Notify conditions that put the channel into the error state.
    pub fn stop_on_error(&self) -> impl Iterator<Item = NotifyBit> {
        NotifyBit::iter_set(self.stop_on_error_notify_bits)
    }

    /// Bytes of the request ring in shared memory.
    #[must_use]
    pub const fn request_ring_bytes(&self) -> usize {
        self.queue_depth.slots() * self.request_size as usize
    }

    /// Bytes of the memory-info ring in shared memory.
    #[must_use]
    pub const fn memoryinfo_ring_bytes(&self) -> usize {
        self.queue_depth.slots() * self.request_memoryinfo_size as usize
    }

    /// Serialize into the 272-byte channel setup payload.
    ///
    /// # Errors
    ///
    /// Only on an internal layout mismatch.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(off::SIZE);
        buf.put_u32_le(self.flags.bits());
        buf.put_u32_le(0); // channel_id is owned by the coprocessor
        buf.put_u32_le(self.vi_unit_id);
        buf.put_u32_le(0);
        buf.put_u64_le(self.vi_channel_mask);
        buf.put_u64_le(self.vi2_channel_mask);
        match self.csi_stream {
            Some(csi) => {
                buf.put_u32_le(csi.stream().get());
                buf.put_u32_le(csi.port().get());
                buf.put_u32_le(csi.virtual_channel().get());
            }
            None => {
                buf.put_u32_le(0);
                buf.put_u32_le(camrtc_abi::nvcsi::PORT_UNSPECIFIED);
                buf.put_u32_le(0);
            }
        }
        buf.put_u32_le(0);
        buf.put_u64_le(self.requests.get());
        buf.put_u64_le(self.requests_memoryinfo.get());
        buf.put_u32_le(self.queue_depth.get());
        buf.put_u32_le(self.request_size);
        buf.put_u32_le(self.request_memoryinfo_size);
        buf.put_u32_le(0);
        buf.put_u8(self.slvsec_stream_main);
        buf.put_u8(self.slvsec_stream_sub);
        buf.put_u16_le(0);
        buf.put_u32_le(self.vi_gos_tables.len() as u32);
        for slot in 0..layout::VI_NUM_GOS_TABLES {
            buf.put_u64_le(self.vi_gos_tables.get(slot).map_or(0, |t| t.get()));
        }
        self.progress_sp.put(&mut buf);
        self.embdata_sp.put(&mut buf);
        self.linetimer_sp.put(&mut buf);
        buf.put_u32_le(self.error_mask_uncorrectable.bits());
        buf.put_u32_le(self.error_mask_correctable.bits());
        buf.put_u64_le(self.stop_on_error_notify_bits);
        wire::finish(buf, off::SIZE, "capture_channel_config")
    }

    /// Parse a channel setup payload and re-run validation on it.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` on short input, `ConfigurationInvalid` for any
    /// broken rule.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = wire::record(bytes, 0, off::SIZE, "capture_channel_config")?;

        let flags = ChannelFlags::from_bits_retain(buf.get_u32_le());
        buf.advance(4);
        let vi_unit_id = buf.get_u32_le();
        buf.advance(4);
        let vi_channel_mask = buf.get_u64_le();
        let vi2_channel_mask = buf.get_u64_le();
        let (stream, port, vc) = (buf.get_u32_le(), buf.get_u32_le(), buf.get_u32_le());
        buf.advance(4);
        let requests = buf.get_u64_le();
        let requests_memoryinfo = buf.get_u64_le();
        let queue_depth = buf.get_u32_le();
        let request_size = buf.get_u32_le();
        let request_memoryinfo_size = buf.get_u32_le();
        buf.advance(4);
        let slvsec_stream_main = buf.get_u8();
        let slvsec_stream_sub = buf.get_u8();
        buf.advance(2);
        let num_gos = buf.get_u32_le() as usize;
        validate::at_most("num_vi_gos_tables", num_gos as u64, layout::VI_NUM_GOS_TABLES as u64)?;
        let mut gos = Vec::with_capacity(num_gos);
        for slot in 0..layout::VI_NUM_GOS_TABLES {
            let table = buf.get_u64_le();
            if slot < num_gos {
                gos.push(table);
            }
        }
        let progress_sp = SyncpointInfo::get(&mut buf)?;
        let embdata_sp = SyncpointInfo::get(&mut buf)?;
        let linetimer_sp = SyncpointInfo::get(&mut buf)?;
        let error_mask_uncorrectable = ChannelErrorMask::from_bits_retain(buf.get_u32_le());
        let error_mask_correctable = ChannelErrorMask::from_bits_retain(buf.get_u32_le());
        let stop_on_error_notify_bits = buf.get_u64_le();

        let csi_stream = if flags.contains(ChannelFlags::CSI) {
            Some(CsiStreamBinding::from_raw(stream, port, vc)?)
        } else {
            None
        };

        ChannelConfigBuilder {
            flags,
            vi_unit_id,
            vi_channel_mask,
            vi2_channel_mask,
            csi_stream,
            requests,
            requests_memoryinfo,
            queue_depth,
            request_size,
            request_memoryinfo_size,
            slvsec_stream_main,
            slvsec_stream_sub,
            vi_gos_tables: gos,
            progress_sp,
            embdata_sp,
            linetimer_sp,
            error_mask_uncorrectable,
            error_mask_correctable,
            stop_on_error_notify_bits,
        }
        .build()
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Builder for [`ChannelConfig`].
#[derive(Debug, Clone)]
pub struct ChannelConfigBuilder {
    flags: ChannelFlags,
    vi_unit_id: u32,
    vi_channel_mask: u64,
    vi2_channel_mask: u64,
    csi_stream: Option<CsiStreamBinding>,
    requests: u64,
    requests_memoryinfo: u64,
    queue_depth: u32,
    request_size: u32,
    request_memoryinfo_size: u32,
    slvsec_stream_main: u8,
    slvsec_stream_sub: u8,
    vi_gos_tables: Vec<u64>,
    progress_sp: SyncpointInfo,
    embdata_sp: SyncpointInfo,
    linetimer_sp: SyncpointInfo,
    error_mask_uncorrectable: ChannelErrorMask,
    error_mask_correctable: ChannelErrorMask,
    stop_on_error_notify_bits: u64,
}

impl Default for ChannelConfigBuilder {
    fn default() -> Self {
        Self {
            flags: ChannelFlags::empty(),
            vi_unit_id: unit::VI,
            vi_channel_mask: VI_CHANNEL_MASK_MAX,
            vi2_channel_mask: 0,
            csi_stream: None,
            requests: 0,
            requests_memoryinfo: 0,
            queue_depth: 0,
            request_size: layout::descriptor::SIZE as u32,
            request_memoryinfo_size: layout::memoryinfo::SIZE as u32,
            slvsec_stream_main: off::SLVSEC_STREAM_DISABLED,
            slvsec_stream_sub: off::SLVSEC_STREAM_DISABLED,
            vi_gos_tables: Vec::new(),
            progress_sp: SyncpointInfo::UNUSED,
            embdata_sp: SyncpointInfo::UNUSED,
            linetimer_sp: SyncpointInfo::UNUSED,
            error_mask_uncorrectable: ChannelErrorMask::empty(),
            error_mask_correctable: ChannelErrorMask::empty(),
            stop_on_error_notify_bits: 0,
        }
    }
}

impl ChannelConfigBuilder {
    /// Add resource flags.
    #[must_use]
    pub fn flags(mut self, flags: ChannelFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub const fn vi_unit_id(mut self, id: u32) -> Self {
        self.vi_unit_id = id;
        self
    }

    /// VI channels eligible for allocation, LSB is channel 0.
    #[must_use]
    pub const fn vi_channel_mask(mut self, mask: u64) -> Self {
        self.vi_channel_mask = mask;
        self
    }

    #[must_use]
    pub const fn vi2_channel_mask(mut self, mask: u64) -> Self {
        self.vi2_channel_mask = mask;
        self
    }

    /// Bind to a CSI stream; sets [`ChannelFlags::CSI`].
    #[must_use]
    pub fn csi_stream(mut self, binding: CsiStreamBinding) -> Self {
        self.csi_stream = Some(binding);
        self.flags |= ChannelFlags::CSI;
        self
    }

    /// Request ring base address.
    #[must_use]
    pub const fn requests(mut self, iova: u64) -> Self {
        self.requests = iova;
        self
    }

    /// Memory-info ring base address.
    #[must_use]
    pub const fn requests_memoryinfo(mut self, iova: u64) -> Self {
        self.requests_memoryinfo = iova;
        self
    }

    #[must_use]
    pub const fn queue_depth(mut self, depth: u32) -> Self {
        self.queue_depth = depth;
        self
    }

    #[must_use]
    pub const fn request_size(mut self, size: u32) -> Self {
        self.request_size = size;
        self
    }

    #[must_use]
    pub const fn request_memoryinfo_size(mut self, size: u32) -> Self {
        self.request_memoryinfo_size = size;
        self
    }

    /// SLVS-EC main and sub stream; sets [`ChannelFlags::SLVSEC`].
    #[must_use]
    pub fn slvsec_streams(mut self, main: u8, sub: u8) -> Self {
        self.slvsec_stream_main = main;
        self.slvsec_stream_sub = sub;
        self.flags |= ChannelFlags::SLVSEC;
        self
    }

    /// Append a VI Grid-of-Semaphores table.
    #[must_use]
    pub fn vi_gos_table(mut self, iova: u64) -> Self {
        self.vi_gos_tables.push(iova);
        self
    }

    #[must_use]
    pub const fn progress_sp(mut self, sp: SyncpointInfo) -> Self {
        self.progress_sp = sp;
        self
    }

    #[must_use]
    pub const fn embdata_sp(mut self, sp: SyncpointInfo) -> Self {
        self.embdata_sp = sp;
        self
    }

    #[must_use]
    pub const fn linetimer_sp(mut self, sp: SyncpointInfo) -> Self {
        self.linetimer_sp = sp;
        self
    }

    /// HSM error masks; sets [`ChannelFlags::ENABLE_HSM_ERROR_MASKS`].
    #[must_use]
    pub fn error_masks(mut self, uncorrectable: ChannelErrorMask, correctable: ChannelErrorMask) -> Self {
        self.error_mask_uncorrectable = uncorrectable;
        self.error_mask_correctable = correctable;
        self.flags |= ChannelFlags::ENABLE_HSM_ERROR_MASKS;
        self
    }

    /// Enter the channel error state when `bit` is reported.
    #[must_use]
    pub const fn stop_on_error(mut self, bit: NotifyBit) -> Self {
        self.stop_on_error_notify_bits |= bit.mask();
        self
    }

    /// Run every rule and produce the configuration.
    ///
    /// # Errors
    ///
    /// The first [`ConfigViolation`] found, wrapped in
    /// `CaptureError::ConfigurationInvalid`.
    pub fn build(self) -> Result<ChannelConfig> {
        validate::ring_geometry(self.requests, self.request_size)?;
        validate::ring_base("requests_memoryinfo", self.requests_memoryinfo)?;
        let queue_depth = QueueDepth::new(self.queue_depth)?;
        validate::entry_size(
            "request_memoryinfo_size",
            self.request_memoryinfo_size,
            layout::memoryinfo::SIZE,
        )?;
        validate::ring_bytes("request ring", queue_depth.get(), self.request_size)?;
        validate::ring_bytes("memoryinfo ring", queue_depth.get(), self.request_memoryinfo_size)?;
        validate::gos_tables("vi_gos_tables", &self.vi_gos_tables, layout::VI_NUM_GOS_TABLES)?;
        validate::at_most("vi_unit_id", self.vi_unit_id.into(), unit::VI2.into())?;
        validate::at_most("vi_channel_mask", self.vi_channel_mask, VI_CHANNEL_MASK_MAX)?;
        validate::at_most("vi2_channel_mask", self.vi2_channel_mask, VI_CHANNEL_MASK_MAX)?;

        if self.flags.contains(ChannelFlags::CSI) && self.csi_stream.is_none() {
            return Err(ConfigViolation::inconsistent("CSI flag set without a CSI stream binding").into());
        }
        if self.flags.contains(ChannelFlags::SLVSEC)
            && self.slvsec_stream_main == off::SLVSEC_STREAM_DISABLED
        {
            return Err(ConfigViolation::inconsistent("SLVSEC flag set without a main stream").into());
        }
        if self.flags.contains(ChannelFlags::LINETIMER) && !self.linetimer_sp.is_used() {
            return Err(ConfigViolation::inconsistent("LINETIMER flag set without a line timer syncpoint").into());
        }

        let deprecated = self.flags & ChannelFlags::DEPRECATED;
        if !deprecated.is_empty() {
            warn!("channel requests deprecated resources: {deprecated:?}");
        }
        if !self.flags.contains(ChannelFlags::ENABLE_HSM_ERROR_MASKS)
            && !(self.error_mask_uncorrectable | self.error_mask_correctable).is_empty()
        {
            warn!("HSM error masks ignored without ENABLE_HSM_ERROR_MASKS");
        }
        let unknown_stop = self.stop_on_error_notify_bits & !NotifyBit::KNOWN_MASK;
        if unknown_stop != 0 {
            warn!("stop_on_error_notify_bits has uncatalogued bits {unknown_stop:#x}");
        }

        debug!(
            "channel config ok: {} slots x {} B at {:#x}",
            queue_depth.get(),
            self.request_size,
            self.requests
        );

        Ok(ChannelConfig {
            flags: self.flags,
            vi_unit_id: self.vi_unit_id,
            vi_channel_mask: self.vi_channel_mask,
            vi2_channel_mask: self.vi2_channel_mask,
            csi_stream: self.csi_stream,
            requests: Iova::new(self.requests),
            requests_memoryinfo: Iova::new(self.requests_memoryinfo),
            queue_depth,
            request_size: self.request_size,
            request_memoryinfo_size: self.request_memoryinfo_size,
            slvsec_stream_main: self.slvsec_stream_main,
            slvsec_stream_sub: self.slvsec_stream_sub,
            vi_gos_tables: self.vi_gos_tables.into_iter().map(Iova::new).collect(),
            progress_sp: self.progress_sp,
            embdata_sp: self.embdata_sp,
            linetimer_sp: self.linetimer_sp,
            error_mask_uncorrectable: self.error_mask_uncorrectable,
            error_mask_correctable: self.error_mask_correctable,
            stop_on_error_notify_bits: self.stop_on_error_notify_bits,
        })
    }
}
