//! Shared-memory record layout.
//!
//! Sizes and field offsets of every record exchanged through the capture
//! rings. All records are little-endian and free of implicit padding; the
//! firmware header is compiled with `-Werror=padded`, so every reserved
//! word below is an explicit field.
//!
//! ```text
//! Record                          Size  Align  Lives in
//! ─────────────────────────────── ───── ────── ──────────────────────────────
//! syncpoint_info                    24      8  channel config, descriptor
//! capture_channel_config           272      8  CAPTURE_CHANNEL_SETUP_REQ
//! capture_descriptor               384     64  VI request ring (per slot)
//!   └ vi_channel_config            160      8    @ 64
//!   └ vi_pfsd_config                40      8    @ 224
//!   └ capture_status                56      8    @ 272
//! capture_descriptor_memoryinfo    128     64  VI memoryinfo ring (per slot)
//! capture_channel_isp_config       184      8  CAPTURE_CHANNEL_ISP_SETUP_REQ
//! capture_isp_status                16      8  ISP descriptor
//! isp_program_descriptor            64     64  ISP program ring (per slot)
//! isp5_program                   16512     64  follows its program descriptor
//! ```

// ── Alignment ────────────────────────────────────────────────────────────────

/// Alignment of descriptor records in shared memory.
pub const DESCRIPTOR_ALIGN: usize = 64;

/// Alignment of scalar fields carried over IVC.
pub const IVC_ALIGN: usize = 8;

/// GoS table IOVAs must be multiples of this.
pub const GOS_TABLE_ALIGN: u64 = 256;

/// Memory-info surface bases and sizes must be multiples of this.
pub const SURFACE_ALIGN: u64 = 16;

/// Syncpoint shim register addresses must be multiples of this.
pub const SHIM_ADDR_ALIGN: u64 = 4;

/// Round `value` up to the next multiple of `align` (a power of two).
#[must_use]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// True if `value` is a multiple of `align` (a power of two).
#[must_use]
pub const fn is_aligned(value: u64, align: u64) -> bool {
    value & (align - 1) == 0
}

// ── Queue bounds ─────────────────────────────────────────────────────────────

/// Smallest legal request queue depth.
pub const MIN_QUEUE_DEPTH: u32 = 1;
/// Largest legal VI / ISP request queue depth.
pub const MAX_QUEUE_DEPTH: u32 = 240;
/// Largest legal ISP program queue depth.
pub const MAX_PROGRAM_QUEUE_DEPTH: u32 = 32;
/// Largest request or memory-info ring the host will allocate, in bytes.
pub const MAX_RING_BYTES: u64 = 16 << 20;

/// Number of VI Grid-of-Semaphores table pointers in a channel config.
pub const VI_NUM_GOS_TABLES: usize = 12;
/// Number of ISP Grid-of-Semaphores table pointers in an ISP channel config.
pub const ISP_NUM_GOS_TABLES: usize = 8;

/// Output surfaces per VI capture (3 pixel planes + embedded data).
pub const VI_NUM_ATOMP_SURFACES: usize = 4;
/// Verification regions per PFSD configuration.
pub const VI_NUM_PFSD_SURFACES: usize = 2;
/// Deprecated pre-fence slots kept in the descriptor for layout only.
pub const CAPTURE_PREFENCE_ARRAY_SIZE: usize = 2;

/// Minimum size of the engine status surface in bytes.
pub const ENGINE_STATUS_SURFACE_SIZE: u64 = 16;

// ── syncpoint_info ───────────────────────────────────────────────────────────

/// Syncpoint descriptor.
pub mod syncpoint {
    /// Record size.
    pub const SIZE: usize = 24;
    pub const ID: usize = 0;
    pub const THRESHOLD: usize = 4;
    pub const GOS_SID: usize = 8;
    pub const GOS_INDEX: usize = 9;
    pub const GOS_OFFSET: usize = 10;
    pub const SHIM_ADDR: usize = 16;

    /// Syncpoint id meaning "no syncpoint".
    pub const ID_INVALID: u32 = 0;
    /// GoS index meaning "no GoS table".
    pub const GOS_INDEX_INVALID: u8 = 0xFF;
    /// Largest GoS SMMU stream id.
    pub const GOS_SID_MAX: u8 = 127;
    /// Largest semaphore offset within a GoS.
    pub const GOS_OFFSET_MAX: u16 = 63;
}

// ── capture_channel_config ───────────────────────────────────────────────────

/// VI capture channel configuration (channel setup message payload).
pub mod channel_config {
    /// Record size.
    pub const SIZE: usize = 272;
    pub const CHANNEL_FLAGS: usize = 0;
    pub const CHANNEL_ID: usize = 4;
    pub const VI_UNIT_ID: usize = 8;
    pub const VI_CHANNEL_MASK: usize = 16;
    pub const VI2_CHANNEL_MASK: usize = 24;
    /// `csi_stream_config`: stream id, port, virtual channel, pad (4 × u32).
    pub const CSI_STREAM: usize = 32;
    pub const REQUESTS: usize = 48;
    pub const REQUESTS_MEMORYINFO: usize = 56;
    pub const QUEUE_DEPTH: usize = 64;
    pub const REQUEST_SIZE: usize = 68;
    pub const REQUEST_MEMORYINFO_SIZE: usize = 72;
    pub const SLVSEC_STREAM_MAIN: usize = 80;
    pub const SLVSEC_STREAM_SUB: usize = 81;
    pub const NUM_VI_GOS_TABLES: usize = 84;
    pub const VI_GOS_TABLES: usize = 88;
    pub const PROGRESS_SP: usize = 184;
    pub const EMBDATA_SP: usize = 208;
    pub const LINETIMER_SP: usize = 232;
    pub const ERROR_MASK_UNCORRECTABLE: usize = 256;
    pub const ERROR_MASK_CORRECTABLE: usize = 260;
    pub const STOP_ON_ERROR_NOTIFY_BITS: usize = 264;

    /// SLVS-EC stream id meaning "disabled".
    pub const SLVSEC_STREAM_DISABLED: u8 = 0xFF;
}

// ── capture_descriptor ───────────────────────────────────────────────────────

/// VI capture descriptor (one ring slot).
pub mod descriptor {
    /// Record size. Already a multiple of [`super::DESCRIPTOR_ALIGN`].
    pub const SIZE: usize = 384;
    pub const SEQUENCE: usize = 0;
    pub const CAPTURE_FLAGS: usize = 4;
    pub const FRAME_START_TIMEOUT: usize = 8;
    pub const FRAME_COMPLETION_TIMEOUT: usize = 10;
    /// Deprecated; always written as zero.
    pub const PREFENCE_COUNT: usize = 12;
    /// Deprecated; always written as zero.
    pub const PREFENCE: usize = 16;
    pub const VI_CHANNEL_CONFIG: usize = 64;
    pub const PFSD_CONFIG: usize = 224;
    pub const ENGINE_STATUS: usize = 264;
    pub const STATUS: usize = 272;
    pub const OUTPUT_BUFFER_ID: usize = 328;
    pub const WATERMARK_OFFSET: usize = 336;
    pub const RESERVED: usize = 344;
}

/// `vi_channel_config` embedded in the descriptor.
pub mod vi_channel {
    /// Record size.
    pub const SIZE: usize = 160;
    pub const FLAGS: usize = 0;
    pub const MATCH: usize = 4;
    pub const DOL_HEADER_SEL: usize = 20;
    pub const DT_OVERRIDE: usize = 21;
    pub const DPCM_MODE: usize = 22;
    pub const FRAME: usize = 24;
    pub const FLUSH: usize = 44;
    pub const LINE_TIMER: usize = 48;
    pub const PIXFMT: usize = 52;
    pub const DPCM: usize = 80;
    pub const ATOMP: usize = 104;
}

/// `vi_pfsd_config` embedded in the descriptor.
pub mod pfsd {
    /// Record size.
    pub const SIZE: usize = 40;
    pub const REPLACE_ROI: usize = 0;
    pub const REPLACE_VALUE: usize = 8;
    pub const EXPECTED_COUNT: usize = 12;
    pub const EXPECTED: usize = 16;
    /// Size of one expected-value region.
    pub const EXPECTED_SIZE: usize = 12;
}

/// `capture_status` embedded in the descriptor.
///
/// Offsets are relative to the status record, not the descriptor.
pub mod status {
    /// Record size.
    pub const SIZE: usize = 56;
    pub const SRC_STREAM: usize = 0;
    pub const VIRTUAL_CHANNEL: usize = 1;
    pub const FRAME_ID: usize = 2;
    pub const STATUS: usize = 4;
    pub const SOF_TIMESTAMP: usize = 8;
    pub const EOF_TIMESTAMP: usize = 16;
    pub const ERR_DATA: usize = 24;
    pub const FLAGS: usize = 28;
    pub const NOTIFY_BITS: usize = 32;
    /// `nvcsi_error_status`: stream, VC, CIL A, CIL B (4 × u32).
    pub const NVCSI_ERR_STATUS: usize = 40;
}

// ── capture_descriptor_memoryinfo ────────────────────────────────────────────

/// Per-request memory information (KMD ↔ RCE only).
pub mod memoryinfo {
    /// Record size.
    pub const SIZE: usize = 128;
    /// `memoryinfo_surface`: base u64, size u64.
    pub const SURFACE_SIZE: usize = 16;
    pub const SURFACES: usize = 0;
    pub const ENGINE_STATUS_BASE: usize = 64;
    pub const ENGINE_STATUS_SIZE: usize = 72;
    pub const WATERMARK_SURFACE: usize = 80;
    pub const RESERVED: usize = 96;
}

// ── ISP records ──────────────────────────────────────────────────────────────

/// ISP capture channel configuration.
pub mod isp_channel_config {
    /// Record size.
    pub const SIZE: usize = 184;
    pub const CHANNEL_ID: usize = 0;
    pub const CHANNEL_FLAGS: usize = 4;
    pub const REQUESTS: usize = 8;
    pub const REQUEST_QUEUE_DEPTH: usize = 16;
    pub const REQUEST_SIZE: usize = 20;
    pub const PROGRAMS: usize = 24;
    pub const PROGRAM_QUEUE_DEPTH: usize = 32;
    pub const PROGRAM_SIZE: usize = 36;
    pub const PROGRESS_SP: usize = 40;
    pub const STATS_PROGRESS_SP: usize = 64;
    pub const REQUESTS_MEMORYINFO: usize = 88;
    pub const PROGRAMS_MEMORYINFO: usize = 96;
    pub const REQUEST_MEMORYINFO_SIZE: usize = 104;
    pub const PROGRAM_MEMORYINFO_SIZE: usize = 108;
    pub const ISP_UNIT_ID: usize = 112;
    pub const NUM_ISP_GOS_TABLES: usize = 116;
    pub const ISP_GOS_TABLES: usize = 120;
}

/// `capture_isp_status` and `capture_isp_program_status` (same shape).
pub mod isp_status {
    /// Record size.
    pub const SIZE: usize = 16;
    pub const CHAN_ID: usize = 0;
    /// `settings_id` (u8), program status only.
    pub const SETTINGS_ID: usize = 1;
    /// `frame_id` (u16), process status only.
    pub const FRAME_ID: usize = 2;
    pub const STATUS: usize = 4;
    pub const ERROR_MASK: usize = 8;
}

/// `isp_program_descriptor`.
pub mod program_descriptor {
    /// Record size.
    pub const SIZE: usize = 64;
    pub const SETTINGS_ID: usize = 0;
    pub const VI_CHANNEL_ID: usize = 1;
    pub const SEQUENCE: usize = 4;
    pub const ISP_PROGRAM_OFFSET: usize = 8;
    pub const ISP_PROGRAM_SIZE: usize = 12;
    pub const ISP_PB1_MEM: usize = 16;
    pub const PROGRAM_STATUS: usize = 24;
    pub const STATS_BUFFER_ID: usize = 40;
    pub const PROGRAM_BUFFER_ID: usize = 48;
    pub const ACTIVATE_FLAGS: usize = 56;

    /// VI channel id meaning "memory-to-memory, no VI binding".
    pub const NO_VI_BINDING: u8 = 0xFF;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_sizes_are_descriptor_aligned() {
        assert_eq!(descriptor::SIZE % DESCRIPTOR_ALIGN, 0);
        assert_eq!(memoryinfo::SIZE % DESCRIPTOR_ALIGN, 0);
        assert_eq!(program_descriptor::SIZE % DESCRIPTOR_ALIGN, 0);
    }

    #[test]
    fn ivc_records_are_ivc_aligned() {
        for size in [
            syncpoint::SIZE,
            channel_config::SIZE,
            vi_channel::SIZE,
            pfsd::SIZE,
            status::SIZE,
            isp_channel_config::SIZE,
            isp_status::SIZE,
        ] {
            assert_eq!(size % IVC_ALIGN, 0, "size {size}");
        }
    }

    #[test]
    fn descriptor_sub_records_tile_without_gaps() {
        assert_eq!(
            descriptor::PREFENCE + CAPTURE_PREFENCE_ARRAY_SIZE * syncpoint::SIZE,
            descriptor::VI_CHANNEL_CONFIG
        );
        assert_eq!(descriptor::VI_CHANNEL_CONFIG + vi_channel::SIZE, descriptor::PFSD_CONFIG);
        assert_eq!(descriptor::PFSD_CONFIG + pfsd::SIZE, descriptor::ENGINE_STATUS);
        assert_eq!(descriptor::ENGINE_STATUS + 8, descriptor::STATUS);
        assert_eq!(descriptor::STATUS + status::SIZE, descriptor::OUTPUT_BUFFER_ID);
        assert_eq!(descriptor::RESERVED + 10 * 4, descriptor::SIZE);
    }

    #[test]
    fn channel_config_tail_lands_on_size() {
        assert_eq!(
            channel_config::VI_GOS_TABLES + VI_NUM_GOS_TABLES * 8,
            channel_config::PROGRESS_SP
        );
        assert_eq!(channel_config::STOP_ON_ERROR_NOTIFY_BITS + 8, channel_config::SIZE);
        assert_eq!(
            isp_channel_config::ISP_GOS_TABLES + ISP_NUM_GOS_TABLES * 8,
            isp_channel_config::SIZE
        );
    }

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_up(1056, 64), 1088);
        assert_eq!(align_up(64, 64), 64);
        assert!(is_aligned(0x1000, 64));
        assert!(!is_aligned(0x1010, 64));
    }
}
