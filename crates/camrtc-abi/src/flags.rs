//! Flag words and unit identifiers.
//!
//! Raw bit values as they appear on the wire. The capture crate wraps
//! these in typed flag sets; they are kept here as plain constants so
//! that the ABI model stays dependency-free.

// ── Capture channel resource flags (capture_channel_config::channel_flags) ──

pub mod channel {
    /// Channel takes input from VI.
    pub const VIDEO: u32 = 0x0001;
    /// RAW Bayer output.
    pub const RAW: u32 = 0x0002;
    /// Planar YUV output.
    pub const PLANAR: u32 = 0x0004;
    /// Semi-planar YUV output.
    pub const SEMI_PLANAR: u32 = 0x0008;
    /// Phase-detection auto-focus.
    pub const PDAF: u32 = 0x0010;
    /// Sensor embedded data output.
    pub const EMBDATA: u32 = 0x0040;
    /// Output to ISPA. Deprecated.
    pub const ISPA: u32 = 0x0080;
    /// Output to ISPB. Deprecated.
    pub const ISPB: u32 = 0x0100;
    /// Direct ISP output (ISO mode). Deprecated.
    pub const ISP_DIRECT: u32 = 0x0200;
    /// Software ISP output. Reserved.
    pub const ISPSW: u32 = 0x0400;
    /// All errors are stop-on-error; recovery needs a reset.
    pub const RESET_ON_ERROR: u32 = 0x0800;
    /// Line timer enabled.
    pub const LINETIMER: u32 = 0x1000;
    /// SLVS-EC sensor.
    pub const SLVSEC: u32 = 0x2000;
    /// Report errors to the system error handler using the HSM masks.
    pub const ENABLE_HSM_ERROR_MASKS: u32 = 0x4000;
    /// Permanent-fault software diagnostics.
    pub const ENABLE_VI_PFSD: u32 = 0x8000;
    /// Bind to a CSI stream and virtual channel.
    pub const CSI: u32 = 0x1_0000;
}

// ── VI channel error numbers (HSM error masks) ───────────────────────────────

pub mod channel_error {
    pub const PIXEL_MISSING_LE: u32 = 1 << 5;
    pub const PIXEL_RUNAWAY: u32 = 1 << 6;
    pub const PIXEL_SPURIOUS: u32 = 1 << 7;
    pub const PIXEL_LONG_LINE: u32 = 1 << 8;
    pub const PIXEL_SHORT_LINE: u32 = 1 << 9;
    pub const EMBED_MISSING_LE: u32 = 1 << 10;
    pub const EMBED_RUNAWAY: u32 = 1 << 11;
    pub const EMBED_SPURIOUS: u32 = 1 << 12;
    pub const EMBED_LONG_LINE: u32 = 1 << 13;
    pub const EMBED_INFRINGE: u32 = 1 << 14;
    pub const DTYPE_MISMATCH: u32 = 1 << 15;
    pub const LOAD_FRAMED: u32 = 1 << 16;
    pub const FORCE_FE: u32 = 1 << 17;
    pub const COLLISION: u32 = 1 << 18;
    pub const STALE_FRAME: u32 = 1 << 19;
    pub const INCOMPLETE: u32 = 1 << 20;
    pub const EMBED_INCOMPLETE: u32 = 1 << 21;
    pub const VI_PFSD_FAULT: u32 = 1 << 22;
    pub const VI_FRAME_START_TIMEOUT: u32 = 1 << 23;
}

// ── Capture request flags (capture_descriptor::capture_flags) ────────────────

pub mod capture {
    /// Enable status and error reporting.
    pub const STATUS_REPORT_ENABLE: u32 = 1 << 0;
    /// Enable error reporting only.
    pub const ERROR_REPORT_ENABLE: u32 = 1 << 1;
}

// ── vi_channel_config flag bitfield (13 used bits, LSB first) ────────────────

pub mod vi_channel {
    pub const DT_ENABLE: u32 = 1 << 0;
    pub const EMBDATA_ENABLE: u32 = 1 << 1;
    pub const FLUSH_ENABLE: u32 = 1 << 2;
    pub const FLUSH_PERIODIC: u32 = 1 << 3;
    pub const LINE_TIMER_ENABLE: u32 = 1 << 4;
    pub const LINE_TIMER_PERIODIC: u32 = 1 << 5;
    pub const PIXFMT_ENABLE: u32 = 1 << 6;
    pub const PIXFMT_WIDE_ENABLE: u32 = 1 << 7;
    pub const PIXFMT_WIDE_ENDIAN: u32 = 1 << 8;
    pub const PIXFMT_PDAF_REPLACE_ENABLE: u32 = 1 << 9;
    /// Deprecated.
    pub const ISPBUFA_ENABLE: u32 = 1 << 10;
    /// Deprecated.
    pub const ISPBUFB_ENABLE: u32 = 1 << 11;
    pub const COMPAND_ENABLE: u32 = 1 << 12;
    /// Mask of every defined bit; the remaining 19 are reserved.
    pub const DEFINED: u32 = (1 << 13) - 1;
}

// ── Capture status flags (capture_status::flags) ─────────────────────────────

pub mod status {
    /// Channel hit an unrecoverable error and must be reset.
    pub const CHANNEL_IN_ERROR: u32 = 1 << 1;
}

// ── ISP flags ────────────────────────────────────────────────────────────────

pub mod isp_channel {
    /// Treat every error as stop-on-error.
    pub const RESET_ON_ERROR: u32 = 0x0001;
}

pub mod isp_process {
    pub const STATUS_REPORT_ENABLE: u32 = 1 << 0;
    pub const ERROR_REPORT_ENABLE: u32 = 1 << 1;
    pub const ISP_PROGRAM_BINDING: u32 = 1 << 2;
}

pub mod isp_error {
    pub const DMA_PBUF_ERR: u32 = 1 << 0;
    pub const DMA_SBUF_ERR: u32 = 1 << 1;
    pub const DMA_SEQ_ERR: u32 = 1 << 2;
    pub const FRAMEID_ERR: u32 = 1 << 3;
    pub const TIMEOUT: u32 = 1 << 4;
    pub const TASK_TIMEOUT: u32 = 1 << 5;
    pub const ALL: u32 = 0x003F;
}

pub mod isp_activate {
    /// Activate when the frame sequence id reaches the threshold.
    pub const ON_SEQUENCE_ID: u32 = 0x1;
    /// Activate when the settings id reaches the threshold.
    pub const ON_SETTINGS_ID: u32 = 0x2;
    /// Each process request is coupled with a program request.
    pub const COUPLED: u32 = 0x4;
}

// ── Unit identifiers ─────────────────────────────────────────────────────────

pub mod unit {
    pub const VI: u32 = 0;
    pub const VI2: u32 = 1;
    pub const ISP: u32 = 0;
    pub const ISP2: u32 = 1;
}

// ── VI DPCM modes ────────────────────────────────────────────────────────────

pub mod dpcm {
    pub const RAW10: u8 = 0;
    pub const RAW12: u8 = 1;
    pub const RLE_RAW10: u8 = 2;
    pub const RLE_RAW12: u8 = 3;
    pub const RAW16: u8 = 4;
    pub const RAW20: u8 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_flags_are_distinct_bits() {
        let all = [
            channel::VIDEO,
            channel::RAW,
            channel::PLANAR,
            channel::SEMI_PLANAR,
            channel::PDAF,
            channel::EMBDATA,
            channel::ISPA,
            channel::ISPB,
            channel::ISP_DIRECT,
            channel::ISPSW,
            channel::RESET_ON_ERROR,
            channel::LINETIMER,
            channel::SLVSEC,
            channel::ENABLE_HSM_ERROR_MASKS,
            channel::ENABLE_VI_PFSD,
            channel::CSI,
        ];
        let mut seen = 0u32;
        for bit in all {
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0);
            seen |= bit;
        }
    }

    #[test]
    fn vi_channel_defined_mask_covers_compand() {
        assert_ne!(vi_channel::DEFINED & vi_channel::COMPAND_ENABLE, 0);
        assert_eq!(vi_channel::DEFINED >> 13, 0);
    }
}
