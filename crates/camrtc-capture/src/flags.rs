//! Typed flag words.

use bitflags::bitflags;
use camrtc_abi::flags;

bitflags! {
    /// Hardware resources a VI capture channel requires.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChannelFlags: u32 {
        const VIDEO = flags::channel::VIDEO;
        const RAW = flags::channel::RAW;
        const PLANAR = flags::channel::PLANAR;
        const SEMI_PLANAR = flags::channel::SEMI_PLANAR;
        const PDAF = flags::channel::PDAF;
        const EMBDATA = flags::channel::EMBDATA;
        const ISPA = flags::channel::ISPA;
        const ISPB = flags::channel::ISPB;
        const ISP_DIRECT = flags::channel::ISP_DIRECT;
        const ISPSW = flags::channel::ISPSW;
        const RESET_ON_ERROR = flags::channel::RESET_ON_ERROR;
        const LINETIMER = flags::channel::LINETIMER;
        const SLVSEC = flags::channel::SLVSEC;
        const ENABLE_HSM_ERROR_MASKS = flags::channel::ENABLE_HSM_ERROR_MASKS;
        const ENABLE_VI_PFSD = flags::channel::ENABLE_VI_PFSD;
        const CSI = flags::channel::CSI;
    }
}

impl ChannelFlags {
    /// Flags the firmware still accepts but no longer acts on.
    pub const DEPRECATED: Self = Self::ISPA
        .union(Self::ISPB)
        .union(Self::ISP_DIRECT)
        .union(Self::ISPSW);
}

bitflags! {
    /// VI channel error numbers for the HSM error masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChannelErrorMask: u32 {
        const PIXEL_MISSING_LE = flags::channel_error::PIXEL_MISSING_LE;
        const PIXEL_RUNAWAY = flags::channel_error::PIXEL_RUNAWAY;
        const PIXEL_SPURIOUS = flags::channel_error::PIXEL_SPURIOUS;
        const PIXEL_LONG_LINE = flags::channel_error::PIXEL_LONG_LINE;
        const PIXEL_SHORT_LINE = flags::channel_error::PIXEL_SHORT_LINE;
        const EMBED_MISSING_LE = flags::channel_error::EMBED_MISSING_LE;
        const EMBED_RUNAWAY = flags::channel_error::EMBED_RUNAWAY;
        const EMBED_SPURIOUS = flags::channel_error::EMBED_SPURIOUS;
        const EMBED_LONG_LINE = flags::channel_error::EMBED_LONG_LINE;
        const EMBED_INFRINGE = flags::channel_error::EMBED_INFRINGE;
        const DTYPE_MISMATCH = flags::channel_error::DTYPE_MISMATCH;
        const LOAD_FRAMED = flags::channel_error::LOAD_FRAMED;
        const FORCE_FE = flags::channel_error::FORCE_FE;
        const COLLISION = flags::channel_error::COLLISION;
        const STALE_FRAME = flags::channel_error::STALE_FRAME;
        const INCOMPLETE = flags::channel_error::INCOMPLETE;
        const EMBED_INCOMPLETE = flags::channel_error::EMBED_INCOMPLETE;
        const VI_PFSD_FAULT = flags::channel_error::VI_PFSD_FAULT;
        const VI_FRAME_START_TIMEOUT = flags::channel_error::VI_FRAME_START_TIMEOUT;
    }
}

bitflags! {
    /// Per-request reporting flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CaptureFlags: u32 {
        const STATUS_REPORT_ENABLE = flags::capture::STATUS_REPORT_ENABLE;
        const ERROR_REPORT_ENABLE = flags::capture::ERROR_REPORT_ENABLE;
    }
}

bitflags! {
    /// `vi_channel_config` enable bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ViChannelFlags: u32 {
        const DT_ENABLE = flags::vi_channel::DT_ENABLE;
        const EMBDATA_ENABLE = flags::vi_channel::EMBDATA_ENABLE;
        const FLUSH_ENABLE = flags::vi_channel::FLUSH_ENABLE;
        const FLUSH_PERIODIC = flags::vi_channel::FLUSH_PERIODIC;
        const LINE_TIMER_ENABLE = flags::vi_channel::LINE_TIMER_ENABLE;
        const LINE_TIMER_PERIODIC = flags::vi_channel::LINE_TIMER_PERIODIC;
        const PIXFMT_ENABLE = flags::vi_channel::PIXFMT_ENABLE;
        const PIXFMT_WIDE_ENABLE = flags::vi_channel::PIXFMT_WIDE_ENABLE;
        const PIXFMT_WIDE_ENDIAN = flags::vi_channel::PIXFMT_WIDE_ENDIAN;
        const PIXFMT_PDAF_REPLACE_ENABLE = flags::vi_channel::PIXFMT_PDAF_REPLACE_ENABLE;
        const ISPBUFA_ENABLE = flags::vi_channel::ISPBUFA_ENABLE;
        const ISPBUFB_ENABLE = flags::vi_channel::ISPBUFB_ENABLE;
        const COMPAND_ENABLE = flags::vi_channel::COMPAND_ENABLE;
    }
}

bitflags! {
    /// `capture_status::flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u32 {
        const CHANNEL_IN_ERROR = flags::status::CHANNEL_IN_ERROR;
        const _ = !0;
    }
}

bitflags! {
    /// ISP channel flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IspChannelFlags: u32 {
        const RESET_ON_ERROR = flags::isp_channel::RESET_ON_ERROR;
    }
}

bitflags! {
    /// ISP process request flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IspProcessFlags: u32 {
        const STATUS_REPORT_ENABLE = flags::isp_process::STATUS_REPORT_ENABLE;
        const ERROR_REPORT_ENABLE = flags::isp_process::ERROR_REPORT_ENABLE;
        const ISP_PROGRAM_BINDING = flags::isp_process::ISP_PROGRAM_BINDING;
    }
}

bitflags! {
    /// ISP error mask reported with ISP process and program status.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IspErrorMask: u32 {
        const DMA_PBUF_ERR = flags::isp_error::DMA_PBUF_ERR;
        const DMA_SBUF_ERR = flags::isp_error::DMA_SBUF_ERR;
        const DMA_SEQ_ERR = flags::isp_error::DMA_SEQ_ERR;
        const FRAMEID_ERR = flags::isp_error::FRAMEID_ERR;
        const TIMEOUT = flags::isp_error::TIMEOUT;
        const TASK_TIMEOUT = flags::isp_error::TASK_TIMEOUT;
    }
}

bitflags! {
    /// ISP program activation condition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActivateFlags: u32 {
        const ON_SEQUENCE_ID = flags::isp_activate::ON_SEQUENCE_ID;
        const ON_SETTINGS_ID = flags::isp_activate::ON_SETTINGS_ID;
        const COUPLED = flags::isp_activate::COUPLED;
    }
}
