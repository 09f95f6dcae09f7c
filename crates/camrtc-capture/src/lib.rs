//! Host side of the camera RTCPU capture protocol.
//!
//! The host and the camera real-time coprocessor share two rings per
//! channel: capture descriptors and their memory-info records. This crate
//! builds and validates the channel configuration, encodes requests into
//! ring slots, tracks slot ownership across the handoff, and turns each
//! completion status into a frame verdict.
//!
//! Nothing here performs I/O. The rings live in memory this crate owns
//! (or that a caller maps in), and the mailbox/IVC transport that carries
//! completion notices is out of scope: a notice arrives as a
//! [`CompletionNotice`] value.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | Validated channel configuration and its 272-byte codec |
//! | [`csi`] | CSI stream, port, virtual channel and data type wrappers |
//! | [`syncpoint`] | Syncpoint and Grid-of-Semaphores slot |
//! | [`flags`] | Typed flag words |
//! | [`vi`] | Per-request VI channel and PFSD settings |
//! | [`descriptor`] | 384-byte capture descriptor codec |
//! | [`memoryinfo`] | Per-request surface IOVAs |
//! | [`status`] | Completion status record |
//! | [`classify`](mod@classify) | Frame verdicts from status and notify bits |
//! | [`ring`] | Descriptor ring with move-only slot ownership |
//! | [`isp`] | ISP channel configuration and status records |
//! | [`program`] | ISP program descriptors and program buffers |
//!
//! # Quick start
//!
//! ```
//! use camrtc_capture::prelude::*;
//!
//! # fn main() -> camrtc_capture::Result<()> {
//! let config = ChannelConfig::builder()
//!     .flags(ChannelFlags::VIDEO | ChannelFlags::RAW)
//!     .requests(0x8000_0000)
//!     .requests_memoryinfo(0x8010_0000)
//!     .queue_depth(4)
//!     .request_size(384)
//!     .request_memoryinfo_size(128)
//!     .build()?;
//!
//! let mut ring = DescriptorRing::new(config);
//! let token = ring.submit(&CaptureRequest::default(), None)?;
//! assert_eq!(ring.in_flight(), 1);
//!
//! // The coprocessor has not written a status yet.
//! let notice = CompletionNotice { sequence: token.sequence() };
//! assert!(matches!(ring.complete(token, notice)?, Completion::Pending(_)));
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod classify;
pub mod config;
pub mod csi;
pub mod descriptor;
mod error;
pub mod flags;
pub mod isp;
pub mod memoryinfo;
pub mod program;
pub mod ring;
pub mod status;
pub mod syncpoint;
mod validate;
pub mod vi;
mod wire;

pub use camrtc_abi;

pub use classify::{classify, classify_raw, classify_status, Classification, Diagnostic, Verdict};
pub use config::{ChannelConfig, ChannelConfigBuilder, Iova, QueueDepth};
pub use csi::{CsiDataType, CsiPort, CsiStream, CsiStreamBinding, VirtualChannel};
pub use descriptor::{decode_request, descriptor_sequence, encode_request, CaptureRequest, WatermarkOffset};
pub use error::{CaptureError, ConfigViolation, Result};
pub use flags::{
    ActivateFlags, CaptureFlags, ChannelErrorMask, ChannelFlags, IspChannelFlags, IspErrorMask,
    IspProcessFlags, StatusFlags, ViChannelFlags,
};
pub use isp::{IspChannelConfig, IspChannelConfigBuilder, IspProgramStatus, IspStatus};
pub use memoryinfo::{MemoryInfo, Surface};
pub use program::{IspProgram, ProgramDescriptor};
pub use ring::{
    slot_index, CompletedSlot, Completion, CompletionNotice, CompletionRejected, DescriptorRing, SlotState,
    SubmittedSlot,
};
pub use status::{decode_status, write_status, CaptureStatus, NvcsiBlock, NvcsiErrorStatus};
pub use syncpoint::{GosSlot, SyncpointInfo};
pub use vi::{PfsdConfig, ViChannelConfig};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        classify, classify_status, CaptureError, CaptureFlags, CaptureRequest, CaptureStatus,
        ChannelConfig, ChannelFlags, Classification, CompletedSlot, Completion, CompletionNotice,
        DescriptorRing, MemoryInfo, Result, SubmittedSlot, Surface, SyncpointInfo, Verdict,
    };
    pub use camrtc_abi::status::StatusCode;
}
