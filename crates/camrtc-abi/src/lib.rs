//! Shared-memory ABI model for the camera real-time coprocessor.
//!
//! This crate has **no dependencies** and **no I/O**. It is a pure model of
//! the capture protocol as both sides see it in memory: record sizes and
//! field offsets, alignment rules, flag words, the status-code catalog and
//! the notify-bit taxonomy with its frame-impact classification.
//!
//! Everything is little-endian. Typed wrappers, codecs and validation live
//! in `camrtc-capture`; this crate only states the facts they rely on.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`layout`] | Alignments, queue bounds, record sizes and field offsets |
//! | [`flags`] | Channel, capture, VI, status and ISP flag bits; unit ids |
//! | [`status`] | VI and ISP completion status codes |
//! | [`notify`] | Notify-bit catalog, corrupting vs non-corrupting |
//! | [`nvcsi`] | CSI streams/ports/VCs, NVCSI error bits, data types |
//! | [`isp`] | ISP program header (magic, version) and stats layout |

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod flags;
pub mod isp;
pub mod layout;
pub mod notify;
pub mod nvcsi;
pub mod status;
