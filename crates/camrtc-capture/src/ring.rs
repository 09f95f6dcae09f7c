//! Descriptor ring and slot ownership.
//!
//! A VI channel owns two parallel rings in shared memory: the request ring
//! (`queue_depth` slots of `request_size` bytes) and the memory-info ring
//! (`queue_depth` slots of `request_memoryinfo_size` bytes). Sequence
//! numbers increase by one per submission and map to slots modulo the
//! depth.
//!
//! Every slot is either host-owned or coprocessor-owned:
//!
//! ```text
//!              submit()                   complete() sees final status
//! HostOwned ───────────────▶ Coprocessor ─────────────────────────────▶ Completed
//!     ▲                       Owned                                         │
//!     └─────────────────────── release() ◀──────────────────────────────────┘
//! ```
//!
//! Ownership is also carried in the type system. `submit` hands back a
//! [`SubmittedSlot`] token that can only be spent by `complete`, and a
//! finished request is a [`CompletedSlot`] that can only be spent by
//! `release`. Neither token is `Clone`, so a slot cannot be completed or
//! released twice.
//!
//! The memory here stands in for the IOVA-mapped region the coprocessor
//! sees; [`DescriptorRing::shared_memory_mut`] gives the coprocessor side
//! (or a simulation of it) the same bytes.

use std::time::{Duration, Instant};

use camrtc_abi::layout::memoryinfo;
use thiserror::Error;

use crate::classify::{classify_status, Classification, Verdict};
use crate::config::{ChannelConfig, QueueDepth};
use crate::descriptor::{descriptor_sequence, write_request, CaptureRequest};
use crate::memoryinfo::MemoryInfo;
use crate::status::{decode_status, CaptureStatus};
use crate::{wire, CaptureError, Result};

/// Slot holding `sequence`.
///
/// When the depth does not divide 2^32, the slot pattern breaks where the
/// sequence wraps: with depth 3, `u32::MAX` and the following 0 both map
/// to slot 0. [`DescriptorRing::submit`] catches that collision with
/// `SlotBusy` while the earlier request still holds the slot; callers
/// tracking slots by sequence on their own must handle it themselves.
#[must_use]
pub const fn slot_index(sequence: u32, depth: QueueDepth) -> usize {
    (sequence % depth.get()) as usize
}

/// Ownership of one ring slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Free for the next submission.
    HostOwned,
    /// Handed to the coprocessor; the host must not touch it.
    CoprocessorOwned {
        /// Request occupying the slot.
        sequence: u32,
    },
    /// Host-owned again, but the result has not been released.
    Completed {
        /// Request whose result the slot still holds.
        sequence: u32,
    },
}

impl SlotState {
    #[must_use]
    pub const fn is_host_owned(&self) -> bool {
        !matches!(self, Self::CoprocessorOwned { .. })
    }

    const fn sequence(&self) -> Option<u32> {
        match *self {
            Self::HostOwned => None,
            Self::CoprocessorOwned { sequence } | Self::Completed { sequence } => Some(sequence),
        }
    }
}

/// Token for a request handed to the coprocessor.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a submitted slot must be completed, or it stays owned by the coprocessor"]
pub struct SubmittedSlot {
    index: usize,
    sequence: u32,
    submitted_at: Instant,
    timeout: Option<Duration>,
}

impl SubmittedSlot {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub const fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// When the coprocessor should have reported, from the request's start
    /// and completion timeouts. `None` if either waits forever.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|t| self.submitted_at + t)
    }

    #[must_use]
    pub fn is_overdue(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|d| now > d)
    }
}

/// Transport notification that request `sequence` has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionNotice {
    pub sequence: u32,
}

/// A request whose final status has been read.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a completed slot must be released before it can be reused"]
pub struct CompletedSlot {
    index: usize,
    sequence: u32,
    status: CaptureStatus,
    classification: Classification,
}

impl CompletedSlot {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub const fn status(&self) -> &CaptureStatus {
        &self.status
    }

    #[must_use]
    pub const fn classification(&self) -> &Classification {
        &self.classification
    }

    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.classification.verdict()
    }
}

/// Outcome of [`DescriptorRing::complete`].
#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    /// Status still `UNKNOWN`; the token comes back unchanged.
    Pending(SubmittedSlot),
    /// Final status read.
    Ready(CompletedSlot),
}

/// A completion the ring refused.
///
/// While the slot still belongs to the token's request the token rides
/// along, so the caller can pair it with the right notice later. A token
/// whose slot was reclaimed by a reset, or reused, is gone.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct CompletionRejected {
    error: CaptureError,
    token: Option<SubmittedSlot>,
}

impl CompletionRejected {
    #[must_use]
    pub const fn error(&self) -> &CaptureError {
        &self.error
    }

    /// Take the token back, if the slot still holds its request.
    #[must_use]
    pub fn into_token(self) -> Option<SubmittedSlot> {
        self.token
    }

    /// Split into the error and the returned token.
    #[must_use]
    pub fn into_parts(self) -> (CaptureError, Option<SubmittedSlot>) {
        (self.error, self.token)
    }
}

impl From<CompletionRejected> for CaptureError {
    fn from(rejected: CompletionRejected) -> Self {
        rejected.error
    }
}

/// Request ring plus memory-info ring for one channel.
#[derive(Debug)]
pub struct DescriptorRing {
    config: ChannelConfig,
    requests: Vec<u8>,
    memoryinfo: Vec<u8>,
    slots: Vec<SlotState>,
    next_sequence: u32,
    in_flight: usize,
    resetting: bool,
}

impl DescriptorRing {
    /// Allocate zeroed rings sized from `config`.
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self::starting_at(config, 0)
    }

    /// Like [`new`](Self::new), but the first submission uses `sequence`.
    #[must_use]
    pub fn starting_at(config: ChannelConfig, sequence: u32) -> Self {
        let depth = config.queue_depth().slots();
        tracing::info!(
            "Created descriptor ring: {depth} slots x {} bytes at {}, memoryinfo x {} bytes at {}",
            config.request_size(),
            config.requests(),
            config.request_memoryinfo_size(),
            config.requests_memoryinfo()
        );
        Self {
            requests: vec![0; config.request_ring_bytes()],
            memoryinfo: vec![0; config.memoryinfo_ring_bytes()],
            slots: vec![SlotState::HostOwned; depth],
            next_sequence: sequence,
            in_flight: 0,
            resetting: false,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    #[must_use]
    pub const fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Requests currently owned by the coprocessor.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    #[must_use]
    pub fn slot_state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).copied()
    }

    #[must_use]
    pub const fn is_resetting(&self) -> bool {
        self.resetting
    }

    /// Write `request` into the next slot and hand it to the coprocessor.
    ///
    /// The ring stamps the sequence number; whatever `request.sequence`
    /// held is ignored. Memory-info is written to the matching slot of the
    /// memory-info ring, or zeroed when `None`.
    ///
    /// # Errors
    ///
    /// - `ChannelResetting` between [`begin_reset`](Self::begin_reset) and
    ///   the last in-flight completion
    /// - `SlotBusy` if the target slot is not free
    /// - `ConfigurationInvalid` if the request or memory-info is rejected
    pub fn submit(&mut self, request: &CaptureRequest, memoryinfo: Option<&MemoryInfo>) -> Result<SubmittedSlot> {
        if self.resetting {
            return Err(CaptureError::ChannelResetting {
                in_flight: self.in_flight,
            });
        }

        let sequence = self.next_sequence;
        let index = slot_index(sequence, self.config.queue_depth());
        let state = self.slots[index];
        if let Some(busy) = state.sequence() {
            return Err(CaptureError::SlotBusy { index, sequence: busy });
        }

        if let Some(info) = memoryinfo {
            info.validate()?;
        }

        let stamped = CaptureRequest {
            sequence,
            ..request.clone()
        };
        let request_size = self.config.request_size() as usize;
        let slot = &mut self.requests[index * request_size..(index + 1) * request_size];
        write_request(&self.config, &stamped, slot)?;

        let info_size = self.config.request_memoryinfo_size() as usize;
        let info_slot = &mut self.memoryinfo[index * info_size..(index + 1) * info_size];
        info_slot.fill(0);
        if let Some(info) = memoryinfo {
            let mut out = wire::record_mut(info_slot, 0, memoryinfo::SIZE, "capture_descriptor_memoryinfo")?;
            info.put(&mut out);
        }

        self.slots[index] = SlotState::CoprocessorOwned { sequence };
        self.next_sequence = sequence.wrapping_add(1);
        self.in_flight += 1;

        tracing::debug!("Submitted request {sequence} in slot {index} ({} in flight)", self.in_flight);

        let timeout = match (request.frame_start_timeout, request.frame_completion_timeout) {
            (0, _) | (_, 0) => None,
            (start, done) => Some(Duration::from_millis(u64::from(start) + u64::from(done))),
        };
        Ok(SubmittedSlot {
            index,
            sequence,
            submitted_at: Instant::now(),
            timeout,
        })
    }

    /// Pair a completion notice with its token and read the result.
    ///
    /// Notices may arrive out of order; one that names another request
    /// hands the token back inside the rejection.
    ///
    /// # Errors
    ///
    /// - `NoticeMismatch` if the notice names a different request
    /// - `SequenceMismatch` if the slot no longer holds the token's request
    ///   (a reset reclaimed it, or the descriptor was overwritten)
    /// - `InvalidStatusCode` if the coprocessor wrote a status outside the
    ///   catalog
    ///
    /// The slot keeps its state on error. The token is returned unless a
    /// reset or a later submission already took the slot.
    pub fn complete(
        &mut self,
        token: SubmittedSlot,
        notice: CompletionNotice,
    ) -> std::result::Result<Completion, CompletionRejected> {
        let index = token.index;
        match self.slots.get(index) {
            Some(SlotState::CoprocessorOwned { sequence }) if *sequence == token.sequence => {}
            other => {
                let found = other
                    .and_then(SlotState::sequence)
                    .or_else(|| descriptor_sequence(self.slot_bytes(index)).ok())
                    .unwrap_or_default();
                return Err(CompletionRejected {
                    error: CaptureError::SequenceMismatch {
                        index,
                        expected: token.sequence,
                        found,
                    },
                    token: None,
                });
            }
        }

        if notice.sequence != token.sequence {
            tracing::debug!("Notice {} does not match token {}; token returned", notice.sequence, token.sequence);
            return Err(CompletionRejected {
                error: CaptureError::NoticeMismatch {
                    token: token.sequence,
                    notice: notice.sequence,
                },
                token: Some(token),
            });
        }

        let slot = self.slot_bytes(index);
        let read = descriptor_sequence(slot).and_then(|found| {
            if found == token.sequence {
                decode_status(slot)
            } else {
                tracing::error!("Slot {index} overwritten: holds sequence {found}, expected {}", token.sequence);
                Err(CaptureError::SequenceMismatch {
                    index,
                    expected: token.sequence,
                    found,
                })
            }
        });
        let status = match read {
            Ok(status) => status,
            Err(error) => {
                return Err(CompletionRejected {
                    error,
                    token: Some(token),
                })
            }
        };
        if !status.is_final() {
            return Ok(Completion::Pending(token));
        }

        let classification = classify_status(&status);
        self.slots[index] = SlotState::Completed {
            sequence: token.sequence,
        };
        self.in_flight -= 1;
        tracing::debug!(
            "Request {} completed in slot {index}: {:?} ({} in flight)",
            token.sequence,
            classification.verdict(),
            self.in_flight
        );
        if self.resetting && self.in_flight == 0 {
            self.resetting = false;
            tracing::info!("Channel reset complete; submissions resume");
        }

        Ok(Completion::Ready(CompletedSlot {
            index,
            sequence: token.sequence,
            status,
            classification,
        }))
    }

    /// Re-read the status of a completed slot from shared memory.
    ///
    /// # Errors
    ///
    /// `InvalidStatusCode` if the status word has been corrupted since.
    pub fn read_status(&self, completed: &CompletedSlot) -> Result<CaptureStatus> {
        decode_status(self.slot_bytes(completed.index))
    }

    /// Hand a completed slot back for reuse.
    pub fn release(&mut self, completed: CompletedSlot) {
        if self.slots[completed.index] == (SlotState::Completed { sequence: completed.sequence }) {
            self.slots[completed.index] = SlotState::HostOwned;
        }
    }

    /// Stop accepting submissions until every in-flight request completes.
    ///
    /// The coprocessor answers a channel reset by force-completing the
    /// requests it holds, so the ring leaves the resetting state on its own
    /// once the last of them is collected.
    pub fn begin_reset(&mut self) {
        if self.in_flight == 0 {
            tracing::info!("Channel reset with no requests in flight");
            return;
        }
        tracing::warn!("Channel reset: {} requests in flight", self.in_flight);
        self.resetting = true;
    }

    /// Reclaim every slot after the coprocessor has confirmed the channel
    /// reset. Outstanding tokens become stale and complete with
    /// `SequenceMismatch`.
    pub fn acknowledge_reset(&mut self) {
        let reclaimed = self.in_flight;
        for slot in &mut self.slots {
            if let SlotState::CoprocessorOwned { .. } = slot {
                *slot = SlotState::HostOwned;
            }
        }
        self.in_flight = 0;
        self.resetting = false;
        tracing::info!("Channel reset acknowledged; reclaimed {reclaimed} slots");
    }

    /// Request ring bytes as the coprocessor sees them.
    pub fn shared_memory_mut(&mut self) -> &mut [u8] {
        &mut self.requests
    }

    /// Memory-info ring bytes.
    #[must_use]
    pub fn memoryinfo(&self) -> &[u8] {
        &self.memoryinfo
    }

    /// Descriptor bytes of slot `index`.
    ///
    /// # Panics
    ///
    /// If `index` is not below the queue depth.
    #[must_use]
    pub fn slot_bytes(&self, index: usize) -> &[u8] {
        let size = self.config.request_size() as usize;
        &self.requests[index * size..(index + 1) * size]
    }

    /// Mutable descriptor bytes of slot `index`, for the coprocessor side.
    ///
    /// # Panics
    ///
    /// If `index` is not below the queue depth.
    pub fn slot_bytes_mut(&mut self, index: usize) -> &mut [u8] {
        let size = self.config.request_size() as usize;
        &mut self.requests[index * size..(index + 1) * size]
    }
}
