//! Ring lifecycle against a simulated coprocessor
//!
//! The coprocessor side is played by writing status records straight into
//! the shared request ring, the way firmware would.

use camrtc_capture::camrtc_abi::status::StatusCode;
use camrtc_capture::prelude::*;
use camrtc_capture::{decode_request, slot_index, write_status, QueueDepth, SlotState};

const DEPTH: u32 = 4;

fn channel() -> ChannelConfig {
    channel_with_depth(DEPTH)
}

fn channel_with_depth(depth: u32) -> ChannelConfig {
    ChannelConfig::builder()
        .flags(ChannelFlags::VIDEO | ChannelFlags::RAW)
        .requests(0x9000_0000)
        .requests_memoryinfo(0x9001_0000)
        .queue_depth(depth)
        .build()
        .expect("valid channel")
}

/// Firmware writes a final status into the slot holding `token`.
fn firmware_completes(ring: &mut DescriptorRing, token: &SubmittedSlot, status: StatusCode, notify_bits: u64) {
    let st = CaptureStatus {
        frame_id: token.sequence() as u16,
        status,
        notify_bits,
        sof_timestamp: 1_000,
        eof_timestamp: 34_000,
        ..CaptureStatus::default()
    };
    write_status(ring.slot_bytes_mut(token.index()), &st).expect("status fits slot");
}

fn collect(ring: &mut DescriptorRing, token: SubmittedSlot) -> CompletedSlot {
    let notice = CompletionNotice { sequence: token.sequence() };
    match ring.complete(token, notice).expect("completion") {
        Completion::Ready(done) => done,
        Completion::Pending(t) => panic!("request {} still pending", t.sequence()),
    }
}

#[test]
fn test_streaming_wraps_the_ring_several_times() {
    let mut ring = DescriptorRing::new(channel());
    let depth = QueueDepth::new(DEPTH).unwrap();

    for frame in 0..(DEPTH * 3) {
        let request = CaptureRequest {
            capture_flags: CaptureFlags::STATUS_REPORT_ENABLE,
            output_buffer_id: u64::from(frame) + 100,
            ..CaptureRequest::default()
        };
        let token = ring.submit(&request, None).expect("slot free");
        assert_eq!(token.sequence(), frame);
        assert_eq!(token.index(), slot_index(frame, depth));

        let written = decode_request(ring.slot_bytes(token.index())).unwrap();
        assert_eq!(written.sequence, frame);
        assert_eq!(written.output_buffer_id, u64::from(frame) + 100);

        firmware_completes(&mut ring, &token, StatusCode::Success, 0);
        let done = collect(&mut ring, token);
        assert_eq!(done.verdict(), Verdict::FrameGood);
        assert_eq!(done.status().duration_ns(), Some(33_000));
        ring.release(done);
    }
    assert_eq!(ring.in_flight(), 0);
    assert_eq!(ring.next_sequence(), DEPTH * 3);
}

#[test]
fn test_full_ring_then_out_of_order_completion() {
    let mut ring = DescriptorRing::new(channel());
    let mut tokens: Vec<_> = (0..DEPTH)
        .map(|_| ring.submit(&CaptureRequest::default(), None).unwrap())
        .collect();
    assert_eq!(ring.in_flight(), DEPTH as usize);
    assert!(matches!(
        ring.submit(&CaptureRequest::default(), None),
        Err(CaptureError::SlotBusy { index: 0, sequence: 0 })
    ));

    // Firmware finishes the last request first; the host still collects
    // each one through its own token.
    let last = tokens.pop().unwrap();
    firmware_completes(&mut ring, &last, StatusCode::Success, 0);
    let done = collect(&mut ring, last);
    ring.release(done);

    // Slot 0 is still owned by the coprocessor, so the ring stays full.
    assert!(matches!(
        ring.submit(&CaptureRequest::default(), None),
        Err(CaptureError::SlotBusy { index: 0, .. })
    ));

    for token in tokens {
        firmware_completes(&mut ring, &token, StatusCode::Success, 0);
        let done = collect(&mut ring, token);
        ring.release(done);
    }
    assert!(ring.submit(&CaptureRequest::default(), None).is_ok());
}

#[test]
fn test_pending_until_status_written() {
    let mut ring = DescriptorRing::new(channel());
    let token = ring.submit(&CaptureRequest::default(), None).unwrap();
    let seq = token.sequence();

    let token = match ring.complete(token, CompletionNotice { sequence: seq }).unwrap() {
        Completion::Pending(t) => t,
        Completion::Ready(_) => panic!("zeroed status must read as pending"),
    };
    assert_eq!(ring.slot_state(0), Some(SlotState::CoprocessorOwned { sequence: seq }));

    firmware_completes(&mut ring, &token, StatusCode::AtompFrameTruncated, 0);
    let done = collect(&mut ring, token);
    assert_eq!(done.verdict(), Verdict::FrameCorrupted);
    assert_eq!(ring.slot_state(0), Some(SlotState::Completed { sequence: seq }));
    assert_eq!(ring.read_status(&done).unwrap().status, StatusCode::AtompFrameTruncated);
}

#[test]
fn test_overwritten_descriptor_is_detected() {
    let mut ring = DescriptorRing::new(channel());
    let token = ring.submit(&CaptureRequest::default(), None).unwrap();
    ring.slot_bytes_mut(0)[..4].copy_from_slice(&77u32.to_le_bytes());
    firmware_completes(&mut ring, &token, StatusCode::Success, 0);

    let rejected = ring.complete(token, CompletionNotice { sequence: 0 }).unwrap_err();
    assert_eq!(rejected.error(), &CaptureError::SequenceMismatch { index: 0, expected: 0, found: 77 });
    assert!(rejected.error().is_fatal_to_channel());
    assert_eq!(ring.slot_state(0), Some(SlotState::CoprocessorOwned { sequence: 0 }));
}

#[test]
fn test_out_of_order_notice_keeps_both_tokens() {
    let mut ring = DescriptorRing::new(channel_with_depth(2));
    let t0 = ring.submit(&CaptureRequest::default(), None).unwrap();
    let t1 = ring.submit(&CaptureRequest::default(), None).unwrap();
    firmware_completes(&mut ring, &t1, StatusCode::Success, 0);

    // Request 1 finished first, but the host tried it against t0.
    let rejected = ring.complete(t0, CompletionNotice { sequence: 1 }).unwrap_err();
    assert_eq!(rejected.error(), &CaptureError::NoticeMismatch { token: 0, notice: 1 });
    assert!(!rejected.error().is_fatal_to_channel());
    let t0 = rejected.into_token().expect("token comes back");
    assert_eq!(ring.slot_state(0), Some(SlotState::CoprocessorOwned { sequence: 0 }));
    assert_eq!(ring.in_flight(), 2);

    let done1 = collect(&mut ring, t1);
    assert_eq!(done1.sequence(), 1);
    firmware_completes(&mut ring, &t0, StatusCode::Success, 0);
    let done0 = collect(&mut ring, t0);
    assert_eq!(done0.sequence(), 0);
    assert_eq!(ring.in_flight(), 0);

    ring.release(done0);
    ring.release(done1);
    assert!(ring.submit(&CaptureRequest::default(), None).is_ok());
}

#[test]
fn test_reset_drains_then_resumes() {
    let mut ring = DescriptorRing::new(channel());
    let a = ring.submit(&CaptureRequest::default(), None).unwrap();
    let b = ring.submit(&CaptureRequest::default(), None).unwrap();

    ring.begin_reset();
    assert!(matches!(
        ring.submit(&CaptureRequest::default(), None),
        Err(CaptureError::ChannelResetting { in_flight: 2 })
    ));

    // Firmware force-completes everything it held.
    firmware_completes(&mut ring, &a, StatusCode::Success, 0);
    firmware_completes(&mut ring, &b, StatusCode::SyncFailure, 0);
    let a = collect(&mut ring, a);
    assert!(ring.is_resetting());
    let b = collect(&mut ring, b);
    assert!(!ring.is_resetting());
    assert_eq!(b.verdict(), Verdict::FrameCorrupted);

    ring.release(a);
    ring.release(b);
    let c = ring.submit(&CaptureRequest::default(), None).unwrap();
    assert_eq!(c.sequence(), 2);
}

#[test]
fn test_sequence_continues_across_u32_wrap() {
    let mut ring = DescriptorRing::starting_at(channel(), u32::MAX);
    let t = ring.submit(&CaptureRequest::default(), None).unwrap();
    assert_eq!(t.sequence(), u32::MAX);
    assert_eq!(t.index(), (u32::MAX % DEPTH) as usize);
    firmware_completes(&mut ring, &t, StatusCode::Success, 0);
    let done = collect(&mut ring, t);
    ring.release(done);
    assert_eq!(ring.next_sequence(), 0);
}
