//! Frame verdict properties over the whole status and notify catalog

use camrtc_capture::camrtc_abi::notify::{FrameImpact, NotifyBit};
use camrtc_capture::camrtc_abi::status::StatusCode;
use camrtc_capture::{
    classify, classify_raw, classify_status, decode_status, encode_request, write_status, CaptureError,
    CaptureRequest, CaptureStatus, ChannelConfig, Diagnostic, Verdict,
};

fn non_corrupting() -> impl Iterator<Item = NotifyBit> {
    NotifyBit::ALL
        .into_iter()
        .filter(|b| matches!(b.impact(), FrameImpact::NonCorrupting))
}

fn corrupting() -> impl Iterator<Item = NotifyBit> {
    NotifyBit::ALL
        .into_iter()
        .filter(|b| matches!(b.impact(), FrameImpact::Corrupting))
}

#[test]
fn test_every_non_corrupting_bit_keeps_a_good_frame_good() {
    let all: u64 = non_corrupting().map(NotifyBit::mask).fold(0, |acc, m| acc | m);
    assert_ne!(all, 0);
    for bit in non_corrupting() {
        assert_eq!(classify(StatusCode::Success, bit.mask()).verdict(), Verdict::FrameGood, "{}", bit.name());
    }
    assert_eq!(classify(StatusCode::Success, all).verdict(), Verdict::FrameGood);
}

#[test]
fn test_any_corrupting_bit_wins() {
    let benign: u64 = non_corrupting().map(NotifyBit::mask).fold(0, |acc, m| acc | m);
    for bit in corrupting() {
        let c = classify(StatusCode::Success, benign | bit.mask());
        assert_eq!(c.verdict(), Verdict::FrameCorrupted, "{}", bit.name());
        assert!(c.diagnostics().contains(&Diagnostic::Notify(bit)));
    }
}

#[test]
fn test_every_uncatalogued_position_fails_closed() {
    for pos in 0..64u32 {
        let bit = 1u64 << pos;
        if bit & NotifyBit::KNOWN_MASK != 0 {
            continue;
        }
        let c = classify(StatusCode::Success, bit);
        assert_eq!(c.verdict(), Verdict::FrameCorrupted, "bit {pos}");
        assert_eq!(c.diagnostics(), &[Diagnostic::UnknownNotify(bit)]);
    }
}

#[test]
fn test_unknown_status_is_never_judged() {
    for bits in [0, NotifyBit::KNOWN_MASK, NotifyBit::CORRUPTING_MASK, u64::MAX] {
        let c = classify(StatusCode::Unknown, bits);
        assert_eq!(c.verdict(), Verdict::FrameUnknown);
        assert!(c.diagnostics().is_empty());
    }
}

#[test]
fn test_diagnostics_are_ordered_status_first_then_bits_ascending() {
    let bits = NotifyBit::ALL.iter().fold(0u64, |acc, b| acc | b.mask());
    let c = classify(StatusCode::ChanselFault, bits);
    assert_eq!(c.diagnostics()[0], Diagnostic::Status(StatusCode::ChanselFault));
    let positions: Vec<u8> = c
        .diagnostics()
        .iter()
        .filter_map(|d| match d {
            Diagnostic::Notify(b) => Some(b.position()),
            _ => None,
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(positions.len(), NotifyBit::ALL.len());
}

#[test]
fn test_raw_codes() {
    for code in StatusCode::ALL {
        let raw = code as u32;
        assert_eq!(classify_raw(raw, 0).unwrap(), classify(code, 0));
    }
    assert!(matches!(classify_raw(17, 0), Err(CaptureError::InvalidStatusCode { raw: 17, .. })));
    assert!(matches!(classify_raw(u32::MAX, 0), Err(CaptureError::InvalidStatusCode { .. })));
}

#[test]
fn test_truncated_frame_notify_with_success_status() {
    let c = classify(StatusCode::Success, NotifyBit::AtompFrameTruncated.mask());
    assert_eq!(c.verdict(), Verdict::FrameCorrupted);
    assert_eq!(c.diagnostics(), &[Diagnostic::Notify(NotifyBit::AtompFrameTruncated)]);

    let c = classify(StatusCode::Success, NotifyBit::CsiFaultPhEccSingleBitErr.mask());
    assert_eq!(c.verdict(), Verdict::FrameGood);
}

#[test]
fn test_decoding_a_completed_slot_is_a_pure_read() {
    let config = ChannelConfig::builder()
        .requests(0x8000_0000)
        .requests_memoryinfo(0x8100_0000)
        .queue_depth(2)
        .build()
        .unwrap();
    let mut slot = encode_request(&config, &CaptureRequest::default()).unwrap().to_vec();
    assert_eq!(decode_status(&slot).unwrap().status, StatusCode::Unknown);

    let written = CaptureStatus {
        status: StatusCode::Success,
        notify_bits: NotifyBit::CsiFaultPhEccSingleBitErr.mask(),
        ..CaptureStatus::default()
    };
    write_status(&mut slot, &written).unwrap();
    let before = slot.clone();

    let first = decode_status(&slot).unwrap();
    let second = decode_status(&slot).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, written);
    assert_eq!(classify_status(&first), classify_status(&second));
    assert_eq!(slot, before);
}
