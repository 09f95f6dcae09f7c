//! Channel and request validation before anything reaches the coprocessor

use camrtc_capture::camrtc_abi::layout;
use camrtc_capture::camrtc_abi::notify::NotifyBit;
use camrtc_capture::vi::{PfsdRegion, ViChannelConfig};
use camrtc_capture::{
    encode_request, CaptureError, CaptureRequest, ChannelConfig, ChannelConfigBuilder, ChannelFlags,
    ConfigViolation, CsiStreamBinding, DescriptorRing, GosSlot, IspChannelConfig, PfsdConfig,
    SyncpointInfo,
};

fn base() -> ChannelConfigBuilder {
    ChannelConfig::builder()
        .requests(0x8000_0000)
        .requests_memoryinfo(0x8100_0000)
        .queue_depth(8)
}

fn violation(result: camrtc_capture::Result<ChannelConfig>) -> ConfigViolation {
    match result {
        Err(CaptureError::ConfigurationInvalid(v)) => v,
        other => panic!("expected a configuration violation, got {other:?}"),
    }
}

#[test]
fn test_full_channel_survives_encode_decode() {
    let sp = SyncpointInfo::new(42, 1000).with_gos(GosSlot::new(3, 1, 12).unwrap());
    let config = base()
        .flags(ChannelFlags::VIDEO | ChannelFlags::RAW | ChannelFlags::CSI | ChannelFlags::LINETIMER)
        .csi_stream(CsiStreamBinding::from_raw(2, 2, 1).unwrap())
        .vi_gos_table(0x7000_0100)
        .progress_sp(sp)
        .linetimer_sp(SyncpointInfo::new(43, 0))
        .stop_on_error(NotifyBit::ChanselCollision)
        .build()
        .unwrap();

    let bytes = config.encode().unwrap();
    assert_eq!(bytes.len(), layout::channel_config::SIZE);
    let back = ChannelConfig::decode(&bytes).unwrap();
    assert_eq!(back, config);
    assert_eq!(back.stop_on_error().collect::<Vec<_>>(), vec![NotifyBit::ChanselCollision]);
}

#[test]
fn test_ring_geometry_rules() {
    assert!(matches!(violation(base().requests(0).build()), ConfigViolation::ZeroAddress { field: "requests" }));
    assert!(matches!(
        violation(base().requests(0x8000_0020).build()),
        ConfigViolation::Misaligned { field: "requests", align: 64, .. }
    ));
    assert!(matches!(
        violation(base().request_size(320).build()),
        ConfigViolation::EntryTooSmall { field: "request_size", min: 384, .. }
    ));
    assert!(matches!(
        violation(base().request_size(400).build()),
        ConfigViolation::Misaligned { field: "request_size", .. }
    ));
    // Larger, aligned slots are fine; the ring strides by request_size.
    let roomy = base().request_size(512).build().unwrap();
    assert_eq!(roomy.request_ring_bytes(), 8 * 512);
}

#[test]
fn test_oversized_rings_rejected_before_allocation() {
    let huge = base().queue_depth(layout::MAX_QUEUE_DEPTH).request_size(0xFFFF_FFC0);
    assert!(matches!(
        violation(huge.build()),
        ConfigViolation::FieldOutOfRange { field: "request ring", max: layout::MAX_RING_BYTES, .. }
    ));
    assert!(matches!(
        violation(base().request_memoryinfo_size(0x0400_0000).build()),
        ConfigViolation::FieldOutOfRange { field: "memoryinfo ring", .. }
    ));

    // Largest ring that still fits is accepted and can back a ring.
    let per_slot = (layout::MAX_RING_BYTES / u64::from(layout::MAX_QUEUE_DEPTH)) as u32 & !63;
    let config = base()
        .queue_depth(layout::MAX_QUEUE_DEPTH)
        .request_size(per_slot)
        .build()
        .unwrap();
    let ring = DescriptorRing::new(config);
    assert_eq!(ring.slot_bytes(0).len(), per_slot as usize);
}

#[test]
fn test_queue_depth_bounds() {
    for depth in [0, layout::MAX_QUEUE_DEPTH + 1] {
        assert!(matches!(
            violation(base().queue_depth(depth).build()),
            ConfigViolation::QueueDepthOutOfRange { .. }
        ));
    }
    assert!(base().queue_depth(layout::MAX_QUEUE_DEPTH).build().is_ok());
}

#[test]
fn test_flags_need_their_resources() {
    assert!(matches!(
        violation(base().flags(ChannelFlags::CSI).build()),
        ConfigViolation::Inconsistent { .. }
    ));
    assert!(matches!(
        violation(base().flags(ChannelFlags::LINETIMER).build()),
        ConfigViolation::Inconsistent { .. }
    ));
}

#[test]
fn test_too_many_gos_tables() {
    let mut b = base();
    for i in 0..=layout::VI_NUM_GOS_TABLES as u64 {
        b = b.vi_gos_table(0x7000_0000 + i * 0x100);
    }
    assert!(matches!(violation(b.build()), ConfigViolation::TooManyGosTables { .. }));
}

#[test]
fn test_pfsd_needs_channel_support() {
    let pfsd = PfsdConfig {
        expected: vec![PfsdRegion { offset: 0, len: 16, value: [1, 2, 3, 4] }],
        ..PfsdConfig::default()
    };
    let request = CaptureRequest {
        pfsd: Some(pfsd),
        ..CaptureRequest::default()
    };

    let plain = base().build().unwrap();
    assert!(matches!(
        encode_request(&plain, &request),
        Err(CaptureError::ConfigurationInvalid(ConfigViolation::Inconsistent { .. }))
    ));

    let pfsd_channel = base().flags(ChannelFlags::ENABLE_VI_PFSD).build().unwrap();
    let bytes = encode_request(&pfsd_channel, &request).unwrap();
    assert_eq!(bytes.len(), layout::descriptor::SIZE);
}

#[test]
fn test_rejected_request_leaves_slot_untouched() {
    let mut ring = DescriptorRing::new(base().build().unwrap());
    let bad = CaptureRequest {
        vi_channel: ViChannelConfig {
            dol_header_sel: 9,
            ..ViChannelConfig::default()
        },
        ..CaptureRequest::default()
    };
    assert!(ring.submit(&bad, None).is_err());
    assert_eq!(ring.in_flight(), 0);
    assert_eq!(ring.next_sequence(), 0);
    assert!(ring.slot_state(0).is_some_and(|s| s.is_host_owned()));
}

#[test]
fn test_isp_channel_rules() {
    let ok = IspChannelConfig::builder()
        .requests(0x6000_0000, 4, 512)
        .programs(0x6100_0000, 4, 16_576)
        .memoryinfo(0x6200_0000, 128, 0x6300_0000, 64)
        .build()
        .unwrap();
    assert_eq!(IspChannelConfig::decode(&ok.encode().unwrap()).unwrap(), ok);

    let small_program = IspChannelConfig::builder()
        .requests(0x6000_0000, 4, 512)
        .programs(0x6100_0000, 4, 16_384)
        .memoryinfo(0x6200_0000, 128, 0x6300_0000, 64)
        .build();
    assert!(matches!(
        small_program,
        Err(CaptureError::ConfigurationInvalid(ConfigViolation::EntryTooSmall { field: "program_size", .. }))
    ));

    let deep_programs = IspChannelConfig::builder()
        .requests(0x6000_0000, 4, 512)
        .programs(0x6100_0000, layout::MAX_PROGRAM_QUEUE_DEPTH + 1, 16_576)
        .memoryinfo(0x6200_0000, 128, 0x6300_0000, 64)
        .build();
    assert!(deep_programs.is_err());
}
