//! Stream frames through a descriptor ring with a simulated coprocessor
//!
//! The "firmware" here completes each request by writing a status record
//! into shared memory, occasionally with a corrected ECC error, a CRC
//! error or a failed status, and the host classifies what comes back.

use camrtc_capture::camrtc_abi::status::StatusCode;
use camrtc_capture::prelude::*;
use camrtc_capture::write_status;

const FRAMES: u32 = 12;

fn firmware_status(frame: u32) -> (StatusCode, u64) {
    match frame % 6 {
        2 => (StatusCode::Success, 1 << 16), // corrected header ECC
        4 => (StatusCode::Success, 1 << 17), // payload CRC
        5 => (StatusCode::ChanselShortFrame, 0),
        _ => (StatusCode::Success, 0),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("camrtc_capture=debug")
        .init();

    let config = ChannelConfig::builder()
        .flags(ChannelFlags::VIDEO | ChannelFlags::RAW)
        .requests(0x8000_0000)
        .requests_memoryinfo(0x8010_0000)
        .queue_depth(4)
        .progress_sp(SyncpointInfo::new(17, 0))
        .build()?;

    let mut ring = DescriptorRing::new(config);
    let frame_bytes = 1920 * 1080 * 2;

    let mut good = 0;
    for frame in 0..FRAMES {
        let request = CaptureRequest {
            capture_flags: CaptureFlags::STATUS_REPORT_ENABLE | CaptureFlags::ERROR_REPORT_ENABLE,
            frame_start_timeout: 100,
            frame_completion_timeout: 100,
            output_buffer_id: u64::from(frame),
            ..CaptureRequest::default()
        };
        let mut info = MemoryInfo::default();
        info.surfaces[0] = Surface::new(0x1_0000_0000 + u64::from(frame % 4) * frame_bytes, frame_bytes);

        let token = ring.submit(&request, Some(&info))?;

        let (status, notify_bits) = firmware_status(frame);
        let record = CaptureStatus {
            frame_id: frame as u16,
            status,
            notify_bits,
            sof_timestamp: u64::from(frame) * 33_333_333,
            eof_timestamp: u64::from(frame) * 33_333_333 + 16_000_000,
            ..CaptureStatus::default()
        };
        write_status(ring.slot_bytes_mut(token.index()), &record)?;

        let notice = CompletionNotice { sequence: token.sequence() };
        let Completion::Ready(done) = ring.complete(token, notice)? else {
            anyhow::bail!("frame {frame} still pending after firmware wrote its status");
        };

        let reasons: Vec<String> = done.classification().diagnostics().iter().map(ToString::to_string).collect();
        println!(
            "frame {:>2}  slot {}  {:<15} {}",
            done.sequence(),
            done.index(),
            format!("{:?}", done.verdict()),
            reasons.join(", ")
        );
        if done.verdict() == Verdict::FrameGood {
            good += 1;
        }
        ring.release(done);
    }

    println!("\n{good}/{FRAMES} frames delivered");
    Ok(())
}
