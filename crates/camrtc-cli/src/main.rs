//! `camrtc`: inspect camera RTCPU capture records offline.
//!
//! ```text
//! USAGE:
//!   camrtc layout                       Record sizes, offsets and alignment
//!   camrtc classify --status N ...      Verdict for a status and notify word
//!   camrtc check-config ...             Validate a channel configuration
//!   camrtc decode <ring-dump> ...       Classify every slot of a ring dump
//!   camrtc program <file>               Check and print an ISP program
//!   camrtc datatype <name>              Canonicalize a CSI data type name
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use camrtc_capture::camrtc_abi::layout;
use camrtc_capture::camrtc_abi::nvcsi::Spelling;
use camrtc_capture::camrtc_abi::status::StatusCode;
use camrtc_capture::program::ProgramDescriptor;
use camrtc_capture::{
    classify_status, decode_status, descriptor_sequence, CaptureError, CaptureStatus, ChannelConfig,
    ChannelFlags, Classification, CsiDataType, IspProgram, NvcsiErrorStatus, QueueDepth,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "camrtc", about = "Camera RTCPU capture record inspector", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print sizes, offsets and alignment of every shared-memory record.
    Layout,
    /// Classify a completion status and notify word.
    Classify {
        /// Raw `capture_status::status` value.
        #[arg(long)]
        status: u32,
        /// Notify bits (hex with 0x prefix, or decimal).
        #[arg(long, default_value = "0", value_parser = parse_u64)]
        notify: u64,
        /// NVCSI virtual-channel error bits, reported as advisory.
        #[arg(long, default_value = "0", value_parser = parse_u32)]
        nvcsi_vc: u32,
        /// Mark the channel as in error.
        #[arg(long)]
        channel_in_error: bool,
    },
    /// Run the channel configuration validator.
    CheckConfig {
        /// Request ring IOVA.
        #[arg(long, value_parser = parse_u64)]
        requests: u64,
        /// Memory-info ring IOVA.
        #[arg(long, value_parser = parse_u64)]
        memoryinfo: u64,
        #[arg(long)]
        queue_depth: u32,
        #[arg(long, default_value_t = layout::descriptor::SIZE as u32)]
        request_size: u32,
        #[arg(long, default_value_t = layout::memoryinfo::SIZE as u32)]
        memoryinfo_size: u32,
        /// Raw `channel_flags` word.
        #[arg(long, default_value = "0", value_parser = parse_u32)]
        flags: u32,
        /// Print the encoded 272-byte record as hex.
        #[arg(long)]
        dump: bool,
    },
    /// Decode and classify the status of each slot in a raw request-ring dump.
    Decode {
        file: PathBuf,
        #[arg(long)]
        queue_depth: u32,
        #[arg(long, default_value_t = layout::descriptor::SIZE as u32)]
        request_size: u32,
        /// Only this slot.
        #[arg(long)]
        slot: Option<usize>,
    },
    /// Check an ISP program buffer's magic and version, then print it.
    Program {
        file: PathBuf,
        /// The file starts with an `isp_program_descriptor`.
        #[arg(long)]
        with_descriptor: bool,
    },
    /// Canonicalize a CSI data type name.
    Datatype {
        name: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Layout => cmd_layout(),
        Cmd::Classify {
            status,
            notify,
            nvcsi_vc,
            channel_in_error,
        } => cmd_classify(status, notify, nvcsi_vc, channel_in_error)?,
        Cmd::CheckConfig {
            requests,
            memoryinfo,
            queue_depth,
            request_size,
            memoryinfo_size,
            flags,
            dump,
        } => {
            let builder = ChannelConfig::builder()
                .flags(ChannelFlags::from_bits_retain(flags))
                .requests(requests)
                .requests_memoryinfo(memoryinfo)
                .queue_depth(queue_depth)
                .request_size(request_size)
                .request_memoryinfo_size(memoryinfo_size);
            cmd_check_config(builder.build(), dump)?;
        }
        Cmd::Decode {
            file,
            queue_depth,
            request_size,
            slot,
        } => cmd_decode(&file, queue_depth, request_size, slot)?,
        Cmd::Program { file, with_descriptor } => cmd_program(&file, with_descriptor)?,
        Cmd::Datatype { name } => cmd_datatype(&name)?,
    }

    Ok(())
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("{s}: {e}"))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let v = parse_u64(s)?;
    u32::try_from(v).map_err(|_| format!("{s}: does not fit in 32 bits"))
}

fn cmd_layout() {
    let records = [
        ("syncpoint_info", layout::syncpoint::SIZE, layout::IVC_ALIGN),
        ("capture_channel_config", layout::channel_config::SIZE, layout::IVC_ALIGN),
        ("capture_descriptor", layout::descriptor::SIZE, layout::DESCRIPTOR_ALIGN),
        ("vi_channel_config", layout::vi_channel::SIZE, layout::IVC_ALIGN),
        ("vi_pfsd_config", layout::pfsd::SIZE, layout::IVC_ALIGN),
        ("capture_status", layout::status::SIZE, layout::IVC_ALIGN),
        ("capture_descriptor_memoryinfo", layout::memoryinfo::SIZE, layout::DESCRIPTOR_ALIGN),
        ("capture_channel_isp_config", layout::isp_channel_config::SIZE, layout::IVC_ALIGN),
        ("capture_isp_status", layout::isp_status::SIZE, layout::IVC_ALIGN),
        ("isp_program_descriptor", layout::program_descriptor::SIZE, layout::DESCRIPTOR_ALIGN),
    ];

    println!("{:<32} {:>6} {:>6}", "record", "size", "align");
    for (name, size, align) in records {
        println!("{name:<32} {size:>6} {align:>6}");
    }

    println!();
    println!("capture_descriptor fields:");
    for (name, offset) in [
        ("sequence", layout::descriptor::SEQUENCE),
        ("capture_flags", layout::descriptor::CAPTURE_FLAGS),
        ("frame_start_timeout", layout::descriptor::FRAME_START_TIMEOUT),
        ("frame_completion_timeout", layout::descriptor::FRAME_COMPLETION_TIMEOUT),
        ("prefence_count", layout::descriptor::PREFENCE_COUNT),
        ("prefence", layout::descriptor::PREFENCE),
        ("ch_cfg", layout::descriptor::VI_CHANNEL_CONFIG),
        ("pfsd_cfg", layout::descriptor::PFSD_CONFIG),
        ("engine_status", layout::descriptor::ENGINE_STATUS),
        ("status", layout::descriptor::STATUS),
        ("output_buffer_id", layout::descriptor::OUTPUT_BUFFER_ID),
        ("watermark_offset", layout::descriptor::WATERMARK_OFFSET),
    ] {
        println!("  {offset:>4}  {name}");
    }

    println!();
    println!("Queue depth       : {}..={}", layout::MIN_QUEUE_DEPTH, layout::MAX_QUEUE_DEPTH);
    println!("ISP program depth : {}..={}", layout::MIN_QUEUE_DEPTH, layout::MAX_PROGRAM_QUEUE_DEPTH);
    println!("Surface alignment : {}", layout::SURFACE_ALIGN);
    println!("GoS table align   : {}", layout::GOS_TABLE_ALIGN);
}

fn print_classification(c: &Classification) {
    println!("verdict: {:?}", c.verdict());
    for d in c.diagnostics() {
        let tag = if d.is_corrupting() { "corrupting" } else { "advisory" };
        println!("  [{tag:>10}] {d}");
    }
}

fn cmd_classify(raw: u32, notify: u64, nvcsi_vc: u32, channel_in_error: bool) -> Result<()> {
    let status = StatusCode::from_raw(raw).ok_or_else(|| CaptureError::invalid_status("capture_status", raw))?;
    let mut record = CaptureStatus {
        status,
        notify_bits: notify,
        nvcsi: NvcsiErrorStatus {
            virtual_channel_bits: nvcsi_vc,
            ..NvcsiErrorStatus::default()
        },
        ..CaptureStatus::default()
    };
    if channel_in_error {
        record.flags |= camrtc_capture::StatusFlags::CHANNEL_IN_ERROR;
    }

    println!("status: {} ({raw})", status.name());
    print_classification(&classify_status(&record));
    Ok(())
}

fn cmd_check_config(result: camrtc_capture::Result<ChannelConfig>, dump: bool) -> Result<()> {
    match result {
        Ok(config) => {
            println!("ok");
            println!(
                "  {} slots x {} bytes = {} bytes of request ring",
                config.queue_depth().get(),
                config.request_size(),
                config.request_ring_bytes()
            );
            if dump {
                let bytes = config.encode()?;
                for (i, row) in bytes.chunks(16).enumerate() {
                    let hex: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
                    println!("  {:04x}: {}", i * 16, hex.join(" "));
                }
            }
            Ok(())
        }
        Err(CaptureError::ConfigurationInvalid(violation)) => {
            println!("rejected: {violation}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_decode(file: &Path, queue_depth: u32, request_size: u32, only: Option<usize>) -> Result<()> {
    let depth = QueueDepth::new(queue_depth)?;
    let slot_size = request_size as usize;
    anyhow::ensure!(
        slot_size >= layout::descriptor::SIZE,
        "request size {slot_size} is smaller than a {}-byte descriptor",
        layout::descriptor::SIZE
    );

    let dump = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let needed = depth.slots() * slot_size;
    anyhow::ensure!(
        dump.len() >= needed,
        "{} holds {} bytes, ring needs {needed}",
        file.display(),
        dump.len()
    );

    let slots: Vec<usize> = match only {
        Some(i) => {
            anyhow::ensure!(i < depth.slots(), "slot {i} outside a {}-slot ring", depth.slots());
            vec![i]
        }
        None => (0..depth.slots()).collect(),
    };

    for i in slots {
        let slot = &dump[i * slot_size..(i + 1) * slot_size];
        let sequence = descriptor_sequence(slot)?;
        match decode_status(slot) {
            Ok(status) => {
                println!(
                    "slot {i:>3}  seq {sequence:>10}  {}  frame {}",
                    status.status.name(),
                    status.frame_id
                );
                let c = classify_status(&status);
                print_classification(&c);
            }
            Err(e) => println!("slot {i:>3}  seq {sequence:>10}  {e}"),
        }
    }
    Ok(())
}

fn cmd_program(file: &Path, with_descriptor: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;

    let program_bytes = if with_descriptor {
        let desc = ProgramDescriptor::decode(&bytes)?;
        println!("descriptor:");
        println!("  settings_id   : {}", desc.settings_id);
        match desc.vi_channel_id {
            Some(vi) => println!("  vi_channel_id : {vi}"),
            None => println!("  vi_channel_id : none (memory-to-memory)"),
        }
        println!("  sequence      : {}", desc.sequence);
        println!("  program       : {} bytes at +{}", desc.isp_program_size, desc.isp_program_offset);
        println!("  activate      : {:?}", desc.activate_flags);
        if let Some(st) = desc.program_status {
            println!("  last status   : {:?} (errors {:?})", st.status, st.error_mask);
        }
        desc.validate()?;
        let start = desc.isp_program_offset as usize;
        bytes
            .get(start..)
            .with_context(|| format!("program offset {start} past end of file"))?
    } else {
        &bytes[..]
    };

    let program = IspProgram::decode(program_bytes)?;
    let stats = program.stats_layout();
    println!("ISP program ({:?})", program.isp_type);
    println!("  enables_config : {:#010x}", program.enables_config);
    println!("  stats_aidx     : {:#010x}", program.stats_aidx_flag);
    println!("  pushbuffer     : {} words", program.pushbuffer.len());
    println!("  overfetch      : {:?}", program.overfetch);
    for (i, crop) in program.mw_crop.iter().enumerate() {
        println!(
            "  mw{i} crop       : [{}..={}] x [{}..={}]",
            crop.left, crop.right, crop.top, crop.bottom
        );
    }
    println!("  stats surface  : {} bytes", stats.total);
    Ok(())
}

fn cmd_datatype(name: &str) -> Result<()> {
    let (dt, spelling) = CsiDataType::lookup(name)?;
    let note = match spelling {
        Spelling::Canonical => "",
        Spelling::Legacy => "  (legacy spelling)",
    };
    println!("{}{note}", dt.canonical_name());
    Ok(())
}
