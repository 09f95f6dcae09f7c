//! Alignment and sizing rules.
//!
//! Pure predicates over configuration values. Each returns the first
//! rule it finds broken; none of them keep state or log. Callers run them
//! once per configuration event, before any ring reaches the coprocessor.

use camrtc_abi::layout::{self, is_aligned};

use crate::ConfigViolation;

type Check = std::result::Result<(), ConfigViolation>;

/// Ring base address: non-zero and descriptor aligned.
pub fn ring_base(field: &'static str, base: u64) -> Check {
    if base == 0 {
        return Err(ConfigViolation::ZeroAddress { field });
    }
    aligned(field, base, layout::DESCRIPTOR_ALIGN as u64)
}

/// Ring entry size: descriptor aligned and large enough for `min` bytes.
pub fn entry_size(field: &'static str, size: u32, min: usize) -> Check {
    aligned(field, u64::from(size), layout::DESCRIPTOR_ALIGN as u64)?;
    if (size as usize) < min {
        return Err(ConfigViolation::EntryTooSmall {
            field,
            size,
            min: min as u32,
        });
    }
    Ok(())
}

/// Request ring geometry: base address plus per-slot size.
///
/// Passes iff the base is non-zero, both values are multiples of
/// 64 bytes, and the size holds a full capture descriptor.
pub fn ring_geometry(base: u64, request_size: u32) -> Check {
    ring_base("requests", base)?;
    entry_size("request_size", request_size, layout::descriptor::SIZE)
}

/// Whole ring (`depth` slots of `entry_size` bytes) within `MAX_RING_BYTES`.
pub fn ring_bytes(field: &'static str, depth: u32, entry_size: u32) -> Check {
    at_most(field, u64::from(depth) * u64::from(entry_size), layout::MAX_RING_BYTES)
}

/// Queue depth within `MIN_QUEUE_DEPTH..=max`.
pub fn queue_depth(field: &'static str, depth: u32, max: u32) -> Check {
    if (layout::MIN_QUEUE_DEPTH..=max).contains(&depth) {
        Ok(())
    } else {
        Err(ConfigViolation::QueueDepthOutOfRange {
            field,
            depth,
            min: layout::MIN_QUEUE_DEPTH,
            max,
        })
    }
}

/// Grid-of-Semaphores table list: bounded count, each 256-byte aligned.
pub fn gos_tables(field: &'static str, tables: &[u64], max: usize) -> Check {
    if tables.len() > max {
        return Err(ConfigViolation::TooManyGosTables {
            count: tables.len(),
            max,
        });
    }
    for &table in tables {
        if table == 0 {
            return Err(ConfigViolation::ZeroAddress { field });
        }
        aligned(field, table, layout::GOS_TABLE_ALIGN)?;
    }
    Ok(())
}

/// `value <= max`.
pub fn at_most(field: &'static str, value: u64, max: u64) -> Check {
    if value <= max {
        Ok(())
    } else {
        Err(ConfigViolation::FieldOutOfRange { field, value, max })
    }
}

/// `value` is a multiple of `align` (a power of two).
pub fn aligned(field: &'static str, value: u64, align: u64) -> Check {
    if is_aligned(value, align) {
        Ok(())
    } else {
        Err(ConfigViolation::Misaligned { field, value, align })
    }
}

/// Memory-info surface: base and size 16-byte aligned, base set when size is.
pub fn surface(field: &'static str, base: u64, size: u64) -> Check {
    aligned(field, base, layout::SURFACE_ALIGN)?;
    aligned(field, size, layout::SURFACE_ALIGN)?;
    if size > 0 && base == 0 {
        return Err(ConfigViolation::ZeroAddress { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_accepts_aligned_full_descriptor() {
        assert_eq!(ring_geometry(0x1000, 384), Ok(()));
        assert_eq!(ring_geometry(0x1040, 448), Ok(()));
    }

    #[test]
    fn geometry_rejects_each_rule_deterministically() {
        assert_eq!(ring_geometry(0, 384), Err(ConfigViolation::ZeroAddress { field: "requests" }));
        assert_eq!(
            ring_geometry(0x1008, 384),
            Err(ConfigViolation::Misaligned { field: "requests", value: 0x1008, align: 64 })
        );
        assert_eq!(
            ring_geometry(0x1000, 400),
            Err(ConfigViolation::Misaligned { field: "request_size", value: 400, align: 64 })
        );
        assert_eq!(
            ring_geometry(0x1000, 320),
            Err(ConfigViolation::EntryTooSmall { field: "request_size", size: 320, min: 384 })
        );
        // Repeated evaluation gives the same answer.
        assert_eq!(ring_geometry(0x1000, 320), ring_geometry(0x1000, 320));
    }

    #[test]
    fn geometry_iff_property() {
        for base in [0u64, 8, 64, 0x40, 0x1000, 0x1010, 0xFFFF_FFC0] {
            for size in [0u32, 64, 320, 384, 390, 448, 512, 1024] {
                let expected = base != 0 && base % 64 == 0 && size % 64 == 0 && size >= 384;
                assert_eq!(ring_geometry(base, size).is_ok(), expected, "{base:#x} {size}");
            }
        }
    }

    #[test]
    fn queue_depth_bounds() {
        assert!(queue_depth("queue_depth", 1, 240).is_ok());
        assert!(queue_depth("queue_depth", 240, 240).is_ok());
        assert!(queue_depth("queue_depth", 0, 240).is_err());
        assert!(queue_depth("queue_depth", 241, 240).is_err());
        assert!(queue_depth("program_queue_depth", 33, 32).is_err());
    }

    #[test]
    fn gos_table_rules() {
        assert!(gos_tables("vi_gos_tables", &[0x100, 0x200], 12).is_ok());
        assert!(gos_tables("vi_gos_tables", &[0x180], 12).is_err());
        assert!(gos_tables("vi_gos_tables", &[0], 12).is_err());
        assert_eq!(
            gos_tables("isp_gos_tables", &[0x100; 9], 8),
            Err(ConfigViolation::TooManyGosTables { count: 9, max: 8 })
        );
    }

    #[test]
    fn surface_rules() {
        assert!(surface("surface[0]", 0, 0).is_ok());
        assert!(surface("surface[0]", 0x10, 0x20).is_ok());
        assert!(surface("surface[0]", 0, 0x20).is_err());
        assert!(surface("surface[0]", 0x18, 0x20).is_err());
        assert!(surface("surface[0]", 0x10, 0x21).is_err());
    }
}
