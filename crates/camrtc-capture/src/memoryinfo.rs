//! Per-request memory-info record (`capture_descriptor_memoryinfo`).
//!
//! Lives in its own ring, slot-for-slot beside the request ring, and
//! carries the IOVAs of every surface the descriptor refers to.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use camrtc_abi::layout::{self, memoryinfo as off};

use crate::{validate, wire, ConfigViolation, Result};

/// One surface: base IOVA and size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Surface {
    pub base_address: u64,
    pub size: u64,
}

impl Surface {
    #[must_use]
    pub const fn new(base_address: u64, size: u64) -> Self {
        Self { base_address, size }
    }

    #[must_use]
    pub const fn is_unused(&self) -> bool {
        self.size == 0
    }
}

/// IOVAs for one capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryInfo {
    /// Pixel planes and embedded data, in ATOMP surface order.
    pub surfaces: [Surface; layout::VI_NUM_ATOMP_SURFACES],
    /// Engine status record; size 0 leaves it unused.
    pub engine_status: Surface,
    pub watermark: Surface,
}

impl MemoryInfo {
    /// Check surface alignment and sizing.
    ///
    /// # Errors
    ///
    /// A misaligned base or size, a sized surface at IOVA 0, or an engine
    /// status surface too small for its record.
    pub fn validate(&self) -> Result<()> {
        const SURFACE_FIELDS: [&str; layout::VI_NUM_ATOMP_SURFACES] =
            ["surface[0]", "surface[1]", "surface[2]", "surface[3]"];
        for (field, s) in SURFACE_FIELDS.into_iter().zip(&self.surfaces) {
            validate::surface(field, s.base_address, s.size)?;
        }

        let es = &self.engine_status;
        validate::surface("engine_status", es.base_address, es.size)?;
        if es.size != 0 && es.size < layout::ENGINE_STATUS_SURFACE_SIZE {
            return Err(ConfigViolation::EntryTooSmall {
                field: "engine_status",
                size: es.size as u32,
                min: layout::ENGINE_STATUS_SURFACE_SIZE as u32,
            }
            .into());
        }
        if es.size > u64::from(u32::MAX) {
            return Err(ConfigViolation::out_of_range("engine_status", es.size, u32::MAX).into());
        }

        validate::surface("watermark", self.watermark.base_address, self.watermark.size)?;
        Ok(())
    }

    /// Encode the 128-byte record.
    ///
    /// # Errors
    ///
    /// Anything [`validate`](Self::validate) rejects.
    pub fn encode(&self) -> Result<Bytes> {
        self.validate()?;
        let mut buf = BytesMut::with_capacity(off::SIZE);
        self.put(&mut buf);
        wire::finish(buf, off::SIZE, "capture_descriptor_memoryinfo")
    }

    /// Decode a 128-byte record.
    ///
    /// # Errors
    ///
    /// `LayoutMismatch` on a short buffer, then anything
    /// [`validate`](Self::validate) rejects.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut rd = wire::record(bytes, 0, off::SIZE, "capture_descriptor_memoryinfo")?;
        let mut info = Self::default();
        for s in &mut info.surfaces {
            *s = Surface::new(rd.get_u64_le(), rd.get_u64_le());
        }
        info.engine_status.base_address = rd.get_u64_le();
        info.engine_status.size = u64::from(rd.get_u32_le());
        rd.advance(4);
        info.watermark = Surface::new(rd.get_u64_le(), rd.get_u64_le());
        info.validate()?;
        Ok(info)
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        for s in &self.surfaces {
            buf.put_u64_le(s.base_address);
            buf.put_u64_le(s.size);
        }
        buf.put_u64_le(self.engine_status.base_address);
        buf.put_u32_le(self.engine_status.size as u32);
        buf.put_u32_le(0);
        buf.put_u64_le(self.watermark.base_address);
        buf.put_u64_le(self.watermark.size);
        buf.put_bytes(0, off::SIZE - off::RESERVED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CaptureError;

    fn info() -> MemoryInfo {
        MemoryInfo {
            surfaces: [
                Surface::new(0x1_0000_0000, 1920 * 1080 * 2),
                Surface::default(),
                Surface::default(),
                Surface::new(0x2000_0000, 4800),
            ],
            engine_status: Surface::new(0x3000_0000, 16),
            watermark: Surface::new(0x3000_1000, 0x1000),
        }
    }

    #[test]
    fn encodes_at_header_offsets() {
        let bytes = info().encode().unwrap();
        assert_eq!(bytes.len(), off::SIZE);
        assert_eq!(&bytes[off::SURFACES..off::SURFACES + 8], &0x1_0000_0000u64.to_le_bytes());
        assert_eq!(&bytes[off::ENGINE_STATUS_SIZE..off::ENGINE_STATUS_SIZE + 4], &16u32.to_le_bytes());
        assert_eq!(&bytes[off::WATERMARK_SURFACE..off::WATERMARK_SURFACE + 8], &0x3000_1000u64.to_le_bytes());
        assert_eq!(MemoryInfo::decode(&bytes).unwrap(), info());
    }

    #[test]
    fn surface_rules() {
        let mut m = info();
        m.surfaces[1] = Surface::new(0x1008, 64);
        assert!(matches!(
            m.encode(),
            Err(CaptureError::ConfigurationInvalid(ConfigViolation::Misaligned { field: "surface[1]", .. }))
        ));

        let mut m = info();
        m.surfaces[2] = Surface::new(0, 64);
        assert!(m.validate().is_err());
    }

    #[test]
    fn engine_status_size() {
        let mut m = info();
        m.engine_status = Surface::default();
        assert!(m.validate().is_ok());
        // 0 < size < 16 cannot be 16-aligned, so alignment catches it first.
        m.engine_status = Surface::new(0x3000_0000, 8);
        assert!(m.validate().is_err());
        m.engine_status = Surface::new(0x3000_0000, 32);
        assert!(m.validate().is_ok());
    }
}
