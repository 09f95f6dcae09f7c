//! Syncpoint descriptors.

use bytes::{Buf, BufMut};
use camrtc_abi::layout::{self, syncpoint};

use crate::{validate, ConfigViolation, Result};

/// Grid-of-Semaphores slot mirroring a syncpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GosSlot {
    sid: u8,
    index: u8,
    offset: u16,
}

impl GosSlot {
    /// Validate a GoS slot.
    ///
    /// # Errors
    ///
    /// SID must be `1..=127`, offset `0..=63`, and index must not be the
    /// reserved "invalid" value.
    pub fn new(sid: u8, index: u8, offset: u16) -> Result<Self> {
        if sid == 0 {
            return Err(ConfigViolation::inconsistent("GoS SID 0 is reserved").into());
        }
        validate::at_most("gos_sid", sid.into(), syncpoint::GOS_SID_MAX.into())?;
        validate::at_most("gos_offset", offset.into(), syncpoint::GOS_OFFSET_MAX.into())?;
        if index == syncpoint::GOS_INDEX_INVALID {
            return Err(ConfigViolation::inconsistent("GoS index 0xFF means no GoS").into());
        }
        Ok(Self { sid, index, offset })
    }

    #[must_use]
    pub const fn sid(&self) -> u8 {
        self.sid
    }

    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    #[must_use]
    pub const fn offset(&self) -> u16 {
        self.offset
    }
}

/// `syncpoint_info`: a hardware counter and its initial threshold.
///
/// Id 0 means the syncpoint is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyncpointInfo {
    id: u32,
    threshold: u32,
    gos: Option<GosSlot>,
    shim_addr: u64,
}

impl SyncpointInfo {
    /// Unused syncpoint.
    pub const UNUSED: Self = Self {
        id: syncpoint::ID_INVALID,
        threshold: 0,
        gos: None,
        shim_addr: 0,
    };

    /// Syncpoint `id` whose hardware counter currently reads `threshold`.
    #[must_use]
    pub const fn new(id: u32, threshold: u32) -> Self {
        Self {
            id,
            threshold,
            gos: None,
            shim_addr: 0,
        }
    }

    /// Mirror the syncpoint into a GoS slot.
    #[must_use]
    pub const fn with_gos(mut self, gos: GosSlot) -> Self {
        self.gos = Some(gos);
        self
    }

    /// Attach the syncpoint shim register address.
    ///
    /// # Errors
    ///
    /// The address must be a multiple of 4.
    pub fn with_shim_addr(mut self, addr: u64) -> Result<Self> {
        validate::aligned("shim_addr", addr, layout::SHIM_ADDR_ALIGN)?;
        self.shim_addr = addr;
        Ok(self)
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub const fn gos(&self) -> Option<GosSlot> {
        self.gos
    }

    #[must_use]
    pub const fn shim_addr(&self) -> u64 {
        self.shim_addr
    }

    #[must_use]
    pub const fn is_used(&self) -> bool {
        self.id != syncpoint::ID_INVALID
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.id);
        buf.put_u32_le(self.threshold);
        match self.gos {
            Some(g) => {
                buf.put_u8(g.sid);
                buf.put_u8(g.index);
                buf.put_u16_le(g.offset);
            }
            None => {
                buf.put_u8(0);
                buf.put_u8(syncpoint::GOS_INDEX_INVALID);
                buf.put_u16_le(0);
            }
        }
        buf.put_u32_le(0);
        buf.put_u64_le(self.shim_addr);
    }

    /// Read one record; the caller guarantees 24 bytes remain.
    pub(crate) fn get(buf: &mut impl Buf) -> Result<Self> {
        let id = buf.get_u32_le();
        let threshold = buf.get_u32_le();
        let sid = buf.get_u8();
        let index = buf.get_u8();
        let offset = buf.get_u16_le();
        buf.advance(4);
        let shim_addr = buf.get_u64_le();

        let gos = if index == syncpoint::GOS_INDEX_INVALID {
            None
        } else {
            Some(GosSlot::new(sid, index, offset)?)
        };
        Self { id, threshold, gos, shim_addr: 0 }.with_shim_addr(shim_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn gos_ranges() {
        assert!(GosSlot::new(1, 0, 0).is_ok());
        assert!(GosSlot::new(127, 3, 63).is_ok());
        assert!(GosSlot::new(0, 0, 0).is_err());
        assert!(GosSlot::new(128, 0, 0).is_err());
        assert!(GosSlot::new(1, 0, 64).is_err());
        assert!(GosSlot::new(1, 0xFF, 0).is_err());
    }

    #[test]
    fn shim_alignment() {
        assert!(SyncpointInfo::new(7, 0).with_shim_addr(0x1000_0004).is_ok());
        assert!(SyncpointInfo::new(7, 0).with_shim_addr(0x1000_0002).is_err());
    }

    #[test]
    fn record_is_24_bytes_and_reads_back() {
        let sp = SyncpointInfo::new(12, 400)
            .with_gos(GosSlot::new(9, 2, 17).unwrap())
            .with_shim_addr(0x6000_0010)
            .unwrap();
        let mut buf = BytesMut::new();
        sp.put(&mut buf);
        assert_eq!(buf.len(), syncpoint::SIZE);
        assert_eq!(buf[syncpoint::GOS_INDEX], 2);
        let mut rd = &buf[..];
        assert_eq!(SyncpointInfo::get(&mut rd).unwrap(), sp);
    }

    #[test]
    fn unused_syncpoint_encodes_invalid_gos_index() {
        let mut buf = BytesMut::new();
        SyncpointInfo::UNUSED.put(&mut buf);
        assert_eq!(buf[syncpoint::GOS_INDEX], syncpoint::GOS_INDEX_INVALID);
        assert!(!SyncpointInfo::UNUSED.is_used());
    }
}
