//! Per-frame VI channel settings and permanent-fault diagnostics.
//!
//! Both records are embedded in every capture descriptor. Field ranges
//! are checked by `validate()` before a descriptor is written.

use bytes::{Buf, BufMut};
use camrtc_abi::flags::dpcm;
use camrtc_abi::layout::{self, pfsd as pfsd_off, vi_channel as off};

use crate::flags::ViChannelFlags;
use crate::validate::at_most;
use crate::{ConfigViolation, Result};

/// Largest stride, clamp and PFSD test-pattern value (20 bits).
pub const MAX_20BIT: u32 = 0xF_FFFF;
/// Largest embedded data line length in bytes.
pub const MAX_EMBED_X: u32 = 131_071;
/// Largest embedded data line count.
pub const MAX_EMBED_Y: u32 = 65_535;
/// Largest DOL header select.
pub const MAX_DOL_HEADER_SEL: u8 = 3;
/// Largest match stream and stream mask.
pub const MAX_STREAM_MASK: u8 = 0x3F;
/// Largest PFSD expected-region length in bytes.
pub const MAX_PFSD_LEN: u32 = 255;

/// Frame match rule (`match_rec`). A frame matches when every
/// `(value & mask)` equals `(incoming & mask)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchRule {
    pub datatype: u8,
    pub datatype_mask: u8,
    pub stream: u8,
    pub stream_mask: u8,
    pub vc: u16,
    pub vc_mask: u16,
    pub frame_id: u16,
    pub frame_id_mask: u16,
    pub dol: u16,
    pub dol_mask: u16,
}

/// Crop/skip corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Corner {
    pub x: u16,
    pub y: u16,
}

/// Frame geometry (`vi_frame_config`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameGeometry {
    /// Width in pixels before cropping.
    pub frame_x: u16,
    /// Height in lines before cropping.
    pub frame_y: u16,
    /// Embedded data bytes per line.
    pub embed_x: u32,
    /// Embedded data lines per frame.
    pub embed_y: u32,
    /// Top-left crop corner; `x` counts groups of 8 pixels, 0 disables.
    pub skip: Corner,
    /// Bottom-right crop corner; 0 means 65536.
    pub crop: Corner,
}

impl FrameGeometry {
    /// Effective crop edge; zero stands for 65536.
    const fn crop_edge(v: u16) -> u32 {
        if v == 0 {
            65_536
        } else {
            v as u32
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigViolation> {
        at_most("frame.embed_x", self.embed_x.into(), MAX_EMBED_X.into())?;
        at_most("frame.embed_y", self.embed_y.into(), MAX_EMBED_Y.into())?;

        let max_skip_x = (u32::from(self.frame_x).min(Self::crop_edge(self.crop.x))).saturating_sub(1) / 8;
        at_most("frame.skip.x", self.skip.x.into(), max_skip_x.into())?;
        let max_skip_y = (u32::from(self.frame_y).min(Self::crop_edge(self.crop.y))).saturating_sub(1);
        at_most("frame.skip.y", self.skip.y.into(), max_skip_y.into())
    }
}

/// PDAF pixel separation and replacement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdafConfig {
    pub crop_left: u16,
    pub crop_right: u16,
    pub crop_top: u16,
    pub crop_bottom: u16,
    pub replace_crop_left: u16,
    pub replace_crop_right: u16,
    pub replace_crop_top: u16,
    pub replace_crop_bottom: u16,
    pub last_pixel_x: u16,
    pub last_pixel_y: u16,
    pub replace_value: u16,
    pub format: u8,
}

/// Pixel formatter (`pixfmt_rec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelFormat {
    pub format: u16,
    pub pad0_en: bool,
    pub pdaf: PdafConfig,
}

/// DPCM chunking (`dpcm_rec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DpcmConfig {
    /// Deprecated.
    pub strip_width: u16,
    pub strip_overfetch: u16,
    pub chunk_first: u16,
    pub chunk_body: u16,
    pub chunk_body_count: u16,
    pub chunk_penultimate: u16,
    pub chunk_last: u16,
    pub clamp_high: u32,
    pub clamp_low: u32,
}

/// Memory writer (`atomp_rec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtompConfig {
    /// Surface offsets (or IOVAs when the KMD patches them).
    pub surface: [u64; layout::VI_NUM_ATOMP_SURFACES],
    /// Line strides in bytes.
    pub surface_stride: [u32; layout::VI_NUM_ATOMP_SURFACES],
    pub dpcm_chunk_stride: u32,
}

/// `vi_channel_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViChannelConfig {
    pub flags: ViChannelFlags,
    pub match_rule: MatchRule,
    pub dol_header_sel: u8,
    pub dt_override: u8,
    pub dpcm_mode: u8,
    pub frame: FrameGeometry,
    /// Lines between memory flushes; 0 means 65536.
    pub flush: u16,
    pub flush_first: u16,
    /// Lines between line timer events; 0 means 65536.
    pub line_timer: u16,
    pub line_timer_first: u16,
    pub pixfmt: PixelFormat,
    pub dpcm: DpcmConfig,
    pub atomp: AtompConfig,
}

impl ViChannelConfig {
    /// Check every documented field range.
    ///
    /// # Errors
    ///
    /// The first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        at_most("match.stream", self.match_rule.stream.into(), MAX_STREAM_MASK.into())?;
        at_most("match.stream_mask", self.match_rule.stream_mask.into(), MAX_STREAM_MASK.into())?;
        at_most("dol_header_sel", self.dol_header_sel.into(), MAX_DOL_HEADER_SEL.into())?;
        at_most("dpcm_mode", self.dpcm_mode.into(), dpcm::RAW20.into())?;
        self.frame.validate()?;
        at_most("dpcm.clamp_high", self.dpcm.clamp_high.into(), MAX_20BIT.into())?;
        at_most("dpcm.clamp_low", self.dpcm.clamp_low.into(), MAX_20BIT.into())?;
        for stride in self.atomp.surface_stride {
            at_most("atomp.surface_stride", stride.into(), MAX_20BIT.into())?;
        }
        at_most("atomp.dpcm_chunk_stride", self.atomp.dpcm_chunk_stride.into(), MAX_20BIT.into())?;
        Ok(())
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.flags.bits());

        let m = &self.match_rule;
        buf.put_u8(m.datatype);
        buf.put_u8(m.datatype_mask);
        buf.put_u8(m.stream);
        buf.put_u8(m.stream_mask);
        for v in [m.vc, m.vc_mask, m.frame_id, m.frame_id_mask, m.dol, m.dol_mask] {
            buf.put_u16_le(v);
        }

        buf.put_u8(self.dol_header_sel);
        buf.put_u8(self.dt_override);
        buf.put_u8(self.dpcm_mode);
        buf.put_u8(0);

        let f = &self.frame;
        buf.put_u16_le(f.frame_x);
        buf.put_u16_le(f.frame_y);
        buf.put_u32_le(f.embed_x);
        buf.put_u32_le(f.embed_y);
        for v in [f.skip.x, f.skip.y, f.crop.x, f.crop.y] {
            buf.put_u16_le(v);
        }

        for v in [self.flush, self.flush_first, self.line_timer, self.line_timer_first] {
            buf.put_u16_le(v);
        }

        let p = &self.pixfmt;
        buf.put_u16_le(p.format);
        buf.put_u8(u8::from(p.pad0_en));
        buf.put_u8(0);
        let d = &p.pdaf;
        for v in [
            d.crop_left,
            d.crop_right,
            d.crop_top,
            d.crop_bottom,
            d.replace_crop_left,
            d.replace_crop_right,
            d.replace_crop_top,
            d.replace_crop_bottom,
            d.last_pixel_x,
            d.last_pixel_y,
            d.replace_value,
        ] {
            buf.put_u16_le(v);
        }
        buf.put_u8(d.format);
        buf.put_u8(0);

        let c = &self.dpcm;
        for v in [
            c.strip_width,
            c.strip_overfetch,
            c.chunk_first,
            c.chunk_body,
            c.chunk_body_count,
            c.chunk_penultimate,
            c.chunk_last,
            0,
        ] {
            buf.put_u16_le(v);
        }
        buf.put_u32_le(c.clamp_high);
        buf.put_u32_le(c.clamp_low);

        let a = &self.atomp;
        for surface in a.surface {
            buf.put_u32_le(surface as u32);
            buf.put_u32_le((surface >> 32) as u32);
        }
        for stride in a.surface_stride {
            buf.put_u32_le(stride);
        }
        buf.put_u32_le(a.dpcm_chunk_stride);
        buf.put_u32_le(0);
    }

    /// Read one record; the caller guarantees 160 bytes remain.
    pub(crate) fn get(buf: &mut impl Buf) -> Self {
        let flags = ViChannelFlags::from_bits_retain(buf.get_u32_le());

        let match_rule = MatchRule {
            datatype: buf.get_u8(),
            datatype_mask: buf.get_u8(),
            stream: buf.get_u8(),
            stream_mask: buf.get_u8(),
            vc: buf.get_u16_le(),
            vc_mask: buf.get_u16_le(),
            frame_id: buf.get_u16_le(),
            frame_id_mask: buf.get_u16_le(),
            dol: buf.get_u16_le(),
            dol_mask: buf.get_u16_le(),
        };

        let dol_header_sel = buf.get_u8();
        let dt_override = buf.get_u8();
        let dpcm_mode = buf.get_u8();
        buf.advance(1);

        let frame = FrameGeometry {
            frame_x: buf.get_u16_le(),
            frame_y: buf.get_u16_le(),
            embed_x: buf.get_u32_le(),
            embed_y: buf.get_u32_le(),
            skip: Corner {
                x: buf.get_u16_le(),
                y: buf.get_u16_le(),
            },
            crop: Corner {
                x: buf.get_u16_le(),
                y: buf.get_u16_le(),
            },
        };

        let flush = buf.get_u16_le();
        let flush_first = buf.get_u16_le();
        let line_timer = buf.get_u16_le();
        let line_timer_first = buf.get_u16_le();

        let format = buf.get_u16_le();
        let pad0_en = buf.get_u8() != 0;
        buf.advance(1);
        let pdaf = PdafConfig {
            crop_left: buf.get_u16_le(),
            crop_right: buf.get_u16_le(),
            crop_top: buf.get_u16_le(),
            crop_bottom: buf.get_u16_le(),
            replace_crop_left: buf.get_u16_le(),
            replace_crop_right: buf.get_u16_le(),
            replace_crop_top: buf.get_u16_le(),
            replace_crop_bottom: buf.get_u16_le(),
            last_pixel_x: buf.get_u16_le(),
            last_pixel_y: buf.get_u16_le(),
            replace_value: buf.get_u16_le(),
            format: buf.get_u8(),
        };
        buf.advance(1);

        let dpcm = DpcmConfig {
            strip_width: buf.get_u16_le(),
            strip_overfetch: buf.get_u16_le(),
            chunk_first: buf.get_u16_le(),
            chunk_body: buf.get_u16_le(),
            chunk_body_count: buf.get_u16_le(),
            chunk_penultimate: buf.get_u16_le(),
            chunk_last: buf.get_u16_le(),
            clamp_high: {
                buf.advance(2);
                buf.get_u32_le()
            },
            clamp_low: buf.get_u32_le(),
        };

        let mut atomp = AtompConfig::default();
        for surface in &mut atomp.surface {
            let lo = u64::from(buf.get_u32_le());
            let hi = u64::from(buf.get_u32_le());
            *surface = hi << 32 | lo;
        }
        for stride in &mut atomp.surface_stride {
            *stride = buf.get_u32_le();
        }
        atomp.dpcm_chunk_stride = buf.get_u32_le();
        buf.advance(4);

        Self {
            flags,
            match_rule,
            dol_header_sel,
            dt_override,
            dpcm_mode,
            frame,
            flush,
            flush_first,
            line_timer,
            line_timer_first,
            pixfmt: PixelFormat { format, pad0_en, pdaf },
            dpcm,
            atomp,
        }
    }
}

// ── PFSD ─────────────────────────────────────────────────────────────────────

/// Pixel replacement region, inclusive edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceRoi {
    pub left: u16,
    pub right: u16,
    pub top: u16,
    pub bottom: u16,
}

/// One output-surface region whose bytes are checked after capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PfsdRegion {
    /// Byte offset from the start of the surface.
    pub offset: u32,
    /// Bytes to read, at most 255.
    pub len: u32,
    /// Expected byte pattern.
    pub value: [u8; 4],
}

/// `vi_pfsd_config`: inject a test pattern and verify it reaches memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PfsdConfig {
    pub replace_roi: ReplaceRoi,
    /// Test pattern in nvcsi2vi pixel bus format.
    pub replace_value: u32,
    /// Up to two regions; none disables the check for this frame.
    pub expected: Vec<PfsdRegion>,
}

impl PfsdConfig {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Test pattern above 20 bits, more than two regions, or a region
    /// longer than 255 bytes.
    pub fn validate(&self) -> Result<()> {
        at_most("pfsd.replace_value", self.replace_value.into(), MAX_20BIT.into())?;
        at_most(
            "pfsd.expected_count",
            self.expected.len() as u64,
            layout::VI_NUM_PFSD_SURFACES as u64,
        )?;
        for region in &self.expected {
            at_most("pfsd.expected.len", region.len.into(), MAX_PFSD_LEN.into())?;
        }
        Ok(())
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        let r = &self.replace_roi;
        for v in [r.left, r.right, r.top, r.bottom] {
            buf.put_u16_le(v);
        }
        buf.put_u32_le(self.replace_value);
        buf.put_u32_le(self.expected.len() as u32);
        for slot in 0..layout::VI_NUM_PFSD_SURFACES {
            let region = self.expected.get(slot).copied().unwrap_or_default();
            buf.put_u32_le(region.offset);
            buf.put_u32_le(region.len);
            buf.put_slice(&region.value);
        }
    }

    /// Read one record; the caller guarantees 40 bytes remain.
    pub(crate) fn get(buf: &mut impl Buf) -> Result<Self> {
        let replace_roi = ReplaceRoi {
            left: buf.get_u16_le(),
            right: buf.get_u16_le(),
            top: buf.get_u16_le(),
            bottom: buf.get_u16_le(),
        };
        let replace_value = buf.get_u32_le();
        let count = buf.get_u32_le();
        at_most("pfsd.expected_count", count.into(), layout::VI_NUM_PFSD_SURFACES as u64)?;

        let mut expected = Vec::with_capacity(count as usize);
        for slot in 0..layout::VI_NUM_PFSD_SURFACES {
            let offset = buf.get_u32_le();
            let len = buf.get_u32_le();
            let mut value = [0u8; 4];
            buf.copy_to_slice(&mut value);
            if slot < count as usize {
                expected.push(PfsdRegion { offset, len, value });
            }
        }
        Ok(Self {
            replace_roi,
            replace_value,
            expected,
        })
    }
}

const _: () = assert!(off::ATOMP + 56 == off::SIZE);
const _: () = assert!(pfsd_off::EXPECTED + 2 * pfsd_off::EXPECTED_SIZE == pfsd_off::SIZE);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CaptureError;
    use bytes::BytesMut;

    fn sample() -> ViChannelConfig {
        ViChannelConfig {
            flags: ViChannelFlags::DT_ENABLE | ViChannelFlags::PIXFMT_ENABLE,
            match_rule: MatchRule {
                datatype: 0x2B,
                datatype_mask: 0x3F,
                stream: 1,
                stream_mask: 0x3F,
                vc: 2,
                vc_mask: 0xF,
                ..MatchRule::default()
            },
            frame: FrameGeometry {
                frame_x: 1920,
                frame_y: 1080,
                embed_x: 2400,
                embed_y: 2,
                skip: Corner { x: 8, y: 4 },
                crop: Corner { x: 1900, y: 1070 },
            },
            atomp: AtompConfig {
                surface: [0x1_2345_6780, 0, 0, 0x9000],
                surface_stride: [3840, 0, 0, 2400],
                dpcm_chunk_stride: 0,
            },
            ..ViChannelConfig::default()
        }
    }

    #[test]
    fn record_sizes() {
        let mut buf = BytesMut::new();
        sample().put(&mut buf);
        assert_eq!(buf.len(), off::SIZE);

        let mut buf = BytesMut::new();
        PfsdConfig::default().put(&mut buf);
        assert_eq!(buf.len(), pfsd_off::SIZE);
    }

    #[test]
    fn fields_land_on_header_offsets() {
        let mut buf = BytesMut::new();
        sample().put(&mut buf);
        let u16_at = |o: usize| u16::from_le_bytes([buf[o], buf[o + 1]]);
        assert_eq!(buf[off::MATCH], 0x2B);
        assert_eq!(u16_at(off::FRAME), 1920);
        assert_eq!(u16_at(off::FRAME + 2), 1080);
        assert_eq!(u16_at(off::FRAME + 12), 8);
        assert_eq!(u16_at(off::FRAME + 16), 1900);
        assert_eq!(buf[off::ATOMP], 0x80);
        assert_eq!(buf[off::ATOMP + 4], 0x01);
        assert_eq!(u16_at(off::ATOMP + 32), 3840);
    }

    #[test]
    fn reads_back_unchanged() {
        let cfg = sample();
        let mut buf = BytesMut::new();
        cfg.put(&mut buf);
        assert_eq!(ViChannelConfig::get(&mut &buf[..]), cfg);
    }

    #[test]
    fn documented_ranges() {
        assert!(sample().validate().is_ok());

        let mut c = sample();
        c.frame.embed_x = MAX_EMBED_X + 1;
        assert!(c.validate().is_err());

        let mut c = sample();
        c.dol_header_sel = 4;
        assert!(c.validate().is_err());

        let mut c = sample();
        c.match_rule.stream_mask = 0x40;
        assert!(c.validate().is_err());

        let mut c = sample();
        c.atomp.surface_stride[1] = MAX_20BIT + 1;
        assert!(matches!(
            c.validate(),
            Err(CaptureError::ConfigurationInvalid(ConfigViolation::FieldOutOfRange {
                field: "atomp.surface_stride",
                ..
            }))
        ));
    }

    #[test]
    fn skip_is_bounded_by_frame_and_crop() {
        let mut c = sample();
        // (min(1920, 1900) - 1) / 8 = 237
        c.frame.skip.x = 237;
        assert!(c.validate().is_ok());
        c.frame.skip.x = 238;
        assert!(c.validate().is_err());

        let mut c = sample();
        c.frame.crop = Corner { x: 0, y: 0 };
        c.frame.skip.y = 1079;
        assert!(c.validate().is_ok());
        c.frame.skip.y = 1080;
        assert!(c.validate().is_err());
    }

    #[test]
    fn pfsd_limits() {
        let mut p = PfsdConfig {
            replace_roi: ReplaceRoi { left: 0, right: 15, top: 0, bottom: 3 },
            replace_value: 0xABCDE,
            expected: vec![PfsdRegion { offset: 64, len: 16, value: [1, 2, 3, 4] }],
        };
        assert!(p.validate().is_ok());

        let mut buf = BytesMut::new();
        p.put(&mut buf);
        assert_eq!(PfsdConfig::get(&mut &buf[..]).unwrap(), p);

        p.replace_value = MAX_20BIT + 1;
        assert!(p.validate().is_err());
        p.replace_value = 0;
        p.expected = vec![PfsdRegion::default(); 3];
        assert!(p.validate().is_err());
        p.expected = vec![PfsdRegion { len: 256, ..PfsdRegion::default() }];
        assert!(p.validate().is_err());
    }

    #[test]
    fn pfsd_count_above_two_is_rejected_on_read() {
        let mut buf = BytesMut::new();
        PfsdConfig::default().put(&mut buf);
        buf[pfsd_off::EXPECTED_COUNT] = 3;
        assert!(PfsdConfig::get(&mut &buf[..]).is_err());
    }
}
