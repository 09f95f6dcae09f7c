//! ISP program buffer header and statistics surface layout.
//!
//! An ISP program is a versioned record: consumers must check
//! [`PROGRAM_STRUCT_ID`] and [`PROGRAM_STRUCT_VERSION`] before reading
//! anything past the header.

// ── Program buffer ───────────────────────────────────────────────────────────

/// Magic bytes identifying an ISP program ("ISPP", little-endian).
pub const PROGRAM_STRUCT_ID: u32 = 0x5050_5349;

/// Supported version of the ISP program structure.
pub const PROGRAM_STRUCT_VERSION: u16 = 3;

/// Push buffer size in bytes.
pub const PROGRAM_PB_SIZE: usize = 16384;

/// Size of a complete ISP program record (header + push buffer).
pub const PROGRAM_MAX_SIZE: usize = 16512;

/// Second push buffer size limit in bytes.
pub const PB2_MAX_SIZE: usize = 512;

/// Input surfaces per ISP process request.
pub const MAX_INPUT_SURFACES: usize = 3;

/// Memory-write outputs per ISP process request.
pub const MAX_OUTPUTS: usize = 3;

/// Surfaces per memory-write output.
pub const MAX_OUTPUT_SURFACES: usize = 2;

/// Pre-fences per ISP process request.
pub const MAX_PREFENCES: usize = 14;

/// Field offsets of `isp5_program`.
pub mod program {
    pub const STRUCT_ID: usize = 0;
    pub const STRUCT_VERSION: usize = 4;
    pub const ISP_TYPE: usize = 6;
    /// `xbsrc0..=3`, four u32.
    pub const XBSRC: usize = 8;
    pub const ENABLES_CONFIG: usize = 24;
    pub const AFM_CTRL: usize = 28;
    pub const STATS_AIDX_FLAG: usize = 32;
    /// Push buffer fill, in 4-byte words.
    pub const PUSHBUFFER_SIZE: usize = 36;
    /// `ds0..=2_pixel_incr_h`, U5.20 fixed point.
    pub const DS_PIXEL_INCR_H: usize = 40;
    /// `isp_overfetch`: left, right, top, bottom, pru_ovf_h, alignment, pad[2].
    pub const OVERFETCH: usize = 52;
    /// `isp_crop_rect` per output: top, bottom, left, right (u16).
    pub const OUTPUTS_MW: usize = 60;
    pub const CROP_RECT_SIZE: usize = 8;
    pub const RESERVED: usize = 84;
    pub const PUSHBUFFER: usize = 128;
    /// Bytes preceding the push buffer.
    pub const HEADER_SIZE: usize = PUSHBUFFER;
}

/// Target ISP generation (`isp5_program::isp_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IspType {
    Isp5 = 3,
    Isp6 = 4,
    Isp7 = 5,
}

impl IspType {
    /// Decode the raw `isp_type` field.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            3 => Some(Self::Isp5),
            4 => Some(Self::Isp6),
            5 => Some(Self::Isp7),
            _ => None,
        }
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self as u16
    }

    /// Statistics surface layout produced by this generation.
    #[must_use]
    pub const fn stats_layout(self) -> StatsLayout {
        match self {
            Self::Isp5 => StatsLayout::ISP5,
            Self::Isp6 => StatsLayout::ISP6,
            Self::Isp7 => StatsLayout::ISP7,
        }
    }
}

// ── Statistics surface ───────────────────────────────────────────────────────

/// Statistics units are placed on this boundary.
pub const STATS_ALIGN: usize = 64;

/// Hardware header preceding each unit's data.
pub const STATS_HW_HEADER_SIZE: usize = 32;

/// Maximum size of each statistics unit, including the hardware header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSizes {
    /// Flicker band.
    pub fb: usize,
    /// Focus metrics.
    pub fm: usize,
    /// Auto-focus metrics, per ROI (8 ROIs).
    pub afm_roi: usize,
    /// Local average clipping, per ROI (4 ROIs per LAC unit).
    pub lac_roi: usize,
    /// Histogram, per unit.
    pub hist: usize,
    /// Number of histogram units.
    pub hist_units: usize,
    /// Outlier replacement (ISP5/6) or defective pixel correction (ISP7).
    pub pixel_correction: usize,
    /// RAW24 histogram (ISP6 only).
    pub hist_raw24: usize,
    /// Local tone mapping.
    pub ltm: usize,
}

/// Byte offsets of every statistics unit within the stats surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsLayout {
    pub fb: usize,
    pub fm: usize,
    pub afm: usize,
    pub lac0: usize,
    pub lac1: usize,
    /// Offsets of HIST0, HIST1 and (ISP7) HIST2; unused entries are zero.
    pub hist: [usize; 3],
    pub pixel_correction: usize,
    /// Zero where the generation has no RAW24 histogram.
    pub hist_raw24: usize,
    pub ltm: usize,
    /// Total surface size.
    pub total: usize,
}

const AFM_ROIS: usize = 8;
const LAC_ROIS: usize = 4;

const fn aligned(size: usize) -> usize {
    crate::layout::align_up(size, STATS_ALIGN)
}

impl StatsLayout {
    pub const ISP5: Self = Self::compute(StatsSizes {
        fb: 1056,
        fm: 32800,
        afm_roi: 48,
        lac_roi: 32800,
        hist: 4144,
        hist_units: 2,
        pixel_correction: 64,
        hist_raw24: 0,
        ltm: 1056,
    });

    pub const ISP6: Self = Self::compute(StatsSizes {
        fb: 2080,
        fm: 32800,
        afm_roi: 48,
        lac_roi: 32800,
        hist: 4144,
        hist_units: 2,
        pixel_correction: 64,
        hist_raw24: 1056,
        ltm: 1056,
    });

    pub const ISP7: Self = Self::compute(StatsSizes {
        fb: 2080,
        fm: 32800,
        afm_roi: 48,
        lac_roi: 32800,
        hist: 4144,
        hist_units: 3,
        pixel_correction: 128,
        hist_raw24: 0,
        ltm: 1056,
    });

    /// Lay out units back to back, each starting on a 64-byte boundary.
    ///
    /// Order: FB, FM, AFM×8, LAC0×4, LAC1×4, HIST×n, OR/DPC, HIST_RAW24, LTM.
    #[must_use]
    pub const fn compute(sizes: StatsSizes) -> Self {
        let fb = 0;
        let fm = fb + aligned(sizes.fb);
        let afm = fm + aligned(sizes.fm);
        let lac0 = afm + aligned(sizes.afm_roi) * AFM_ROIS;
        let lac1 = lac0 + aligned(sizes.lac_roi) * LAC_ROIS;
        let hist0 = lac1 + aligned(sizes.lac_roi) * LAC_ROIS;

        let mut hist = [0usize; 3];
        let mut cursor = hist0;
        let mut i = 0;
        while i < sizes.hist_units && i < hist.len() {
            hist[i] = cursor;
            cursor += aligned(sizes.hist);
            i += 1;
        }

        let pixel_correction = cursor;
        cursor += aligned(sizes.pixel_correction);

        let hist_raw24 = if sizes.hist_raw24 > 0 { cursor } else { 0 };
        if sizes.hist_raw24 > 0 {
            cursor += aligned(sizes.hist_raw24);
        }

        let ltm = cursor;
        Self {
            fb,
            fm,
            afm,
            lac0,
            lac1,
            hist,
            pixel_correction,
            hist_raw24,
            ltm,
            total: ltm + sizes.ltm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_header_fills_128_bytes() {
        assert_eq!(program::OUTPUTS_MW + MAX_OUTPUTS * program::CROP_RECT_SIZE, program::RESERVED);
        assert_eq!(program::RESERVED + 11 * 4, program::PUSHBUFFER);
        assert_eq!(program::PUSHBUFFER + PROGRAM_PB_SIZE, PROGRAM_MAX_SIZE);
        assert_eq!(PROGRAM_MAX_SIZE % crate::layout::DESCRIPTOR_ALIGN, 0);
    }

    #[test]
    fn magic_spells_ispp() {
        assert_eq!(&PROGRAM_STRUCT_ID.to_le_bytes(), b"ISPP");
    }

    #[test]
    fn isp5_offsets() {
        let l = StatsLayout::ISP5;
        assert_eq!(l.fb, 0);
        assert_eq!(l.fm, 1088);
        assert_eq!(l.afm, 1088 + 32832);
        assert_eq!(l.lac0, l.afm + 64 * 8);
        assert_eq!(l.lac1, l.lac0 + 32832 * 4);
        assert_eq!(l.hist[0], l.lac1 + 32832 * 4);
        assert_eq!(l.hist[1], l.hist[0] + 4160);
        assert_eq!(l.hist[2], 0);
        assert_eq!(l.pixel_correction, l.hist[1] + 4160);
        assert_eq!(l.ltm, l.pixel_correction + 64);
        assert_eq!(l.total, l.ltm + 1056);
    }

    #[test]
    fn isp6_adds_raw24_histogram() {
        let l = StatsLayout::ISP6;
        assert_eq!(l.fm, 2112);
        assert_eq!(l.hist_raw24, l.pixel_correction + 64);
        assert_eq!(l.ltm, l.hist_raw24 + 1088);
    }

    #[test]
    fn isp7_has_three_histograms_and_dpc() {
        let l = StatsLayout::ISP7;
        assert_eq!(l.hist[2], l.hist[1] + 4160);
        assert_eq!(l.pixel_correction, l.hist[2] + 4160);
        assert_eq!(l.ltm, l.pixel_correction + 128);
        assert_eq!(l.hist_raw24, 0);
    }

    #[test]
    fn every_unit_is_64_byte_aligned() {
        for l in [StatsLayout::ISP5, StatsLayout::ISP6, StatsLayout::ISP7] {
            for off in [l.fb, l.fm, l.afm, l.lac0, l.lac1, l.pixel_correction, l.ltm] {
                assert_eq!(off % STATS_ALIGN, 0);
            }
        }
    }

    #[test]
    fn isp_type_codes() {
        assert_eq!(IspType::from_raw(3), Some(IspType::Isp5));
        assert_eq!(IspType::from_raw(6), None);
        assert_eq!(IspType::Isp7.stats_layout(), StatsLayout::ISP7);
    }
}
