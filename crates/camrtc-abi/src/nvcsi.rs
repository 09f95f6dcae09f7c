//! NVCSI receiver: stream/port/VC identifiers, error bits, data types.
//!
//! NVCSI error bits are collected by the coprocessor between consecutive
//! captures and copied into the status record. They are not frame
//! accurate and never feed the frame verdict on their own.

// ── Stream, port, virtual channel ────────────────────────────────────────────

/// Number of NVCSI streams (`NVCSI_STREAM_0..=5`).
pub const NUM_STREAMS: u32 = 6;

/// Number of NVCSI ports (`NVCSI_PORT_A..=H`).
pub const NUM_PORTS: u32 = 8;

/// Port value meaning "not specified".
pub const PORT_UNSPECIFIED: u32 = 0xFFFF_FFFF;

/// Number of CSI virtual channels.
pub const NUM_VIRTUAL_CHANNELS: u32 = 16;

/// Stream a port feeds. Ports F and H share streams 4 and 5 with a lane swizzle.
#[must_use]
pub const fn port_to_stream(port: u32) -> Option<u32> {
    match port {
        0..=4 => Some(port),
        5 => Some(4),
        6 | 7 => Some(5),
        _ => None,
    }
}

/// Port letter for diagnostics.
#[must_use]
pub const fn port_letter(port: u32) -> Option<char> {
    match port {
        0 => Some('A'),
        1 => Some('B'),
        2 => Some('C'),
        3 => Some('D'),
        4 => Some('E'),
        5 => Some('F'),
        6 => Some('G'),
        7 => Some('H'),
        _ => None,
    }
}

// ── Error bits ───────────────────────────────────────────────────────────────

/// Stream-level errors (`nvcsi_error_status::nvcsi_stream_bits`).
pub mod stream_error {
    pub const PH_ECC_MULTI_BIT_ERR: u32 = 1 << 0;
    pub const PH_BOTH_CRC_ERR: u32 = 1 << 1;

    /// `(bit, name)` pairs, lowest first.
    pub const NAMES: [(u32, &str); 2] = [
        (PH_ECC_MULTI_BIT_ERR, "PH_ECC_MULTI_BIT_ERR"),
        (PH_BOTH_CRC_ERR, "PH_BOTH_CRC_ERR"),
    ];
}

/// Virtual-channel errors (`nvcsi_error_status::nvcsi_virtual_channel_bits`).
pub mod vc_error {
    pub const PPFSM_TIMEOUT: u32 = 1 << 0;
    pub const PH_ECC_SINGLE_BIT_ERR: u32 = 1 << 1;
    pub const PD_CRC_ERR: u32 = 1 << 2;
    pub const PD_WC_SHORT_ERR: u32 = 1 << 3;
    pub const PH_SINGLE_CRC_ERR: u32 = 1 << 4;
    pub const EMBEDDED_LINE_CRC_ERR: u32 = 1 << 5;

    /// `(bit, name)` pairs, lowest first.
    pub const NAMES: [(u32, &str); 6] = [
        (PPFSM_TIMEOUT, "PPFSM_TIMEOUT"),
        (PH_ECC_SINGLE_BIT_ERR, "PH_ECC_SINGLE_BIT_ERR"),
        (PD_CRC_ERR, "PD_CRC_ERR"),
        (PD_WC_SHORT_ERR, "PD_WC_SHORT_ERR"),
        (PH_SINGLE_CRC_ERR, "PH_SINGLE_CRC_ERR"),
        (EMBEDDED_LINE_CRC_ERR, "EMBEDDED_LINE_CRC_ERR"),
    ];
}

/// Common interface logic errors, per CIL partition.
pub mod cil_error {
    pub const DPHY_CLK_LANE_CTRL_ERR: u32 = 1 << 0;
    pub const DATA_LANE_SOT_SB_ERR0: u32 = 1 << 1;
    pub const DATA_LANE_SOT_MB_ERR0: u32 = 1 << 2;
    pub const DATA_LANE_CTRL_ERR0: u32 = 1 << 3;
    pub const DATA_LANE_RXFIFO_FULL_ERR0: u32 = 1 << 4;
    pub const DATA_LANE_SOT_SB_ERR1: u32 = 1 << 5;
    pub const DATA_LANE_SOT_MB_ERR1: u32 = 1 << 6;
    pub const DATA_LANE_CTRL_ERR1: u32 = 1 << 7;
    pub const DATA_LANE_RXFIFO_FULL_ERR1: u32 = 1 << 8;
    pub const DPHY_DESKEW_CALIB_ERR_LANE0: u32 = 1 << 9;
    pub const DPHY_DESKEW_CALIB_ERR_LANE1: u32 = 1 << 10;
    pub const DPHY_DESKEW_CALIB_ERR_CTRL: u32 = 1 << 11;
    pub const DPHY_LANE_ALIGN_ERR: u32 = 1 << 12;
    pub const DATA_LANE_ESC_MODE_SYNC_ERR0: u32 = 1 << 13;
    pub const DATA_LANE_ESC_MODE_SYNC_ERR1: u32 = 1 << 14;

    /// `(bit, name)` pairs, lowest first.
    pub const NAMES: [(u32, &str); 15] = [
        (DPHY_CLK_LANE_CTRL_ERR, "DPHY_CLK_LANE_CTRL_ERR"),
        (DATA_LANE_SOT_SB_ERR0, "DATA_LANE_SOT_SB_ERR0"),
        (DATA_LANE_SOT_MB_ERR0, "DATA_LANE_SOT_MB_ERR0"),
        (DATA_LANE_CTRL_ERR0, "DATA_LANE_CTRL_ERR0"),
        (DATA_LANE_RXFIFO_FULL_ERR0, "DATA_LANE_RXFIFO_FULL_ERR0"),
        (DATA_LANE_SOT_SB_ERR1, "DATA_LANE_SOT_SB_ERR1"),
        (DATA_LANE_SOT_MB_ERR1, "DATA_LANE_SOT_MB_ERR1"),
        (DATA_LANE_CTRL_ERR1, "DATA_LANE_CTRL_ERR1"),
        (DATA_LANE_RXFIFO_FULL_ERR1, "DATA_LANE_RXFIFO_FULL_ERR1"),
        (DPHY_DESKEW_CALIB_ERR_LANE0, "DPHY_DESKEW_CALIB_ERR_LANE0"),
        (DPHY_DESKEW_CALIB_ERR_LANE1, "DPHY_DESKEW_CALIB_ERR_LANE1"),
        (DPHY_DESKEW_CALIB_ERR_CTRL, "DPHY_DESKEW_CALIB_ERR_CTRL"),
        (DPHY_LANE_ALIGN_ERR, "DPHY_LANE_ALIGN_ERR"),
        (DATA_LANE_ESC_MODE_SYNC_ERR0, "DATA_LANE_ESC_MODE_SYNC_ERR0"),
        (DATA_LANE_ESC_MODE_SYNC_ERR1, "DATA_LANE_ESC_MODE_SYNC_ERR1"),
    ];
}

/// Names of the bits set in `bits` according to `table`, plus any
/// leftover bits the table does not know.
pub fn named_bits<'a>(
    bits: u32,
    table: &'a [(u32, &'a str)],
) -> (impl Iterator<Item = &'a str> + 'a, u32) {
    let known = table.iter().fold(0u32, |acc, (bit, _)| acc | bit);
    let names = table
        .iter()
        .filter(move |(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name);
    (names, bits & !known)
}

// ── Data types ───────────────────────────────────────────────────────────────

/// CSI-2 data type identifier.
///
/// One canonical catalog. Historical headers carry a second spelling
/// (`NVCSI_DATA_TYPE_*`, mixed case for `Unspecified`/`Unknown`, no
/// user-defined types); [`DataType::lookup`] accepts it and reports
/// [`Spelling::Legacy`] so callers can migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataType {
    Unspecified = 0,
    Yuv420_8 = 24,
    Yuv420_10 = 25,
    LegYuv420_8 = 26,
    Yuv420Csps8 = 28,
    Yuv420Csps10 = 29,
    Yuv422_8 = 30,
    Yuv422_10 = 31,
    Rgb444 = 32,
    Rgb555 = 33,
    Rgb565 = 34,
    Rgb666 = 35,
    Rgb888 = 36,
    Raw6 = 40,
    Raw7 = 41,
    Raw8 = 42,
    Raw10 = 43,
    Raw12 = 44,
    Raw14 = 45,
    Raw16 = 46,
    Raw20 = 47,
    User1 = 48,
    User2 = 49,
    User3 = 50,
    User4 = 51,
    User5 = 52,
    User6 = 53,
    User7 = 54,
    User8 = 55,
    Unknown = 64,
}

/// Which naming scheme a data type name was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spelling {
    /// `NVCSI_DATATYPE_*` or the bare suffix.
    Canonical,
    /// `NVCSI_DATA_TYPE_*`. Deprecated.
    Legacy,
}

/// Canonical prefix.
pub const DATATYPE_PREFIX: &str = "NVCSI_DATATYPE_";
/// Deprecated prefix.
pub const LEGACY_DATATYPE_PREFIX: &str = "NVCSI_DATA_TYPE_";

impl DataType {
    /// Every data type, in wire order.
    pub const ALL: [Self; 30] = [
        Self::Unspecified,
        Self::Yuv420_8,
        Self::Yuv420_10,
        Self::LegYuv420_8,
        Self::Yuv420Csps8,
        Self::Yuv420Csps10,
        Self::Yuv422_8,
        Self::Yuv422_10,
        Self::Rgb444,
        Self::Rgb555,
        Self::Rgb565,
        Self::Rgb666,
        Self::Rgb888,
        Self::Raw6,
        Self::Raw7,
        Self::Raw8,
        Self::Raw10,
        Self::Raw12,
        Self::Raw14,
        Self::Raw16,
        Self::Raw20,
        Self::User1,
        Self::User2,
        Self::User3,
        Self::User4,
        Self::User5,
        Self::User6,
        Self::User7,
        Self::User8,
        Self::Unknown,
    ];

    /// Raw wire value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Decode a raw value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        let mut i = 0;
        while i < Self::ALL.len() {
            if Self::ALL[i] as u8 == raw {
                return Some(Self::ALL[i]);
            }
            i += 1;
        }
        None
    }

    /// Canonical suffix (after `NVCSI_DATATYPE_`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Yuv420_8 => "YUV420_8",
            Self::Yuv420_10 => "YUV420_10",
            Self::LegYuv420_8 => "LEG_YUV420_8",
            Self::Yuv420Csps8 => "YUV420CSPS_8",
            Self::Yuv420Csps10 => "YUV420CSPS_10",
            Self::Yuv422_8 => "YUV422_8",
            Self::Yuv422_10 => "YUV422_10",
            Self::Rgb444 => "RGB444",
            Self::Rgb555 => "RGB555",
            Self::Rgb565 => "RGB565",
            Self::Rgb666 => "RGB666",
            Self::Rgb888 => "RGB888",
            Self::Raw6 => "RAW6",
            Self::Raw7 => "RAW7",
            Self::Raw8 => "RAW8",
            Self::Raw10 => "RAW10",
            Self::Raw12 => "RAW12",
            Self::Raw14 => "RAW14",
            Self::Raw16 => "RAW16",
            Self::Raw20 => "RAW20",
            Self::User1 => "USER_1",
            Self::User2 => "USER_2",
            Self::User3 => "USER_3",
            Self::User4 => "USER_4",
            Self::User5 => "USER_5",
            Self::User6 => "USER_6",
            Self::User7 => "USER_7",
            Self::User8 => "USER_8",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Suffix under the legacy prefix, if the legacy catalog had one.
    #[must_use]
    pub const fn legacy_name(self) -> Option<&'static str> {
        match self {
            Self::Unspecified => Some("Unspecified"),
            Self::Unknown => Some("Unknown"),
            Self::User1
            | Self::User2
            | Self::User3
            | Self::User4
            | Self::User5
            | Self::User6
            | Self::User7
            | Self::User8 => None,
            other => Some(other.name()),
        }
    }

    /// Resolve a name in either spelling.
    ///
    /// Accepts `NVCSI_DATATYPE_RAW10`, `NVCSI_DATA_TYPE_RAW10` and the bare
    /// `RAW10`. Bare suffixes match case-insensitively; prefixed names must
    /// match the catalog exactly.
    #[must_use]
    pub fn lookup(name: &str) -> Option<(Self, Spelling)> {
        if let Some(suffix) = name.strip_prefix(LEGACY_DATATYPE_PREFIX) {
            return Self::ALL
                .into_iter()
                .find(|dt| dt.legacy_name() == Some(suffix))
                .map(|dt| (dt, Spelling::Legacy));
        }
        if let Some(suffix) = name.strip_prefix(DATATYPE_PREFIX) {
            return Self::ALL
                .into_iter()
                .find(|dt| dt.name() == suffix)
                .map(|dt| (dt, Spelling::Canonical));
        }
        Self::ALL
            .into_iter()
            .find(|dt| dt.name().eq_ignore_ascii_case(name))
            .map(|dt| (dt, Spelling::Canonical))
    }

    /// Bits per pixel for RAW types.
    #[must_use]
    pub const fn raw_bits(self) -> Option<u8> {
        match self {
            Self::Raw6 => Some(6),
            Self::Raw7 => Some(7),
            Self::Raw8 => Some(8),
            Self::Raw10 => Some(10),
            Self::Raw12 => Some(12),
            Self::Raw14 => Some(14),
            Self::Raw16 => Some(16),
            Self::Raw20 => Some(20),
            _ => None,
        }
    }
}
