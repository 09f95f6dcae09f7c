//! CSI stream binding and data types.
//!
//! Every scalar here has a smart constructor; once built, a value is
//! known to be inside the range the receiver hardware accepts.

use std::fmt;

use camrtc_abi::nvcsi::{self, DataType, Spelling};
use tracing::warn;

use crate::{CaptureError, ConfigViolation, Result};

/// NVCSI stream id, `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsiStream(u8);

impl CsiStream {
    /// Validate a stream id.
    ///
    /// # Errors
    ///
    /// Returns `FieldOutOfRange` above stream 5.
    pub fn new(id: u32) -> Result<Self> {
        if id < nvcsi::NUM_STREAMS {
            Ok(Self(id as u8))
        } else {
            Err(ConfigViolation::out_of_range("csi_stream.stream_id", id, nvcsi::NUM_STREAMS - 1).into())
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0 as u32
    }
}

/// NVCSI port. Ports A..=H, or unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsiPort(u32);

impl CsiPort {
    /// No port requested; the stream alone selects the input.
    pub const UNSPECIFIED: Self = Self(nvcsi::PORT_UNSPECIFIED);

    /// Validate a raw port value.
    ///
    /// # Errors
    ///
    /// Returns `FieldOutOfRange` for values other than `0..=7` and
    /// `0xFFFF_FFFF`.
    pub fn new(raw: u32) -> Result<Self> {
        if raw < nvcsi::NUM_PORTS || raw == nvcsi::PORT_UNSPECIFIED {
            Ok(Self(raw))
        } else {
            Err(ConfigViolation::out_of_range("csi_stream.csi_port", raw, nvcsi::NUM_PORTS - 1).into())
        }
    }

    /// Port from its letter, `'A'..='H'`.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        let index = (0..nvcsi::NUM_PORTS).find(|&p| nvcsi::port_letter(p) == Some(letter.to_ascii_uppercase()))?;
        Some(Self(index))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_specified(self) -> bool {
        self.0 != nvcsi::PORT_UNSPECIFIED
    }

    /// Stream this port feeds, if specified.
    #[must_use]
    pub const fn stream(self) -> Option<u32> {
        nvcsi::port_to_stream(self.0)
    }
}

impl fmt::Display for CsiPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match nvcsi::port_letter(self.0) {
            Some(letter) => write!(f, "{letter}"),
            None => f.write_str("unspecified"),
        }
    }
}

/// CSI virtual channel, `0..=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualChannel(u8);

impl VirtualChannel {
    /// Validate a virtual channel number.
    ///
    /// # Errors
    ///
    /// Returns `FieldOutOfRange` above 15.
    pub fn new(vc: u32) -> Result<Self> {
        if vc < nvcsi::NUM_VIRTUAL_CHANNELS {
            Ok(Self(vc as u8))
        } else {
            Err(ConfigViolation::out_of_range(
                "csi_stream.virtual_channel",
                vc,
                nvcsi::NUM_VIRTUAL_CHANNELS - 1,
            )
            .into())
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0 as u32
    }
}

/// `csi_stream_config`: which stream, port and virtual channel feed the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsiStreamBinding {
    stream: CsiStream,
    port: CsiPort,
    vc: VirtualChannel,
}

impl CsiStreamBinding {
    /// Bind to a stream. A specified port must feed that stream.
    ///
    /// # Errors
    ///
    /// Returns `Inconsistent` when the port maps to a different stream.
    pub fn new(stream: CsiStream, port: CsiPort, vc: VirtualChannel) -> Result<Self> {
        if let Some(fed) = port.stream() {
            if fed != stream.get() {
                return Err(ConfigViolation::inconsistent(format!(
                    "port {port} feeds stream {fed}, not stream {}",
                    stream.get()
                ))
                .into());
            }
        }
        Ok(Self { stream, port, vc })
    }

    /// Decode the four raw words of `csi_stream_config`.
    ///
    /// # Errors
    ///
    /// Any out-of-range word, or a port/stream mismatch.
    pub fn from_raw(stream: u32, port: u32, vc: u32) -> Result<Self> {
        Self::new(CsiStream::new(stream)?, CsiPort::new(port)?, VirtualChannel::new(vc)?)
    }

    #[must_use]
    pub const fn stream(&self) -> CsiStream {
        self.stream
    }

    #[must_use]
    pub const fn port(&self) -> CsiPort {
        self.port
    }

    #[must_use]
    pub const fn virtual_channel(&self) -> VirtualChannel {
        self.vc
    }
}

/// Canonical CSI data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsiDataType(DataType);

impl CsiDataType {
    /// Validate a raw data type byte.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDataType` for values outside the catalog.
    pub fn from_raw(raw: u8) -> Result<Self> {
        DataType::from_raw(raw)
            .map(Self)
            .ok_or_else(|| CaptureError::unknown_data_type(format!("{raw:#04x}")))
    }

    /// Resolve a name and report which spelling it used.
    ///
    /// Legacy `NVCSI_DATA_TYPE_*` names resolve to the same value as their
    /// canonical counterpart and are logged as deprecated.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDataType` when neither spelling matches.
    pub fn lookup(name: &str) -> Result<(Self, Spelling)> {
        let (dt, spelling) = DataType::lookup(name).ok_or_else(|| CaptureError::unknown_data_type(name))?;
        if spelling == Spelling::Legacy {
            warn!(
                "{name} uses the deprecated {} prefix; use {}{}",
                nvcsi::LEGACY_DATATYPE_PREFIX,
                nvcsi::DATATYPE_PREFIX,
                dt.name()
            );
        }
        Ok((Self(dt), spelling))
    }

    /// Resolve a name in either spelling.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDataType` when neither spelling matches.
    pub fn parse(name: &str) -> Result<Self> {
        Self::lookup(name).map(|(dt, _)| dt)
    }

    /// Fully prefixed canonical name.
    #[must_use]
    pub fn canonical_name(self) -> String {
        format!("{}{}", nvcsi::DATATYPE_PREFIX, self.0.name())
    }

    #[must_use]
    pub const fn data_type(self) -> DataType {
        self.0
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0.raw()
    }
}

impl From<DataType> for CsiDataType {
    fn from(dt: DataType) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_range() {
        assert!(CsiStream::new(5).is_ok());
        assert!(matches!(
            CsiStream::new(6),
            Err(CaptureError::ConfigurationInvalid(ConfigViolation::FieldOutOfRange { max: 5, .. }))
        ));
    }

    #[test]
    fn port_must_feed_stream() {
        let port_f = CsiPort::from_letter('f').map(CsiPort::get);
        assert_eq!(port_f, Some(5));
        assert!(CsiStreamBinding::from_raw(4, 5, 0).is_ok());
        assert!(CsiStreamBinding::from_raw(5, 5, 0).is_err());
        assert!(CsiStreamBinding::from_raw(3, nvcsi::PORT_UNSPECIFIED, 15).is_ok());
        assert!(CsiStreamBinding::from_raw(3, 3, 16).is_err());
        assert!(CsiPort::new(8).is_err());
    }

    #[test]
    fn legacy_spelling_is_flagged_but_resolves() {
        let (dt, spelling) = CsiDataType::lookup("NVCSI_DATA_TYPE_RAW12").unwrap();
        assert_eq!(spelling, Spelling::Legacy);
        assert_eq!(dt.canonical_name(), "NVCSI_DATATYPE_RAW12");
        assert_eq!(CsiDataType::parse("NVCSI_DATATYPE_RAW12").unwrap(), dt);
    }

    #[test]
    fn unknown_names_and_values() {
        assert!(matches!(
            CsiDataType::parse("RAW11"),
            Err(CaptureError::UnknownDataType { .. })
        ));
        assert!(CsiDataType::from_raw(27).is_err());
        assert_eq!(CsiDataType::from_raw(43).map(CsiDataType::raw), Ok(43));
    }
}
