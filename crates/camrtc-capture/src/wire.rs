//! Little-endian record access helpers.

use bytes::{Bytes, BytesMut};

use crate::{CaptureError, Result};

/// Borrow `size` bytes at `offset`, or report which record did not fit.
pub(crate) fn record<'a>(
    bytes: &'a [u8],
    offset: usize,
    size: usize,
    name: &'static str,
) -> Result<&'a [u8]> {
    bytes
        .get(offset..offset + size)
        .ok_or_else(|| CaptureError::layout_mismatch(name, offset + size, bytes.len()))
}

/// Mutable variant of [`record`].
pub(crate) fn record_mut<'a>(
    bytes: &'a mut [u8],
    offset: usize,
    size: usize,
    name: &'static str,
) -> Result<&'a mut [u8]> {
    let actual = bytes.len();
    bytes
        .get_mut(offset..offset + size)
        .ok_or_else(|| CaptureError::layout_mismatch(name, offset + size, actual))
}

/// Freeze an encoded record after checking it hit its declared size.
pub(crate) fn finish(buf: BytesMut, size: usize, name: &'static str) -> Result<Bytes> {
    if buf.len() == size {
        Ok(buf.freeze())
    } else {
        Err(CaptureError::layout_mismatch(name, size, buf.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn record_bounds() {
        let data = [0u8; 16];
        assert_eq!(record(&data, 8, 8, "x").map(<[u8]>::len), Ok(8));
        assert_eq!(
            record(&data, 8, 16, "x"),
            Err(CaptureError::layout_mismatch("x", 24, 16))
        );
    }

    #[test]
    fn finish_checks_length() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1);
        assert!(finish(buf.clone(), 4, "x").is_ok());
        assert!(finish(buf, 8, "x").is_err());
    }
}
