//! LEB128 variable-length integers used by the codec wire formats

use foldvault_types::{Error, Result};

/// Append `value` as unsigned LEB128
pub fn write(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read an unsigned LEB128 value starting at `*pos`, advancing it
pub fn read(input: &[u8], pos: &mut usize, strategy: &str) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *input
            .get(*pos)
            .ok_or_else(|| Error::strategy_failure(strategy, "truncated varint"))?;
        *pos += 1;

        if shift >= 64 || (shift == 63 && byte > 1) {
            return Err(Error::strategy_failure(strategy, "varint overflow"));
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Read a varint that must fit in `usize` and not exceed `limit`
pub fn read_len(input: &[u8], pos: &mut usize, limit: usize, strategy: &str) -> Result<usize> {
    let value = read(input, pos, strategy)?;
    usize::try_from(value)
        .ok()
        .filter(|&v| v <= limit)
        .ok_or_else(|| {
            Error::strategy_failure(strategy, format!("length {} exceeds limit {}", value, limit))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_and_large_values() {
        for value in [0u64, 1, 127, 128, 300, 16_384, u64::from(u32::MAX), u64::MAX] {
            let mut buf = Vec::new();
            write(&mut buf, value);
            let mut pos = 0;
            assert_eq!(read(&buf, &mut pos, "test").unwrap(), value);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn test_single_byte_encoding() {
        let mut buf = Vec::new();
        write(&mut buf, 127);
        assert_eq!(buf, vec![0x7F]);
    }

    #[test]
    fn test_truncated_input() {
        let mut pos = 0;
        assert!(read(&[0x80, 0x80], &mut pos, "test").is_err());
    }

    #[test]
    fn test_limit_enforced() {
        let mut buf = Vec::new();
        write(&mut buf, 5000);
        let mut pos = 0;
        assert!(read_len(&buf, &mut pos, 4096, "test").is_err());
    }
}
