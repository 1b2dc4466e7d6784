//! Unsigned LEB128 varint, used by [`super::hybrid_rle`] for its
//! run-header. Grounded on `parquet2::encoding::uleb128`.

/// Encodes `value` into `container`, returning the number of bytes
/// used. `container` must be at least 10 bytes (the worst case for a
/// `u64`).
pub fn encode(mut value: u64, container: &mut [u8]) -> usize {
    let mut used = 0;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        container[used] = byte;
        used += 1;
        if value == 0 {
            break;
        }
    }
    used
}

/// Decodes a varint from the front of `values`, returning the value
/// and the number of bytes consumed.
pub fn decode(values: &[u8]) -> (u64, usize) {
    let mut result = 0u64;
    let mut shift = 0;
    let mut consumed = 0;
    for byte in values {
        consumed += 1;
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    (result, consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for value in [0u64, 1, 127, 128, 16384, 624_485, u32::MAX as u64, u64::MAX] {
            let mut buf = [0u8; 10];
            let used = encode(value, &mut buf);
            let (decoded, consumed) = decode(&buf[..used]);
            assert_eq!(decoded, value);
            assert_eq!(consumed, used);
        }
    }

    #[test]
    fn matches_known_encoding() {
        let data = [0xe5, 0x8e, 0x26, 0xDE, 0xAD, 0xBE, 0xEF];
        let (value, len) = decode(&data);
        assert_eq!(value, 624_485);
        assert_eq!(len, 3);
    }
}
