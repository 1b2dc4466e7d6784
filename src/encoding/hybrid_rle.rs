//! The RLE/bit-packed hybrid level codec, spec.md §4.4: a sequence of
//! groups, each a uleb128 header whose low bit selects a run (the next
//! `ceil8(num_bits)` bytes hold one repeated-value) or a bit-packed
//! block (the next `8 * groups-of-8` values, `num_bits` wide, packed
//! LSB-first). Grounded on `parquet2::encoding::hybrid_rle`, but
//! actually emits RLE runs for repeated levels instead of always
//! bit-packing — real encoders do, and every definition/repetition
//! level stream in an all-required, unnested schema is one giant run
//! of zeros that would otherwise bloat every page.

use super::bitpacking;
use super::uleb128;

const RUN_THRESHOLD: usize = 8;

fn ceil8(bits: usize) -> usize {
    bits / 8 + (bits % 8 != 0) as usize
}

/// Encodes `values` (each assumed to fit in `num_bits` bits) into
/// `out`. A bit-packed group is only ever flushed at exactly 8 pending
/// values, or once for whatever's left after the last value — padding
/// a short group with fabricated zeros is only safe for that final
/// group, since it's the only one the decoder can trim against the
/// caller-supplied length instead of misreading as real data.
pub fn encode(values: &[i16], num_bits: u8, out: &mut Vec<u8>) {
    let values: Vec<u32> = values.iter().map(|&v| v as u32).collect();
    let mut i = 0;
    let mut pending: Vec<u32> = Vec::new();
    while i < values.len() {
        let mut j = i + 1;
        while j < values.len() && values[j] == values[i] {
            j += 1;
        }
        let run_len = j - i;
        if run_len >= RUN_THRESHOLD && pending.is_empty() {
            write_run(values[i], run_len, num_bits, out);
            i = j;
        } else {
            pending.push(values[i]);
            i += 1;
            if pending.len() == 8 {
                flush_bitpacked(&mut pending, num_bits, out);
            }
        }
    }
    flush_bitpacked(&mut pending, num_bits, out);
}

fn write_run(value: u32, run_len: usize, num_bits: u8, out: &mut Vec<u8>) {
    let header = (run_len as u64) << 1;
    let mut buf = [0u8; 10];
    let used = uleb128::encode(header, &mut buf);
    out.extend_from_slice(&buf[..used]);
    let width_bytes = ceil8(num_bits as usize);
    out.extend_from_slice(&value.to_le_bytes()[..width_bytes]);
}

fn flush_bitpacked(pending: &mut Vec<u32>, num_bits: u8, out: &mut Vec<u8>) {
    if pending.is_empty() {
        return;
    }
    let num_groups = (pending.len() + 7) / 8;
    pending.resize(num_groups * 8, 0);
    let header = ((num_groups as u64) << 1) | 1;
    let mut buf = [0u8; 10];
    let used = uleb128::encode(header, &mut buf);
    out.extend_from_slice(&buf[..used]);
    bitpacking::encode(pending, num_bits as usize, out);
    pending.clear();
}

/// Decodes exactly `length` values of width `num_bits` from the front
/// of `bytes`.
pub fn decode(bytes: &[u8], num_bits: u8, length: usize) -> Vec<i16> {
    let mut out = Vec::with_capacity(length);
    let mut pos = 0;
    while out.len() < length && pos < bytes.len() {
        let (header, consumed) = uleb128::decode(&bytes[pos..]);
        pos += consumed;
        if header & 1 == 1 {
            let num_groups = (header >> 1) as usize;
            let count = num_groups * 8;
            let byte_len = num_groups * num_bits as usize;
            let chunk = &bytes[pos..(pos + byte_len).min(bytes.len())];
            pos += byte_len;
            out.extend(bitpacking::Decoder::new(chunk, num_bits, count).map(|v| v as i16));
        } else {
            let run_len = (header >> 1) as usize;
            let width_bytes = ceil8(num_bits as usize);
            let mut value_bytes = [0u8; 4];
            let available = width_bytes.min(bytes.len() - pos);
            value_bytes[..available].copy_from_slice(&bytes[pos..pos + available]);
            pos += width_bytes;
            let value = u32::from_le_bytes(value_bytes) as i16;
            out.extend(std::iter::repeat(value).take(run_len));
        }
    }
    out.truncate(length);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_long_run() {
        let values = vec![0i16; 100];
        let mut out = Vec::new();
        encode(&values, 1, &mut out);
        assert_eq!(decode(&out, 1, 100), values);
        // A single RLE run should be far smaller than bit-packing 100 values.
        assert!(out.len() < 20);
    }

    #[test]
    fn round_trips_mixed_runs_and_noise() {
        let mut values = vec![2i16; 20];
        values.extend([0, 1, 2, 0, 1, 2, 1]);
        values.extend(vec![1i16; 12]);
        let mut out = Vec::new();
        encode(&values, 2, &mut out);
        assert_eq!(decode(&out, 2, values.len()), values);
    }

    #[test]
    fn round_trips_every_spec_width() {
        for num_bits in [1u8, 2, 3, 8, 16] {
            let max = if num_bits >= 16 { 30000i16 } else { (1i16 << num_bits) - 1 };
            let values: Vec<i16> = (0..53).map(|i| i % (max + 1)).collect();
            let mut out = Vec::new();
            encode(&values, num_bits, &mut out);
            assert_eq!(decode(&out, num_bits, values.len()), values, "num_bits={num_bits}");
        }
    }

    /// 10,000 random values at each supported width round-trip exactly
    /// and stay within the worst-case size a naive bit-packed-only
    /// encoder would produce (num_bits per value, plus a small constant
    /// per-group overhead for headers).
    #[test]
    fn round_trips_ten_thousand_random_values_within_the_size_bound() {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        for num_bits in [1u8, 2, 3, 8, 16] {
            let max = if num_bits >= 16 { u16::MAX as i16 } else { (1i16 << num_bits) - 1 };
            let values: Vec<i16> = (0..10_000).map(|_| rng.gen_range(0..=max)).collect();

            let mut out = Vec::new();
            encode(&values, num_bits, &mut out);
            assert_eq!(decode(&out, num_bits, values.len()), values, "num_bits={num_bits}");

            let bit_packed_bound = (values.len() * num_bits as usize + 7) / 8;
            let header_overhead = values.len() / RUN_THRESHOLD.max(8) + 16;
            assert!(
                out.len() <= bit_packed_bound + header_overhead,
                "num_bits={num_bits} encoded to {} bytes, bound was {}",
                out.len(),
                bit_packed_bound + header_overhead
            );
        }
    }
}
