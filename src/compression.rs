//! Page-body compression, spec.md §4.6: a page's encoded bytes are
//! optionally compressed as a whole, one codec per column chunk.
//! Grounded directly on `parquet2::compression`'s `Codec` trait and
//! per-algorithm modules; `Zstd` is dropped since spec.md names only
//! `{UNCOMPRESSED, SNAPPY, GZIP, BROTLI, LZ4}` plus an always-rejected
//! `LZO` (see [`crate::schema::Compression::Lzo`]), so this crate
//! never needed the `zstd` dependency the teacher carries.

use crate::error::{unsupported_err, Result};
use crate::schema::Compression;

/// Compresses/decompresses whole page bodies for one algorithm.
pub trait Codec: std::fmt::Debug {
    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()>;
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<()>;
}

/// Returns a codec for `compression`, or `None` for `Uncompressed`.
pub fn create_codec(compression: Compression) -> Result<Option<Box<dyn Codec>>> {
    match compression {
        #[cfg(feature = "snappy")]
        Compression::Snappy => Ok(Some(Box::new(snappy::SnappyCodec::new()))),
        #[cfg(feature = "gzip")]
        Compression::Gzip => Ok(Some(Box::new(gzip::GzipCodec::new()))),
        #[cfg(feature = "brotli")]
        Compression::Brotli => Ok(Some(Box::new(brotli_codec::BrotliCodec::new()))),
        #[cfg(feature = "lz4")]
        Compression::Lz4 => Ok(Some(Box::new(lz4_codec::Lz4Codec::new()))),
        Compression::Uncompressed => Ok(None),
        other => Err(unsupported_err!("compression codec {:?} is not installed", other)),
    }
}

#[cfg(feature = "snappy")]
mod snappy {
    use super::Codec;
    use crate::error::Result;
    use snap::raw::{decompress_len, max_compress_len, Decoder, Encoder};

    #[derive(Debug)]
    pub struct SnappyCodec {
        decoder: Decoder,
        encoder: Encoder,
    }

    impl SnappyCodec {
        pub fn new() -> Self {
            Self {
                decoder: Decoder::new(),
                encoder: Encoder::new(),
            }
        }
    }

    impl Codec for SnappyCodec {
        fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
            let len = decompress_len(input).map_err(|e| crate::error::corrupt_err!("snappy: {}", e))?;
            if len != output.len() {
                return Err(crate::error::corrupt_err!(
                    "snappy decompressed length {} does not match expected {}",
                    len,
                    output.len()
                ));
            }
            self.decoder
                .decompress(input, output)
                .map(|_| ())
                .map_err(|e| crate::error::corrupt_err!("snappy: {}", e))
        }

        fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
            let start = output.len();
            output.resize(start + max_compress_len(input.len()), 0);
            let n = self
                .encoder
                .compress(input, &mut output[start..])
                .map_err(|e| crate::error::corrupt_err!("snappy: {}", e))?;
            output.truncate(start + n);
            Ok(())
        }
    }
}

#[cfg(feature = "gzip")]
mod gzip {
    use super::Codec;
    use crate::error::Result;
    use flate2::{read, write, Compression as GzLevel};
    use std::io::{Read, Write};

    #[derive(Debug)]
    pub struct GzipCodec;

    impl GzipCodec {
        pub fn new() -> Self {
            Self
        }
    }

    impl Codec for GzipCodec {
        fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
            read::GzDecoder::new(input).read_exact(output)?;
            Ok(())
        }

        fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
            let mut encoder = write::GzEncoder::new(output, GzLevel::default());
            encoder.write_all(input)?;
            encoder.try_finish()?;
            Ok(())
        }
    }
}

#[cfg(feature = "brotli")]
mod brotli_codec {
    use super::Codec;
    use crate::error::Result;
    use std::io::{Read, Write};

    const BUFFER_SIZE: usize = 4096;
    const QUALITY: u32 = 5;
    const LG_WINDOW_SIZE: u32 = 22;

    #[derive(Debug)]
    pub struct BrotliCodec;

    impl BrotliCodec {
        pub fn new() -> Self {
            Self
        }
    }

    impl Codec for BrotliCodec {
        fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
            brotli::Decompressor::new(input, BUFFER_SIZE).read_exact(output)?;
            Ok(())
        }

        fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
            let mut encoder = brotli::CompressorWriter::new(output, BUFFER_SIZE, QUALITY, LG_WINDOW_SIZE);
            encoder.write_all(input)?;
            encoder.flush()?;
            Ok(())
        }
    }
}

#[cfg(feature = "lz4")]
mod lz4_codec {
    use super::Codec;
    use crate::error::Result;
    use std::io::{Read, Write};

    #[derive(Debug)]
    pub struct Lz4Codec;

    impl Lz4Codec {
        pub fn new() -> Self {
            Self
        }
    }

    impl Codec for Lz4Codec {
        fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
            let mut decoder = lz4::Decoder::new(input)?;
            decoder.read_exact(output)?;
            Ok(())
        }

        fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
            let mut encoder = lz4::EncoderBuilder::new().build(output)?;
            encoder.write_all(input)?;
            encoder.finish().1?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "snappy")]
    #[test]
    fn snappy_round_trips() {
        round_trip(Compression::Snappy);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_round_trips() {
        round_trip(Compression::Gzip);
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn lz4_round_trips() {
        round_trip(Compression::Lz4);
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn brotli_round_trips() {
        round_trip(Compression::Brotli);
    }

    #[allow(dead_code)]
    fn round_trip(compression: Compression) {
        let data: Vec<u8> = (0..10_000u32).map(|x| (x % 251) as u8).collect();
        let mut codec = create_codec(compression).unwrap().unwrap();
        let mut compressed = Vec::new();
        codec.compress(&data, &mut compressed).unwrap();

        let mut other = create_codec(compression).unwrap().unwrap();
        let mut decompressed = vec![0u8; data.len()];
        other.decompress(&compressed, &mut decompressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn lzo_is_unsupported() {
        let err = create_codec(Compression::Lzo).unwrap_err();
        assert!(matches!(err, crate::error::Error::Unsupported(_)));
    }
}
