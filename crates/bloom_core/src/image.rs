//! Image file format & IO
//!
//! Header (LE, 48 bytes):
//!   magic[4]   = "BLMF"
//!   major[2]   = 2  (readers reject any other major)
//!   minor[2]   = 1
//!   entries[8] = u64
//!   error[8]   = f64
//!   bits[8]    = u64, multiple of 8
//!   bytes[8]   = u64, bits / 8
//!   hashes[4]  = u32
//!   crc[4]     = crc32(bit array)
//!
//! Followed by exactly `bytes` bytes of bit array; no padding, no trailer.

use crate::consts::{FORMAT_MAJOR, FORMAT_MINOR, HDR_SIZE, MAGIC_IMG, MAX_BITS, MAX_HASHES};
use crate::errors::{BloomError, Result};
use crate::filter::{alloc_bits, BloomFilter};
use crate::params::FilterParams;
use crate::utils::{
    crc32, fsync_dir, parent_dir, read_f64, read_u16, read_u32, read_u64, write_f64, write_u16,
    write_u32, write_u64,
};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

fn corrupt(msg: impl Into<String>) -> BloomError {
    let msg = msg.into();
    warn!(reason = %msg, "rejecting bloom image");
    BloomError::CorruptImage(msg)
}

fn write_header<W: Write>(w: &mut W, p: &FilterParams, crc: u32) -> io::Result<()> {
    w.write_all(MAGIC_IMG)?;
    write_u16(w, FORMAT_MAJOR)?;
    write_u16(w, FORMAT_MINOR)?;
    write_u64(w, p.entries)?;
    write_f64(w, p.error)?;
    write_u64(w, p.bits)?;
    write_u64(w, p.bytes)?;
    write_u32(w, p.hashes)?;
    write_u32(w, crc)
}

type RawHeader = (u16, u16, u64, f64, u64, u64, u32, u32);

fn read_fields(r: &mut &[u8]) -> io::Result<RawHeader> {
    Ok((
        read_u16(r)?,
        read_u16(r)?,
        read_u64(r)?,
        read_f64(r)?,
        read_u64(r)?,
        read_u64(r)?,
        read_u32(r)?,
        read_u32(r)?,
    ))
}

/// Parses and validates a header. Returns the dimensions and the bit-array checksum.
fn read_header(hdr: &[u8; HDR_SIZE]) -> Result<(FilterParams, u32)> {
    if &hdr[0..4] != MAGIC_IMG {
        return Err(corrupt("bad magic"));
    }
    let (major, _minor, entries, error, bits, bytes, hashes, crc) =
        read_fields(&mut &hdr[4..]).map_err(|e| corrupt(format!("header: {e}")))?;

    if major != FORMAT_MAJOR {
        return Err(corrupt(format!("unsupported format major {major}")));
    }
    if entries == 0 {
        return Err(corrupt("entries is zero"));
    }
    if !(error > 0.0 && error < 1.0) {
        return Err(corrupt(format!("error {error} outside (0, 1)")));
    }
    if hashes == 0 || hashes > MAX_HASHES {
        return Err(corrupt(format!("implausible hash count {hashes}")));
    }
    if bits == 0 || bits > MAX_BITS {
        return Err(corrupt(format!("implausible bit count {bits}")));
    }
    if bytes != bits.div_ceil(8) {
        return Err(corrupt(format!("bytes {bytes} does not match bits {bits}")));
    }
    if bits % 8 != 0 {
        return Err(corrupt(format!("bits {bits} is not a whole number of bytes")));
    }
    Ok((FilterParams { entries, error, bits, bytes, hashes }, crc))
}

impl BloomFilter {
    /// Serialized image: header followed by the bit array.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HDR_SIZE + self.as_bytes().len());
        // Writing into a Vec cannot fail.
        let _ = write_header(&mut out, &self.params(), crc32(self.as_bytes()));
        out.extend_from_slice(self.as_bytes());
        out
    }

    /// Parses an image produced by [`BloomFilter::to_bytes`] or [`BloomFilter::save`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let hdr: &[u8; HDR_SIZE] = buf
            .get(..HDR_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| corrupt(format!("image of {} bytes is shorter than the header", buf.len())))?;
        let (p, crc) = read_header(hdr)?;
        let body = &buf[HDR_SIZE..];
        if body.len() as u64 != p.bytes {
            return Err(corrupt(format!("expected {} bytes of bits, found {}", p.bytes, body.len())));
        }
        if crc32(body) != crc {
            return Err(corrupt("bit array checksum mismatch"));
        }
        let mut bits = alloc_bits(p.bits)?;
        bits.copy_from_slice(body);
        Ok(BloomFilter::from_parts(p, bits))
    }

    /// Writes the image to `path`. The file is written to a temporary sibling
    /// and renamed into place, so `path` never holds a partial image.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut tmp = tempfile::Builder::new().prefix(".bloom_").tempfile_in(parent_dir(path))?;
        {
            let f = tmp.as_file_mut();
            let mut hdr = Vec::with_capacity(HDR_SIZE);
            write_header(&mut hdr, &self.params(), crc32(self.as_bytes()))?;
            f.write_all(&hdr)?;
            f.write_all(self.as_bytes())?;
            f.sync_all()?;
        }
        tmp.persist(path)?;
        let _ = fsync_dir(path);
        debug!(path = %path.display(), bits = self.bits(), hashes = self.hashes(), "bloom image saved");
        Ok(())
    }

    /// Reads an image written by [`BloomFilter::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut f = File::open(path)?;
        let len = f.metadata()?.len();
        if len < HDR_SIZE as u64 {
            return Err(corrupt(format!("file of {len} bytes is shorter than the header")));
        }
        let mut hdr = [0u8; HDR_SIZE];
        f.read_exact(&mut hdr)?;
        let (p, crc) = read_header(&hdr)?;
        let want = HDR_SIZE as u64 + p.bytes;
        if len != want {
            return Err(corrupt(format!("file is {len} bytes, header declares {want}")));
        }
        let mut bits = alloc_bits(p.bits)?;
        f.read_exact(&mut bits).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => corrupt("bit array truncated"),
            _ => BloomError::Io(e),
        })?;
        if crc32(&bits) != crc {
            return Err(corrupt("bit array checksum mismatch"));
        }
        debug!(path = %path.display(), bits = p.bits, hashes = p.hashes, "bloom image loaded");
        Ok(BloomFilter::from_parts(p, bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(f: &BloomFilter) -> [u8; HDR_SIZE] {
        f.to_bytes()[..HDR_SIZE].try_into().unwrap()
    }

    #[test]
    fn header_layout() {
        let f = BloomFilter::new(1000, 0.01).unwrap();
        let img = f.to_bytes();
        assert_eq!(img.len(), HDR_SIZE + 1199);
        assert_eq!(&img[0..4], b"BLMF");
        assert_eq!(u16::from_le_bytes([img[4], img[5]]), FORMAT_MAJOR);
        assert_eq!(u64::from_le_bytes(img[8..16].try_into().unwrap()), 1000);
        assert_eq!(f64::from_le_bytes(img[16..24].try_into().unwrap()), 0.01);
        assert_eq!(u64::from_le_bytes(img[24..32].try_into().unwrap()), 9592);
        assert_eq!(u64::from_le_bytes(img[32..40].try_into().unwrap()), 1199);
        assert_eq!(u32::from_le_bytes(img[40..44].try_into().unwrap()), 7);
    }

    #[test]
    fn minor_version_is_ignored() {
        let f = BloomFilter::new(1000, 0.01).unwrap();
        let mut hdr = header_of(&f);
        hdr[6] = 99;
        assert!(read_header(&hdr).is_ok());
        hdr[4] = FORMAT_MAJOR as u8 + 1;
        assert!(matches!(read_header(&hdr), Err(BloomError::CorruptImage(_))));
    }

    #[test]
    fn inconsistent_fields_are_rejected() {
        let f = BloomFilter::new(1000, 0.01).unwrap();
        let patches: [(usize, &[u8]); 8] = [
            (0, b"XXXX"),
            (8, &0u64.to_le_bytes()),
            (16, &1.5f64.to_le_bytes()),
            (24, &9591u64.to_le_bytes()),
            (24, &(MAX_BITS << 3).to_le_bytes()),
            (32, &1200u64.to_le_bytes()),
            (40, &0u32.to_le_bytes()),
            (40, &(MAX_HASHES + 1).to_le_bytes()),
        ];
        for (off, bytes) in patches {
            let mut hdr = header_of(&f);
            hdr[off..off + bytes.len()].copy_from_slice(bytes);
            assert!(
                matches!(read_header(&hdr), Err(BloomError::CorruptImage(_))),
                "patch at {off} accepted"
            );
        }
    }
}
