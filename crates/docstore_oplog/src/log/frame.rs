//! On-disk framing for the file-backed change log.
//!
//! ```text
//! | magic "DSOL" (4) | version u16 (2) | length u32 (4) | CBOR entry | crc32 (4) |
//! ```
//!
//! All integers are little endian. The CRC covers everything before it.

use crate::entry::ChangeEntry;
use crate::error::{OplogError, OplogResult};

/// Frame magic.
pub const FRAME_MAGIC: [u8; 4] = *b"DSOL";

/// Frame format version.
pub const FRAME_VERSION: u16 = 1;

/// Bytes before the payload.
pub const HEADER_SIZE: usize = 10;

/// Bytes after the payload.
pub const CRC_SIZE: usize = 4;

/// Frames an entry.
pub fn encode_frame(entry: &ChangeEntry) -> OplogResult<Vec<u8>> {
    let payload = entry.encode()?;
    let len = u32::try_from(payload.len())
        .map_err(|_| OplogError::malformed("entry larger than 4 GiB"))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    let crc = compute_crc32(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// What [`decode_frames`] found in a byte buffer.
#[derive(Debug)]
pub struct Decoded {
    /// Entries of every complete frame, in order.
    pub entries: Vec<ChangeEntry>,
    /// Length of the prefix made of complete frames.
    pub valid_len: u64,
}

/// Decodes consecutive frames.
///
/// A frame cut short by the end of the buffer ends the scan; its bytes are
/// excluded from `valid_len`. Anything else that is wrong with a frame is
/// an error.
pub fn decode_frames(bytes: &[u8]) -> OplogResult<Decoded> {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let offset = pos as u64;
        let rest = &bytes[pos..];
        if rest.len() < HEADER_SIZE {
            break;
        }
        if rest[..4] != FRAME_MAGIC {
            return Err(OplogError::corrupted(offset, "bad frame magic"));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != FRAME_VERSION {
            return Err(OplogError::corrupted(
                offset,
                format!("unsupported frame version {version}"),
            ));
        }
        let len = u32::from_le_bytes([rest[6], rest[7], rest[8], rest[9]]) as usize;
        let total = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < total {
            break;
        }

        let body = &rest[..HEADER_SIZE + len];
        let stored = u32::from_le_bytes([
            rest[HEADER_SIZE + len],
            rest[HEADER_SIZE + len + 1],
            rest[HEADER_SIZE + len + 2],
            rest[HEADER_SIZE + len + 3],
        ]);
        let computed = compute_crc32(body);
        if stored != computed {
            return Err(OplogError::ChecksumMismatch {
                offset,
                expected: stored,
                actual: computed,
            });
        }

        let entry = ChangeEntry::decode(&body[HEADER_SIZE..])
            .map_err(|e| OplogError::corrupted(offset, e.to_string()))?;
        entries.push(entry);
        pos += total;
    }

    Ok(Decoded {
        entries,
        valid_len: pos as u64,
    })
}

/// CRC-32 (IEEE).
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    !data.iter().fold(0xFFFF_FFFF_u32, |crc, &byte| {
        (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize]
    })
}
