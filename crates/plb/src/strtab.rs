//! String table: length-prefixed strings with one-level back-reference
//! deduplication, used for field names, the notice string, and metadata
//! field values.
//!
//! Every string byte is stored XORed with `0x80` on disk, which keeps the
//! stream free of plain ASCII control bytes. A first occurrence is written
//! as `varint(length) || masked bytes` with `length < 256`. A repeat is
//! written as `varint(offset + 256)`, where `offset` is the byte position of
//! the first occurrence relative to the start of the metadata region.

use std::collections::HashMap;

use crate::error::Error;
use crate::varint::decode_unsigned;

const MASK: u8 = 0x80;

/// Writer side: encodes `s` into `out`, consulting (and updating) `seen` to
/// deduplicate against strings already written earlier in the same region.
/// `out` must be exactly the buffer for the region being built, since the
/// recorded offset is `out.len()` at the moment of the first occurrence.
pub fn encode_string(out: &mut Vec<u8>, seen: &mut HashMap<String, u64>, s: &str) -> Result<(), Error> {
    if s.len() >= 256 {
        // Strings this long cannot be represented inline; the builder is
        // expected to have rejected them earlier. Encoding defensively here
        // would silently corrupt the stream, so this is a hard error.
        return Err(Error::TruncatedString);
    }

    if let Some(&offset) = seen.get(s) {
        crate::varint::encode_unsigned(out, offset + 256);
        return Ok(());
    }

    seen.insert(s.to_string(), out.len() as u64);
    crate::varint::encode_unsigned(out, s.len() as u64);
    out.extend(s.bytes().map(|b| b ^ MASK));
    Ok(())
}

/// Reader side: decodes one string starting at `*index` (an absolute byte
/// position within `data`), advancing `*index` past the bytes consumed for
/// an inline string. A back-reference consumes only the varint that encodes
/// it; `*index` does not follow the reference.
pub fn decode_string(data: &[u8], metadata_offset: u32, index: &mut u32) -> Result<String, Error> {
    let start = *index as usize;
    if start > data.len() {
        return Err(Error::TruncatedString);
    }
    let mut cursor = &data[start..];
    let length = decode_unsigned(&mut cursor)?;
    let after_length_index = (data.len() - cursor.len()) as u32;

    if length >= 256 {
        let backref_offset: u32 = (length - 256)
            .try_into()
            .map_err(|_| Error::TruncatedString)?;
        let mut remote_index = metadata_offset
            .checked_add(backref_offset)
            .ok_or(Error::TruncatedString)?;
        let remote_start = remote_index as usize;
        if remote_start > data.len() {
            return Err(Error::TruncatedString);
        }
        let mut remote_cursor = &data[remote_start..];
        let remote_length = decode_unsigned(&mut remote_cursor)?;
        if remote_length >= 256 {
            // A back-reference may not itself point at another back-reference.
            return Err(Error::TruncatedString);
        }
        remote_index = (data.len() - remote_cursor.len()) as u32;
        let bytes = read_masked(data, remote_index, remote_length as usize)?;

        *index = after_length_index;
        Ok(bytes)
    } else {
        let bytes = read_masked(data, after_length_index, length as usize)?;
        *index = after_length_index + length as u32;
        Ok(bytes)
    }
}

fn read_masked(data: &[u8], offset: u32, len: usize) -> Result<String, Error> {
    let start = offset as usize;
    let end = start.checked_add(len).ok_or(Error::TruncatedString)?;
    let raw = data.get(start..end).ok_or(Error::TruncatedString)?;
    let unmasked: Vec<u8> = raw.iter().map(|&b| b ^ MASK).collect();
    String::from_utf8(unmasked).map_err(|_| Error::TruncatedString)
}
