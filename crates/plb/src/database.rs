use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::Error;
use crate::strtab::decode_string;
use crate::varint::decode_unsigned;

pub const MAGIC: &[u8; 3] = b"PLB";
pub const VERSION: u8 = 0;

/// A memory-mapped, immutable PLB zone database.
///
/// `open` maps the file and parses the header eagerly; everything else —
/// the bbox index, metadata, and polygon streams — is read directly out of
/// the mapping on each `lookup` call. Nothing here allocates per vertex.
pub struct Database {
    mapping: Mmap,

    table_type: u8,
    precision: u8,
    field_names: Vec<String>,
    notice: String,

    pub(crate) bbox_offset: u32,
    pub(crate) metadata_offset: u32,
    pub(crate) data_offset: u32,
}

impl Database {
    /// Opens and maps `path`, parsing and validating the header. No partial
    /// database is ever returned: any failure here is an open-time error.
    pub fn open(path: impl AsRef<Path>) -> Result<Database, Error> {
        let file = File::open(path)?;
        let mapping = unsafe { Mmap::map(&file)? };
        Self::from_mapping(mapping)
    }

    fn from_mapping(mapping: Mmap) -> Result<Database, Error> {
        let data: &[u8] = &mapping;

        if data.len() < 7 {
            return Err(Error::TruncatedHeader);
        }
        if &data[0..3] != MAGIC {
            return Err(Error::BadMagic);
        }

        let table_type = data[3];
        let version = data[4];
        let precision = data[5];
        let num_fields = data[6];

        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        if precision == 0 || precision > 63 {
            return Err(Error::UnsupportedPrecision(precision));
        }

        let mut index = 7u32;

        let mut field_names = Vec::with_capacity(num_fields as usize);
        for _ in 0..num_fields {
            field_names.push(decode_string(data, 0, &mut index)?);
        }

        let notice = decode_string(data, 0, &mut index)?;

        let mut cursor = &data[index as usize..];
        let bbox_size = decode_unsigned(&mut cursor)?;
        index = (data.len() - cursor.len()) as u32;

        let mut cursor = &data[index as usize..];
        let meta_size = decode_unsigned(&mut cursor)?;
        index = (data.len() - cursor.len()) as u32;

        let mut cursor = &data[index as usize..];
        let data_size = decode_unsigned(&mut cursor)?;
        index = (data.len() - cursor.len()) as u32;

        let header_end = index;
        let bbox_offset = header_end;
        let metadata_offset = bbox_offset
            .checked_add(bbox_size as u32)
            .ok_or(Error::TruncatedHeader)?;
        let data_offset = metadata_offset
            .checked_add(meta_size as u32)
            .ok_or(Error::TruncatedHeader)?;

        let expected_len = data_offset as u64 + data_size;
        if expected_len != data.len() as u64 {
            return Err(Error::SizeMismatch {
                expected: expected_len,
                actual: data.len() as u64,
            });
        }

        Ok(Database {
            mapping,
            table_type,
            precision,
            field_names,
            notice,
            bbox_offset,
            metadata_offset,
            data_offset,
        })
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        &self.mapping
    }

    pub fn notice(&self) -> &str {
        &self.notice
    }

    pub fn table_type(&self) -> u8 {
        self.table_type
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }
}
