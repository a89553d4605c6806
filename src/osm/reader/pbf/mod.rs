// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

// Generated by build.rs from fileformat.proto and osmformat.proto;
// declares the `fileformat` and `osmformat` modules.
include!(concat!(env!("OUT_DIR"), "/protos/mod.rs"));

use std::collections::HashMap;
use std::io;
use std::io::Read;
use std::rc::Rc;
use std::sync::Arc;

use protobuf::Message;

use super::model::{Feature, FeatureType, Relation, RelationMember, Way};

/// Max permitted size for a serialized [blob header](https://wiki.openstreetmap.org/wiki/PBF_Format#File_format) -
/// 64 KiB.
const MAX_BLOB_HEADER_SIZE: u32 = 64 * 1024;

/// Max permitted size for a serialized & decompressed [blob](https://wiki.openstreetmap.org/wiki/PBF_Format#File_format) -
/// 32 MiB.
const MAX_BLOB_SIZE: u32 = 32 * 1024 * 1024;

/// All strings used by an [OSM PBF Block](https://wiki.openstreetmap.org/wiki/PBF_Format#Definition_of_OSMData_fileblock),
/// reference-counted as this table is shared by the way and relation iterators of every group.
type StringTable = Rc<Vec<String>>;

/// Error which can occur when reading a PBF file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("protobuf: {0}")]
    Protobuf(#[from] Arc<protobuf::Error>),

    #[error("io: {0}")]
    Io(#[from] Arc<io::Error>),

    #[error("BlobHeader too large: {0} > {MAX_BLOB_HEADER_SIZE}")]
    BlobHeaderTooLarge(u32),

    #[error("Blob too large: {0} > {MAX_BLOB_SIZE}")]
    BlobTooLarge(u32),

    #[error("BlobHeader.type: got {got:?}, expected {expected:?}")]
    UnexpectedBlobHeaderType { got: String, expected: &'static str },

    #[error("BlobHeader.datasize is negative")]
    NegativeBlobHeaderSize,

    #[error("Blob has no data")]
    MissingBlobData,

    #[error("unsupported compression: {0} (supported: raw, zlib and bzip2)")]
    UnsupportedCompression(&'static str),

    #[error("file requires unsupported features: {0:?}")]
    UnsupportedFeatures(Vec<String>),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<protobuf::Error> for Error {
    fn from(e: protobuf::Error) -> Self {
        Error::Protobuf(Arc::new(e))
    }
}

/// Returns an iterator over all ways and relations from an OSM PBF file.
pub(super) fn features_from_io<R: io::Read>(
    reader: R,
) -> impl Iterator<Item = Result<Feature, Error>> {
    FileBlocks {
        reader,
        header_checked: false,
        done: false,
    }
    .flat_map(block_result_features)
}

/// Iterator over [Blocks](Block) in an OSM PBF file.
///
/// The file must start with a single `OSMHeader` blob, followed by any number of
/// `OSMData` blobs. Blobs of other types are skipped.
struct FileBlocks<R: io::Read> {
    reader: R,
    header_checked: bool,
    done: bool,
}

impl<R: io::Read> Iterator for FileBlocks<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.read_next_block().transpose();
        self.done = !matches!(result, Some(Ok(_)));
        result
    }
}

impl<R: io::Read> FileBlocks<R> {
    /// Reads the next [Block], validating the file header first if that hasn't happened yet.
    /// Returns `Ok(None)` on EOF.
    fn read_next_block(&mut self) -> Result<Option<Block>, Error> {
        if !self.header_checked {
            if !self.read_and_check_header()? {
                return Ok(None); // empty file
            }
            self.header_checked = true;
        }

        loop {
            let blob_header = match self.read_blob_header()? {
                Some(h) => h,
                None => return Ok(None),
            };

            let blob = self.read_blob(blob_header.datasize())?;

            if blob_header.type_() == "OSMData" {
                let block = osmformat::PrimitiveBlock::parse_from_bytes(&blob)?;
                return Ok(Some(Block(block)));
            }

            log::debug!("skipping PBF blob of type {:?}", blob_header.type_());
        }
    }

    /// Reads the first size + [fileformat::BlobHeader] + [fileformat::Blob] sequence,
    /// expecting an `OSMHeader` block containing an [osmformat::HeaderBlock].
    ///
    /// Returns `Ok(true)` if a header block was successfully read and validated,
    /// `Ok(false)` on EOF, or an [Error] if anything bad has happened.
    fn read_and_check_header(&mut self) -> Result<bool, Error> {
        let blob_header = match self.read_blob_header()? {
            Some(h) => h,
            None => return Ok(false),
        };

        if blob_header.type_() != "OSMHeader" {
            return Err(Error::UnexpectedBlobHeaderType {
                got: blob_header.type_.unwrap_or_default(),
                expected: "OSMHeader",
            });
        }

        let blob = self.read_blob(blob_header.datasize())?;
        let header = osmformat::HeaderBlock::parse_from_bytes(&blob)?;

        let unknown_features: Vec<String> = header
            .required_features
            .iter()
            .filter(|f| !matches!(f.as_str(), "OsmSchema-V0.6" | "DenseNodes"))
            .cloned()
            .collect();
        if !unknown_features.is_empty() {
            return Err(Error::UnsupportedFeatures(unknown_features));
        }

        log::debug!(
            "PBF file written by {:?}",
            header.writingprogram.as_deref().unwrap_or("unknown program")
        );
        Ok(true)
    }

    /// Reads the next 4-byte size and the [fileformat::BlobHeader] following it.
    ///
    /// Returns `Ok(Some(_))` on success, `Ok(None)` on a clean EOF, or an [Error].
    /// EOF is only clean before the first byte of the size; a partial size is an [Error::Io].
    fn read_blob_header(&mut self) -> Result<Option<fileformat::BlobHeader>, Error> {
        let mut size_buf = [0u8; 4];
        let mut filled = 0;
        while filled < size_buf.len() {
            match self.reader.read(&mut size_buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "truncated BlobHeader size",
                    )
                    .into())
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let size = u32::from_be_bytes(size_buf);
        if size > MAX_BLOB_HEADER_SIZE {
            return Err(Error::BlobHeaderTooLarge(size));
        }

        let mut buf = vec![0u8; size as usize];
        self.reader.read_exact(&mut buf)?;
        Ok(Some(fileformat::BlobHeader::parse_from_bytes(&buf)?))
    }

    /// Reads the next [fileformat::Blob] and returns the decompressed contents of it.
    fn read_blob(&mut self, size: i32) -> Result<Vec<u8>, Error> {
        if size < 0 {
            return Err(Error::NegativeBlobHeaderSize);
        }
        if size as u32 > MAX_BLOB_SIZE {
            return Err(Error::BlobTooLarge(size as u32));
        }

        let mut buf = vec![0u8; size as usize];
        self.reader.read_exact(&mut buf)?;

        let blob = fileformat::Blob::parse_from_bytes(&buf)?;

        let raw_size = blob.raw_size().max(0) as u32;
        if raw_size > MAX_BLOB_SIZE {
            return Err(Error::BlobTooLarge(raw_size));
        }

        match blob.data.ok_or(Error::MissingBlobData)? {
            fileformat::blob::Data::Raw(data) => Ok(data),

            fileformat::blob::Data::ZlibData(data) => {
                decompress(flate2::read::ZlibDecoder::new(&data[..]), raw_size)
            }

            fileformat::blob::Data::OBSOLETEBzip2Data(data) => {
                decompress(bzip2::read::BzDecoder::new(&data[..]), raw_size)
            }

            fileformat::blob::Data::LzmaData(_) => Err(Error::UnsupportedCompression("lzma")),
            fileformat::blob::Data::Lz4Data(_) => Err(Error::UnsupportedCompression("lz4")),
            fileformat::blob::Data::ZstdData(_) => Err(Error::UnsupportedCompression("zstd")),
        }
    }
}

/// Decompresses a blob, refusing to produce more than [MAX_BLOB_SIZE] bytes
/// regardless of what the blob claims its raw size is.
fn decompress<D: io::Read>(decoder: D, raw_size: u32) -> Result<Vec<u8>, Error> {
    let mut decompressed = Vec::with_capacity(raw_size as usize);
    decoder
        .take(MAX_BLOB_SIZE as u64 + 1)
        .read_to_end(&mut decompressed)?;

    if decompressed.len() > MAX_BLOB_SIZE as usize {
        Err(Error::BlobTooLarge(decompressed.len() as u32))
    } else {
        Ok(decompressed)
    }
}

/// Wrapper for a union of any [Feature] iterator with `std::iter::once<Error>`.
enum BlockResultFeatureIterator<I: Iterator<Item = Feature>> {
    Iterating(I),
    Done(Option<Error>),
}

impl<I: Iterator<Item = Feature>> Iterator for BlockResultFeatureIterator<I> {
    type Item = Result<Feature, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Iterating(i) => i.next().map(Ok),
            Self::Done(e) => e.take().map(Err),
        }
    }
}

fn block_result_features(
    block_result: Result<Block, Error>,
) -> BlockResultFeatureIterator<impl Iterator<Item = Feature>> {
    match block_result {
        Ok(block) => BlockResultFeatureIterator::Iterating(block.features()),
        Err(e) => BlockResultFeatureIterator::Done(Some(e)),
    }
}

/// Block abstracts away an [osmformat::PrimitiveBlock] into a friendly interface.
struct Block(osmformat::PrimitiveBlock);

impl Block {
    /// Returns a flattened iterator over all ways and relations from all groups in this block.
    /// Nodes (plain and dense) are skipped without being decoded into [Features](Feature).
    fn features(self) -> impl Iterator<Item = Feature> {
        let string_table: StringTable = Rc::new(
            self.0
                .stringtable
                .s
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect(),
        );

        self.0.primitivegroup.into_iter().flat_map(move |g| {
            let ways = ways(g.ways, string_table.clone()).map(Feature::Way);
            let relations = relations(g.relations, string_table.clone()).map(Feature::Relation);
            ways.chain(relations)
        })
    }
}

/// Returns an iterator over all [ways](Way) from a moved vector of [raw ways](osmformat::Way).
fn ways(raw_ways: Vec<osmformat::Way>, string_table: StringTable) -> impl Iterator<Item = Way> {
    raw_ways.into_iter().map(move |way| Way {
        id: way.id(),
        nodes: delta_decode(&way.refs).collect(),
        tags: collect_tags(&way.keys, &way.vals, &string_table),
    })
}

/// Returns an iterator over all [relations](Relation) from a moved vector of [raw relations](osmformat::Relation).
fn relations(
    raw_relations: Vec<osmformat::Relation>,
    string_table: StringTable,
) -> impl Iterator<Item = Relation> {
    raw_relations.into_iter().map(move |relation| Relation {
        id: relation.id(),
        members: collect_relation_members(
            &relation.memids,
            &relation.roles_sid,
            &relation.types,
            &string_table,
        ),
        tags: collect_tags(&relation.keys, &relation.vals, &string_table),
    })
}

fn delta_decode(deltas: &[i64]) -> impl Iterator<Item = i64> + '_ {
    deltas.iter().scan(0i64, |acc, &delta| {
        *acc = acc.wrapping_add(delta);
        Some(*acc)
    })
}

fn collect_tags(keys: &[u32], values: &[u32], string_table: &[String]) -> HashMap<String, String> {
    keys.iter()
        .zip(values.iter())
        .map(|(&key_idx, &value_idx)| {
            (
                get_string(string_table, key_idx),
                get_string(string_table, value_idx),
            )
        })
        .collect()
}

/// Decodes relation members. Members with a type unknown to this reader are dropped,
/// mirroring how the XML reader treats them.
fn collect_relation_members(
    member_id_deltas: &[i64],
    roles: &[i32],
    types: &[protobuf::EnumOrUnknown<osmformat::relation::MemberType>],
    string_table: &[String],
) -> Vec<RelationMember> {
    delta_decode(member_id_deltas)
        .zip(roles.iter().zip(types.iter()))
        .filter_map(|(ref_, (&role_idx, type_))| {
            let type_ = match type_.enum_value().ok()? {
                osmformat::relation::MemberType::NODE => FeatureType::Node,
                osmformat::relation::MemberType::WAY => FeatureType::Way,
                osmformat::relation::MemberType::RELATION => FeatureType::Relation,
            };
            Some(RelationMember {
                type_,
                ref_,
                role: get_string(string_table, role_idx as u32),
            })
        })
        .collect()
}

#[inline]
fn get_string(table: &[String], idx: u32) -> String {
    table.get(idx as usize).cloned().unwrap_or_default()
}
