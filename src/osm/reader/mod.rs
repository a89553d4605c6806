// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use super::{Error, Handler};

pub(super) mod model;
mod pbf;
mod xml;

pub use pbf::Error as PbfError;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the file name or the content
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,

    /// Force [OSM PBF](https://wiki.openstreetmap.org/wiki/PBF_Format)
    Pbf,
}

impl FileFormat {
    /// Guesses the format based on the extension of a file name,
    /// returning [FileFormat::Unknown] if the extension is not recognized.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let name = match path.as_ref().file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_ascii_lowercase(),
            None => return Self::Unknown,
        };

        if name.ends_with(".pbf") {
            Self::Pbf
        } else if name.ends_with(".osm.gz") {
            Self::XmlGz
        } else if name.ends_with(".osm.bz2") {
            Self::XmlBz2
        } else if name.ends_with(".osm") || name.ends_with(".xml") {
            Self::Xml
        } else {
            Self::Unknown
        }
    }

    /// Guesses the format based on the first few bytes of a file.
    ///
    /// Compression is recognized by its magic bytes, uncompressed XML by a leading `<`
    /// (after an optional byte order mark and whitespace). Anything else is assumed
    /// to be PBF, as that format has no magic bytes of its own.
    pub fn sniff(prefix: &[u8]) -> Self {
        let prefix = prefix.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(prefix);

        if prefix.starts_with(&[0x1F, 0x8B]) {
            Self::XmlGz
        } else if prefix.starts_with(b"BZh") {
            Self::XmlBz2
        } else if prefix.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<') {
            Self::Xml
        } else {
            Self::Pbf
        }
    }
}

/// Delivers all ways and relations from a stream of decoded features to a [Handler],
/// stopping at the first decoding error.
fn apply<H, I, E>(handler: &mut H, features: I) -> Result<(), Error>
where
    H: Handler + ?Sized,
    I: Iterator<Item = Result<model::Feature, E>>,
    Error: From<E>,
{
    for f in features {
        match f? {
            model::Feature::Way(w) => handler.way(&w),
            model::Feature::Relation(r) => handler.relation(&r),
        }
    }
    Ok(())
}

/// Parse OSM features from a reader, delivering all ways and relations to a [Handler].
///
/// The provided stream will be automatically wrapped in a buffered reader.
/// With [FileFormat::Unknown], the format is guessed with [FileFormat::sniff].
pub fn add_features_from_io<H: Handler + ?Sized, R: io::Read>(
    handler: &mut H,
    file_format: FileFormat,
    reader: R,
) -> Result<(), Error> {
    let mut reader = io::BufReader::new(reader);

    let file_format = match file_format {
        FileFormat::Unknown => {
            let detected = FileFormat::sniff(reader.fill_buf()?);
            log::debug!("detected file format from content: {detected:?}");
            detected
        }
        f => f,
    };

    match file_format {
        FileFormat::Unknown => unreachable!("FileFormat::sniff never returns Unknown"),

        FileFormat::Xml => apply(handler, xml::Reader::from_io(reader)),

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            let b = io::BufReader::new(d);
            apply(handler, xml::Reader::from_io(b))
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            let b = io::BufReader::new(d);
            apply(handler, xml::Reader::from_io(b))
        }

        FileFormat::Pbf => apply(handler, pbf::features_from_io(reader)),
    }
}

/// Parse OSM features from a file at the provided path, delivering all ways and relations
/// to a [Handler]. With [FileFormat::Unknown], the format is guessed from the file name,
/// and then from its content.
pub fn add_features_from_file<H: Handler + ?Sized, P: AsRef<Path>>(
    handler: &mut H,
    file_format: FileFormat,
    path: P,
) -> Result<(), Error> {
    let file_format = match file_format {
        FileFormat::Unknown => FileFormat::from_path(&path),
        f => f,
    };
    log::debug!("reading {} as {file_format:?}", path.as_ref().display());

    let f = File::open(path)?;
    add_features_from_io(handler, file_format, f)
}

/// Parse OSM features from a static buffer, delivering all ways and relations to a [Handler].
pub fn add_features_from_buffer<H: Handler + ?Sized>(
    handler: &mut H,
    file_format: FileFormat,
    data: &[u8],
) -> Result<(), Error> {
    let file_format = match file_format {
        FileFormat::Unknown => FileFormat::sniff(data),
        f => f,
    };

    match file_format {
        // Fast path is available for in-memory XML data
        FileFormat::Xml => apply(handler, xml::Reader::from_buffer(data)),

        // PBF doesn't need a buffered reader around a slice
        FileFormat::Pbf => apply(handler, pbf::features_from_io(data)),

        _ => add_features_from_io(handler, file_format, data),
    }
}
