// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Streaming access to ways and relations of [OpenStreetMap](https://www.openstreetmap.org/)
//! files, in the XML (optionally gzip- or bzip2-compressed) and PBF formats.

use std::io;

mod handler;
mod reader;

pub use handler::Handler;
pub use reader::model::{Feature, FeatureType, Relation, RelationMember, Way};
pub use reader::{
    add_features_from_buffer, add_features_from_file, add_features_from_io, FileFormat,
    PbfError,
};

/// Error which can occur when reading an OSM file. Any of these aborts the whole pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("pbf: {0}")]
    Pbf(#[from] PbfError),
}
