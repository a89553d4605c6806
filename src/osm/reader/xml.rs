// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};

use super::model::{Feature, FeatureType, Relation, RelationMember, Way};

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

/// Reader streams ways and relations from an [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) file.
///
/// Ending the document with unclosed elements is an error, so that a truncated
/// file never yields a partially-read feature.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
    open_elements: Vec<String>,
}

impl<'a> Reader<BufParser<'a>> {
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self {
            parser: BufParser(quick_xml::Reader::from_reader(data)),
            eof: false,
            open_elements: Vec::default(),
        }
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    pub(super) fn from_io(reader: R) -> Self {
        Self {
            parser: IoParser(quick_xml::Reader::from_reader(reader), Vec::default()),
            eof: false,
            open_elements: Vec::default(),
        }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        // Feature currently being built; None when outside of <way> and <relation>,
        // which includes the insides of <node> elements.
        let mut f: Option<Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            };

            match event {
                // "tag", "nd" and "member" are always self-closing
                Event::Empty(e) => match (e.local_name().as_ref(), f.as_mut()) {
                    (b"tag", Some(Feature::Way(w))) => add_tag(&mut w.tags, &e),
                    (b"tag", Some(Feature::Relation(r))) => add_tag(&mut r.tags, &e),
                    (b"nd", Some(Feature::Way(w))) => w.nodes.extend(parse_nd(&e)),
                    (b"member", Some(Feature::Relation(r))) => r.members.extend(parse_member(&e)),
                    _ => {}
                },

                Event::Start(e) => {
                    self.open_elements
                        .push(String::from_utf8_lossy(e.name().as_ref()).into_owned());

                    match e.local_name().as_ref() {
                        b"way" => {
                            f = parse_id(&e).map(|id| {
                                Feature::Way(Way {
                                    id,
                                    nodes: Vec::default(),
                                    tags: HashMap::default(),
                                })
                            })
                        }
                        b"relation" => {
                            f = parse_id(&e).map(|id| {
                                Feature::Relation(Relation {
                                    id,
                                    members: Vec::default(),
                                    tags: HashMap::default(),
                                })
                            })
                        }
                        _ => {}
                    }
                }

                Event::End(e) => {
                    self.open_elements.pop();

                    match e.local_name().as_ref() {
                        b"way" | b"relation" => {
                            if let Some(f) = f.take() {
                                return Some(Ok(f));
                            }
                        }
                        _ => {}
                    }
                }

                Event::Eof => {
                    self.eof = true;
                    if let Some(name) = self.open_elements.pop() {
                        return Some(Err(quick_xml::Error::IllFormed(
                            IllFormedError::MissingEndTag(name),
                        )));
                    }
                }

                _ => {}
            }
        }

        None
    }
}

/// Parses the `id` attribute of a `<way>` or `<relation>` element.
/// Missing, malformed and zero identifiers cause the element to be skipped.
fn parse_id(e: &BytesStart<'_>) -> Option<i64> {
    match parse_i64_attribute(e, b"id")? {
        0 => None,
        id => Some(id),
    }
}

fn parse_nd(e: &BytesStart<'_>) -> Option<i64> {
    match parse_i64_attribute(e, b"ref")? {
        0 => None,
        ref_ => Some(ref_),
    }
}

fn add_tag(tags: &mut HashMap<String, String>, e: &BytesStart<'_>) {
    let mut k = None;
    let mut v = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"k" => k = attr.unescape_value().ok().map(|s| s.into_owned()),
            b"v" => v = attr.unescape_value().ok().map(|s| s.into_owned()),
            _ => {}
        }
    }

    if let Some(k) = k {
        tags.insert(k, v.unwrap_or_default());
    }
}

fn parse_member(e: &BytesStart<'_>) -> Option<RelationMember> {
    let mut ref_: i64 = 0;
    let mut type_ = None;
    let mut role = None;

    for attr in e.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"ref" => ref_ = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"type" => type_ = Some(parse_feature_type(&attr.value)?),
            b"role" => role = Some(attr.unescape_value().ok()?.into_owned()),
            _ => {}
        }
    }

    match (ref_, type_, role) {
        (0, _, _) => None,
        (ref_, Some(type_), role) => Some(RelationMember {
            type_,
            ref_,
            role: role.unwrap_or_default(),
        }),
        _ => None,
    }
}

fn parse_feature_type(s: &[u8]) -> Option<FeatureType> {
    match s {
        b"node" => Some(FeatureType::Node),
        b"way" => Some(FeatureType::Way),
        b"relation" => Some(FeatureType::Relation),
        _ => None,
    }
}

fn parse_i64_attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<i64> {
    let attr = e.try_get_attribute(key).ok()??;
    from_utf8(&attr.value).ok()?.parse().ok()
}
