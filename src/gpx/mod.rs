//! Reading GPX documents
//!
//! Elements are matched by local name anywhere in the tree, so documents with
//! or without the GPX namespace, and fragments without a `<gpx>` root, are
//! treated alike.

use roxmltree::{Document, Node, ParsingOptions};

use crate::domain::geo::Coordinate;

pub mod error;

use error::GpxError;

pub const GPX: &str = "gpx";
pub const TRACK: &str = "trk";
pub const TRACK_POINT: &str = "trkpt";
pub const WAYPOINT: &str = "wpt";
const NAME: &str = "name";

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub position: Coordinate,
    pub name: Option<String>,
}

/// Coordinates extracted from one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxData {
    /// valid track points in document order
    pub track_points: Vec<Coordinate>,
    /// waypoints with valid coordinates
    pub waypoints: Vec<Waypoint>,
    /// number of `trkpt` elements, valid or not
    pub track_point_elements: usize,
    /// number of `wpt` elements, valid or not
    pub waypoint_elements: usize,
}

impl GpxData {
    pub fn has_point_elements(&self) -> bool {
        self.track_point_elements > 0 || self.waypoint_elements > 0
    }

    /// All valid coordinates, track points first
    pub fn coordinates(&self) -> impl Iterator<Item = &Coordinate> {
        self.track_points
            .iter()
            .chain(self.waypoints.iter().map(|w| &w.position))
    }
}

fn parse_document(text: &str) -> Result<Document<'_>, GpxError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(text, options)?)
}

fn elements<'a, 'input>(
    doc: &'a Document<'input>,
    local_name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    doc.descendants()
        .filter(move |n| n.is_element() && n.tag_name().name() == local_name)
}

fn coordinate_of(node: &Node) -> Option<Coordinate> {
    Coordinate::parse(node.attribute("lat"), node.attribute("lon"))
}

/// Text content of the first `name` element below `node`, kept as written.
///
/// Only an empty name counts as missing; surrounding whitespace is part of
/// the label.
fn name_of(node: &Node) -> Option<String> {
    let name = node
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == NAME)?;
    let text = name
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>();
    (!text.is_empty()).then_some(text)
}

/// Checks that `text` is well-formed XML containing at least one
/// `gpx`, `trk` or `wpt` element.
pub fn validate(text: &str) -> Result<(), GpxError> {
    let doc = parse_document(text)?;
    let found = doc.descendants().any(|n| {
        n.is_element() && matches!(n.tag_name().name(), GPX | TRACK | WAYPOINT)
    });
    if found { Ok(()) } else { Err(GpxError::NoGpxData) }
}

/// Extracts track points and waypoints.
///
/// Points whose `lat`/`lon` do not parse as finite numbers are skipped.
pub fn extract(text: &str) -> Result<GpxData, GpxError> {
    let doc = parse_document(text)?;
    let mut data = GpxData::default();

    for node in elements(&doc, TRACK_POINT) {
        data.track_point_elements += 1;
        if let Some(c) = coordinate_of(&node) {
            data.track_points.push(c);
        }
    }

    for node in elements(&doc, WAYPOINT) {
        data.waypoint_elements += 1;
        if let Some(position) = coordinate_of(&node) {
            data.waypoints.push(Waypoint {
                position,
                name: name_of(&node),
            });
        }
    }

    Ok(data)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_gpx_root() {
        assert!(validate(&fixtures::track(&[("1", "1")])).is_ok());
    }

    #[test]
    fn test_validate_accepts_bare_trk_or_wpt() {
        assert!(validate("<data><trk/></data>").is_ok());
        assert!(validate(r#"<data><wpt lat="1" lon="2"/></data>"#).is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_xml() {
        let err = validate("<gpx><trk></gpx>").unwrap_err();
        assert!(matches!(err, GpxError::InvalidXml(_)));
    }

    #[test]
    fn test_validate_rejects_xml_without_gpx_elements() {
        let err = validate("<kml><Placemark/></kml>").unwrap_err();
        assert!(matches!(err, GpxError::NoGpxData));
    }

    #[test]
    fn test_extract_skips_unparsable_points() -> anyhow::Result<()> {
        let data = extract(&fixtures::track(&[("1", "1"), ("x", "2"), ("3", ""), ("4", "4")]))?;
        assert_eq!(
            data.track_points,
            vec![Coordinate::new(1.0, 1.0), Coordinate::new(4.0, 4.0)]
        );
        assert_eq!(data.track_point_elements, 4);
        Ok(())
    }

    #[test]
    fn test_extract_waypoint_names() -> anyhow::Result<()> {
        let text = fixtures::with_waypoints(
            &[],
            &[
                ("1", "2", Some("Camp1")),
                ("3", "4", None),
                ("5", "6", Some("")),
                ("7", "8", Some(" Camp 2 ")),
            ],
        );
        let data = extract(&text)?;
        let names = data.waypoints.iter().map(|w| w.name.as_deref()).collect::<Vec<_>>();
        assert_eq!(names, vec![Some("Camp1"), None, None, Some(" Camp 2 ")]);
        Ok(())
    }

    #[test]
    fn test_coordinates_include_waypoints() -> anyhow::Result<()> {
        let data = extract(&fixtures::with_waypoints(&[("1", "1")], &[("2", "2", None)]))?;
        assert_eq!(data.coordinates().count(), 2);
        Ok(())
    }
}
