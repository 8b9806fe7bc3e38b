use prost::Message;

use crate::error::TypeError;
use crate::proto;

/// Bounding box of the file, in nanodegrees.
///
/// ```text
/// ┌──────────┬───────────┬────────┐
/// │ Field ID │ Wire Type │ Name   │
/// ├──────────┼───────────┼────────┤
/// │ 1        │ sint64    │ left   │
/// │ 2        │ sint64    │ right  │
/// │ 3        │ sint64    │ top    │
/// │ 4        │ sint64    │ bottom │
/// └──────────┴───────────┴────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderBBox {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

impl HeaderBBox {
    /// `[min_lon, min_lat, max_lon, max_lat]` in degrees.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_degrees(&self) -> [f64; 4] {
        const NANO: f64 = 1_000_000_000.0;
        [
            self.left as f64 / NANO,
            self.bottom as f64 / NANO,
            self.right as f64 / NANO,
            self.top as f64 / NANO,
        ]
    }
}

impl TryFrom<proto::HeaderBBox> for HeaderBBox {
    type Error = TypeError;

    fn try_from(msg: proto::HeaderBBox) -> Result<Self, TypeError> {
        let missing = |field| TypeError::MissingRequiredField {
            message: "HeaderBBox",
            field,
        };
        Ok(Self {
            left: msg.left.ok_or_else(|| missing("left"))?,
            right: msg.right.ok_or_else(|| missing("right"))?,
            top: msg.top.ok_or_else(|| missing("top"))?,
            bottom: msg.bottom.ok_or_else(|| missing("bottom"))?,
        })
    }
}

impl From<&HeaderBBox> for proto::HeaderBBox {
    fn from(bbox: &HeaderBBox) -> Self {
        Self {
            left: Some(bbox.left),
            right: Some(bbox.right),
            top: Some(bbox.top),
            bottom: Some(bbox.bottom),
        }
    }
}

/// Payload of the `OSMHeader` frame that opens every file.
///
/// Field layout within body:
///
/// ```text
/// ┌──────────┬───────────┬─────────────────────────────────────┐
/// │ Field ID │ Wire Type │ Name                                │
/// ├──────────┼───────────┼─────────────────────────────────────┤
/// │ 1        │ Nested    │ bbox                                │
/// │ 4        │ Bytes     │ required_features (repeated)        │
/// │ 5        │ Bytes     │ optional_features (repeated)        │
/// │ 16       │ Bytes     │ writingprogram                      │
/// │ 17       │ Bytes     │ source                              │
/// │ 32       │ Varint    │ osmosis_replication_timestamp       │
/// │ 33       │ Varint    │ osmosis_replication_sequence_number │
/// │ 34       │ Bytes     │ osmosis_replication_base_url        │
/// └──────────┴───────────┴─────────────────────────────────────┘
/// ```
///
/// A reader must refuse a file whose `required_features` it does not
/// implement. Optional features are informational.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    pub bbox: Option<HeaderBBox>,
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
    pub writing_program: Option<String>,
    pub source: Option<String>,
    /// Seconds since the epoch.
    pub replication_timestamp: Option<i64>,
    pub replication_sequence: Option<i64>,
    pub replication_base_url: Option<String>,
}

impl HeaderBlock {
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        proto::HeaderBlock::from(self).encode_to_vec()
    }

    /// # Errors
    ///
    /// Fails on malformed protobuf, a bbox missing a side, or a string
    /// field holding invalid UTF-8.
    pub fn decode_body(buf: &[u8]) -> Result<Self, TypeError> {
        proto::HeaderBlock::decode(buf)?.try_into()
    }

    /// Required features not contained in `supported`.
    #[must_use]
    pub fn unsupported_features(&self, supported: &[&str]) -> Vec<&str> {
        self.required_features
            .iter()
            .map(String::as_str)
            .filter(|f| !supported.iter().any(|s| s == f))
            .collect()
    }
}

impl TryFrom<proto::HeaderBlock> for HeaderBlock {
    type Error = TypeError;

    fn try_from(msg: proto::HeaderBlock) -> Result<Self, TypeError> {
        Ok(Self {
            bbox: msg.bbox.map(HeaderBBox::try_from).transpose()?,
            required_features: msg.required_features,
            optional_features: msg.optional_features,
            writing_program: msg.writingprogram,
            source: msg.source,
            replication_timestamp: msg.osmosis_replication_timestamp,
            replication_sequence: msg.osmosis_replication_sequence_number,
            replication_base_url: msg.osmosis_replication_base_url,
        })
    }
}

impl From<&HeaderBlock> for proto::HeaderBlock {
    fn from(header: &HeaderBlock) -> Self {
        Self {
            bbox: header.bbox.as_ref().map(Into::into),
            required_features: header.required_features.clone(),
            optional_features: header.optional_features.clone(),
            writingprogram: header.writing_program.clone(),
            source: header.source.clone(),
            osmosis_replication_timestamp: header.replication_timestamp,
            osmosis_replication_sequence_number: header.replication_sequence,
            osmosis_replication_base_url: header.replication_base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HeaderBlock {
        HeaderBlock {
            bbox: Some(HeaderBBox {
                left: -1_000_000_000,
                right: 2_000_000_000,
                top: 3_000_000_000,
                bottom: -500_000_000,
            }),
            required_features: vec!["OsmSchema-V0.6".into(), "DenseNodes".into()],
            optional_features: vec!["Sort.Type_then_ID".into()],
            writing_program: Some("pbf-encoder".into()),
            source: None,
            replication_timestamp: Some(1_700_000_000),
            replication_sequence: Some(42),
            replication_base_url: Some("https://example.org/replication".into()),
        }
    }

    #[test]
    fn header_fields_survive_encoding() {
        let header = sample();
        let decoded = HeaderBlock::decode_body(&header.encode_body()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn bbox_in_degrees() {
        let bbox = sample().bbox.unwrap();
        assert_eq!(bbox.to_degrees(), [-1.0, -0.5, 2.0, 3.0]);
    }

    #[test]
    fn invalid_utf8_in_a_string_field_is_rejected() {
        // writingprogram (field 16) = 0xFF
        let buf = [0x82, 0x01, 0x01, 0xFF];
        assert!(matches!(
            HeaderBlock::decode_body(&buf),
            Err(TypeError::Decode(_))
        ));
    }

    #[test]
    fn unsupported_features_are_listed() {
        let mut header = sample();
        header.required_features.push("HistoricalInformation".into());
        let missing = header.unsupported_features(&["OsmSchema-V0.6", "DenseNodes"]);
        assert_eq!(missing, vec!["HistoricalInformation"]);
    }

    #[test]
    fn incomplete_bbox_is_rejected() {
        let buf = proto::HeaderBlock {
            bbox: Some(proto::HeaderBBox {
                left: Some(0),
                ..proto::HeaderBBox::default()
            }),
            ..proto::HeaderBlock::default()
        }
        .encode_to_vec();
        assert!(matches!(
            HeaderBlock::decode_body(&buf),
            Err(TypeError::MissingRequiredField {
                message: "HeaderBBox",
                field: "right"
            })
        ));
    }
}
