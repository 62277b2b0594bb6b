#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use cavern_crawl_core::{TerrainView, TileCoord, TileKind};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "cavern";
const SNAPSHOT_VERSION: &str = "v1";

/// Scheme marker every encoded snapshot starts with.
pub(crate) const SNAPSHOT_HEADER: &str = "cavern:v1";
/// Separator between the header segments and the payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of a generated grid plus the seed that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct MapSnapshot {
    /// Grid width in tiles.
    pub columns: u32,
    /// Grid height in tiles.
    pub rows: u32,
    /// Master seed the generation pipeline consumed.
    pub seed: u32,
    /// Grid rows rendered as glyph strings, top row first.
    pub tiles: Vec<String>,
}

impl MapSnapshot {
    /// Captures the provided terrain as a transferable snapshot.
    #[must_use]
    pub(crate) fn from_terrain(view: &TerrainView<'_>, seed: u32) -> Self {
        let (columns, rows) = view.dimensions();
        let mut tiles = Vec::new();
        for row in 0..rows {
            let mut line = String::new();
            for column in 0..columns {
                let kind = view
                    .kind(TileCoord::new(column, row))
                    .unwrap_or(TileKind::Wall);
                line.push(glyph(kind));
            }
            tiles.push(line);
        }
        Self {
            columns,
            rows,
            seed,
            tiles,
        }
    }

    /// Renders the snapshot as one line of text that survives a clipboard round trip.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let payload = SerializableSnapshot {
            seed: self.seed,
            tiles: self.tiles.clone(),
        };
        let json = serde_json::to_vec(&payload).expect("map snapshot serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!("{SNAPSHOT_HEADER}:{}x{}:{encoded}", self.columns, self.rows)
    }

    /// Parses a snapshot back out of its single-line encoding.
    pub(crate) fn decode(value: &str) -> Result<Self, MapTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(MapTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(MapTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(MapTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(MapTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(MapTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(MapTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(MapTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(MapTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(MapTransferError::InvalidPayload)?;

        if decoded.tiles.len() != usize::try_from(rows).unwrap_or(usize::MAX) {
            return Err(MapTransferError::RowCountMismatch {
                expected: rows,
                actual: decoded.tiles.len(),
            });
        }
        for line in &decoded.tiles {
            if line.chars().count() != usize::try_from(columns).unwrap_or(usize::MAX) {
                return Err(MapTransferError::RowWidthMismatch {
                    expected: columns,
                    line: line.clone(),
                });
            }
            if let Some(unknown) = line.chars().find(|glyph| kind_for_glyph(*glyph).is_none()) {
                return Err(MapTransferError::UnknownGlyph(unknown));
            }
        }

        Ok(Self {
            columns,
            rows,
            seed: decoded.seed,
            tiles: decoded.tiles,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableSnapshot {
    seed: u32,
    tiles: Vec<String>,
}

/// Single-character rendering of a tile kind.
pub(crate) const fn glyph(kind: TileKind) -> char {
    match kind {
        TileKind::Wall => '#',
        TileKind::Floor => '.',
        TileKind::Door => '+',
        TileKind::Water => '~',
    }
}

const fn kind_for_glyph(glyph: char) -> Option<TileKind> {
    match glyph {
        '#' => Some(TileKind::Wall),
        '.' => Some(TileKind::Floor),
        '+' => Some(TileKind::Door),
        '~' => Some(TileKind::Water),
        _ => None,
    }
}

/// Errors that can occur while decoding map transfer strings.
#[derive(Debug)]
pub(crate) enum MapTransferError {
    /// The input held nothing but whitespace.
    EmptyPayload,
    /// No prefix segment was present at all.
    MissingPrefix,
    /// Nothing followed the prefix where the version should be.
    MissingVersion,
    /// Nothing followed the version where the dimensions should be.
    MissingDimensions,
    /// Nothing followed the dimensions where the payload should be.
    MissingPayload,
    /// The string carries a prefix from some other scheme.
    InvalidPrefix(String),
    /// The version segment names a format this build cannot read.
    UnsupportedVersion(String),
    /// The dimension segment is not `<columns>x<rows>` with nonzero sides.
    InvalidDimensions(String),
    /// The payload is not valid base64.
    InvalidEncoding(base64::DecodeError),
    /// The payload bytes did not deserialise into a snapshot.
    InvalidPayload(serde_json::Error),
    /// The payload row count disagrees with the header dimensions.
    RowCountMismatch {
        /// Row count promised by the header.
        expected: u32,
        /// Row count actually present in the payload.
        actual: usize,
    },
    /// A payload row disagrees with the header column count.
    RowWidthMismatch {
        /// Column count promised by the header.
        expected: u32,
        /// The offending row.
        line: String,
    },
    /// The payload contained a glyph with no tile kind mapping.
    UnknownGlyph(char),
}

impl fmt::Display for MapTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "map payload was empty"),
            Self::MissingPrefix => write!(f, "map string is missing the prefix"),
            Self::MissingVersion => write!(f, "map string is missing the version"),
            Self::MissingDimensions => write!(f, "map string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "map string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "map prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "map version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode map payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse map payload: {error}")
            }
            Self::RowCountMismatch { expected, actual } => {
                write!(f, "map payload holds {actual} rows, header promised {expected}")
            }
            Self::RowWidthMismatch { expected, line } => {
                write!(f, "map row '{line}' is not {expected} columns wide")
            }
            Self::UnknownGlyph(glyph) => write!(f, "map glyph '{glyph}' is not recognised"),
        }
    }
}

impl Error for MapTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), MapTransferError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| MapTransferError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| MapTransferError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| MapTransferError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(MapTransferError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok((columns, rows))
}
