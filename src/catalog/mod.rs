use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::io;

use crate::error::{PracticeError, Result};
use crate::geometry::Point;
use crate::progress::CharacterId;

static CATALOG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/catalog");

const CATALOG_FILE: &str = "characters.json";

/// Entry in the character picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterPreview {
    pub id: CharacterId,
    pub name: String,
    pub preview: String,
}

/// Model stroke, as canonical key points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStroke {
    pub nodes: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub svg_url: String,
    pub stroke_data: Vec<ReferenceStroke>,
}

impl Character {
    pub fn stroke_count(&self) -> usize {
        self.stroke_data.len()
    }
}

/// Practice characters and their reference strokes
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    previews: Vec<CharacterPreview>,
    characters: Vec<Character>,
}

impl Catalog {
    /// Catalog bundled into the binary
    pub fn builtin() -> Result<Self> {
        let file = CATALOG_DIR.get_file(CATALOG_FILE).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "bundled character catalog missing")
        })?;
        let contents = file.contents_utf8().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "character catalog is not utf-8")
        })?;
        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn previews(&self) -> &[CharacterPreview] {
        &self.previews
    }

    pub fn character(&self, id: CharacterId) -> Result<&Character> {
        self.characters
            .iter()
            .find(|c| c.id == id)
            .ok_or(PracticeError::NotFound {
                kind: "character",
                id,
            })
    }
}
