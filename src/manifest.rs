use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};

use std::fmt;

static PREFERRED_LANGUAGE: &str = "en";

/// A presentation manifest reduced to the parts the chapter resolver reads:
/// the top-level range tree and the leaf units carrying durations.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub structures: Vec<Range>,
    #[serde(default)]
    pub items: Vec<Canvas>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Manifest, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A leaf unit: an addressable span of continuous media.
#[derive(Clone, Debug, Deserialize)]
pub struct Canvas {
    pub id: String,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// A hierarchical grouping node. May reference leaf units and/or nest
/// further ranges, without depth limit.
#[derive(Clone, Debug, Deserialize)]
pub struct Range {
    pub id: String,
    #[serde(default)]
    pub label: Option<LabelMap>,
    #[serde(default)]
    pub items: Vec<StructureItem>,
    #[serde(default)]
    pub thumbnail: Vec<Thumbnail>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

/// A child entry of a range, discriminated by its `type` field. Types other
/// than `Range` and `Canvas` deserialize to `Unknown` and take no part in
/// resolution.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StructureItem {
    Range(Range),
    Canvas(CanvasRef),
    #[serde(other)]
    Unknown,
}

/// A reference to a leaf unit, possibly fragment-decorated.
#[derive(Clone, Debug, Deserialize)]
pub struct CanvasRef {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Thumbnail {
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub label: LabelMap,
    #[serde(default)]
    pub value: LabelMap,
}

/// A language-tagged label map, e.g. `{"en": ["Introduction"]}`.
///
/// Entries keep their document order: the fallback label scan depends on it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelMap(Vec<(String, Vec<String>)>);

impl LabelMap {
    /// The display string for this map: the leading entry under `en` when
    /// present and non-empty, otherwise the first non-empty leading entry in
    /// document order.
    pub fn preferred(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(language, _)| language.as_str() == PREFERRED_LANGUAGE)
            .and_then(|(_, values)| values.first())
            .filter(|value| !value.is_empty())
            .map(String::as_str)
            .or_else(|| {
                self.0
                    .iter()
                    .filter_map(|(_, values)| values.first())
                    .find(|value| !value.is_empty())
                    .map(String::as_str)
            })
    }
}

impl From<Vec<(String, Vec<String>)>> for LabelMap {
    fn from(entries: Vec<(String, Vec<String>)>) -> Self {
        LabelMap(entries)
    }
}

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LabelMapVisitor;

        impl<'de> Visitor<'de> for LabelMapVisitor {
            type Value = LabelMap;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of language tags to lists of strings")
            }

            fn visit_map<A>(self, mut access: A) -> Result<LabelMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }
                Ok(LabelMap(entries))
            }
        }

        deserializer.deserialize_map(LabelMapVisitor)
    }
}
