use serde::{Deserialize, Serialize};

use super::{parse_media_fragment, split_fragment, SpatialFragment, TemporalFragment};

static SPECIFIC_RESOURCE: &str = "SpecificResource";
static FRAGMENT_SELECTOR: &str = "FragmentSelector";

/// A target to locate: either a plain URI or a structured reference.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Uri(String),
    Resource(Resource),
}

impl Target {
    pub fn from_json(json: &str) -> Result<Target, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// An object-shaped target carrying an explicit source and an optional
/// selector describing a sub-part of that source.
#[derive(Clone, Debug, Deserialize)]
pub struct Resource {
    // a missing discriminator is not an error, it just never matches
    #[serde(default, rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub selector: Option<Selector>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Uri(String),
    Resource { id: String },
}

#[derive(Clone, Debug, Deserialize)]
pub struct Selector {
    #[serde(default, rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// A located target: the fragment-free source plus whatever temporal and/or
/// spatial descriptors the fragment carried.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedTarget {
    pub source: String,
    pub temporal: Option<TemporalFragment>,
    pub spatial: Option<SpatialFragment>,
}

/// Parses a URI with an optional fragment. Always produces a record: without
/// a `#` the whole input becomes the source.
pub fn parse_fragment_uri(uri: &str) -> ParsedTarget {
    let (source, fragment) = split_fragment(uri);
    let fragment = fragment.map(parse_media_fragment).unwrap_or_default();

    ParsedTarget {
        source: source.to_string(),
        temporal: fragment.temporal,
        spatial: fragment.spatial,
    }
}

/// Dispatches on the target shape.
///
/// An empty URI yields nothing (but a bare `#fragment` still yields a record
/// with an empty source). A structured reference must be a
/// `SpecificResource`; its selector is honored only when it is a
/// `FragmentSelector` with a non-empty value, parsed as a bare fragment body.
pub fn parse_target(target: &Target) -> Option<ParsedTarget> {
    match target {
        Target::Uri(uri) => {
            if uri.is_empty() {
                return None;
            }
            Some(parse_fragment_uri(uri))
        }
        Target::Resource(resource) => parse_resource(resource),
    }
}

fn parse_resource(resource: &Resource) -> Option<ParsedTarget> {
    if resource.type_ != SPECIFIC_RESOURCE {
        return None;
    }

    let source = match resource.source.as_ref()? {
        Source::Uri(uri) => uri.clone(),
        Source::Resource { id } => id.clone(),
    };

    let fragment = resource
        .selector
        .as_ref()
        .filter(|selector| selector.type_ == FRAGMENT_SELECTOR)
        .and_then(|selector| selector.value.as_deref())
        .filter(|value| !value.is_empty())
        .map(parse_media_fragment)
        .unwrap_or_default();

    Some(ParsedTarget {
        source,
        temporal: fragment.temporal,
        spatial: fragment.spatial,
    })
}
