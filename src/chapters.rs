use log::debug;

use serde::Serialize;

use std::{cmp::Ordering, collections::HashMap};

use super::media_fragment::temporal_match;
use super::{parse_temporal, split_fragment, Manifest, Range, StructureItem};

static DEFAULT_CHAPTER_TITLE: &str = "Untitled Chapter";

pub fn default_chapter_title() -> String {
    DEFAULT_CHAPTER_TITLE.to_string()
}

/// A resolved, playable time segment. `end > start` strictly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chapter {
    pub id: String,
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub thumbnail: Option<String>,
    /// Insertion-ordered, unique keys; a later duplicate key overwrites the
    /// value in place.
    pub metadata: Option<Vec<(String, String)>>,
}

/// Flattens the manifest's range tree into a chapter list sorted by start
/// time.
///
/// Every malformed or unresolvable node is a silent skip; the only failure
/// output is an empty list.
pub fn resolve_chapters(manifest: &Manifest) -> Vec<Chapter> {
    let durations = canvas_durations(manifest);

    let mut chapters: Vec<Chapter> = manifest
        .structures
        .iter()
        .flat_map(|range| resolve_range(range, &durations))
        .collect();

    // ties keep their traversal order
    chapters.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));
    chapters
}

fn canvas_durations(manifest: &Manifest) -> HashMap<&str, f64> {
    manifest
        .items
        .iter()
        .filter_map(|canvas| {
            canvas
                .duration
                .filter(|duration| duration.is_finite() && *duration >= 0f64)
                .map(|duration| (canvas.id.as_str(), duration))
        })
        .collect()
}

// Depth-first, document order. Each call returns its own local list; the
// caller concatenates.
fn resolve_range(range: &Range, durations: &HashMap<&str, f64>) -> Vec<Chapter> {
    let mut chapters = Vec::new();

    if let Some(chapter) = synthesize_chapter(range, durations) {
        chapters.push(chapter);
    }

    for item in &range.items {
        match item {
            StructureItem::Range(child) => chapters.extend(resolve_range(child, durations)),
            StructureItem::Canvas(_) | StructureItem::Unknown => (),
        }
    }

    chapters
}

fn synthesize_chapter(range: &Range, durations: &HashMap<&str, f64>) -> Option<Chapter> {
    // at most one chapter per range node: only the first direct canvas child
    // whose id carries a temporal fragment is considered, valid or not
    let (base_id, body) = range.items.iter().find_map(|item| match item {
        StructureItem::Canvas(canvas) => {
            let (base_id, fragment) = split_fragment(&canvas.id);
            fragment
                .filter(|body| temporal_match(body).is_some())
                .map(|body| (base_id, body))
        }
        StructureItem::Range(_) | StructureItem::Unknown => None,
    })?;

    let temporal = match parse_temporal(body) {
        Some(temporal) => temporal,
        None => {
            debug!("range {}: unusable temporal fragment {:?}", range.id, body);
            return None;
        }
    };

    let end = match temporal.end {
        Some(end) => end,
        // open-ended span: back-fill from the leaf unit's declared duration
        None => match durations.get(base_id) {
            Some(duration) => *duration,
            None => {
                debug!("range {}: no declared duration for {}", range.id, base_id);
                return None;
            }
        },
    };

    if end <= temporal.start {
        debug!(
            "range {}: declared duration {} does not reach past {}",
            range.id, end, temporal.start
        );
        return None;
    }

    Some(Chapter {
        id: range.id.clone(),
        label: range
            .label
            .as_ref()
            .and_then(|label| label.preferred())
            .map(str::to_string)
            .unwrap_or_else(default_chapter_title),
        start: temporal.start,
        end,
        thumbnail: range
            .thumbnail
            .first()
            .map(|thumbnail| thumbnail.id.clone()),
        metadata: resolve_metadata(range),
    })
}

fn resolve_metadata(range: &Range) -> Option<Vec<(String, String)>> {
    if range.metadata.is_empty() {
        return None;
    }

    let mut metadata: Vec<(String, String)> = Vec::with_capacity(range.metadata.len());
    for entry in &range.metadata {
        let key = entry
            .label
            .preferred()
            .map(str::to_string)
            .unwrap_or_else(default_chapter_title);
        let value = entry
            .value
            .preferred()
            .map(str::to_string)
            .unwrap_or_else(default_chapter_title);

        match metadata.iter().position(|(existing, _)| *existing == key) {
            Some(index) => metadata[index].1 = value,
            None => metadata.push((key, value)),
        }
    }

    Some(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters(json: &str) -> Vec<Chapter> {
        let _ = env_logger::try_init();
        resolve_chapters(&Manifest::from_json(json).unwrap())
    }

    #[test]
    fn no_structures_resolves_to_nothing() {
        assert!(chapters("{}").is_empty());
        assert!(chapters(r#"{"structures": []}"#).is_empty());
        assert!(chapters(r#"{"structures": [{"id": "r", "type": "Range"}]}"#).is_empty());
    }

    #[test]
    fn explicit_span_resolves_to_one_chapter() {
        let resolved = chapters(
            r#"{
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "label": {"en": ["Introduction"]},
                    "items": [{"id": "canvas#t=0,30", "type": "Canvas"}]
                }]
            }"#,
        );

        assert_eq!(
            vec![Chapter {
                id: "range-1".to_string(),
                label: "Introduction".to_string(),
                start: 0f64,
                end: 30f64,
                thumbnail: None,
                metadata: None,
            }],
            resolved,
        );
    }

    #[test]
    fn open_ended_span_back_fills_from_the_declared_duration() {
        let resolved = chapters(
            r#"{
                "items": [{"id": "canvas-1", "type": "Canvas", "duration": 7278.422}],
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "label": {"en": ["Finale"]},
                    "items": [{"id": "canvas-1#t=3971.24", "type": "Canvas"}]
                }]
            }"#,
        );

        assert_eq!(1, resolved.len());
        assert_eq!(3_971.24f64, resolved[0].start);
        assert_eq!(7_278.422f64, resolved[0].end);
    }

    #[test]
    fn open_ended_span_without_a_duration_yields_no_chapter() {
        let resolved = chapters(
            r#"{
                "items": [{"id": "canvas-1", "type": "Canvas"}],
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "items": [{"id": "canvas-1#t=3971.24", "type": "Canvas"}]
                }]
            }"#,
        );

        assert!(resolved.is_empty());
    }

    #[test]
    fn duration_lookup_requires_the_exact_fragment_free_id() {
        let resolved = chapters(
            r#"{
                "items": [{"id": "canvas-1", "type": "Canvas", "duration": 60}],
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "items": [{"id": "canvas-2#t=10", "type": "Canvas"}]
                }]
            }"#,
        );

        assert!(resolved.is_empty());
    }

    #[test]
    fn a_duration_within_the_span_yields_no_chapter() {
        let resolved = chapters(
            r#"{
                "items": [{"id": "canvas-1", "type": "Canvas", "duration": 5}],
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "items": [{"id": "canvas-1#t=10", "type": "Canvas"}]
                }]
            }"#,
        );

        assert!(resolved.is_empty());
    }

    #[test]
    fn nested_ranges_flatten_one_chapter_per_leaf_bearing_level() {
        let resolved = chapters(
            r#"{
                "structures": [{
                    "id": "part",
                    "type": "Range",
                    "label": {"en": ["Part"]},
                    "items": [
                        {"id": "canvas#t=0,100", "type": "Canvas"},
                        {
                            "id": "scene",
                            "type": "Range",
                            "label": {"en": ["Scene"]},
                            "items": [
                                {"id": "canvas#t=10,50", "type": "Canvas"},
                                {
                                    "id": "shot",
                                    "type": "Range",
                                    "label": {"en": ["Shot"]},
                                    "items": [{"id": "canvas#t=20,30", "type": "Canvas"}]
                                }
                            ]
                        }
                    ]
                }]
            }"#,
        );

        let ids: Vec<&str> = resolved.iter().map(|chapter| chapter.id.as_str()).collect();
        assert_eq!(vec!["part", "scene", "shot"], ids);
        let labels: Vec<&str> = resolved
            .iter()
            .map(|chapter| chapter.label.as_str())
            .collect();
        assert_eq!(vec!["Part", "Scene", "Shot"], labels);
    }

    #[test]
    fn a_range_without_direct_leaves_still_yields_descendants() {
        let resolved = chapters(
            r#"{
                "structures": [{
                    "id": "outer",
                    "type": "Range",
                    "items": [{
                        "id": "inner",
                        "type": "Range",
                        "items": [{"id": "canvas#t=5,15", "type": "Canvas"}]
                    }]
                }]
            }"#,
        );

        assert_eq!(1, resolved.len());
        assert_eq!("inner", resolved[0].id);
    }

    #[test]
    fn only_the_first_fragment_bearing_child_is_considered() {
        // the first carrier is invalid (end <= start): the whole node is
        // abandoned even though a valid sibling follows
        let resolved = chapters(
            r#"{
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "items": [
                        {"id": "canvas#t=20,10", "type": "Canvas"},
                        {"id": "canvas#t=0,5", "type": "Canvas"}
                    ]
                }]
            }"#,
        );
        assert!(resolved.is_empty());

        // fragment-free children are not carriers and are skipped over
        let resolved = chapters(
            r#"{
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "items": [
                        {"id": "canvas-plain", "type": "Canvas"},
                        {"id": "canvas#t=0,5", "type": "Canvas"}
                    ]
                }]
            }"#,
        );
        assert_eq!(1, resolved.len());
        assert_eq!(0f64, resolved[0].start);
        assert_eq!(5f64, resolved[0].end);
    }

    #[test]
    fn labels_fall_back_to_any_language_then_the_placeholder() {
        let resolved = chapters(
            r#"{
                "structures": [
                    {
                        "id": "r1",
                        "type": "Range",
                        "label": {"fr": ["Introduction FR"]},
                        "items": [{"id": "c#t=0,1", "type": "Canvas"}]
                    },
                    {
                        "id": "r2",
                        "type": "Range",
                        "label": {"en": [""], "de": ["Hallo"]},
                        "items": [{"id": "c#t=1,2", "type": "Canvas"}]
                    },
                    {
                        "id": "r3",
                        "type": "Range",
                        "items": [{"id": "c#t=2,3", "type": "Canvas"}]
                    }
                ]
            }"#,
        );

        let labels: Vec<&str> = resolved
            .iter()
            .map(|chapter| chapter.label.as_str())
            .collect();
        assert_eq!(vec!["Introduction FR", "Hallo", "Untitled Chapter"], labels);
    }

    #[test]
    fn thumbnail_and_metadata_are_carried_over() {
        let resolved = chapters(
            r#"{
                "structures": [{
                    "id": "range-1",
                    "type": "Range",
                    "thumbnail": [{"id": "thumb.jpg", "type": "Image"}],
                    "metadata": [
                        {"label": {"en": ["Author"]}, "value": {"en": ["Jane"]}},
                        {"label": {"en": ["Author"]}, "value": {"en": ["John"]}},
                        {"label": {"en": ["Year"]}, "value": {"en": ["1999"]}}
                    ],
                    "items": [{"id": "canvas#t=0,30", "type": "Canvas"}]
                }]
            }"#,
        );

        assert_eq!(Some("thumb.jpg".to_string()), resolved[0].thumbnail);
        // the duplicate key overwrote its value in place
        assert_eq!(
            Some(vec![
                ("Author".to_string(), "John".to_string()),
                ("Year".to_string(), "1999".to_string()),
            ]),
            resolved[0].metadata,
        );
    }

    #[test]
    fn chapters_are_sorted_by_start_time_ties_keep_traversal_order() {
        let resolved = chapters(
            r#"{
                "structures": [
                    {
                        "id": "late",
                        "type": "Range",
                        "items": [{"id": "c#t=10,20", "type": "Canvas"}]
                    },
                    {
                        "id": "early-a",
                        "type": "Range",
                        "items": [{"id": "c#t=0,5", "type": "Canvas"}]
                    },
                    {
                        "id": "early-b",
                        "type": "Range",
                        "items": [{"id": "c#t=0,7", "type": "Canvas"}]
                    }
                ]
            }"#,
        );

        let ids: Vec<&str> = resolved.iter().map(|chapter| chapter.id.as_str()).collect();
        assert_eq!(vec!["early-a", "early-b", "late"], ids);
    }
}
