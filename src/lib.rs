mod chapters;
pub use self::chapters::{default_chapter_title, resolve_chapters, Chapter};

mod manifest;
pub use self::manifest::{
    Canvas, CanvasRef, LabelMap, Manifest, MetadataEntry, Range, StructureItem, Thumbnail,
};

mod media_fragment;
pub use self::media_fragment::{
    parse_media_fragment, parse_spatial, parse_temporal, split_fragment, MediaFragment,
    SpatialFragment, SpatialUnit, TemporalFragment,
};

mod target;
pub use self::target::{
    parse_fragment_uri, parse_target, ParsedTarget, Resource, Selector, Source, Target,
};

mod timestamp_4_humans;
pub use self::timestamp_4_humans::{parse_timestamp, Timestamp4Humans};

mod webvtt;
pub use self::webvtt::{extract_speaker_segments, SpeakerSegment};
