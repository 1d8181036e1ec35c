/// Metadata reader implementation using lofty
use crate::error::MetadataError;
use crate::formats::is_supported_media;
use lofty::{AudioFile, TaggedFileExt};
use std::path::Path;
use twindeck_core::{MediaInfo, MetadataReader, ReplayGain};

/// Metadata reader using the lofty library
pub struct LoftyMetadataReader;

/// Raw tag values before gain normalisation
#[derive(Default)]
struct TagValues {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    track_gain: Option<String>,
    reference_loudness: Option<String>,
    r128_track_gain: Option<String>,
}

impl TagValues {
    /// Fill gaps from a lower priority tag
    fn merge(&mut self, other: TagValues) {
        self.title = self.title.take().or(other.title);
        self.artist = self.artist.take().or(other.artist);
        self.album = self.album.take().or(other.album);
        self.track_gain = self.track_gain.take().or(other.track_gain);
        self.reference_loudness = self.reference_loudness.take().or(other.reference_loudness);
        self.r128_track_gain = self.r128_track_gain.take().or(other.r128_track_gain);
    }

    fn replaygain(&self) -> ReplayGain {
        if let Some(gain) = self
            .r128_track_gain
            .as_deref()
            .and_then(ReplayGain::from_r128_q78)
        {
            return gain;
        }
        self.track_gain
            .as_deref()
            .map(|gain| ReplayGain::from_tag(gain, self.reference_loudness.as_deref()))
            .unwrap_or(ReplayGain::DEFAULT)
    }
}

impl LoftyMetadataReader {
    /// Create a new metadata reader
    pub fn new() -> Self {
        Self
    }

    /// Extract the values we care about from a lofty tag
    fn extract_from_tag(tag: &lofty::Tag) -> TagValues {
        let mut values = TagValues::default();
        let text = |item: &lofty::TagItem| item.value().text().map(|s| s.to_string());

        // lofty 0.18 API - iterate through items
        for item in tag.items() {
            match item.key() {
                lofty::ItemKey::TrackTitle => values.title = text(item),
                lofty::ItemKey::TrackArtist => values.artist = text(item),
                lofty::ItemKey::AlbumTitle => values.album = text(item),
                lofty::ItemKey::ReplayGainTrackGain => values.track_gain = text(item),
                lofty::ItemKey::Unknown(name)
                    if name.eq_ignore_ascii_case("REPLAYGAIN_REFERENCE_LOUDNESS") =>
                {
                    values.reference_loudness = text(item);
                }
                lofty::ItemKey::Unknown(name) if name.eq_ignore_ascii_case("R128_TRACK_GAIN") => {
                    values.r128_track_gain = text(item);
                }
                _ => {}
            }
        }

        values
    }
}

impl Default for LoftyMetadataReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataReader for LoftyMetadataReader {
    fn read(&self, path: &Path) -> twindeck_core::Result<MediaInfo> {
        if !is_supported_media(path) {
            return Err(MetadataError::UnsupportedFormat(path.display().to_string()).into());
        }

        // Check if file exists
        if !path.is_file() {
            return Err(MetadataError::FileNotFound(path.display().to_string()).into());
        }

        // Probe and read the file
        let tagged_file = lofty::read_from_path(path).map_err(MetadataError::from)?;

        let length_secs = tagged_file.properties().duration().as_secs_f64();

        // Primary tag first, the rest fill any gaps
        let mut values = tagged_file
            .primary_tag()
            .map(Self::extract_from_tag)
            .unwrap_or_default();
        for tag in tagged_file.tags() {
            values.merge(Self::extract_from_tag(tag));
        }

        Ok(MediaInfo {
            length_secs,
            replaygain: values.replaygain(),
            title: values.title.unwrap_or_default(),
            artist: values.artist.unwrap_or_default(),
            album: values.album.unwrap_or_default(),
        })
    }
}
