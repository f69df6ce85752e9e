//! Record extraction from classified payloads.

use super::classifier::{classify, unwrap_raw_content, ShapeKind};
use super::fields::{self, JsonObject};
use crate::envelope::RawEnvelope;
use crate::history::{ExtractedRecord, TrackSighting};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use tracing::debug;

/// What to do with an item that carries no play time of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum UndatedPolicy {
    /// Date the play by the capture time of the envelope it was seen in
    #[default]
    CaptureTime,
    /// Keep the track, but record no play
    Skip,
}

/// Everything one envelope yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvelopeExtraction {
    pub shape: ShapeKind,
    pub records: Vec<ExtractedRecord>,
    /// Candidate items dropped for lacking an identifier
    pub malformed: usize,
    /// Records whose item had no timestamp of its own
    pub undated: usize,
}

impl EnvelopeExtraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Extracts every track/play record an envelope contains.
///
/// Never fails: unrecognized payloads and malformed items simply contribute
/// nothing. Pure, so envelopes may be extracted in parallel.
pub fn extract_envelope(envelope: &RawEnvelope, policy: UndatedPolicy) -> EnvelopeExtraction {
    let Some(data) = envelope.data.as_ref() else {
        return EnvelopeExtraction::default();
    };

    let payload = unwrap_raw_content(data);
    let shape = classify(&payload);
    let observed_at = envelope.captured_at();

    let mut extraction = EnvelopeExtraction {
        shape: shape.kind(),
        ..Default::default()
    };

    for item in shape.items() {
        let Some((sighting, item_played_at)) = extract_item(item, observed_at) else {
            debug!(
                "Skipping item without identifier in {}: {:?}",
                envelope.url,
                fields::title(item)
            );
            extraction.malformed += 1;
            continue;
        };

        let played_at = match item_played_at {
            Some(played_at) => Some(played_at),
            None => {
                extraction.undated += 1;
                match policy {
                    UndatedPolicy::CaptureTime => observed_at,
                    UndatedPolicy::Skip => None,
                }
            }
        };

        extraction.records.push(ExtractedRecord {
            sighting,
            played_at,
            source_url: envelope.url.clone(),
        });
    }

    extraction
}

/// Normalizes one item. Returns `None` when it has no usable identifier.
///
/// Display fields come from the wrapped `track` object when there is one,
/// falling back to the item itself; the play time always belongs to the item.
pub fn extract_item(
    item: &JsonObject,
    observed_at: Option<DateTime<Utc>>,
) -> Option<(TrackSighting, Option<DateTime<Utc>>)> {
    let id = fields::identifier(item)?;
    let details = fields::nested_track(item).unwrap_or(item);

    let sighting = TrackSighting {
        id,
        title: fields::title(details).or_else(|| fields::title(item)),
        artist: fields::artist(details).or_else(|| fields::artist(item)),
        url: fields::url(details).or_else(|| fields::url(item)),
        reported_play_count: fields::reported_count(item)
            .or_else(|| fields::reported_count(details)),
        observed_at,
    };

    Some((sighting, fields::played_at(item)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TrackId;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn envelope(data: Value) -> RawEnvelope {
        RawEnvelope {
            url: "https://api-v2.example.com/me/play-history/tracks".to_string(),
            method: Some("GET".to_string()),
            status: Some(200),
            timestamp: Some("2024-02-01T08:00:00".to_string()),
            data: Some(data),
            ..Default::default()
        }
    }

    fn capture_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_absent_or_empty_payload_yields_nothing() {
        let no_data = RawEnvelope {
            data: None,
            ..envelope(json!(null))
        };
        assert!(extract_envelope(&no_data, UndatedPolicy::CaptureTime).is_empty());

        for data in [json!(null), json!({}), json!([]), json!({"collection": []})] {
            let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);
            assert!(extraction.is_empty());
            assert_eq!(extraction.malformed, 0);
        }
    }

    #[test]
    fn test_item_missing_identifier_is_skipped() {
        let data = json!({"collection": [
            {"id": 1, "title": "First", "played_at": "2024-01-01T10:00:00Z"},
            {"title": "Orphan", "played_at": "2024-01-01T11:00:00Z"},
            {"id": 3, "title": "Third", "played_at": "2024-01-01T12:00:00Z"}
        ]});
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);

        assert_eq!(extraction.shape, ShapeKind::Collection);
        assert_eq!(extraction.malformed, 1);
        let ids: Vec<_> = extraction
            .records
            .iter()
            .map(|r| r.sighting.id.clone())
            .collect();
        assert_eq!(ids, vec![TrackId::Numeric(1), TrackId::Numeric(3)]);
    }

    #[test]
    fn test_play_history_item() {
        let data = json!({"collection": [{
            "played_at": 1704103200000_i64,
            "track_id": 42,
            "track": {
                "id": 42,
                "title": "Wrapped Song",
                "permalink_url": "https://example.com/artist/wrapped-song",
                "playback_count": 1200,
                "user": {"username": "the-artist", "full_name": "The Artist"}
            }
        }]});
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);
        assert_eq!(extraction.records.len(), 1);

        let record = &extraction.records[0];
        assert_eq!(record.sighting.id, TrackId::Numeric(42));
        assert_eq!(record.sighting.title.as_deref(), Some("Wrapped Song"));
        assert_eq!(record.sighting.artist.as_deref(), Some("the-artist"));
        assert_eq!(
            record.sighting.url.as_deref(),
            Some("https://example.com/artist/wrapped-song")
        );
        assert_eq!(record.sighting.reported_play_count, Some(1200));
        assert_eq!(record.sighting.observed_at, Some(capture_time()));
        assert_eq!(
            record.played_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            record.source_url,
            "https://api-v2.example.com/me/play-history/tracks"
        );
        assert_eq!(extraction.undated, 0);
    }

    #[test]
    fn test_undated_item_falls_back_to_capture_time() {
        let data = json!({"id": 9, "title": "Seen Once"});
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);
        assert_eq!(extraction.shape, ShapeKind::SingleItem);
        assert_eq!(extraction.undated, 1);
        assert_eq!(extraction.records[0].played_at, Some(capture_time()));
    }

    #[test]
    fn test_undated_item_skip_policy() {
        let data = json!({"id": 9, "title": "Seen Once"});
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::Skip);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].played_at, None);
        assert_eq!(extraction.undated, 1);
    }

    #[test]
    fn test_undated_item_without_capture_time() {
        let mut env = envelope(json!({"id": 9, "title": "Seen Once"}));
        env.timestamp = None;
        let extraction = extract_envelope(&env, UndatedPolicy::CaptureTime);
        assert_eq!(extraction.records[0].played_at, None);
        assert_eq!(extraction.records[0].sighting.observed_at, None);
    }

    #[test]
    fn test_timestamp_field_fallback() {
        let data = json!([{"id": "abc", "title": "T", "timestamp": "2024-01-05T00:00:00Z"}]);
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);
        assert_eq!(
            extraction.records[0].played_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(
            extraction.records[0].sighting.id,
            TrackId::Text("abc".to_string())
        );
    }

    #[test]
    fn test_offsets_without_colon_are_play_times() {
        let data = json!({"collection": [
            {"id": 3, "title": "T", "played_at": "2013/03/12 18:33:55 +0000"},
            {"id": 3, "title": "T", "played_at": "2024-01-01T10:00:00+0000"}
        ]});
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);
        assert_eq!(extraction.undated, 0);
        let played: Vec<_> = extraction.records.iter().map(|r| r.played_at).collect();
        assert_eq!(
            played,
            vec![
                Some(Utc.with_ymd_and_hms(2013, 3, 12, 18, 33, 55).unwrap()),
                Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            ]
        );
    }

    #[test]
    fn test_single_item_with_unrelated_nested_list() {
        let data = json!({
            "id": 42,
            "title": "Single",
            "user": {"username": "a"},
            "publisher_metadata": {"items": []}
        });
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);
        assert_eq!(extraction.shape, ShapeKind::SingleItem);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].sighting.id, TrackId::Numeric(42));
    }

    #[test]
    fn test_raw_content_payload() {
        let data = json!({"raw_content": "[{\"id\": 5, \"title\": \"From text\"}]"});
        let extraction = extract_envelope(&envelope(data), UndatedPolicy::CaptureTime);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(
            extraction.records[0].sighting.title.as_deref(),
            Some("From text")
        );
    }

    #[test]
    fn test_artist_absent_without_user() {
        let (sighting, _) = extract_item(
            json!({"id": 1, "title": "T"}).as_object().unwrap(),
            None,
        )
        .unwrap();
        assert_eq!(sighting.artist, None);
        assert_eq!(sighting.url, None);
    }
}
