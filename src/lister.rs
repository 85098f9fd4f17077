//! Channel enumeration.
//!
//! yt-dlp answers a flat listing either with a playlist (nested `entries`) or,
//! when the URL points at one video, with that video's own metadata.
//! [`ListingResult`] names both shapes so nothing downstream has to probe.

use std::path::Path;

use serde_json::Value;

use crate::console::Console;
use crate::error::{ExtractError, ListingError};
use crate::extractor::{Extractor, ExtractorOptions};
use crate::model::{ChannelListing, VideoRecord};

const UNKNOWN_CHANNEL: &str = "Unknown Channel";

#[derive(Debug, Clone, PartialEq)]
pub enum ListingResult {
    /// `None` entries are videos the site reported but could not resolve
    /// (removed, private).
    Playlist {
        title: String,
        entries: Vec<Option<VideoRecord>>,
    },
    SingleVideo { record: VideoRecord },
}

impl ListingResult {
    /// Branches on the presence of an `entries` field.
    pub fn from_info(info: Value) -> Result<Self, ListingError> {
        let Value::Object(mut map) = info else {
            return Err(ListingError::Unexpected(
                "extractor returned a non-object result".into(),
            ));
        };

        match map.remove("entries") {
            Some(entries) => {
                let title = string_field(map.get("title")).unwrap_or(UNKNOWN_CHANNEL);
                let entries = match entries {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => {
                        return Err(ListingError::Unexpected(format!(
                            "entries is not a list: {other}"
                        )));
                    }
                };
                let entries = entries
                    .into_iter()
                    .map(|entry| match entry {
                        Value::Null => Ok(None),
                        entry => serde_json::from_value(entry).map(Some),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|err| ListingError::Unexpected(err.to_string()))?;
                Ok(ListingResult::Playlist {
                    title: title.to_owned(),
                    entries,
                })
            }
            None => {
                let record = serde_json::from_value(Value::Object(map))
                    .map_err(|err| ListingError::Unexpected(err.to_string()))?;
                Ok(ListingResult::SingleVideo { record })
            }
        }
    }

    /// Drops unavailable entries, keeping listing order.
    pub fn into_listing(self) -> ChannelListing {
        match self {
            ListingResult::Playlist { title, entries } => ChannelListing {
                title,
                videos: entries.into_iter().flatten().collect(),
            },
            ListingResult::SingleVideo { record } => {
                let title = record
                    .attributes
                    .get("channel")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_CHANNEL)
                    .to_owned();
                ChannelListing {
                    title,
                    videos: vec![record],
                }
            }
        }
    }
}

fn string_field(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Options for a metadata-only enumeration of `channel_url`.
pub fn listing_options(cookie_file: Option<&Path>, verbose: bool) -> ExtractorOptions {
    ExtractorOptions {
        flat: true,
        quiet: !verbose,
        ignore_errors: true,
        cookie_file: cookie_file.map(Path::to_path_buf),
        ..Default::default()
    }
}

/// Enumerates every available video of a channel or playlist without
/// fetching any media.
pub fn list_channel_videos(
    extractor: &dyn Extractor,
    channel_url: &str,
    cookie_file: Option<&Path>,
    verbose: bool,
    console: &mut dyn Console,
) -> Result<ChannelListing, ListingError> {
    let options = listing_options(cookie_file, verbose);
    console.info("Fetching channel information...");

    let info = extractor
        .extract(channel_url, &options, &mut |_| {})
        .map_err(classify_failure)?
        .ok_or(ListingError::NoInformation)?;

    if cookie_file.is_some() {
        console.success("Cookie file loaded successfully");
    }

    let listing = ListingResult::from_info(info)?.into_listing();
    console.success(&format!(
        "Found {} videos in '{}'",
        listing.len(),
        listing.title
    ));
    log::debug!("listed {} videos from {channel_url}", listing.len());

    Ok(listing)
}

fn classify_failure(err: ExtractError) -> ListingError {
    match err {
        ExtractError::Interrupted => ListingError::Interrupted,
        ExtractError::Failed(message) if requires_login(&message) => {
            ListingError::AuthenticationRequired
        }
        ExtractError::Failed(message) => ListingError::Extraction(message),
        other => ListingError::Unexpected(other.to_string()),
    }
}

fn requires_login(message: &str) -> bool {
    message.contains("Sign in") || message.to_lowercase().contains("login")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Transcript;
    use crate::extractor::fake::{Reply, ScriptedExtractor};
    use serde_json::json;
    use std::path::PathBuf;

    fn list(extractor: &ScriptedExtractor) -> Result<ChannelListing, ListingError> {
        let mut console = Transcript::new();
        list_channel_videos(extractor, "https://youtube.com/@chan", None, false, &mut console)
    }

    #[test]
    fn null_entries_are_dropped_in_order() {
        let extractor = ScriptedExtractor::new(vec![Reply::Info(Some(json!({
            "title": "Channel",
            "entries": [
                {"id": "a", "title": "A"},
                null,
                {"id": "b", "title": "B", "duration": 42},
                null,
                {"id": "c", "title": "C"}
            ]
        })))]);
        let listing = list(&extractor).unwrap();
        assert_eq!(listing.title, "Channel");
        let ids: Vec<_> = listing.videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(listing.videos[1].duration, Some(42.0));
    }

    #[test]
    fn single_video_result_is_a_listing_of_one() {
        let extractor = ScriptedExtractor::new(vec![Reply::Info(Some(json!({
            "id": "solo",
            "title": "Only Video",
            "channel": "Solo Channel"
        })))]);
        let listing = list(&extractor).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.title, "Solo Channel");
        assert_eq!(listing.videos[0].id, "solo");
    }

    #[test]
    fn playlist_without_title_uses_placeholder() {
        let result = ListingResult::from_info(json!({"entries": null})).unwrap();
        let listing = result.into_listing();
        assert_eq!(listing.title, "Unknown Channel");
        assert!(listing.is_empty());
    }

    #[test]
    fn sign_in_failures_require_authentication() {
        for message in [
            "[youtube] abc: Sign in to confirm you're not a bot",
            "This channel requires LOGIN to view",
            "members-only content, please login",
        ] {
            let extractor = ScriptedExtractor::new(vec![Reply::Fail(message.into())]);
            let err = list(&extractor).unwrap_err();
            assert!(matches!(err, ListingError::AuthenticationRequired), "{message}");
            assert!(err.to_string().starts_with("Authentication required"));
        }
    }

    #[test]
    fn other_failures_keep_the_message() {
        let extractor =
            ScriptedExtractor::new(vec![Reply::Fail("HTTP Error 404: Not Found".into())]);
        let err = list(&extractor).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to list channel videos: HTTP Error 404: Not Found"
        );
    }

    #[test]
    fn empty_result_is_an_error() {
        let extractor = ScriptedExtractor::new(vec![Reply::Info(None)]);
        let err = list(&extractor).unwrap_err();
        assert!(matches!(err, ListingError::NoInformation));
    }

    #[test]
    fn interrupt_is_not_a_listing_failure() {
        let extractor = ScriptedExtractor::new(vec![Reply::Interrupt]);
        let err = list(&extractor).unwrap_err();
        assert!(matches!(err, ListingError::Interrupted));
    }

    #[test]
    fn listing_is_flat_tolerant_and_passes_cookies() {
        let extractor = ScriptedExtractor::new(vec![Reply::Info(Some(json!({
            "title": "Channel",
            "entries": []
        })))]);
        let cookies = PathBuf::from("/tmp/cookies.txt");
        let mut console = Transcript::new();
        let listing =
            list_channel_videos(&extractor, "https://x", Some(&cookies), true, &mut console)
                .unwrap();
        assert!(listing.is_empty());

        let calls = extractor.calls.borrow();
        let (url, options) = &calls[0];
        assert_eq!(url, "https://x");
        assert!(options.flat);
        assert!(options.ignore_errors);
        assert!(!options.quiet);
        assert!(!options.simulate);
        assert_eq!(options.cookie_file.as_deref(), Some(cookies.as_path()));
        assert!(console.contains("Cookie file loaded successfully"));
        assert!(console.contains("Found 0 videos in 'Channel'"));
    }
}
