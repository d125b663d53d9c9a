// src/watch/playback.rs — Sorting recording URLs into primary/backup CDN slots

use crate::infra::config::UpstreamConfig;
use crate::infra::errors::LiveTrackError;

/// URL substrings that identify each CDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnSigns {
    pub primary: String,
    pub backup: String,
}

impl From<&UpstreamConfig> for CdnSigns {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            primary: config.primary_cdn_sign.clone(),
            backup: config.backup_cdn_sign.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingLinks {
    pub url: String,
    pub backup_url: String,
}

/// Requires exactly one URL per CDN. Anything else is ambiguous and nothing
/// is assigned, so a URL can never land in the wrong slot.
pub fn classify_recordings(
    urls: &[String],
    signs: &CdnSigns,
) -> Result<RecordingLinks, LiveTrackError> {
    let primary: Vec<&String> = urls.iter().filter(|u| u.contains(&signs.primary)).collect();
    let backup: Vec<&String> = urls.iter().filter(|u| u.contains(&signs.backup)).collect();

    match (primary.as_slice(), backup.as_slice()) {
        ([url], [backup_url]) if url != backup_url => Ok(RecordingLinks {
            url: (*url).clone(),
            backup_url: (*backup_url).clone(),
        }),
        _ => Err(LiveTrackError::Disambiguation {
            primary: primary.len(),
            backup: backup.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signs() -> CdnSigns {
        CdnSigns::from(&UpstreamConfig::default())
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_of_each() {
        let links = classify_recordings(
            &urls(&[
                "https://txvod.example.com/rec.m3u8",
                "https://alivod.example.com/rec.m3u8",
            ]),
            &signs(),
        )
        .unwrap();
        assert_eq!(links.url, "https://alivod.example.com/rec.m3u8");
        assert_eq!(links.backup_url, "https://txvod.example.com/rec.m3u8");
    }

    #[test]
    fn test_missing_backup_is_ambiguous() {
        let err =
            classify_recordings(&urls(&["https://alivod.example.com/rec.m3u8"]), &signs())
                .unwrap_err();
        assert!(matches!(
            err,
            LiveTrackError::Disambiguation {
                primary: 1,
                backup: 0
            }
        ));
    }

    #[test]
    fn test_two_primaries_is_ambiguous() {
        let err = classify_recordings(
            &urls(&[
                "https://alivod.example.com/a.m3u8",
                "https://alivod.example.com/b.m3u8",
                "https://txvod.example.com/a.m3u8",
            ]),
            &signs(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LiveTrackError::Disambiguation {
                primary: 2,
                backup: 1
            }
        ));
    }

    #[test]
    fn test_unclassifiable_urls_ignored_when_rest_is_clear() {
        let links = classify_recordings(
            &urls(&[
                "https://cdn.other.com/x.m3u8",
                "https://alivod.example.com/rec.m3u8",
                "https://txvod.example.com/rec.m3u8",
            ]),
            &signs(),
        )
        .unwrap();
        assert_eq!(links.url, "https://alivod.example.com/rec.m3u8");
    }

    #[test]
    fn test_url_matching_both_signs_is_ambiguous() {
        let err = classify_recordings(
            &urls(&["https://alivod.txvod.example.com/rec.m3u8"]),
            &signs(),
        )
        .unwrap_err();
        assert!(matches!(err, LiveTrackError::Disambiguation { .. }));
    }
}
