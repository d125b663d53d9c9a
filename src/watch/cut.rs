// src/watch/cut.rs — Cut number extraction

use std::sync::OnceLock;

use regex::Regex;

use crate::infra::errors::LiveTrackError;
use crate::upstream::CutInfo;

static NUMERIC_SEGMENT: OnceLock<Regex> = OnceLock::new();

fn numeric_segment() -> &'static Regex {
    NUMERIC_SEGMENT.get_or_init(|| Regex::new(r"/[0-9]+").expect("static pattern compiles"))
}

/// Pull the cut number out of a cut URL.
///
/// The URL must contain exactly one `/<digits>` run.
pub fn extract_cut_number(url: &str) -> Result<i64, LiveTrackError> {
    let matches: Vec<&str> = numeric_segment()
        .find_iter(url)
        .map(|m| m.as_str())
        .collect();

    match matches.as_slice() {
        [segment] => segment[1..]
            .parse::<i64>()
            .map_err(|e| LiveTrackError::parse("cut info", format!("cut number in '{url}': {e}"))),
        _ => Err(LiveTrackError::Extraction {
            url: url.to_string(),
            matches: matches.len(),
        }),
    }
}

/// A cut that is not ready yet counts as zero, which is not an error.
pub fn resolve_cut_number(info: CutInfo) -> Result<i64, LiveTrackError> {
    match info {
        CutInfo::NotReady => Ok(0),
        CutInfo::Ready { url } => extract_cut_number(&url),
    }
}
