//! Evaluates a user's manual beatmap pick against a room's star-rating
//! policy, fetching metadata through an injected [`BeatmapFetcher`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::beatmap::fetcher::{BeatmapFetcher, FetchError};
use crate::models::{BeatmapRecord, PlayMode};

/// A user's manual pick as reported by the `Beatmap changed to: ...` cue.
/// The cue's own `title` field isn't used here: an accepted pick's
/// announcement uses the beatmapset title from the fetched metadata instead.
#[derive(Debug, Clone)]
pub struct PickedBeatmap {
    pub version: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationCategory {
    NotFound,
    HttpError,
    DownloadDisabled,
    Star,
}

impl ViolationCategory {
    fn as_str(self) -> &'static str {
        match self {
            ViolationCategory::NotFound => "NotFound",
            ViolationCategory::HttpError => "HttpError",
            ViolationCategory::DownloadDisabled => "DownloadDisabled",
            ViolationCategory::Star => "star",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub category: ViolationCategory,
    pub message: String,
}

impl Violation {
    fn new(category: ViolationCategory, message: impl Into<String>) -> Self {
        Violation {
            category,
            message: message.into(),
        }
    }

    /// Render the `!mp map` reset line the room is sent on a violation. `None`
    /// when there is no prior accepted map to fall back to.
    pub fn reset_command(&self, current_beatmap: Option<i64>, play_mode: PlayMode) -> Option<String> {
        current_beatmap.map(|id| {
            format!(
                "!mp map {} {} | Rule Violation [{}]: {}",
                id,
                play_mode.as_wire(),
                self.category.as_str(),
                self.message
            )
        })
    }
}

/// An accepted pick: the record to store as `current_beatmap` plus the
/// announcement line to send to the room.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedPick {
    pub record: BeatmapRecord,
    pub announcement: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyOutcome {
    Accepted(AcceptedPick),
    Rejected(Violation),
}

static BEATMAP_INFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{"artist".+"#).unwrap());

const SENTINEL_URL: &str = "https://osu.ppy.sh/b/0";

#[derive(Debug, Deserialize)]
struct Availability {
    download_disabled: bool,
}

#[derive(Debug, Deserialize)]
struct RawBeatmapVersion {
    id: i64,
    version: String,
    difficulty_rating: f64,
    status: String,
    cs: f64,
    ar: f64,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawBeatmapSetInfo {
    id: i64,
    title: String,
    availability: Availability,
    beatmaps: Vec<RawBeatmapVersion>,
}

/// Run the full 7-step policy evaluation described for manual picks.
pub async fn evaluate_pick(
    fetcher: &impl BeatmapFetcher,
    picked: &PickedBeatmap,
    min_star: f64,
    max_star: f64,
) -> PolicyOutcome {
    if picked.version.is_empty() || picked.url.is_empty() {
        return PolicyOutcome::Rejected(Violation::new(ViolationCategory::NotFound, "Beatmap not found!"));
    }
    if picked.url == SENTINEL_URL {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::NotFound,
            "Beatmap Not Submitted!",
        ));
    }

    let body = match fetcher.fetch(&picked.url).await {
        Ok(body) => body,
        Err(FetchError::Network { reason, .. }) => {
            return PolicyOutcome::Rejected(Violation::new(ViolationCategory::HttpError, reason));
        }
    };
    if !(200..300).contains(&body.status) {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::NotFound,
            "Beatmap Not Submitted!",
        ));
    }

    let Some(captured) = BEATMAP_INFO_RE.find(&body.text) else {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::NotFound,
            "Beatmap details not found!",
        ));
    };
    let Ok(set_info) = serde_json::from_str::<RawBeatmapSetInfo>(captured.as_str()) else {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::NotFound,
            "Beatmap json parser error",
        ));
    };

    if set_info.availability.download_disabled {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::DownloadDisabled,
            "Beatmap is not available!",
        ));
    }

    let Some(version) = set_info.beatmaps.iter().find(|v| v.version == picked.version) else {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::NotFound,
            "Beatmap version not found",
        ));
    };

    if version.difficulty_rating < min_star {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::Star,
            format!(
                "[https://osu.ppy.sh/beatmapsets/{}#osu/{} {} | {}*] Low Star* Beatmap",
                set_info.id, version.id, version.version, version.difficulty_rating
            ),
        ));
    }
    if version.difficulty_rating > max_star {
        return PolicyOutcome::Rejected(Violation::new(
            ViolationCategory::Star,
            format!(
                "[https://osu.ppy.sh/beatmapsets/{}#osu/{} {} | {}*] High Star* Beatmap",
                set_info.id, version.id, version.version, version.difficulty_rating
            ),
        ));
    }

    let announcement = format!(
        "Stars: {} | Status: {} | CircleSize: {} | ApproachRate: {} | [{} {}] [https://beatconnect.io/b/{}/ Beatconnect]",
        version.difficulty_rating, version.status, version.cs, version.ar, version.url, set_info.title, set_info.id
    );

    PolicyOutcome::Accepted(AcceptedPick {
        record: BeatmapRecord {
            id: version.id,
            title: set_info.title,
            difficulty_rating: version.difficulty_rating,
            version: version.version.clone(),
            status: version.status.clone(),
            download_disabled: false,
        },
        announcement,
    })
}

/// Fetches `url` and extracts the beatmapset id from the response, mirroring
/// `get_beatmap_info`'s use inside `on_changed_beatmap_to`. Returns `None` on
/// any fetch, status, or parse failure — the caller then skips the `Links:`
/// announcement entirely, matching the original's silent fall-through.
pub async fn fetch_autoset_beatmapset_id(fetcher: &impl BeatmapFetcher, url: &str) -> Option<i64> {
    let body = fetcher.fetch(url).await.ok()?;
    if !(200..300).contains(&body.status) {
        return None;
    }
    let captured = BEATMAP_INFO_RE.find(&body.text)?;
    let set_info: RawBeatmapSetInfo = serde_json::from_str(captured.as_str()).ok()?;
    Some(set_info.id)
}

/// Render the `Links: ...` line sent after an AutoPick auto-set echo. Mirrors
/// `on_changed_beatmap_to`'s `links()` helper, keyed by beatmapset id.
pub fn render_auto_set_links(title: &str, beatmapset_id: i64) -> String {
    format!(
        "Links: [https://osu.ppy.sh/beatmapsets/{beatmapset_id} {title}] [https://beatconnect.io/b/{beatmapset_id}/ beatconnect]"
    )
}
