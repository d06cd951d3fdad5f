//! Daily journal entries distilled from a session.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Most mood tags kept per entry.
pub const MAX_MOODS: usize = 2;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Fear,
    Disgust,
    Anger,
    Surprise,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Fear,
        Mood::Disgust,
        Mood::Anger,
        Mood::Surprise,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Fear => "fear",
            Mood::Disgust => "disgust",
            Mood::Anger => "anger",
            Mood::Surprise => "surprise",
            Mood::Neutral => "neutral",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| format!("unknown mood '{s}'"))
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub mood: Vec<Mood>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Render as a line of prior context for a new session, dated by the
    /// calendar day in `timezone` (the same day the entry is stored under).
    pub fn history_line(&self, timezone: Tz) -> String {
        let moods: Vec<&str> = self.mood.iter().map(Mood::as_str).collect();
        format!(
            "On the date {}, the following conversation happened with you and the user, \
             where the user is in second-person: '{}'. User's mood was: {}",
            self.created_at.with_timezone(&timezone).format("%Y-%m-%d"),
            self.summary,
            moods.join(", ")
        )
    }
}

/// Summary as the model returns it, before mood validation.
#[derive(Debug, Deserialize)]
struct SummaryReply {
    summary: String,
    #[serde(default)]
    mood: Vec<String>,
}

/// Decode a summarization reply into summary text and mood tags.
///
/// Accepts bare JSON or JSON wrapped in a markdown code fence. Unknown mood
/// tags are dropped and the list is cut to [`MAX_MOODS`].
pub fn parse_summary_reply(text: &str) -> Result<(String, Vec<Mood>), String> {
    let trimmed = text.trim();
    let json = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let reply: SummaryReply =
        serde_json::from_str(json).map_err(|e| format!("failed to unmarshal response: {e}"))?;

    let mut moods = Vec::with_capacity(MAX_MOODS);
    for raw in &reply.mood {
        match raw.parse::<Mood>() {
            Ok(mood) if !moods.contains(&mood) => moods.push(mood),
            Ok(_) => {}
            Err(e) => warn!("Dropping mood tag: {e}"),
        }
        if moods.len() == MAX_MOODS {
            break;
        }
    }

    Ok((reply.summary, moods))
}
