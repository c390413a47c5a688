use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MatchInfo;

/// A decimal odds value kept as the exact text read off the board.
///
/// Stored as a string to avoid floating-point drift on display; comma
/// decimals ("2,10") are normalized to dot form at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OddsValue(String);

impl OddsValue {
    /// Normalize an OCR token into canonical dot form.
    ///
    /// Returns the numeric value alongside so callers can apply their
    /// market's plausibility band before keeping the odds.
    pub fn from_token(token: &str) -> Option<(Self, f64)> {
        let normalized = token.trim().replace(',', ".");
        let value: f64 = normalized.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some((Self(normalized), value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OddsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Match winner (1X2) odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchWinnerOdds {
    pub home: OddsValue,
    pub draw: OddsValue,
    pub away: OddsValue,
}

/// Goals over/under odds for one line (e.g. "2.5").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsOdds {
    pub line: String,
    pub over: OddsValue,
    pub under: OddsValue,
}

/// Both-teams-to-score odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BttsOdds {
    pub yes: OddsValue,
    pub no: OddsValue,
}

/// Goalscorer odds for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerOdds {
    #[serde(rename = "firstGoal", skip_serializing_if = "Option::is_none")]
    pub first_goal: Option<OddsValue>,

    #[serde(rename = "anytimeGoal", skip_serializing_if = "Option::is_none")]
    pub anytime_goal: Option<OddsValue>,
}

impl PlayerOdds {
    pub fn is_empty(&self) -> bool {
        self.first_goal.is_none() && self.anytime_goal.is_none()
    }
}

/// Consolidated odds for one capture batch, keyed by market.
///
/// A market is present only when at least one image produced a fragment
/// that passed its plausibility validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsRecord {
    #[serde(rename = "1x2", skip_serializing_if = "Option::is_none", default)]
    pub match_winner: Option<MatchWinnerOdds>,

    #[serde(rename = "overUnder", skip_serializing_if = "Option::is_none", default)]
    pub over_under: Option<TotalsOdds>,

    #[serde(
        rename = "bothTeamsScore",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub both_teams_score: Option<BttsOdds>,

    /// Corner-count thresholds mapped to over odds.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub corners: BTreeMap<u8, OddsValue>,

    /// Player name mapped to goalscorer odds.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub players: BTreeMap<String, PlayerOdds>,
}

impl OddsRecord {
    /// True when no market was extracted.
    pub fn is_empty(&self) -> bool {
        self.match_winner.is_none()
            && self.over_under.is_none()
            && self.both_teams_score.is_none()
            && self.corners.is_empty()
            && self.players.is_empty()
    }

    /// Number of markets with at least one value.
    pub fn market_count(&self) -> usize {
        usize::from(self.match_winner.is_some())
            + usize::from(self.over_under.is_some())
            + usize::from(self.both_teams_score.is_some())
            + usize::from(!self.corners.is_empty())
            + usize::from(!self.players.is_empty())
    }
}

/// Payload handed to the downstream delivery collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    pub match_info: MatchInfo,
    pub consolidated_odds: OddsRecord,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}
