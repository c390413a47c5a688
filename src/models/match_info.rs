use serde::{Deserialize, Serialize};

/// Identification of the match a capture batch belongs to.
///
/// Team names are free text from the session-start command, normalized to
/// title case; date, league, and kickoff time are optional extras.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub home_team: String,
    pub away_team: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub match_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub league: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kickoff: Option<String>,
}

impl MatchInfo {
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            match_date: None,
            league: None,
            kickoff: None,
        }
    }

    /// "Home vs Away" display form.
    pub fn fixture(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture() {
        let info = MatchInfo::new("Real Madrid", "Barcelona");
        assert_eq!(info.fixture(), "Real Madrid vs Barcelona");
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut info = MatchInfo::new("Real Madrid", "Barcelona");
        info.league = Some("La Liga".to_string());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["homeTeam"], "Real Madrid");
        assert_eq!(json["awayTeam"], "Barcelona");
        assert_eq!(json["league"], "La Liga");
        assert!(json.get("matchDate").is_none());
    }
}
