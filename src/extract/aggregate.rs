use crate::models::OddsRecord;

/// Merge per-image odds fragments into one consolidated record.
///
/// Fragments must be supplied in image arrival order. Scalar markets are
/// first-write-wins: once a valid reading exists, conflicting OCR noise
/// from a later screenshot does not override it. Multi-valued markets
/// (corner lines, players) merge by key union with the same
/// first-write-wins rule per key. Deterministic and idempotent for a fixed
/// input order.
pub fn consolidate<'a, I>(fragments: I) -> OddsRecord
where
    I: IntoIterator<Item = &'a OddsRecord>,
{
    let mut merged = OddsRecord::default();

    for fragment in fragments {
        if merged.match_winner.is_none() {
            merged.match_winner = fragment.match_winner.clone();
        }
        if merged.over_under.is_none() {
            merged.over_under = fragment.over_under.clone();
        }
        if merged.both_teams_score.is_none() {
            merged.both_teams_score = fragment.both_teams_score.clone();
        }

        for (line, odds) in &fragment.corners {
            merged.corners.entry(*line).or_insert_with(|| odds.clone());
        }
        for (name, odds) in &fragment.players {
            merged
                .players
                .entry(name.clone())
                .or_insert_with(|| odds.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchWinnerOdds, OddsValue, PlayerOdds};

    fn odds(token: &str) -> OddsValue {
        OddsValue::from_token(token).unwrap().0
    }

    fn winner(home: &str, draw: &str, away: &str) -> MatchWinnerOdds {
        MatchWinnerOdds {
            home: odds(home),
            draw: odds(draw),
            away: odds(away),
        }
    }

    #[test]
    fn test_first_write_wins_for_scalar_markets() {
        let first = OddsRecord {
            match_winner: Some(winner("2.10", "3.40", "3.20")),
            ..Default::default()
        };
        let second = OddsRecord {
            match_winner: Some(winner("1.90", "3.60", "3.80")),
            ..Default::default()
        };

        let merged = consolidate([&first, &second]);
        assert_eq!(merged.match_winner.unwrap().home.as_str(), "2.10");
    }

    #[test]
    fn test_later_image_fills_missing_market() {
        let first = OddsRecord {
            match_winner: Some(winner("2.10", "3.40", "3.20")),
            ..Default::default()
        };
        let mut second = OddsRecord::default();
        second.corners.insert(9, odds("1.85"));

        let merged = consolidate([&first, &second]);
        assert!(merged.match_winner.is_some());
        assert_eq!(merged.corners[&9].as_str(), "1.85");
    }

    #[test]
    fn test_corner_lines_union_without_overwrite() {
        let mut first = OddsRecord::default();
        first.corners.insert(9, odds("1.70"));
        first.corners.insert(10, odds("2.10"));

        let mut second = OddsRecord::default();
        second.corners.insert(10, odds("9.99"));
        second.corners.insert(11, odds("2.90"));

        let merged = consolidate([&first, &second]);
        assert_eq!(merged.corners.len(), 3);
        assert_eq!(merged.corners[&10].as_str(), "2.10");
        assert_eq!(merged.corners[&11].as_str(), "2.90");
    }

    #[test]
    fn test_player_entries_union_without_overwrite() {
        let mut first = OddsRecord::default();
        first.players.insert(
            "Mbappé".to_string(),
            PlayerOdds {
                anytime_goal: Some(odds("2.50")),
                ..Default::default()
            },
        );

        let mut second = OddsRecord::default();
        second.players.insert(
            "Mbappé".to_string(),
            PlayerOdds {
                first_goal: Some(odds("7.00")),
                ..Default::default()
            },
        );
        second.players.insert(
            "Haaland".to_string(),
            PlayerOdds {
                anytime_goal: Some(odds("2.20")),
                ..Default::default()
            },
        );

        let merged = consolidate([&first, &second]);
        assert_eq!(merged.players.len(), 2);
        // Mbappé kept from the first image, untouched by the second.
        assert!(merged.players["Mbappé"].first_goal.is_none());
        assert_eq!(
            merged.players["Mbappé"].anytime_goal.as_ref().unwrap().as_str(),
            "2.50"
        );
    }

    #[test]
    fn test_idempotent_over_same_input() {
        let mut first = OddsRecord {
            match_winner: Some(winner("2.10", "3.40", "3.20")),
            ..Default::default()
        };
        first.corners.insert(9, odds("1.70"));
        let second = OddsRecord::default();

        let once = consolidate([&first, &second]);
        let twice = consolidate([&first, &second]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input_yields_empty_record() {
        let merged = consolidate(std::iter::empty::<&OddsRecord>());
        assert!(merged.is_empty());
    }
}
