use std::fmt::Write;

use crate::models::{CaptureBatch, MatchInfo, OddsRecord, PlayerOdds, BATCH_CAPACITY};

/// One line per detected market; absent markets are omitted. Stable field
/// order and label text, suitable for the delivery payload.
pub fn short_summary(match_info: &MatchInfo, odds: &OddsRecord) -> String {
    let mut out = match_info.fixture();

    if let Some(winner) = &odds.match_winner {
        let _ = write!(out, "\n1X2: {} / {} / {}", winner.home, winner.draw, winner.away);
    }
    if let Some(totals) = &odds.over_under {
        let _ = write!(
            out,
            "\nO/U {}: over {}, under {}",
            totals.line, totals.over, totals.under
        );
    }
    if let Some(btts) = &odds.both_teams_score {
        let _ = write!(out, "\nBTTS: yes {}, no {}", btts.yes, btts.no);
    }
    if !odds.corners.is_empty() {
        let lines = odds
            .corners
            .iter()
            .map(|(line, o)| format!("over {line} @ {o}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(out, "\nCorners: {lines}");
    }
    if !odds.players.is_empty() {
        let players = odds
            .players
            .iter()
            .map(|(name, o)| format!("{name} {}", player_odds_inline(o)))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(out, "\nPlayers: {players}");
    }

    if odds.is_empty() {
        out.push_str("\nNo odds detected");
    }
    out
}

/// One section per market with per-outcome breakdown; markets missing from
/// the record render a "not detected" placeholder.
pub fn detailed_summary(match_info: &MatchInfo, odds: &OddsRecord) -> String {
    let mut out = String::from("MATCH\n");
    let _ = writeln!(out, "  {}", match_info.fixture());
    if let Some(league) = &match_info.league {
        let _ = writeln!(out, "  League: {league}");
    }
    if let Some(date) = &match_info.match_date {
        let _ = writeln!(out, "  Date: {date}");
    }
    if let Some(kickoff) = &match_info.kickoff {
        let _ = writeln!(out, "  Kickoff: {kickoff}");
    }

    out.push_str("\nMATCH WINNER (1X2)\n");
    match &odds.match_winner {
        Some(winner) => {
            let _ = writeln!(out, "  Home: {}", winner.home);
            let _ = writeln!(out, "  Draw: {}", winner.draw);
            let _ = writeln!(out, "  Away: {}", winner.away);
        }
        None => out.push_str("  not detected\n"),
    }

    out.push_str("\nGOALS OVER/UNDER\n");
    match &odds.over_under {
        Some(totals) => {
            let _ = writeln!(out, "  Over {}: {}", totals.line, totals.over);
            let _ = writeln!(out, "  Under {}: {}", totals.line, totals.under);
        }
        None => out.push_str("  not detected\n"),
    }

    out.push_str("\nBOTH TEAMS TO SCORE\n");
    match &odds.both_teams_score {
        Some(btts) => {
            let _ = writeln!(out, "  Yes: {}", btts.yes);
            let _ = writeln!(out, "  No: {}", btts.no);
        }
        None => out.push_str("  not detected\n"),
    }

    out.push_str("\nCORNERS\n");
    if odds.corners.is_empty() {
        out.push_str("  not detected\n");
    } else {
        for (line, value) in &odds.corners {
            let _ = writeln!(out, "  Over {line}: {value}");
        }
    }

    out.push_str("\nGOALSCORERS\n");
    if odds.players.is_empty() {
        out.push_str("  not detected\n");
    } else {
        for (name, player) in &odds.players {
            let _ = writeln!(out, "  {name}: {}", player_odds_inline(player));
        }
    }

    out
}

/// Status line for a capture batch: fixture, state, image count.
pub fn batch_status(batch: &CaptureBatch) -> String {
    format!(
        "{} | state: {} | captures: {}/{}",
        batch.match_info.fixture(),
        batch.state,
        batch.images.len(),
        BATCH_CAPACITY
    )
}

fn player_odds_inline(player: &PlayerOdds) -> String {
    let mut parts = Vec::new();
    if let Some(first) = &player.first_goal {
        parts.push(format!("first {first}"));
    }
    if let Some(anytime) = &player.anytime_goal {
        parts.push(format!("anytime {anytime}"));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BttsOdds, ImageRef, MatchWinnerOdds, OddsValue, TotalsOdds};

    fn odds(token: &str) -> OddsValue {
        OddsValue::from_token(token).unwrap().0
    }

    fn full_record() -> OddsRecord {
        let mut record = OddsRecord {
            match_winner: Some(MatchWinnerOdds {
                home: odds("2.10"),
                draw: odds("3.40"),
                away: odds("3.20"),
            }),
            over_under: Some(TotalsOdds {
                line: "2.5".to_string(),
                over: odds("1.66"),
                under: odds("2.20"),
            }),
            both_teams_score: Some(BttsOdds {
                yes: odds("1.80"),
                no: odds("1.95"),
            }),
            ..Default::default()
        };
        record.corners.insert(9, odds("1.70"));
        record.players.insert(
            "Mbappé".to_string(),
            PlayerOdds {
                first_goal: Some(odds("7.00")),
                anytime_goal: Some(odds("2.50")),
            },
        );
        record
    }

    #[test]
    fn test_short_summary_full_record() {
        let summary = short_summary(&MatchInfo::new("Real Madrid", "Barcelona"), &full_record());
        assert_eq!(
            summary,
            "Real Madrid vs Barcelona\n\
             1X2: 2.10 / 3.40 / 3.20\n\
             O/U 2.5: over 1.66, under 2.20\n\
             BTTS: yes 1.80, no 1.95\n\
             Corners: over 9 @ 1.70\n\
             Players: Mbappé first 7.00, anytime 2.50"
        );
    }

    #[test]
    fn test_short_summary_omits_absent_markets() {
        let record = OddsRecord {
            match_winner: Some(MatchWinnerOdds {
                home: odds("2.10"),
                draw: odds("3.40"),
                away: odds("3.20"),
            }),
            ..Default::default()
        };
        let summary = short_summary(&MatchInfo::new("Real Madrid", "Barcelona"), &record);
        assert!(summary.contains("1X2"));
        assert!(!summary.contains("BTTS"));
        assert!(!summary.contains("Corners"));
    }

    #[test]
    fn test_short_summary_empty_record() {
        let summary = short_summary(
            &MatchInfo::new("Real Madrid", "Barcelona"),
            &OddsRecord::default(),
        );
        assert_eq!(summary, "Real Madrid vs Barcelona\nNo odds detected");
    }

    #[test]
    fn test_detailed_summary_placeholders() {
        let record = OddsRecord {
            over_under: Some(TotalsOdds {
                line: "2.5".to_string(),
                over: odds("1.66"),
                under: odds("2.20"),
            }),
            ..Default::default()
        };
        let view = detailed_summary(&MatchInfo::new("Real Madrid", "Barcelona"), &record);

        assert!(view.contains("MATCH WINNER (1X2)\n  not detected"));
        assert!(view.contains("GOALS OVER/UNDER\n  Over 2.5: 1.66\n  Under 2.5: 2.20"));
        assert!(view.contains("BOTH TEAMS TO SCORE\n  not detected"));
        assert!(view.contains("CORNERS\n  not detected"));
        assert!(view.contains("GOALSCORERS\n  not detected"));
    }

    #[test]
    fn test_detailed_summary_is_stable() {
        let info = MatchInfo::new("Real Madrid", "Barcelona");
        let record = full_record();
        assert_eq!(detailed_summary(&info, &record), detailed_summary(&info, &record));
    }

    #[test]
    fn test_batch_status() {
        let mut batch = CaptureBatch::new("chat-1", MatchInfo::new("Real Madrid", "Barcelona"));
        batch.add_image(ImageRef::new("f", "k")).unwrap();

        assert_eq!(
            batch_status(&batch),
            "Real Madrid vs Barcelona | state: open | captures: 1/10"
        );
    }
}
