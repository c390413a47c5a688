use tracing::debug;

use crate::error::CaptureError;
use crate::models::MatchInfo;

/// Parses a session-start match specification into [`MatchInfo`].
///
/// Expected shape: `"Home Team vs Away Team"`, optionally followed by
/// comma-separated extras (league, date, kickoff time) in any order:
/// `"Real Madrid vs Barcelona, La Liga, 2026-08-10, 21:00"`.
pub fn parse_match_spec(input: &str) -> Result<MatchInfo, CaptureError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::InvalidMatchSpec(
            "missing match description, expected 'Home Team vs Away Team'".to_string(),
        ));
    }

    let mut segments = trimmed.split(',').map(str::trim);
    let fixture = segments.next().unwrap_or_default();

    let (home, away) = split_fixture(fixture).ok_or_else(|| {
        CaptureError::InvalidMatchSpec(format!(
            "could not find both teams in '{fixture}', expected 'Home Team vs Away Team'"
        ))
    })?;

    let mut info = MatchInfo::new(title_case(&home), title_case(&away));

    for extra in segments.filter(|s| !s.is_empty()) {
        classify_extra(&mut info, extra);
    }

    debug!("Parsed match spec: {}", info.fixture());
    Ok(info)
}

/// Splits `"Home Team vs Away Team"` on a standalone vs token.
fn split_fixture(fixture: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = fixture.split_whitespace().collect();

    let separator = tokens.iter().position(|t| {
        let lower = t.to_lowercase();
        lower == "vs" || lower == "vs." || lower == "v"
    })?;

    let home = tokens[..separator].join(" ");
    let away = tokens[separator + 1..].join(" ");

    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home, away))
}

/// Sorts a trailing segment into kickoff, date, or league.
fn classify_extra(info: &mut MatchInfo, extra: &str) {
    let has_digit = extra.chars().any(|c| c.is_ascii_digit());

    if has_digit && extra.contains(':') {
        if info.kickoff.is_none() {
            info.kickoff = Some(extra.to_string());
        }
    } else if has_digit {
        if info.match_date.is_none() {
            info.match_date = Some(extra.to_string());
        }
    } else if info.league.is_none() {
        info.league = Some(extra.to_string());
    }
}

/// Normalizes a free-text team name to title case.
///
/// Short all-caps tokens (club abbreviations like "FC" or "PSG") are kept
/// as written.
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            if word.len() <= 3 && word.chars().all(|c| c.is_uppercase()) {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
