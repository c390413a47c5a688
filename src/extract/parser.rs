use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::models::{BttsOdds, MatchWinnerOdds, OddsRecord, OddsValue, PlayerOdds, TotalsOdds};
use crate::recognition::TextFragment;

/// Decimal odds token as printed on bookmaker boards: one or two integer
/// digits, exactly two decimals, dot or comma separator.
const DECIMAL_TOKEN: &str = r"\b\d{1,2}[.,]\d{2}\b";

/// Explicitly labeled 1X2 block: "1 2.10 X 3.40 2 3.20".
const LABELED_1X2: &str =
    r"(?i)\b1\s+(\d{1,2}[.,]\d{2})\s+x\s+(\d{1,2}[.,]\d{2})\s+2\s+(\d{1,2}[.,]\d{2})";

/// Over 2.5 goals with a bilingual label bound to the odds.
const OVER_2_5: &str = r"(?i)(?:m[áa]s|over)(?:\s+de)?\s+2[.,]5\D{0,20}?(\d{1,2}[.,]\d{2})";

/// Under 2.5 goals with a bilingual label bound to the odds.
const UNDER_2_5: &str = r"(?i)(?:menos|under)(?:\s+de)?\s+2[.,]5\D{0,20}?(\d{1,2}[.,]\d{2})";

/// Yes/No pair for both-teams-to-score.
const BTTS_PAIR: &str =
    r"(?is)\b(?:s[íi]|yes)\b\D{0,15}?(\d{1,2}[.,]\d{2}).{0,80}?\bno\b\D{0,15}?(\d{1,2}[.,]\d{2})";

/// Corner line with an explicit over label: "Más de 9 ... 1.70".
const CORNERS_LABELED: &str = r"(?i)(?:m[áa]s\s+de|over)\s+(\d{1,2})\b\D{0,20}?(\d{1,2}[.,]\d{2})";

/// Bare corner line and odds pair: "10 1.85".
const CORNERS_PAIR: &str = r"\b(\d{1,2})\s+(\d{1,2}[.,]\d{2})\b";

const SIDE_ODDS_RANGE: RangeInclusive<f64> = 1.01..=50.0;
const DRAW_ODDS_RANGE: RangeInclusive<f64> = 1.01..=15.0;

/// Bookmaker margin band: implied probability of a real 1X2 triple. Triples
/// outside this band are mis-OCR'd noise, not odds.
const IMPLIED_PROBABILITY_RANGE: RangeInclusive<f64> = 0.95..=1.20;

const TOTALS_ODDS_RANGE: RangeInclusive<f64> = 1.01..=10.0;
const BTTS_ODDS_RANGE: RangeInclusive<f64> = 1.20..=5.00;
const CORNER_ODDS_RANGE: RangeInclusive<f64> = 1.01..=30.0;
const CORNER_LINE_RANGE: RangeInclusive<u8> = 8..=15;
const PLAYER_ODDS_RANGE: RangeInclusive<f64> = 1.50..=25.00;

/// How far after a player name the odds may appear (bytes of OCR text).
const PLAYER_ODDS_WINDOW: usize = 40;

const BTTS_KEYWORDS: &[&str] = &[
    "ambos", "both", "equipos", "teams", "anotan", "marcan", "score", "btts",
];

const CORNER_KEYWORDS: &[&str] = &["corner", "córner", "esquina", "saque"];

const FIRST_SCORER_LABELS: &[&str] = &[
    "primer goleador",
    "primer gol",
    "1er goleador",
    "first scorer",
    "first goalscorer",
];

/// Reference list of goalscorer-market players: canonical name plus the
/// lowercase aliases boards print for them.
const KNOWN_PLAYERS: &[(&str, &[&str])] = &[
    ("Bellingham", &["bellingham"]),
    ("Benzema", &["benzema"]),
    ("Griezmann", &["griezmann"]),
    ("Haaland", &["haaland"]),
    ("Kane", &["kane"]),
    ("Lewandowski", &["lewandowski"]),
    ("Mbappé", &["mbappé", "mbappe", "kylian"]),
    ("Messi", &["messi"]),
    ("Morata", &["morata"]),
    ("Neymar", &["neymar"]),
    ("Salah", &["salah"]),
    ("Vinicius", &["vinicius", "vini"]),
];

/// Heuristic extractor turning recognized board text into validated odds.
///
/// Each market runs a prioritized rule list (labeled patterns before
/// generic fallbacks); the first occurrence in document order that passes
/// the market's plausibility validation wins. Unmatched or implausible
/// patterns leave the market absent; extraction never fails.
pub struct OddsParser {
    decimal: Regex,
    labeled_1x2: Regex,
    over_2_5: Regex,
    under_2_5: Regex,
    btts_pair: Regex,
    corners_labeled: Regex,
    corners_pair: Regex,
}

impl OddsParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            decimal: compile(DECIMAL_TOKEN)?,
            labeled_1x2: compile(LABELED_1X2)?,
            over_2_5: compile(OVER_2_5)?,
            under_2_5: compile(UNDER_2_5)?,
            btts_pair: compile(BTTS_PAIR)?,
            corners_labeled: compile(CORNERS_LABELED)?,
            corners_pair: compile(CORNERS_PAIR)?,
        })
    }

    /// Extract odds from the recognized fragments of one image.
    pub fn parse_fragments(&self, fragments: &[TextFragment]) -> OddsRecord {
        let text = fragments
            .iter()
            .map(|f| f.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        self.parse_text(&text)
    }

    /// Extract every market that validates from one block of board text.
    pub fn parse_text(&self, text: &str) -> OddsRecord {
        let record = OddsRecord {
            match_winner: self.extract_match_winner(text),
            over_under: self.extract_over_under(text),
            both_teams_score: self.extract_btts(text),
            corners: self.extract_corners(text),
            players: self.extract_players(text),
        };

        if !record.is_empty() {
            debug!("Extracted {} market(s) from image text", record.market_count());
        }
        record
    }

    /// 1X2: labeled block first, then the first plausible run of three
    /// decimals in document order.
    fn extract_match_winner(&self, text: &str) -> Option<MatchWinnerOdds> {
        if let Some(caps) = self.labeled_1x2.captures(text) {
            if let Some(odds) = validate_1x2(&caps[1], &caps[2], &caps[3]) {
                return Some(odds);
            }
        }

        let tokens: Vec<&str> = self.decimal.find_iter(text).map(|m| m.as_str()).collect();
        tokens
            .windows(3)
            .find_map(|w| validate_1x2(w[0], w[1], w[2]))
    }

    /// Over/under 2.5 goals. The literal line marker must be present and
    /// both odds must carry their over/under label.
    fn extract_over_under(&self, text: &str) -> Option<TotalsOdds> {
        if !text.contains("2.5") && !text.contains("2,5") {
            return None;
        }

        let over = self.over_2_5.captures(text)?;
        let under = self.under_2_5.captures(text)?;

        let (over, over_value) = OddsValue::from_token(&over[1])?;
        let (under, under_value) = OddsValue::from_token(&under[1])?;

        if !TOTALS_ODDS_RANGE.contains(&over_value) || !TOTALS_ODDS_RANGE.contains(&under_value) {
            return None;
        }

        Some(TotalsOdds {
            line: "2.5".to_string(),
            over,
            under,
        })
    }

    /// Both teams to score: keyword gate, then a labeled yes/no pair.
    fn extract_btts(&self, text: &str) -> Option<BttsOdds> {
        let lower = text.to_lowercase();
        if !BTTS_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return None;
        }

        let caps = self.btts_pair.captures(text)?;
        let (yes, yes_value) = OddsValue::from_token(&caps[1])?;
        let (no, no_value) = OddsValue::from_token(&caps[2])?;

        if !BTTS_ODDS_RANGE.contains(&yes_value) || !BTTS_ODDS_RANGE.contains(&no_value) {
            return None;
        }

        Some(BttsOdds { yes, no })
    }

    /// Corner lines: keyword gate, then labeled pairs before bare pairs.
    /// The first occurrence per threshold wins.
    fn extract_corners(&self, text: &str) -> BTreeMap<u8, OddsValue> {
        let lower = text.to_lowercase();
        if !CORNER_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return BTreeMap::new();
        }

        let mut corners = BTreeMap::new();

        for rule in [&self.corners_labeled, &self.corners_pair] {
            for caps in rule.captures_iter(text) {
                let Ok(threshold) = caps[1].parse::<u8>() else {
                    continue;
                };
                if !CORNER_LINE_RANGE.contains(&threshold) {
                    continue;
                }
                let Some((odds, value)) = OddsValue::from_token(&caps[2]) else {
                    continue;
                };
                if !CORNER_ODDS_RANGE.contains(&value) {
                    continue;
                }
                corners.entry(threshold).or_insert(odds);
            }
        }

        corners
    }

    /// Goalscorer props for players on the reference list: nearest decimal
    /// after the name, classified by a first-scorer label on the board.
    fn extract_players(&self, text: &str) -> BTreeMap<String, PlayerOdds> {
        let lower = text.to_lowercase();
        let first_scorer = FIRST_SCORER_LABELS.iter().any(|l| lower.contains(l));

        let mut players = BTreeMap::new();

        for (canonical, aliases) in KNOWN_PLAYERS {
            let Some(tail) = aliases
                .iter()
                .find_map(|alias| lower.find(alias).map(|at| &lower[at + alias.len()..]))
            else {
                continue;
            };

            let Some(found) = self.decimal.find(tail) else {
                continue;
            };
            if found.start() > PLAYER_ODDS_WINDOW {
                continue;
            }

            let Some((odds, value)) = OddsValue::from_token(found.as_str()) else {
                continue;
            };
            if !PLAYER_ODDS_RANGE.contains(&value) {
                continue;
            }

            let entry = players
                .entry(canonical.to_string())
                .or_insert_with(PlayerOdds::default);
            if first_scorer {
                entry.first_goal.get_or_insert(odds);
            } else {
                entry.anytime_goal.get_or_insert(odds);
            }
        }

        players
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("invalid odds pattern: {pattern}"))
}

fn validate_1x2(home: &str, draw: &str, away: &str) -> Option<MatchWinnerOdds> {
    let (home, home_value) = OddsValue::from_token(home)?;
    let (draw, draw_value) = OddsValue::from_token(draw)?;
    let (away, away_value) = OddsValue::from_token(away)?;

    if !SIDE_ODDS_RANGE.contains(&home_value)
        || !DRAW_ODDS_RANGE.contains(&draw_value)
        || !SIDE_ODDS_RANGE.contains(&away_value)
    {
        return None;
    }

    let implied = 1.0 / home_value + 1.0 / draw_value + 1.0 / away_value;
    if !IMPLIED_PROBABILITY_RANGE.contains(&implied) {
        return None;
    }

    Some(MatchWinnerOdds { home, draw, away })
}
