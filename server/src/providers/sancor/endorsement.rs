use crate::utils::parse_portal_date;
use chrono::{Duration, NaiveDate};
use regex::Regex;

/// Coverage assumed when the portal leaves "valid to" blank.
const DEFAULT_COVERAGE_DAYS: i64 = 364;

/// Columns of one `historicalPolicy` row that matter for validity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoricalRow {
    pub movement_type: String,
    pub valid_from: String,
    pub valid_to: String,
}

impl HistoricalRow {
    pub const MOVEMENT_COLUMN: usize = 3;
    pub const VALID_FROM_COLUMN: usize = 7;
    pub const VALID_TO_COLUMN: usize = 8;

    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
        Self {
            movement_type: cell(Self::MOVEMENT_COLUMN),
            valid_from: cell(Self::VALID_FROM_COLUMN),
            valid_to: cell(Self::VALID_TO_COLUMN),
        }
    }
}

/// Index of the row in force on `today`: an issue or renewal whose window
/// contains `today`. The latest start date wins.
pub fn select_valid_row(rows: &[HistoricalRow], today: NaiveDate) -> Option<usize> {
    let issue = Regex::new(r"^(Emis|Renov).*liza").ok()?;
    let mut best: Option<(NaiveDate, usize)> = None;

    for (index, row) in rows.iter().enumerate() {
        if row.valid_from.is_empty() || !issue.is_match(&row.movement_type) {
            continue;
        }
        let Ok(from) = parse_portal_date(&row.valid_from) else {
            tracing::debug!("SANCOR fila {} con vigencia ilegible: {}", index, row.valid_from);
            continue;
        };

        let to = if row.valid_to.is_empty() {
            let assumed = from + Duration::days(DEFAULT_COVERAGE_DAYS);
            (assumed > today).then_some(assumed)
        } else {
            parse_portal_date(&row.valid_to).ok()
        };

        tracing::debug!(
            "SANCOR mov: {} vigencia {} a {:?}",
            row.movement_type,
            row.valid_from,
            to
        );

        if let Some(to) = to {
            if from <= today && today <= to && best.map_or(true, |(best_from, _)| from >= best_from) {
                best = Some((from, index));
            }
        }
    }

    best.map(|(_, index)| index)
}
