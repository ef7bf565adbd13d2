use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;

// ── Category ──────────────────────────────────────────────────────────────────

/// Row-shaping policy tag from column E of the control worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    IcisApac,
    IcisCommon,
}

impl Category {
    /// Exact match only; the control sheet is hand-maintained and a typo must
    /// surface as a skip, not silently map to the nearest policy.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ICIS_APAC" => Some(Self::IcisApac),
            "ICIS_Common" => Some(Self::IcisCommon),
            _ => None,
        }
    }

    /// Shape the written row. `IcisCommon` keeps its middle column blank; the
    /// target sheets reserve it for a field this system does not populate.
    pub fn shape_row(&self, obs: &Observation) -> Vec<String> {
        match self {
            Self::IcisApac => vec![obs.date.clone(), obs.price.clone()],
            Self::IcisCommon => vec![obs.date.clone(), String::new(), obs.price.clone()],
        }
    }
}

// ── Observation ───────────────────────────────────────────────────────────────

/// One successful fetch: both values verbatim as the page rendered them.
/// Deliberately not parsed into calendar/numeric types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Observation {
    pub date: String,
    pub price: String,
}

// ── Control record ────────────────────────────────────────────────────────────

/// One validated row of the master control worksheet (columns A–E).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRecord {
    /// 1-based position in the control worksheet, for diagnostics.
    pub row_number: usize,
    pub target_sheet_id: String,
    pub target_worksheet_name: String,
    pub commodity_name: String,
    pub source_url: String,
    /// Kept as the raw cell value; the placement engine re-parses it so its
    /// unknown-category guard stays reachable when driven directly.
    pub category: String,
}

impl ControlRecord {
    pub fn from_row(row_number: usize, cells: &[String]) -> Result<Self, ValidationError> {
        if cells.len() < 5 {
            return Err(ValidationError::TooFewColumns { got: cells.len() });
        }

        let field = |idx: usize| cells[idx].trim().to_string();

        let target_sheet_id = field(0);
        if target_sheet_id.is_empty() {
            return Err(ValidationError::MissingField("target_sheet_id"));
        }

        let target_worksheet_name = field(1);
        if target_worksheet_name.is_empty() {
            return Err(ValidationError::MissingField("target_worksheet_name"));
        }

        let source_url = field(3);
        if source_url.is_empty() {
            return Err(ValidationError::MissingField("source_url"));
        }
        Url::parse(&source_url).map_err(|e| ValidationError::InvalidUrl {
            url: source_url.clone(),
            reason: e.to_string(),
        })?;

        let category = field(4);
        if Category::parse(&category).is_none() {
            return Err(ValidationError::UnknownCategory(category));
        }

        Ok(Self {
            row_number,
            target_sheet_id,
            target_worksheet_name,
            commodity_name: field(2),
            source_url,
            category,
        })
    }

    /// Label for log lines; the commodity column is optional.
    pub fn display_name(&self) -> &str {
        if self.commodity_name.is_empty() {
            &self.source_url
        } else {
            &self.commodity_name
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn obs() -> Observation {
        Observation {
            date: "2024-01-05".into(),
            price: "102.50".into(),
        }
    }

    #[test]
    fn apac_row_is_date_then_price() {
        assert_eq!(
            Category::IcisApac.shape_row(&obs()),
            vec!["2024-01-05".to_string(), "102.50".to_string()],
        );
    }

    #[test]
    fn common_row_keeps_middle_column_blank() {
        assert_eq!(
            Category::IcisCommon.shape_row(&obs()),
            vec!["2024-01-05".to_string(), String::new(), "102.50".to_string()],
        );
    }

    #[test]
    fn category_parse_is_exact() {
        assert_eq!(Category::parse("ICIS_APAC"), Some(Category::IcisApac));
        assert_eq!(Category::parse("ICIS_Common"), Some(Category::IcisCommon));
        assert_eq!(Category::parse("icis_apac"), None);
        assert_eq!(Category::parse("ICIS_EU"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn valid_row_parses() {
        let rec = ControlRecord::from_row(
            2,
            &row(&["S1", "W1", "Butadiene", "https://portal.example/bd", "ICIS_APAC"]),
        )
        .unwrap();
        assert_eq!(rec.row_number, 2);
        assert_eq!(rec.target_sheet_id, "S1");
        assert_eq!(rec.target_worksheet_name, "W1");
        assert_eq!(rec.display_name(), "Butadiene");
    }

    #[test]
    fn short_row_is_rejected() {
        let err = ControlRecord::from_row(2, &row(&["S1", "W1", "x"])).unwrap_err();
        assert_eq!(err, ValidationError::TooFewColumns { got: 3 });
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let err =
            ControlRecord::from_row(2, &row(&["", "W1", "x", "https://a.example", "ICIS_APAC"]))
                .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("target_sheet_id"));

        let err =
            ControlRecord::from_row(2, &row(&["S1", "  ", "x", "https://a.example", "ICIS_APAC"]))
                .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("target_worksheet_name"));

        let err = ControlRecord::from_row(2, &row(&["S1", "W1", "x", "", "ICIS_APAC"])).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("source_url"));
    }

    #[test]
    fn malformed_url_is_rejected() {
        let err = ControlRecord::from_row(2, &row(&["S1", "W1", "x", "not a url", "ICIS_APAC"]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { .. }));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err =
            ControlRecord::from_row(2, &row(&["S1", "W1", "x", "https://a.example", "ICIS_EMEA"]))
                .unwrap_err();
        assert_eq!(err, ValidationError::UnknownCategory("ICIS_EMEA".into()));
    }

    #[test]
    fn display_name_falls_back_to_url() {
        let rec = ControlRecord::from_row(
            3,
            &row(&["S1", "W1", "", "https://portal.example/bd", "ICIS_Common"]),
        )
        .unwrap();
        assert_eq!(rec.display_name(), "https://portal.example/bd");
    }
}
