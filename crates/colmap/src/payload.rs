//! Request payload and formula clean-up for the formula-generation service.
//!
//! The snapshot text travels verbatim as `columnMap`. Transport is left to
//! the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

pub const DEFAULT_API_BASE: &str = "https://excelwizpro-backend.onrender.com";

/// Formula used when the service answers without one.
pub const NO_FORMULA: &str = "=ERROR(\"No formula returned\")";

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n").unwrap());
static CONTROL_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n\t]+").unwrap());
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub query: String,
    pub column_map: String,
    pub excel_version: String,
    pub main_sheet: Option<String>,
}

impl GenerateRequest {
    pub fn new(
        query: &str,
        column_map: &str,
        excel_version: Option<&str>,
        main_sheet: Option<&str>,
    ) -> Result<Self, PayloadError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PayloadError::EmptyQuery);
        }
        if column_map.trim().is_empty() {
            return Err(PayloadError::EmptyColumnMap);
        }
        Ok(Self {
            query: query.to_owned(),
            column_map: column_map.to_owned(),
            excel_version: non_blank(excel_version).unwrap_or("unknown").to_owned(),
            main_sheet: non_blank(main_sheet).map(str::to_owned),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub formula: Option<String>,
}

impl GenerateResponse {
    pub fn into_formula(self) -> String {
        finalize_formula(self.formula.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Replace typographic characters that break formula parsing with their
/// ASCII equivalents, flatten to one line, and collapse repeated spaces.
pub fn sanitize_formula(input: &str) -> String {
    let mapped: String = input
        .chars()
        .filter_map(|c| match c {
            '\u{200B}'..='\u{200F}' | '\u{FEFF}' => None,
            '\u{00A0}' => Some(' '),
            '\u{201C}' | '\u{201D}' => Some('"'),
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\u{00D7}' => Some('*'),
            '\u{00F7}' => Some('/'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => Some('-'),
            other => Some(other),
        })
        .collect();
    let single_line = LINE_BREAK.replace_all(&mapped, " ");
    SPACE_RUN.replace_all(&single_line, " ").trim().to_owned()
}

/// Sanitize a service formula and guarantee the leading `=`.
pub fn finalize_formula(raw: Option<&str>) -> String {
    let raw = raw.filter(|f| !f.is_empty()).unwrap_or(NO_FORMULA);
    let formula = sanitize_formula(raw);
    if formula.starts_with('=') {
        formula
    } else {
        format!("={formula}")
    }
}

/// Lighter clean-up for showing a formula in the taskpane.
pub fn sanitize_for_display(input: &str) -> String {
    let mapped: String = input
        .chars()
        .filter_map(|c| match c {
            '\u{200B}'..='\u{200F}' | '\u{FEFF}' => None,
            '\u{00A0}' => Some(' '),
            other => Some(other),
        })
        .collect();
    let flattened = CONTROL_RUN.replace_all(&mapped, " ");
    SPACE_RUN.replace_all(&flattened, " ").trim().to_owned()
}

/// Service base URL: explicit query parameter, then stored setting, then default.
pub fn resolve_api_base(query_param: Option<&str>, stored: Option<&str>) -> String {
    non_blank(query_param)
        .or_else(|| non_blank(stored))
        .unwrap_or(DEFAULT_API_BASE)
        .to_owned()
}
