use crate::coerce;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

pub const MONTHS: [&str; 12] = [
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12",
];

const SAMPLE_BUYERS: [&str; 2] = ["Buyer A", "Buyer B"];
const SAMPLE_CATEGORIES: [&str; 6] = [
    "Gaming Components",
    "Systems",
    "Laptops",
    "Peripherals",
    "Networking",
    "Accessories",
];

/// One monthly target/actual entry for a buyer and category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiRecord {
    #[serde(default = "new_record_id")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce::year")]
    pub year: i32,
    #[serde(default, deserialize_with = "coerce::text")]
    pub month: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub buyer: String,
    #[serde(default, deserialize_with = "coerce::text")]
    pub category: String,
    #[serde(default, deserialize_with = "coerce::number")]
    pub sales_target: f64,
    #[serde(default, deserialize_with = "coerce::number")]
    pub sales_actual: f64,
    #[serde(default, deserialize_with = "coerce::number")]
    pub gp_target: f64,
    #[serde(default, deserialize_with = "coerce::number")]
    pub gp_actual: f64,
    #[serde(default, deserialize_with = "coerce::text")]
    pub notes: String,
}

pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "coerce::number")]
    pub sales_weight: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub gp_weight: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub green: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub yellow: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sales_weight: 70.0,
            gp_weight: 30.0,
            green: 100.0,
            yellow: 95.0,
        }
    }
}

impl Settings {
    /// With green below yellow the at-risk band is empty.
    pub fn has_inverted_thresholds(&self) -> bool {
        self.green < self.yellow
    }
}

/// Whole application state: what gets loaded at startup and written back on
/// every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub rows: Vec<KpiRecord>,
    pub year: i32,
    pub month: String,
    pub buyers: Vec<String>,
    pub categories: Vec<String>,
    pub settings: Settings,
}

impl Default for AppData {
    fn default() -> Self {
        Self::seeded(Local::now().date_naive())
    }
}

impl AppData {
    pub fn seeded(today: NaiveDate) -> Self {
        Self {
            rows: sample_rows(today.year()),
            year: today.year(),
            month: current_month(today),
            buyers: sample_buyers(),
            categories: sample_categories(),
            settings: Settings::default(),
        }
    }
}

pub fn current_month(today: NaiveDate) -> String {
    format!("{:02}", today.month())
}

pub fn sample_buyers() -> Vec<String> {
    SAMPLE_BUYERS.iter().map(|name| name.to_string()).collect()
}

pub fn sample_categories() -> Vec<String> {
    SAMPLE_CATEGORIES.iter().map(|name| name.to_string()).collect()
}

pub fn sample_rows(year: i32) -> Vec<KpiRecord> {
    vec![KpiRecord {
        id: new_record_id(),
        year,
        month: "09".to_string(),
        buyer: SAMPLE_BUYERS[0].to_string(),
        category: SAMPLE_CATEGORIES[0].to_string(),
        sales_target: 12_000_000.0,
        sales_actual: 10_250_000.0,
        gp_target: 1_320_000.0,
        gp_actual: 1_180_000.0,
        notes: "September pull-in fell short, catch up in October".to_string(),
    }]
}

/// Fields of a record as submitted by a form or JSON body. Used for both
/// creation and partial updates; absent fields are `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    #[serde(default, deserialize_with = "coerce::year_opt")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "coerce::text_opt")]
    pub month: Option<String>,
    #[serde(default, deserialize_with = "coerce::text_opt")]
    pub buyer: Option<String>,
    #[serde(default, deserialize_with = "coerce::text_opt")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub sales_target: Option<f64>,
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub sales_actual: Option<f64>,
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub gp_target: Option<f64>,
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub gp_actual: Option<f64>,
    #[serde(default, deserialize_with = "coerce::text_opt")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodSelection {
    #[serde(deserialize_with = "coerce::year")]
    pub year: i32,
    #[serde(deserialize_with = "coerce::text")]
    pub month: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub sales_weight: Option<f64>,
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub gp_weight: Option<f64>,
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub green: Option<f64>,
    #[serde(default, deserialize_with = "coerce::number_opt")]
    pub yellow: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelRequest {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    OnTarget,
    AtRisk,
    UnderTarget,
}

impl Status {
    /// Traffic-light colour used by the page badges.
    pub fn intent(self) -> &'static str {
        match self {
            Status::OnTarget => "green",
            Status::AtRisk => "yellow",
            Status::UnderTarget => "red",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub sales_target_sum: f64,
    pub sales_actual_sum: f64,
    pub gp_target_sum: f64,
    pub gp_actual_sum: f64,
    pub sales_rate: f64,
    pub gp_rate: f64,
    pub composite_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossCell {
    pub target_sum: f64,
    pub actual_sum: f64,
    pub rate: f64,
}

/// Buyer x category matrix of summed sales figures. `cells[b][c]` belongs to
/// `buyers[b]` and `categories[c]`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossTab {
    pub buyers: Vec<String>,
    pub categories: Vec<String>,
    pub cells: Vec<Vec<CrossCell>>,
}

impl CrossTab {
    pub fn cell(&self, buyer: &str, category: &str) -> Option<&CrossCell> {
        let row = self.buyers.iter().position(|name| name == buyer)?;
        let column = self.categories.iter().position(|name| name == category)?;
        self.cells.get(row)?.get(column)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSample {
    pub rate: f64,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub year: i32,
    pub month: String,
    pub rows: Vec<KpiRecord>,
    pub totals: Totals,
    pub sales_status: Status,
    pub gp_status: Status,
    pub composite_status: Status,
    pub cross_tab: CrossTab,
    pub cross_tab_status: Vec<Vec<Status>>,
    pub preview: Vec<ThresholdSample>,
    pub settings: Settings,
    pub thresholds_inverted: bool,
    pub buyers: Vec<String>,
    pub categories: Vec<String>,
}
