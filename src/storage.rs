use crate::errors::AppError;
use crate::models::{self, AppData, KpiRecord, Settings};
use chrono::{Datelike, Local, NaiveDate};
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use tracing::{error, warn};

pub const ROWS_KEY: &str = "kpi_rows_v1";
pub const YEAR_KEY: &str = "kpi_year_v1";
pub const MONTH_KEY: &str = "kpi_month_v1";
pub const BUYERS_KEY: &str = "kpi_buyers_v1";
pub const CATEGORIES_KEY: &str = "kpi_categories_v1";
pub const SETTINGS_KEY: &str = "kpi_settings_v1";

/// On-disk layout: one JSON object whose values are themselves JSON text,
/// one entry per key.
pub type KvDocument = BTreeMap<String, String>;

pub async fn load_data(path: &Path) -> AppData {
    let today = Local::now().date_naive();
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<KvDocument>(&bytes) {
            Ok(document) => decode_data(&document, today),
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::seeded(today)
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::seeded(today),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::seeded(today)
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let document = encode_data(data).map_err(AppError::internal)?;
    let payload = serde_json::to_vec_pretty(&document).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(|err| {
        error!("failed to write data file: {err}");
        AppError::internal(err)
    })?;
    Ok(())
}

/// Every key falls back to its own default, so one corrupt entry does not
/// discard the rest of the state.
pub fn decode_data(document: &KvDocument, today: NaiveDate) -> AppData {
    AppData {
        rows: load_key::<Vec<KpiRecord>>(document, ROWS_KEY)
            .unwrap_or_else(|| models::sample_rows(today.year())),
        year: load_key(document, YEAR_KEY).unwrap_or_else(|| today.year()),
        month: load_key(document, MONTH_KEY).unwrap_or_else(|| models::current_month(today)),
        buyers: load_key(document, BUYERS_KEY).unwrap_or_else(models::sample_buyers),
        categories: load_key(document, CATEGORIES_KEY).unwrap_or_else(models::sample_categories),
        settings: load_key::<Settings>(document, SETTINGS_KEY).unwrap_or_default(),
    }
}

pub fn encode_data(data: &AppData) -> Result<KvDocument, serde_json::Error> {
    let mut document = KvDocument::new();
    document.insert(ROWS_KEY.to_string(), serde_json::to_string(&data.rows)?);
    document.insert(YEAR_KEY.to_string(), serde_json::to_string(&data.year)?);
    document.insert(MONTH_KEY.to_string(), serde_json::to_string(&data.month)?);
    document.insert(BUYERS_KEY.to_string(), serde_json::to_string(&data.buyers)?);
    document.insert(
        CATEGORIES_KEY.to_string(),
        serde_json::to_string(&data.categories)?,
    );
    document.insert(SETTINGS_KEY.to_string(), serde_json::to_string(&data.settings)?);
    Ok(document)
}

fn load_key<T: DeserializeOwned>(document: &KvDocument, key: &str) -> Option<T> {
    let raw = document.get(key)?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, "stored value failed to parse, using default: {err}");
            None
        }
    }
}
