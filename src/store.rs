use crate::models::{AppData, KpiRecord, MONTHS, RecordFields, SettingsPatch, new_record_id};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("month must be one of 01..12, got '{0}'")]
    InvalidMonth(String),
    #[error("name must not be empty")]
    EmptyLabel,
}

impl AppData {
    pub fn find_record(&self, id: &str) -> Option<&KpiRecord> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Appends a new record. Unset period fields follow the current
    /// selection; unset buyer/category take the first list entry.
    pub fn insert_record(&mut self, fields: RecordFields) -> KpiRecord {
        let record = KpiRecord {
            id: new_record_id(),
            year: fields.year.unwrap_or(self.year),
            month: fields.month.unwrap_or_else(|| self.month.clone()),
            buyer: fields
                .buyer
                .or_else(|| self.buyers.first().cloned())
                .unwrap_or_default(),
            category: fields
                .category
                .or_else(|| self.categories.first().cloned())
                .unwrap_or_default(),
            sales_target: fields.sales_target.unwrap_or(0.0),
            sales_actual: fields.sales_actual.unwrap_or(0.0),
            gp_target: fields.gp_target.unwrap_or(0.0),
            gp_actual: fields.gp_actual.unwrap_or(0.0),
            notes: fields.notes.unwrap_or_default(),
        };
        self.rows.push(record.clone());
        record
    }

    pub fn update_record(&mut self, id: &str, fields: RecordFields) -> Option<KpiRecord> {
        let row = self.rows.iter_mut().find(|row| row.id == id)?;
        if let Some(year) = fields.year {
            row.year = year;
        }
        if let Some(month) = fields.month {
            row.month = month;
        }
        if let Some(buyer) = fields.buyer {
            row.buyer = buyer;
        }
        if let Some(category) = fields.category {
            row.category = category;
        }
        if let Some(value) = fields.sales_target {
            row.sales_target = value;
        }
        if let Some(value) = fields.sales_actual {
            row.sales_actual = value;
        }
        if let Some(value) = fields.gp_target {
            row.gp_target = value;
        }
        if let Some(value) = fields.gp_actual {
            row.gp_actual = value;
        }
        if let Some(notes) = fields.notes {
            row.notes = notes;
        }
        Some(row.clone())
    }

    pub fn remove_record(&mut self, id: &str) -> Option<KpiRecord> {
        let index = self.rows.iter().position(|row| row.id == id)?;
        Some(self.rows.remove(index))
    }

    pub fn select_period(&mut self, year: i32, month: &str) -> Result<(), StoreError> {
        let month = month.trim();
        if !MONTHS.contains(&month) {
            return Err(StoreError::InvalidMonth(month.to_string()));
        }
        self.year = year;
        self.month = month.to_string();
        Ok(())
    }

    pub fn apply_settings(&mut self, patch: SettingsPatch) {
        let settings = &mut self.settings;
        if let Some(value) = patch.sales_weight {
            settings.sales_weight = value;
        }
        if let Some(value) = patch.gp_weight {
            settings.gp_weight = value;
        }
        if let Some(value) = patch.green {
            settings.green = value;
        }
        if let Some(value) = patch.yellow {
            settings.yellow = value;
        }
        if settings.has_inverted_thresholds() {
            warn!(
                green = settings.green,
                yellow = settings.yellow,
                "green threshold is below yellow; the at-risk band is empty"
            );
        }
    }

    pub fn add_buyer(&mut self, name: &str) -> Result<bool, StoreError> {
        add_label(&mut self.buyers, name)
    }

    pub fn remove_buyer(&mut self, name: &str) -> bool {
        remove_label(&mut self.buyers, name)
    }

    pub fn add_category(&mut self, name: &str) -> Result<bool, StoreError> {
        add_label(&mut self.categories, name)
    }

    pub fn remove_category(&mut self, name: &str) -> bool {
        remove_label(&mut self.categories, name)
    }
}

/// Returns whether the list changed; duplicates are a no-op.
fn add_label(list: &mut Vec<String>, name: &str) -> Result<bool, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::EmptyLabel);
    }
    if list.iter().any(|existing| existing == name) {
        return Ok(false);
    }
    list.push(name.to_string());
    Ok(true)
}

fn remove_label(list: &mut Vec<String>, name: &str) -> bool {
    let name = name.trim();
    let before = list.len();
    list.retain(|existing| existing != name);
    list.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;
    use chrono::NaiveDate;

    fn data() -> AppData {
        AppData::seeded(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    #[test]
    fn insert_defaults_to_selection_and_first_labels() {
        let mut data = data();
        let before = data.rows.len();
        let record = data.insert_record(RecordFields::default());

        assert_eq!(data.rows.len(), before + 1);
        assert_eq!(data.rows.last(), Some(&record));
        assert_eq!(record.year, 2025);
        assert_eq!(record.month, "03");
        assert_eq!(record.buyer, "Buyer A");
        assert_eq!(record.category, "Gaming Components");
        assert_eq!(record.sales_target, 0.0);
        assert!(record.notes.is_empty());
        assert!(!record.id.is_empty());
    }

    #[test]
    fn insert_with_empty_lists_leaves_labels_blank() {
        let mut data = data();
        data.buyers.clear();
        data.categories.clear();
        let record = data.insert_record(RecordFields::default());
        assert_eq!(record.buyer, "");
        assert_eq!(record.category, "");
    }

    #[test]
    fn update_touches_only_given_fields() {
        let mut data = data();
        let created = data.insert_record(RecordFields {
            buyer: Some("Buyer B".to_string()),
            sales_target: Some(500.0),
            notes: Some("first".to_string()),
            ..RecordFields::default()
        });

        let updated = data
            .update_record(
                &created.id,
                RecordFields {
                    sales_actual: Some(450.0),
                    notes: Some("revised".to_string()),
                    ..RecordFields::default()
                },
            )
            .expect("record should exist");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.buyer, "Buyer B");
        assert_eq!(updated.sales_target, 500.0);
        assert_eq!(updated.sales_actual, 450.0);
        assert_eq!(updated.notes, "revised");
        assert_eq!(data.find_record(&created.id), Some(&updated));
        assert!(data.update_record("missing", RecordFields::default()).is_none());
    }

    #[test]
    fn remove_drops_the_record() {
        let mut data = data();
        let created = data.insert_record(RecordFields::default());
        assert_eq!(data.remove_record(&created.id), Some(created.clone()));
        assert!(data.find_record(&created.id).is_none());
        assert!(data.remove_record(&created.id).is_none());
    }

    #[test]
    fn period_requires_two_digit_month() {
        let mut data = data();
        assert!(data.select_period(2026, "11").is_ok());
        assert_eq!((data.year, data.month.as_str()), (2026, "11"));

        assert_eq!(
            data.select_period(2027, "9"),
            Err(StoreError::InvalidMonth("9".to_string()))
        );
        assert!(data.select_period(2027, "13").is_err());
        assert_eq!((data.year, data.month.as_str()), (2026, "11"));
    }

    #[test]
    fn settings_patch_merges_and_keeps_inverted_thresholds() {
        let mut data = data();
        data.apply_settings(SettingsPatch {
            green: Some(90.0),
            ..SettingsPatch::default()
        });
        assert_eq!(
            data.settings,
            Settings {
                green: 90.0,
                ..Settings::default()
            }
        );
        assert!(data.settings.has_inverted_thresholds());
    }

    #[test]
    fn labels_are_trimmed_and_deduplicated() {
        let mut data = data();
        assert_eq!(data.add_buyer("  Buyer C "), Ok(true));
        assert_eq!(data.add_buyer("Buyer C"), Ok(false));
        assert_eq!(data.add_buyer("   "), Err(StoreError::EmptyLabel));
        assert_eq!(data.buyers, vec!["Buyer A", "Buyer B", "Buyer C"]);

        let record = data.insert_record(RecordFields {
            category: Some("Systems".to_string()),
            ..RecordFields::default()
        });
        assert!(data.remove_category("Systems"));
        assert!(!data.remove_category("Systems"));
        assert_eq!(
            data.find_record(&record.id).map(|row| row.category.as_str()),
            Some("Systems")
        );
        assert!(data.add_category("Tablets").unwrap());
        assert!(data.remove_buyer("Buyer A"));
    }
}
