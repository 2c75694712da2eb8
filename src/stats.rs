use crate::coerce::finite_or_zero;
use crate::models::{
    AppData, CrossCell, CrossTab, DashboardResponse, KpiRecord, Settings, Status, ThresholdSample,
    Totals,
};
use std::collections::HashMap;

pub fn build_dashboard(data: &AppData) -> DashboardResponse {
    let subset = filter_period(&data.rows, data.year, &data.month);
    let settings = &data.settings;

    let totals = aggregate(subset.iter().copied(), settings);
    let cross_tab = cross_tab(subset.iter().copied());
    let cross_tab_status = cross_tab
        .cells
        .iter()
        .map(|row| row.iter().map(|cell| classify(cell.rate, settings)).collect())
        .collect();

    DashboardResponse {
        year: data.year,
        month: data.month.clone(),
        rows: subset.into_iter().cloned().collect(),
        sales_status: classify(totals.sales_rate, settings),
        gp_status: classify(totals.gp_rate, settings),
        composite_status: classify(totals.composite_rate, settings),
        totals,
        cross_tab,
        cross_tab_status,
        preview: threshold_preview(settings).to_vec(),
        settings: *settings,
        thresholds_inverted: settings.has_inverted_thresholds(),
        buyers: data.buyers.clone(),
        categories: data.categories.clone(),
    }
}

/// Records of one period, in collection order. Month matches as text only,
/// so "9" never matches "09".
pub fn filter_period<'a>(rows: &'a [KpiRecord], year: i32, month: &str) -> Vec<&'a KpiRecord> {
    rows.iter()
        .filter(|row| row.year == year && row.month == month)
        .collect()
}

/// Achievement percentage with one decimal. A zero target yields 0.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    round_half_up(numerator / denominator * 1000.0) / 10.0
}

pub fn round_tenth(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

pub fn aggregate<'a, I>(subset: I, settings: &Settings) -> Totals
where
    I: IntoIterator<Item = &'a KpiRecord>,
{
    let mut totals = Totals::default();
    for row in subset {
        totals.sales_target_sum += finite_or_zero(row.sales_target);
        totals.sales_actual_sum += finite_or_zero(row.sales_actual);
        totals.gp_target_sum += finite_or_zero(row.gp_target);
        totals.gp_actual_sum += finite_or_zero(row.gp_actual);
    }

    totals.sales_rate = percentage(totals.sales_actual_sum, totals.sales_target_sum);
    totals.gp_rate = percentage(totals.gp_actual_sum, totals.gp_target_sum);
    // Weights are a plain linear blend and are not normalised to 100.
    totals.composite_rate = round_tenth(
        totals.sales_rate * settings.sales_weight / 100.0
            + totals.gp_rate * settings.gp_weight / 100.0,
    );
    totals
}

/// Full buyer x category cross product of sales target/actual sums. Pairs
/// never observed together still get a zeroed cell.
pub fn cross_tab<'a, I>(subset: I) -> CrossTab
where
    I: IntoIterator<Item = &'a KpiRecord>,
{
    let subset: Vec<&KpiRecord> = subset.into_iter().collect();

    let mut buyers: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    let mut buyer_index: HashMap<&str, usize> = HashMap::new();
    let mut category_index: HashMap<&str, usize> = HashMap::new();
    for row in &subset {
        if !buyer_index.contains_key(row.buyer.as_str()) {
            buyer_index.insert(row.buyer.as_str(), buyers.len());
            buyers.push(row.buyer.clone());
        }
        if !category_index.contains_key(row.category.as_str()) {
            category_index.insert(row.category.as_str(), categories.len());
            categories.push(row.category.clone());
        }
    }

    let mut cells = vec![vec![CrossCell::default(); categories.len()]; buyers.len()];
    for row in &subset {
        let cell = &mut cells[buyer_index[row.buyer.as_str()]][category_index[row.category.as_str()]];
        cell.target_sum += finite_or_zero(row.sales_target);
        cell.actual_sum += finite_or_zero(row.sales_actual);
    }
    for cell in cells.iter_mut().flatten() {
        cell.rate = percentage(cell.actual_sum, cell.target_sum);
    }

    CrossTab {
        buyers,
        categories,
        cells,
    }
}

/// Thresholds are taken as configured. When green < yellow the at-risk band
/// is empty and rates jump straight from under-target to on-target.
pub fn classify(rate: f64, settings: &Settings) -> Status {
    if rate >= settings.green {
        Status::OnTarget
    } else if rate >= settings.yellow {
        Status::AtRisk
    } else {
        Status::UnderTarget
    }
}

/// Sample rates shown next to the threshold inputs: one above green, one
/// just over yellow, one below yellow.
pub fn threshold_preview(settings: &Settings) -> [ThresholdSample; 3] {
    [
        settings.green + 2.0,
        settings.yellow + 1.0,
        (settings.yellow - 2.0).max(0.0),
    ]
    .map(|rate| ThresholdSample {
        rate,
        status: classify(rate, settings),
    })
}
