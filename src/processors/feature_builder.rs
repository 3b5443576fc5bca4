use crate::models::ViewingRecord;
use crate::utils::constants::{UNKNOWN_GENDER, UNKNOWN_LABEL};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};
use validator::Validate;

/// Per-subscriber feature vectors.
///
/// Columns are ordered category pivots first (`category_columns` of them),
/// then one-hot gender and age range indicators. `raw` keeps the unscaled
/// values, `scaled` the standardized ones fed to the clusterer.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    pub client_ids: Vec<String>,
    pub columns: Vec<String>,
    pub category_columns: usize,
    pub raw: Vec<Vec<f64>>,
    pub scaled: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.client_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.client_ids.is_empty()
    }
}

/// Zero-mean, unit-variance scaling fitted on the batch it transforms.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
}

impl StandardScaler {
    /// Population statistics per column. A constant column gets a unit
    /// deviation so it scales to zeros instead of NaN.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;

        let means: Vec<f64> = (0..width)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();

        let std_devs = (0..width)
            .map(|j| {
                let var = rows.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { means, std_devs }
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| (v - self.means[j]) / self.std_devs[j])
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Subscriber {
    gender: String,
    age_range: String,
    durations: HashMap<String, f64>,
}

/// Pivots viewing aggregates into one feature row per subscriber.
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn category_key(category: Option<&str>, subcategory: Option<&str>) -> String {
        format!(
            "{}_{}",
            label_or_unknown(category, UNKNOWN_LABEL),
            label_or_unknown(subcategory, UNKNOWN_LABEL)
        )
    }

    pub fn build(&self, records: &[ViewingRecord]) -> FeatureMatrix {
        let mut order: Vec<String> = Vec::new();
        let mut subscribers: HashMap<String, Subscriber> = HashMap::new();
        let mut categories = BTreeSet::new();
        let mut skipped = 0usize;

        for record in records {
            if let Err(e) = record.validate() {
                debug!("Skipping viewing record for '{}': {}", record.client_id, e);
                skipped += 1;
                continue;
            }

            let subscriber = subscribers
                .entry(record.client_id.clone())
                .or_insert_with(|| {
                    order.push(record.client_id.clone());
                    Subscriber {
                        gender: label_or_unknown(record.gender.as_deref(), UNKNOWN_GENDER),
                        age_range: label_or_unknown(record.age_range.as_deref(), UNKNOWN_LABEL),
                        durations: HashMap::new(),
                    }
                });

            if let Some(duration) = record.total_duration {
                let key =
                    Self::category_key(record.category.as_deref(), record.subcategory.as_deref());
                *subscriber.durations.entry(key.clone()).or_insert(0.0) += duration as f64;
                categories.insert(key);
            }
        }

        if skipped > 0 {
            warn!("Skipped {} invalid viewing records", skipped);
        }

        let genders: BTreeSet<&str> = subscribers.values().map(|s| s.gender.as_str()).collect();
        let age_ranges: BTreeSet<&str> =
            subscribers.values().map(|s| s.age_range.as_str()).collect();

        let mut columns: Vec<String> = categories.iter().cloned().collect();
        let category_columns = columns.len();
        columns.extend(genders.iter().map(|g| format!("gender_{}", g)));
        columns.extend(age_ranges.iter().map(|a| format!("age_range_{}", a)));

        let raw: Vec<Vec<f64>> = order
            .iter()
            .map(|client_id| {
                let s = &subscribers[client_id];
                let mut row: Vec<f64> = categories
                    .iter()
                    .map(|c| s.durations.get(c).copied().unwrap_or(0.0))
                    .collect();
                row.extend(genders.iter().map(|g| one_hot(*g == s.gender)));
                row.extend(age_ranges.iter().map(|a| one_hot(*a == s.age_range)));
                row
            })
            .collect();

        let scaled = StandardScaler::fit(&raw).transform(&raw);

        info!(
            "Built {} feature rows with {} columns ({} viewing categories)",
            order.len(),
            columns.len(),
            category_columns
        );

        FeatureMatrix {
            client_ids: order,
            columns,
            category_columns,
            raw,
            scaled,
        }
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn label_or_unknown(value: Option<&str>, unknown: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => unknown.to_string(),
    }
}

fn one_hot(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}
