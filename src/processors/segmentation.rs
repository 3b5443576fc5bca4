use crate::error::Result;
use crate::models::ViewingRecord;
use crate::processors::{
    ClusterReport, FeatureBuilder, FeatureMatrix, KMeans, Partition, Partitioner,
};
use crate::utils::constants::DEMO_CLUSTERS;
use tracing::info;

/// Output of one segmentation run.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub features: FeatureMatrix,
    pub partition: Partition,
    pub report: ClusterReport,
}

/// Build features from viewing aggregates and partition the subscribers.
///
/// The scaler is fitted on this batch only, so labels are comparable within a
/// run but not across runs on different snapshots.
pub fn segment_subscribers(
    records: &[ViewingRecord],
    partitioner: &dyn Partitioner,
) -> Result<Segmentation> {
    let features = FeatureBuilder::new().build(records);
    let partition = partitioner.fit(&features.scaled)?;
    let report = ClusterReport::build(&features, &partition);

    info!(
        "Partitioned {} subscribers into {} clusters (inertia {:.3})",
        features.len(),
        partitioner.k(),
        partition.inertia
    );

    Ok(Segmentation {
        features,
        partition,
        report,
    })
}

/// Static sample of three subscribers used to demonstrate the clustering.
pub struct DemoDataset {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<f64>>,
}

impl DemoDataset {
    pub fn sample() -> Self {
        Self {
            // tariff: 0 = economy, 1 = standard, 2 = premium
            columns: vec![
                "tariff",
                "watch_hours",
                "channels",
                "sport_pct",
                "news_pct",
                "movies_pct",
                "series_pct",
            ],
            rows: vec![
                vec![0.0, 10.0, 5.0, 10.0, 50.0, 30.0, 10.0],
                vec![1.0, 20.0, 12.0, 30.0, 20.0, 40.0, 10.0],
                vec![2.0, 15.0, 10.0, 5.0, 15.0, 60.0, 20.0],
            ],
        }
    }

    /// Cluster the raw rows with the demo cluster count.
    pub fn cluster(&self, seed: u64) -> Result<Vec<usize>> {
        let partition = KMeans::new(DEMO_CLUSTERS).with_seed(seed).fit(&self.rows)?;
        Ok(partition.labels)
    }

    pub fn render(&self, labels: &[usize]) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\tcluster\n", self.columns.join("\t")));
        for (row, label) in self.rows.iter().zip(labels) {
            let cells: Vec<String> = row.iter().map(|v| format!("{}", v)).collect();
            out.push_str(&format!("{}\t{}\n", cells.join("\t"), label));
        }
        out
    }
}
