use crate::processors::{FeatureMatrix, Partition};
use crate::utils::constants::{MEMBER_PREVIEW, TOP_FEATURES};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMean {
    pub feature: String,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub label: usize,
    pub size: usize,
    pub top_features: Vec<FeatureMean>,
    pub preview: Vec<String>,
}

/// Per-cluster sizes, dominant features and a member preview.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub subscribers: usize,
    pub inertia: f64,
    pub clusters: Vec<ClusterSummary>,
}

impl ClusterReport {
    /// Summarize a partition of `features.scaled`; feature means are taken
    /// over the unscaled values so they read as viewing time.
    pub fn build(features: &FeatureMatrix, partition: &Partition) -> Self {
        let sizes = partition.cluster_sizes();
        let clusters = (0..partition.k())
            .map(|label| {
                let members: Vec<usize> = partition
                    .labels
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| **l == label)
                    .map(|(i, _)| i)
                    .collect();

                ClusterSummary {
                    label,
                    size: sizes[label],
                    top_features: top_features(features, &members),
                    preview: members
                        .iter()
                        .take(MEMBER_PREVIEW)
                        .map(|&i| features.client_ids[i].clone())
                        .collect(),
                }
            })
            .collect();

        Self {
            subscribers: partition.labels.len(),
            inertia: partition.inertia,
            clusters,
        }
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Viewer Segmentation Report ===\n");
        summary.push_str(&format!("Subscribers: {}\n", self.subscribers));
        summary.push_str(&format!("Clusters: {}\n", self.clusters.len()));
        summary.push_str(&format!("Inertia: {:.3}\n", self.inertia));

        for cluster in &self.clusters {
            summary.push_str(&format!(
                "\nCluster {} ({} subscribers)\n",
                cluster.label, cluster.size
            ));
            if !cluster.top_features.is_empty() {
                summary.push_str("  Top features:\n");
                for (i, f) in cluster.top_features.iter().enumerate() {
                    summary.push_str(&format!("    {}. {} = {:.2}\n", i + 1, f.feature, f.mean));
                }
            }
            if !cluster.preview.is_empty() {
                summary.push_str(&format!("  Members: {}", cluster.preview.join(", ")));
                if cluster.size > cluster.preview.len() {
                    summary.push_str(&format!(" (+{} more)", cluster.size - cluster.preview.len()));
                }
                summary.push('\n');
            }
        }

        summary
    }
}

fn top_features(features: &FeatureMatrix, members: &[usize]) -> Vec<FeatureMean> {
    if members.is_empty() {
        return Vec::new();
    }

    let n = members.len() as f64;
    let mut means: Vec<FeatureMean> = features
        .columns
        .iter()
        .enumerate()
        .map(|(j, name)| FeatureMean {
            feature: name.clone(),
            mean: members.iter().map(|&i| features.raw[i][j]).sum::<f64>() / n,
        })
        .collect();

    means.sort_by(|a, b| {
        b.mean
            .partial_cmp(&a.mean)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    means.truncate(TOP_FEATURES);
    means
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> FeatureMatrix {
        let columns: Vec<String> = ["a", "b", "c", "d", "e", "f"].iter().map(|s| s.to_string()).collect();
        let raw = vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![3.0, 2.0, 1.0, 0.0, 0.0, 0.0],
            vec![5.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        ];
        FeatureMatrix {
            client_ids: vec!["c1".into(), "c2".into(), "c3".into()],
            columns,
            category_columns: 6,
            scaled: raw.clone(),
            raw,
        }
    }

    fn partition() -> Partition {
        Partition {
            labels: vec![0, 1, 1],
            centroids: vec![vec![0.0; 6], vec![0.0; 6], vec![0.0; 6]],
            inertia: 1.5,
            iterations: 1,
        }
    }

    #[test]
    fn test_report_groups_members() {
        let report = ClusterReport::build(&matrix(), &partition());

        assert_eq!(report.subscribers, 3);
        assert_eq!(report.clusters.len(), 3);
        assert_eq!(report.clusters[0].size, 1);
        assert_eq!(report.clusters[1].preview, vec!["c2", "c3"]);
        assert_eq!(report.clusters[2].size, 0);
        assert!(report.clusters[2].top_features.is_empty());
    }

    #[test]
    fn test_top_features_ranked_by_mean() {
        let report = ClusterReport::build(&matrix(), &partition());

        let top: Vec<&str> = report.clusters[0]
            .top_features
            .iter()
            .map(|f| f.feature.as_str())
            .collect();
        assert_eq!(top, vec!["f", "e", "d", "c", "b"]);

        let second = &report.clusters[1].top_features;
        assert_eq!(second[0], FeatureMean { feature: "a".into(), mean: 4.0 });
        assert_eq!(second[1].feature, "b");
    }

    #[test]
    fn test_summary_text() {
        let summary = ClusterReport::build(&matrix(), &partition()).generate_summary();
        assert!(summary.contains("Cluster 1 (2 subscribers)"));
        assert!(summary.contains("Members: c2, c3"));
    }
}
