pub mod clean_report;
pub mod cleaner;
pub mod cluster_report;
pub mod clusterer;
pub mod feature_builder;
pub mod segmentation;

pub use clean_report::{CleanReport, DropReason};
pub use cleaner::{Cleaner, ParentKeys};
pub use cluster_report::{ClusterReport, ClusterSummary, FeatureMean};
pub use clusterer::{KMeans, MiniBatchKMeans, Partition, Partitioner};
pub use feature_builder::{FeatureBuilder, FeatureMatrix, StandardScaler};
pub use segmentation::{segment_subscribers, DemoDataset, Segmentation};
