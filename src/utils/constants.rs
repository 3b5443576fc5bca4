/// Table names
pub const ADDRESS_TABLE: &str = "address";
pub const CLIENT_TABLE: &str = "client";
pub const PACKAGE_CHANNEL_TABLE: &str = "package_channel";
pub const EPG_STAT_TABLE: &str = "epg_stat";

/// Default source file names
pub const ADDRESS_FILE: &str = "address.csv";
pub const CLIENT_FILE: &str = "client.csv";
pub const PACKAGE_CHANNEL_FILE: &str = "package_channel.csv";
pub const EPG_STAT_FILE: &str = "epg_stat_2024_10.csv";

/// Directory names
pub const DEFAULT_INPUT_DIR: &str = "csv";
pub const DEFAULT_CONFIG_FILE: &str = "epg-etl.toml";

/// Source format
pub const CSV_DELIMITER: u8 = b';';
pub const NA_VALUES: &[&str] = &["", "NA", "N/A", "NULL", "null", "NaN", "nan", "None", "<NA>"];

/// String length limits
pub const MAX_ADDRESS_LEN: usize = 255;
pub const MAX_ID_LEN: usize = 50;
pub const MAX_GENDER_LEN: usize = 1;
pub const MAX_LABEL_LEN: usize = 50;
pub const MAX_EPG_NAME_LEN: usize = 255;

/// Sentinels used when building features
pub const UNKNOWN_LABEL: &str = "Unknown";
pub const UNKNOWN_GENDER: &str = "U";

/// Loading defaults
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Clustering defaults
pub const DEFAULT_CLUSTERS: usize = 5;
pub const DEMO_CLUSTERS: usize = 3;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_MINI_BATCH_SIZE: usize = 1024;
pub const TOP_FEATURES: usize = 5;
pub const MEMBER_PREVIEW: usize = 10;
