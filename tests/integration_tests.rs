use async_trait::async_trait;
use epg_etl::config::PipelineConfig;
use epg_etl::database::{KeySource, Sink};
use epg_etl::error::{ProcessingError, Result};
use epg_etl::models::{CleanedTable, KeySet, TableKind, Value, ViewingRecord};
use epg_etl::pipeline::{check_sources, EtlPipeline, TableStatus};
use epg_etl::processors::{segment_subscribers, Cleaner, KMeans, ParentKeys};
use epg_etl::readers::CsvTableReader;
use epg_etl::writers::CsvTableWriter;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Store that keeps committed rows in memory and honours key conflicts.
#[derive(Default)]
struct MemoryStore {
    tables: HashMap<TableKind, Vec<Vec<Value>>>,
    fail_on: Option<TableKind>,
    load_calls: Vec<TableKind>,
}

impl MemoryStore {
    fn failing_on(table: TableKind) -> Self {
        Self {
            fail_on: Some(table),
            ..Default::default()
        }
    }

    fn rows(&self, table: TableKind) -> &[Vec<Value>] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn column(&self, table: TableKind, column: &str) -> Vec<Value> {
        let idx = table.schema().position(column).unwrap();
        self.rows(table).iter().map(|r| r[idx].clone()).collect()
    }
}

#[async_trait]
impl KeySource for MemoryStore {
    async fn existing_values(&self, table: TableKind, column: &str) -> Result<KeySet> {
        let schema = table.schema();
        if schema.position(column).is_none() {
            return Err(ProcessingError::UnknownColumn {
                table: schema.name,
                column: column.to_string(),
            });
        }
        Ok(self.column(table, column).into_iter().collect())
    }
}

#[async_trait]
impl Sink for MemoryStore {
    async fn load(&mut self, table: &CleanedTable) -> Result<u64> {
        let kind = TableKind::from_table_name(table.table_name())?;
        self.load_calls.push(kind);
        if self.fail_on == Some(kind) {
            return Err(ProcessingError::InvalidFormat(format!(
                "insert into {} rejected",
                kind
            )));
        }

        let key_positions = table.schema.key_positions();
        let stored = self.tables.entry(kind).or_default();
        let mut keys: HashSet<Vec<Value>> = stored
            .iter()
            .map(|r| key_positions.iter().map(|&i| r[i].clone()).collect())
            .collect();

        let mut inserted = 0;
        for row in &table.rows {
            let key: Vec<Value> = key_positions.iter().map(|&i| row[i].clone()).collect();
            if keys.insert(key) {
                stored.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

const ADDRESS_CSV: &str = "\
ADDRESS;Flats;Entrances;Floors
Main St 1;120;4;9
Main St 2;abc;2;5
Main St 2;10;1;1
;5;5;5
";

const CLIENT_CSV: &str = "\
Client_ID;Address;Gender;Age_Range
C1;Main St 1;M;25-34
C2;Main St 2;;35-44
C3;Nowhere 9;F;18-24
C1;Main St 2;F;45-54
";

const PACKAGE_CHANNEL_CSV: &str = "\
pack_name;ch_id
Basic;1
Sport;2
Sport;x
;3
";

const EPG_STAT_CSV: &str = "\
client_id;device_id;time_ch;ch_id;epg_name;time_epg;time_to_epg;duration;category;subcategory
C1;D1;2024-10-01 08:00:00;1;Morning News;2024-10-01 08:00:00;2024-10-01 09:00:00;3600;News;Daily
C1;D1;2024-10-01 09:00:00;2;Match;2024-10-01 09:00:00;2024-10-01 11:00:00;7200;Sport;Football
C2;D7;2024-10-01 10:00:00;3;Cartoons;2024-10-01 10:00:00;2024-10-01 10:30:00;1800;Kids;Cartoons
C3;D9;2024-10-01 10:00:00;1;Morning News;2024-10-01 10:00:00;2024-10-01 10:10:00;600;News;Daily
C2;D7;2024-10-01 11:00:00;99;Unknown Show;2024-10-01 11:00:00;2024-10-01 11:10:00;600;News;Daily
C1;D1;2024-10-01 08:00:00;1;Repeat;2024-10-01 08:00:00;2024-10-01 08:05:00;100;News;Daily
C2;D7;2024-10-01 12:00:00;1;Glitch;2024-10-01 12:00:00;2024-10-01 12:00:00;-5;News;Daily
C2;D7;not a date;1;Broken;2024-10-01 12:00:00;2024-10-01 12:10:00;600;News;Daily
";

fn write_exports(dir: &Path) {
    fs::write(dir.join("address.csv"), ADDRESS_CSV).unwrap();
    fs::write(dir.join("client.csv"), CLIENT_CSV).unwrap();
    fs::write(dir.join("package_channel.csv"), PACKAGE_CHANNEL_CSV).unwrap();
    fs::write(dir.join("epg_stat_2024_10.csv"), EPG_STAT_CSV).unwrap();
}

fn exports() -> (TempDir, PipelineConfig) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_exports(temp_dir.path());
    let config = PipelineConfig::default().with_input_dir(temp_dir.path());
    (temp_dir, config)
}

fn inserted(status: &TableStatus) -> u64 {
    match status {
        TableStatus::Loaded { inserted } => *inserted,
        other => panic!("expected a loaded table, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_keeps_foreign_keys_closed() {
    let (_dir, config) = exports();
    let mut pipeline = EtlPipeline::new(MemoryStore::default(), config);

    let summary = pipeline.run().await;
    assert!(summary.all_succeeded(), "{}", summary.generate_summary());

    let store = pipeline.into_store();
    assert_eq!(store.rows(TableKind::Address).len(), 2);
    assert_eq!(store.rows(TableKind::Client).len(), 2);
    assert_eq!(store.rows(TableKind::PackageChannel).len(), 3);
    assert_eq!(store.rows(TableKind::EpgStat).len(), 3);

    let addresses: HashSet<Value> = store.column(TableKind::Address, "address").into_iter().collect();
    for address in store.column(TableKind::Client, "address") {
        assert!(addresses.contains(&address));
    }

    let clients: HashSet<Value> = store.column(TableKind::Client, "client_id").into_iter().collect();
    let channels: HashSet<Value> = store.column(TableKind::PackageChannel, "ch_id").into_iter().collect();
    for row in store.rows(TableKind::EpgStat) {
        assert!(clients.contains(&row[0]));
        assert!(channels.contains(&row[3]));
        assert!(row[7].as_integer().unwrap() >= 0);
    }

    let epg = summary.outcome(TableKind::EpgStat).unwrap();
    let report = epg.report.as_ref().unwrap();
    assert_eq!(report.input_rows, 8);
    assert_eq!(report.output_rows, 3);
    assert_eq!(report.foreign_key_drops(), 2);
    assert_eq!(inserted(&epg.status), 3);
}

#[tokio::test]
async fn test_cleaned_defaults_reach_the_store() {
    let (_dir, config) = exports();
    let mut pipeline = EtlPipeline::new(MemoryStore::default(), config);
    pipeline.run().await;
    let store = pipeline.into_store();

    let main_st_2 = store
        .rows(TableKind::Address)
        .iter()
        .find(|r| r[0] == Value::from("Main St 2"))
        .unwrap()
        .clone();
    assert_eq!(main_st_2, vec![Value::from("Main St 2"), Value::from(0), Value::from(2), Value::from(5)]);

    let c2 = store
        .rows(TableKind::Client)
        .iter()
        .find(|r| r[0] == Value::from("C2"))
        .unwrap()
        .clone();
    assert_eq!(c2[2], Value::from("U"));
}

#[tokio::test]
async fn test_second_run_inserts_nothing() {
    let (_dir, config) = exports();
    let mut pipeline = EtlPipeline::new(MemoryStore::default(), config.clone());
    pipeline.run().await;
    let store = pipeline.into_store();
    let before: Vec<usize> = TableKind::LOAD_ORDER.iter().map(|t| store.rows(*t).len()).collect();

    let mut pipeline = EtlPipeline::new(store, config);
    let summary = pipeline.run().await;
    let store = pipeline.into_store();

    assert_eq!(summary.total_inserted(), 0);
    let after: Vec<usize> = TableKind::LOAD_ORDER.iter().map(|t| store.rows(*t).len()).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_failed_parent_does_not_stop_the_run() {
    let (_dir, config) = exports();
    let mut pipeline = EtlPipeline::new(MemoryStore::failing_on(TableKind::Client), config);

    let summary = pipeline.run().await;
    let store = pipeline.into_store();

    assert_eq!(summary.failed_tables(), vec![TableKind::Client]);
    // epg_stat is empty once its client check runs, so it never reaches the store
    assert_eq!(
        store.load_calls,
        vec![TableKind::Address, TableKind::Client, TableKind::PackageChannel]
    );
    assert_eq!(store.rows(TableKind::PackageChannel).len(), 3);

    // no client committed, so every viewing row fails its client check
    let epg = summary.outcome(TableKind::EpgStat).unwrap();
    assert_eq!(inserted(&epg.status), 0);
    assert!(store.rows(TableKind::EpgStat).is_empty());

    let client = summary.outcome(TableKind::Client).unwrap();
    assert!(client.report.is_some());
    assert!(summary.generate_summary().contains("Failed tables: client"));
}

#[tokio::test]
async fn test_missing_source_file_fails_only_that_table() {
    let (dir, config) = exports();
    fs::remove_file(dir.path().join("package_channel.csv")).unwrap();

    let mut pipeline = EtlPipeline::new(MemoryStore::default(), config);
    let summary = pipeline.run().await;
    let store = pipeline.into_store();

    assert_eq!(summary.failed_tables(), vec![TableKind::PackageChannel]);
    assert!(summary.outcome(TableKind::PackageChannel).unwrap().report.is_none());
    assert_eq!(store.rows(TableKind::Client).len(), 2);
    assert!(store.rows(TableKind::EpgStat).is_empty());
}

#[tokio::test]
async fn test_header_only_file_loads_nothing() {
    let (dir, config) = exports();
    fs::write(dir.path().join("address.csv"), "address;flats;entrances;floors\n").unwrap();

    let mut pipeline = EtlPipeline::new(MemoryStore::default(), config);
    let summary = pipeline.run().await;
    let store = pipeline.into_store();

    let address = summary.outcome(TableKind::Address).unwrap();
    assert_eq!(address.status, TableStatus::Loaded { inserted: 0 });
    assert_eq!(address.report.as_ref().unwrap().input_rows, 0);
    assert!(!summary.failed_tables().contains(&TableKind::Address));
    assert!(!store.load_calls.contains(&TableKind::Address));
    assert!(store.load_calls.contains(&TableKind::PackageChannel));
}

#[tokio::test]
async fn test_missing_column_fails_the_table() {
    let (dir, config) = exports();
    fs::write(dir.path().join("client.csv"), "client_id;gender\nC1;M\n").unwrap();

    let mut pipeline = EtlPipeline::new(MemoryStore::default(), config);
    let summary = pipeline.run().await;

    match &summary.outcome(TableKind::Client).unwrap().status {
        TableStatus::Failed { error } => assert!(error.contains("address")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_offline_check_matches_store_load() {
    let (_dir, config) = exports();
    let check = check_sources(&config, &CsvTableReader::new());

    assert!(check.summary.all_succeeded());
    let lengths: Vec<usize> = check.tables.iter().map(CleanedTable::len).collect();
    assert_eq!(lengths, vec![2, 2, 3, 3]);
}

#[test]
fn test_cleaning_is_idempotent() {
    let (_dir, config) = exports();
    let check = check_sources(&config, &CsvTableReader::new());

    let out_dir = TempDir::new().unwrap();
    let writer = CsvTableWriter::new();
    let reader = CsvTableReader::new();

    let mut parents = ParentKeys::new();
    for table in &check.tables {
        for fk in table.schema.foreign_keys {
            let parent = check
                .tables
                .iter()
                .find(|t| t.table_name() == fk.parent_table)
                .unwrap();
            parents.insert(fk.parent_table, fk.parent_column, parent.column_values(fk.parent_column));
        }

        let path = writer.write_into_dir(table, out_dir.path()).unwrap();
        let raw = reader.read_table(&path).unwrap();
        let kind = TableKind::from_table_name(table.table_name()).unwrap();
        let again = Cleaner::new(kind).clean(&raw, &parents).unwrap();

        assert_eq!(again.rows, table.rows);
        assert_eq!(again.report.total_dropped(), 0);
    }
}

#[tokio::test]
async fn test_segment_loaded_subscribers() {
    let (_dir, config) = exports();
    let mut pipeline = EtlPipeline::new(MemoryStore::default(), config);
    pipeline.run().await;
    let store = pipeline.into_store();

    // client LEFT JOIN epg_stat, one record per viewing row
    let mut records = Vec::new();
    for client in store.rows(TableKind::Client) {
        let sessions: Vec<&Vec<Value>> = store
            .rows(TableKind::EpgStat)
            .iter()
            .filter(|r| r[0] == client[0])
            .collect();
        let id = client[0].as_text().unwrap();
        let gender = client[2].as_text();
        let age = client[3].as_text();
        if sessions.is_empty() {
            records.push(ViewingRecord::new(id, gender, age, None, None, None));
        }
        for s in sessions {
            records.push(ViewingRecord::new(
                id,
                gender,
                age,
                s[8].as_text(),
                s[9].as_text(),
                s[7].as_integer().map(i64::from),
            ));
        }
    }

    let segmentation = segment_subscribers(&records, &KMeans::new(2)).unwrap();
    assert_eq!(segmentation.features.client_ids, vec!["C1", "C2"]);
    assert_eq!(segmentation.report.subscribers, 2);
    assert_ne!(segmentation.partition.labels[0], segmentation.partition.labels[1]);
}
