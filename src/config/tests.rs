use super::*;
use crate::source::ColumnType;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write_test_config(dir: &TempDir, filename: &str, content: &str) {
    fs::write(dir.path().join(filename), content).unwrap();
}

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.app_name, "CounterpartyMaxAmount");
    assert_eq!(config.log_level, Some("info".to_string()));
    assert_eq!(config.input.path, PathBuf::from("data/Transaction.csv"));
    assert!(config.input.has_header);
    assert_eq!(config.execution.shuffle_partitions, 4);
    assert_eq!(config.execution.on_invalid_record, InvalidRecordPolicy::Abort);
    assert_eq!(config.output.format, FormatType::Table);
    assert_eq!(config.output.max_rows, 20);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = Config::from_toml(
        r#"
app_name = "nightly"

[input]
path = "exports/transfers.tsv"
delimiter = "\t"

[input.columns]
user_id = "sender"

[input.schema]
amount = "double"

[execution]
shuffle_partitions = 8
on_invalid_record = "skip"

[output]
format = "json-pretty"
"#,
    )
    .unwrap();

    assert_eq!(config.app_name, "nightly");
    assert_eq!(config.input.path, PathBuf::from("exports/transfers.tsv"));
    assert_eq!(config.input.delimiter, '\t');
    assert_eq!(config.input.columns.user_id, "sender");
    assert_eq!(config.input.columns.amount, "amount");
    assert_eq!(config.input.schema.amount, ColumnType::Double);
    assert_eq!(config.input.schema.user_id, ColumnType::Infer);
    assert_eq!(config.execution.shuffle_partitions, 8);
    assert_eq!(config.execution.on_invalid_record, InvalidRecordPolicy::Skip);
    assert_eq!(config.output.format, FormatType::JsonPretty);
    assert!(config.output.truncate);

    let options = config.csv_options().unwrap();
    assert_eq!(options.delimiter, b'\t');
}

#[test]
fn test_invalid_toml() {
    let err = Config::from_toml("[execution]\nshuffle_partitions = \"many\"").unwrap_err();
    assert!(matches!(err, Error::Toml(_)));
    assert_eq!(err.exit_code(), 78);
}

#[test]
fn test_merge_env_vars() {
    let mut config = Config::default();
    config
        .merge_env_with(env(&[
            ("COUNTERPARTY_MAX_INPUT", "/tmp/tx.csv"),
            ("COUNTERPARTY_MAX_LOG_LEVEL", "debug"),
            ("COUNTERPARTY_MAX_SHUFFLE_PARTITIONS", "2"),
            ("COUNTERPARTY_MAX_WORKER_THREADS", "3"),
            ("COUNTERPARTY_MAX_ON_INVALID_RECORD", "skip"),
            ("COUNTERPARTY_MAX_FORMAT", "csv"),
        ]))
        .unwrap();

    assert_eq!(config.input.path, PathBuf::from("/tmp/tx.csv"));
    assert_eq!(config.log_level, Some("debug".to_string()));
    assert_eq!(config.execution.shuffle_partitions, 2);
    assert_eq!(config.execution.worker_threads, Some(3));
    assert_eq!(config.execution.on_invalid_record, InvalidRecordPolicy::Skip);
    assert_eq!(config.output.format, FormatType::Csv);
}

#[test]
fn test_invalid_env_value() {
    let mut config = Config::default();
    let err = config
        .merge_env_with(env(&[("COUNTERPARTY_MAX_SHUFFLE_PARTITIONS", "four")]))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("invalid value for COUNTERPARTY_MAX_SHUFFLE_PARTITIONS"));
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = Config::default();
    config.execution.shuffle_partitions = 0;
    assert!(matches!(config.validate(), Err(Error::Config(_))));

    let mut config = Config::default();
    config.execution.worker_threads = Some(0);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.input.delimiter = '§';
    assert!(config.validate().is_err());
    assert!(config.csv_options().is_err());

    let mut config = Config::default();
    config.input.columns.amount = " ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.input.schema.counterparty_id = ColumnType::Double;
    assert!(config.validate().is_err());
}

#[test]
fn test_execution_settings_follow_config() {
    let mut config = Config::default();
    config.app_name = "job".to_string();
    config.execution.worker_threads = Some(2);
    config.execution.on_invalid_record = InvalidRecordPolicy::Skip;

    let settings = config.execution_settings();
    assert_eq!(settings.app_name, "job");
    assert_eq!(settings.shuffle_partitions, 4);
    assert_eq!(settings.worker_threads, Some(2));
    assert_eq!(settings.invalid_records, InvalidRecordPolicy::Skip);
}

#[tokio::test]
async fn test_load_without_config_file_uses_defaults() {
    let temp_dir = setup_test_dir();
    let loader = ConfigLoader::new(temp_dir.path());
    let config = loader.load_file(None).await.unwrap();
    assert_eq!(config, Config::default());
}

#[tokio::test]
async fn test_load_default_file_from_working_dir() {
    let temp_dir = setup_test_dir();
    write_test_config(&temp_dir, CONFIG_FILE_NAME, "app_name = \"from-file\"\n");

    let loader = ConfigLoader::new(temp_dir.path());
    let config = loader.load_file(None).await.unwrap();
    assert_eq!(config.app_name, "from-file");
}

#[tokio::test]
async fn test_load_with_explicit_path() {
    let temp_dir = setup_test_dir();
    write_test_config(&temp_dir, "custom.toml", "[output]\nmax_rows = 5\n");

    let loader = ConfigLoader::new(temp_dir.path());
    let config = loader
        .load_file(Some(Path::new("custom.toml")))
        .await
        .unwrap();
    assert_eq!(config.output.max_rows, 5);
}

#[tokio::test]
async fn test_missing_explicit_config_is_an_error() {
    let temp_dir = setup_test_dir();
    let loader = ConfigLoader::new(temp_dir.path());
    let err = loader
        .load_file(Some(Path::new("absent.toml")))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[test]
fn test_delimiter_check_is_shared() {
    let mut config = Config::default();
    config.input.delimiter = 'é';

    let from_validate = config.validate().unwrap_err().to_string();
    let from_options = config.csv_options().unwrap_err().to_string();
    assert_eq!(from_validate, from_options);
    assert!(from_validate.contains("input.delimiter must be a single ASCII character"));

    config.input.delimiter = ';';
    assert_eq!(config.csv_options().unwrap().delimiter, b';');
}
