use bloom_logger::{LevelFilter, Logger, Rotation};
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn json_file_logging_writes_records() {
    let tmp_dir = tempdir().expect("temp dir");
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("integration-file")
        .console(false)
        .path(&log_dir)
        .rotation(Rotation::NEVER)
        .json()
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    assert!(logger.guard().is_some(), "file logging should hold a worker guard");

    tracing::info!(salon = "salon:demo", "booking feed attached");
    std::thread::sleep(Duration::from_millis(50));
    drop(logger);

    let contents = std::fs::read_dir(&log_dir)
        .expect("read log dir")
        .flatten()
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("log"))
        .map(|entry| std::fs::read_to_string(entry.path()).unwrap_or_default())
        .collect::<String>();

    assert!(contents.contains("booking feed attached"), "log line should reach the file");
}
