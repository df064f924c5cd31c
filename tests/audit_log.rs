use doc_sync_core::audit::AuditLog;
use doc_sync_core::config::AuditConfig;
use doc_sync_core::contract::AuditSink;
use std::fs;
use tempfile::tempdir;

fn rotated_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != "history.log")
        .collect();
    names.sort();
    names
}

#[test]
fn test_append_creates_directory_and_timestamps_lines() {
    let root = tempdir().unwrap();
    let log = AuditLog::new(root.path().join("nested").join("logs"), 1024);

    log.append("Commit abc processed -> wiki").expect("append should succeed");
    log.append("ERROR processing commit def: fetch: boom").unwrap();

    let content = fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert!(line.starts_with('['), "{line}");
        let (stamp, _) = line[1..].split_once("] ").expect("timestamp prefix");
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "bad stamp {stamp}");
        assert!(stamp.ends_with('Z'));
    }
    assert!(lines[0].ends_with("] Commit abc processed -> wiki"));
    assert!(lines[1].ends_with("] ERROR processing commit def: fetch: boom"));
}

#[test]
fn test_rotation_once_threshold_reached() {
    let root = tempdir().unwrap();
    let log = AuditLog::new(root.path(), 16);

    log.append("first entry is long enough").unwrap();
    assert!(rotated_files(root.path()).is_empty(), "No rotation before the file exists");

    log.append("second entry").unwrap();

    let rotated = rotated_files(root.path());
    assert_eq!(rotated.len(), 1, "{rotated:?}");
    let name = &rotated[0];
    assert!(name.starts_with("history-") && name.ends_with(".log"), "{name}");
    assert!(!name.contains(':'), "Rotated names must be filesystem-safe: {name}");

    let old = fs::read_to_string(root.path().join(name)).unwrap();
    assert!(old.contains("first entry"));
    let current = fs::read_to_string(log.path()).unwrap();
    assert_eq!(current.lines().count(), 1);
    assert!(current.contains("second entry"));
}

#[test]
fn test_below_threshold_keeps_single_file() {
    let root = tempdir().unwrap();
    let log = AuditLog::from_config(&AuditConfig {
        dir: root.path().to_path_buf(),
        ..Default::default()
    });

    for i in 0..50 {
        log.append(&format!("Commit {i} processed -> wiki")).unwrap();
    }

    assert!(rotated_files(root.path()).is_empty());
    assert_eq!(fs::read_to_string(log.path()).unwrap().lines().count(), 50);
}

#[test]
fn test_rapid_rotations_keep_every_entry() {
    let root = tempdir().unwrap();
    let log = AuditLog::new(root.path(), 1);

    for i in 0..20 {
        log.append(&format!("entry-{i}")).unwrap();
    }

    let mut entries: Vec<String> = Vec::new();
    for file in fs::read_dir(root.path()).unwrap() {
        let content = fs::read_to_string(file.unwrap().path()).unwrap();
        entries.extend(
            content
                .lines()
                .filter_map(|line| line.split_once("] ").map(|(_, msg)| msg.to_string())),
        );
    }
    entries.sort_by_key(|e| e["entry-".len()..].parse::<u32>().unwrap());

    let expected: Vec<String> = (0..20).map(|i| format!("entry-{i}")).collect();
    assert_eq!(entries, expected, "Rotation must not overwrite earlier segments");
    assert_eq!(rotated_files(root.path()).len(), 19);
}
