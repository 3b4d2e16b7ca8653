// Integration tests for fleet-wide aggregation
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vmharvest::config::Config;
use vmharvest::error::HarvestError;
use vmharvest::extract::TlsExtractor;
use vmharvest::pipeline::{run_fleet, RunContext};

const TLS_HEADER: &str = "uint16 TLS_VERSION,string TLS_ALPN,bytes TLS_JA3,string TLS_SNI";

fn write_identity(identity_dir: &Path, name: &str, labels: (&str, &str, &str), root: &Path) {
    fs::write(
        identity_dir.join(format!("{}.json", name)),
        format!(
            r#"{{"os_family":"{}","os_type":"{}","os_version":"{}","artifact_root":"{}"}}"#,
            labels.0,
            labels.1,
            labels.2,
            root.display()
        ),
    )
    .unwrap();
}

fn write_flows(root: &Path, rows: &[&str]) {
    fs::create_dir_all(root).unwrap();
    let mut content = String::from(TLS_HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(root.join("flows.csv"), content).unwrap();
}

/// Config whose hypervisor listing is a shell echo of the given lines
fn fleet_config(identity_dir: &Path, listing: &str) -> Config {
    let mut config = Config::default();
    config.identity.dir = identity_dir.to_path_buf();
    config.hypervisor.list_command = vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("printf '{}'", listing),
    ];
    config
}

#[test]
fn test_fleet_unions_machines_and_skips_unknown_names() {
    let temp_dir = TempDir::new().unwrap();
    let root_a = temp_dir.path().join("traffic_a");
    let root_b = temp_dir.path().join("traffic_b");

    // Both machines saw the same JA3; only one negotiated a version.
    write_flows(&root_a, &["771,h2,abc,example.com", "0,,abc,"]);
    write_flows(&root_b, &["0,,abc,"]);

    write_identity(temp_dir.path(), "vm_a", ("linux", "debian", "12"), &root_a);
    write_identity(temp_dir.path(), "vm_b", ("windows", "desktop", "10"), &root_b);

    let config = fleet_config(
        temp_dir.path(),
        r#""vm_a" {u-1}\n"vm_b" {u-2}\n"ghost" {u-3}\n"#,
    );
    let ctx = RunContext::new(&config);

    let output = temp_dir.path().join("merged_tls.csv");
    let summary = run_fleet(&ctx, &TlsExtractor, Some(output.clone())).unwrap();

    // ghost has no identity record and is skipped, not fatal
    assert_eq!(summary.machines, 2);
    assert_eq!(summary.rows, 3);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        "os_family,os_type,os_version,TLS_VERSION,TLS_ALPN,TLS_JA3,TLS_SNI\n\
         linux,debian,12,,,abc,\n\
         linux,debian,12,771,h2,abc,example.com\n\
         windows,desktop,10,,,abc,\n"
    );
}

#[test]
fn test_fleet_refuses_existing_destination_before_extracting() {
    let temp_dir = TempDir::new().unwrap();
    write_identity(
        temp_dir.path(),
        "vm_a",
        ("linux", "debian", "12"),
        &temp_dir.path().join("traffic_a"),
    );

    let config = fleet_config(temp_dir.path(), r#""vm_a" {u-1}\n"#);
    let ctx = RunContext::new(&config);

    let output = temp_dir.path().join("merged_tls.csv");
    fs::write(&output, "previous dataset").unwrap();

    let result = run_fleet(&ctx, &TlsExtractor, Some(output.clone()));
    assert!(matches!(result, Err(HarvestError::DestinationExists { .. })));
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous dataset");
}

#[test]
fn test_identical_labels_collapse_across_machines() {
    let temp_dir = TempDir::new().unwrap();
    let root_a = temp_dir.path().join("traffic_a");
    let root_b = temp_dir.path().join("traffic_b");

    // Two distinct machines, same OS labels, same observed flow.
    write_flows(&root_a, &["771,h2,abc,example.com"]);
    write_flows(&root_b, &["771,h2,abc,example.com"]);

    write_identity(temp_dir.path(), "vm_a", ("linux", "debian", "12"), &root_a);
    write_identity(temp_dir.path(), "vm_b", ("linux", "debian", "12"), &root_b);

    let config = fleet_config(temp_dir.path(), r#""vm_a" {u-1}\n"vm_b" {u-2}\n"#);
    let ctx = RunContext::new(&config);

    let output = temp_dir.path().join("merged_tls.csv");
    let summary = run_fleet(&ctx, &TlsExtractor, Some(output)).unwrap();

    assert_eq!(summary.machines, 2);
    assert_eq!(summary.rows, 1);
}
