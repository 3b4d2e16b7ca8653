// Integration tests for the single-machine extraction pipeline
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vmharvest::config::Config;
use vmharvest::extract::{DnsExtractor, HttpExtractor};
use vmharvest::pipeline::{run_single, RunContext, SingleRun};

fn write_identity(identity_dir: &Path, name: &str, artifact_root: &Path) {
    fs::write(
        identity_dir.join(format!("{}.json", name)),
        format!(
            r#"{{"os_family":"linux","os_type":"debian","os_version":"12","artifact_root":"{}"}}"#,
            artifact_root.display()
        ),
    )
    .unwrap();
}

fn test_config(identity_dir: &Path) -> Config {
    let mut config = Config::default();
    config.identity.dir = identity_dir.to_path_buf();
    config
}

/// Minimal legacy pcap file wrapping the given Ethernet frames
fn write_pcap(path: &Path, frames: &[Vec<u8>]) {
    let mut data = Vec::new();
    data.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes()); // magic
    data.extend_from_slice(&2u16.to_le_bytes()); // version major
    data.extend_from_slice(&4u16.to_le_bytes()); // version minor
    data.extend_from_slice(&0i32.to_le_bytes()); // thiszone
    data.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
    data.extend_from_slice(&65535u32.to_le_bytes()); // snaplen
    data.extend_from_slice(&1u32.to_le_bytes()); // linktype ethernet

    for (i, frame) in frames.iter().enumerate() {
        data.extend_from_slice(&(i as u32).to_le_bytes()); // ts_sec
        data.extend_from_slice(&0u32.to_le_bytes()); // ts_usec
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        data.extend_from_slice(frame);
    }

    fs::write(path, data).unwrap();
}

/// Ethernet/IPv4/TCP frame around an HTTP payload
fn http_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[0u8; 12]);
    frame.extend_from_slice(&0x0800u16.to_be_bytes());

    let total_len = (40 + payload.len()) as u16;
    frame.push(0x45);
    frame.push(0);
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0, 0]);
    frame.push(64);
    frame.push(6);
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(&[10, 0, 0, 1]);
    frame.extend_from_slice(&[93, 184, 216, 34]);

    frame.extend_from_slice(&49152u16.to_be_bytes());
    frame.extend_from_slice(&80u16.to_be_bytes());
    frame.extend_from_slice(&[0u8; 8]);
    frame.push(5 << 4);
    frame.push(0x18);
    frame.extend_from_slice(&[0u8; 6]);

    frame.extend_from_slice(payload);
    frame
}

#[test]
fn test_dns_rows_seen_in_two_tables_collapse_to_one() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("traffic");
    let session_a = root.join("2024-01-01__boot__1");
    let session_b = root.join("2024-01-02__update__2");
    fs::create_dir_all(&session_a).unwrap();
    fs::create_dir_all(&session_b).unwrap();

    fs::write(
        session_a.join("flows.csv"),
        "string DNS_NAME,uint64 BYTES\nexample.com,100\ndebian.org,50\n",
    )
    .unwrap();
    fs::write(
        session_b.join("flows.csv"),
        "string DNS_NAME,uint64 BYTES\nexample.com,80\n",
    )
    .unwrap();

    write_identity(temp_dir.path(), "debian12", &root);
    let config = test_config(temp_dir.path());
    let ctx = RunContext::new(&config);

    let output = temp_dir.path().join("dns.csv");
    let opts = SingleRun {
        machine: "debian12".to_string(),
        output: Some(output.clone()),
        ..Default::default()
    };
    let summary = run_single(&ctx, &DnsExtractor, &opts).unwrap();

    assert_eq!(summary.artifacts, 2);
    assert_eq!(summary.rows, 2);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        "os_family,os_type,os_version,DNS_NAME\n\
         linux,debian,12,debian.org\n\
         linux,debian,12,example.com\n"
    );
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("traffic");
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join("flows.csv"),
        "string DNS_NAME\nexample.com\nexample.org\n",
    )
    .unwrap();

    write_identity(temp_dir.path(), "debian12", &root);
    let config = test_config(temp_dir.path());
    let ctx = RunContext::new(&config);

    let output = temp_dir.path().join("dns.csv");
    let opts = SingleRun {
        machine: "debian12".to_string(),
        output: Some(output.clone()),
        ..Default::default()
    };

    run_single(&ctx, &DnsExtractor, &opts).unwrap();
    let first = fs::read(&output).unwrap();

    run_single(&ctx, &DnsExtractor, &opts).unwrap();
    let second = fs::read(&output).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_http_extraction_and_merge_append() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("traffic");
    fs::create_dir_all(&root).unwrap();

    write_pcap(
        &root.join("traffic.pcap"),
        &[
            http_frame(
                b"GET /a HTTP/1.1\r\nHost: example.com\r\nUser-Agent: curl/8.0\r\n\r\n",
            ),
            // Same request seen again in the capture
            http_frame(
                b"GET /a HTTP/1.1\r\nHost: example.com\r\nUser-Agent: curl/8.0\r\n\r\n",
            ),
            // Missing Host, must be dropped
            http_frame(b"GET /b HTTP/1.1\r\nUser-Agent: curl/8.0\r\n\r\n"),
            // Not an HTTP request
            http_frame(b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n"),
        ],
    );

    write_identity(temp_dir.path(), "debian12", &root);
    let config = test_config(temp_dir.path());
    let ctx = RunContext::new(&config);

    let output = temp_dir.path().join("http.csv");
    let opts = SingleRun {
        machine: "debian12".to_string(),
        output: Some(output.clone()),
        append: true,
        ..Default::default()
    };

    let summary = run_single(&ctx, &HttpExtractor, &opts).unwrap();
    assert_eq!(summary.rows, 1);

    // A later capture re-observes the old request and adds a new one;
    // merging keeps the union.
    write_pcap(
        &root.join("traffic.pcap"),
        &[
            http_frame(
                b"GET /a HTTP/1.1\r\nHost: example.com\r\nUser-Agent: curl/8.0\r\n\r\n",
            ),
            http_frame(
                b"GET /b HTTP/1.1\r\nHost: example.org\r\nUser-Agent: wget/1.21\r\n\r\n",
            ),
        ],
    );

    let summary = run_single(&ctx, &HttpExtractor, &opts).unwrap();
    assert_eq!(summary.rows, 2);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        "os_family,os_type,os_version,user-agent,host,uri\n\
         linux,debian,12,curl/8.0,example.com,/a\n\
         linux,debian,12,wget/1.21,example.org,/b\n"
    );
}

#[test]
fn test_unreadable_artifact_does_not_abort_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("traffic");
    fs::create_dir_all(&root).unwrap();

    // One decodable capture, one file that is not a pcap at all.
    write_pcap(
        &root.join("traffic.pcap"),
        &[http_frame(
            b"GET / HTTP/1.1\r\nHost: example.com\r\nUser-Agent: curl/8.0\r\n\r\n",
        )],
    );
    let bogus = root.join("bogus.pcap");
    fs::write(&bogus, "this is not a capture").unwrap();

    write_identity(temp_dir.path(), "debian12", &root);
    let config = test_config(temp_dir.path());
    let ctx = RunContext::new(&config);

    let opts = SingleRun {
        machine: "debian12".to_string(),
        output: Some(temp_dir.path().join("http.csv")),
        artifacts: Some(vec![root.join("traffic.pcap"), bogus]),
        ..Default::default()
    };

    let summary = run_single(&ctx, &HttpExtractor, &opts).unwrap();
    assert_eq!(summary.artifacts, 1);
    assert_eq!(summary.skipped_artifacts, 1);
    assert_eq!(summary.rows, 1);
}
