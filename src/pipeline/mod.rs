//! Run orchestration
//!
//! Single-machine and fleet-wide drivers over the same per-machine body:
//! resolve identity, probe the destination, discover artifacts, extract,
//! label and aggregate, then commit one output. All run state travels in
//! explicit values; nothing is module-level or mutable across runs.

use crate::aggregate::ResultSet;
use crate::config::Config;
use crate::discovery::{self, ArtifactKind};
use crate::error::{HarvestError, Result};
use crate::extract::Extract;
use crate::hypervisor;
use crate::identity::{IdentityStore, MachineIdentity};
use crate::output::{CsvSink, WriteMode};
use std::path::PathBuf;

/// Everything a run reads, threaded explicitly through each call
pub struct RunContext<'a> {
    pub config: &'a Config,
    pub identities: IdentityStore,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            identities: IdentityStore::new(config.identity.dir.clone()),
        }
    }

    fn artifact_name(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::FlowTable => &self.config.discovery.flow_file,
            ArtifactKind::PacketCapture => &self.config.discovery.capture_file,
        }
    }
}

/// Options for a single-machine run
#[derive(Debug, Clone, Default)]
pub struct SingleRun {
    pub machine: String,
    /// Explicit destination; switches the write mode to overwrite
    pub output: Option<PathBuf>,
    /// Explicit artifacts; bypasses discovery verbatim
    pub artifacts: Option<Vec<PathBuf>>,
    /// Merge with a pre-existing destination instead of requiring a fresh one
    pub append: bool,
}

/// Counters reported when a run finishes
#[derive(Debug, Default)]
pub struct RunSummary {
    pub machines: usize,
    pub artifacts: usize,
    pub skipped_artifacts: usize,
    pub rows: usize,
    pub output: PathBuf,
}

/// Extract one protocol for one machine
pub fn run_single<E: Extract>(
    ctx: &RunContext,
    extractor: &E,
    opts: &SingleRun,
) -> Result<RunSummary> {
    let identity = ctx.identities.resolve(&opts.machine)?;

    let dest = opts
        .output
        .clone()
        .unwrap_or_else(|| identity.artifact_root.join(format!("{}.csv", E::PROTOCOL)));
    let mode = if opts.append {
        WriteMode::MergeAppend
    } else if opts.output.is_some() {
        WriteMode::Overwrite
    } else {
        WriteMode::CreateNew
    };

    let sink = CsvSink::new(dest, mode);
    sink.prepare()?;

    let mut rows = ResultSet::new();
    let mut summary = RunSummary {
        machines: 1,
        output: sink.path().to_path_buf(),
        ..Default::default()
    };
    collect_machine(ctx, extractor, &identity, opts.artifacts.as_deref(), &mut rows, &mut summary)?;

    summary.rows = sink.commit(rows)?;
    tracing::info!(
        "Finished, {} unique {} records saved to {}",
        summary.rows,
        E::PROTOCOL,
        summary.output.display()
    );
    Ok(summary)
}

/// Extract one protocol across every machine the hypervisor knows
pub fn run_fleet<E: Extract>(
    ctx: &RunContext,
    extractor: &E,
    output: Option<PathBuf>,
) -> Result<RunSummary> {
    let dest = output.unwrap_or_else(|| {
        ctx.config
            .output
            .fleet_dir
            .join(format!("merged_{}.csv", E::PROTOCOL))
    });

    // Exclusive creation, probed before any machine is touched.
    let sink = CsvSink::new(dest, WriteMode::CreateNew);
    sink.prepare()?;

    let machines = hypervisor::list_machines(&ctx.config.hypervisor.list_command)?;
    tracing::info!(
        "Aggregating {} records over {} machines",
        E::PROTOCOL,
        machines.len()
    );

    let mut rows = ResultSet::new();
    let mut summary = RunSummary {
        output: sink.path().to_path_buf(),
        ..Default::default()
    };

    for machine in &machines {
        let identity = match ctx.identities.resolve(&machine.name) {
            Ok(identity) => identity,
            Err(e @ HarvestError::IdentityNotFound { .. }) => {
                tracing::warn!("Skipping machine: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        };
        summary.machines += 1;
        collect_machine(ctx, extractor, &identity, None, &mut rows, &mut summary)?;
    }

    summary.rows = sink.commit(rows)?;
    tracing::info!(
        "Finished, {} unique {} records from {} machines saved to {}",
        summary.rows,
        E::PROTOCOL,
        summary.machines,
        summary.output.display()
    );
    Ok(summary)
}

/// Extract and label every artifact of one machine into `rows`.
///
/// An unreadable artifact is logged and skipped; any other failure aborts
/// the run.
fn collect_machine<E: Extract>(
    ctx: &RunContext,
    extractor: &E,
    identity: &MachineIdentity,
    explicit: Option<&[PathBuf]>,
    rows: &mut ResultSet<E::Record>,
    summary: &mut RunSummary,
) -> Result<()> {
    let label = identity.label();
    let artifacts: Box<dyn Iterator<Item = PathBuf>> = match explicit {
        Some(list) => Box::new(list.to_vec().into_iter()),
        None => Box::new(discovery::discover(
            &identity.artifact_root,
            ctx.artifact_name(E::KIND),
        )),
    };

    for artifact in artifacts {
        tracing::info!("processing {} ...", artifact.display());
        match extractor.extract(&artifact) {
            Ok(records) => {
                summary.artifacts += 1;
                rows.absorb(&label, records);
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!("{}", e);
                summary.skipped_artifacts += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DnsExtractor;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(identity_dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.identity.dir = identity_dir.to_path_buf();
        config
    }

    fn write_identity(dir: &std::path::Path, name: &str, artifact_root: &std::path::Path) {
        fs::write(
            dir.join(format!("{}.json", name)),
            format!(
                r#"{{"os_family":"linux","os_type":"debian","os_version":"12","artifact_root":"{}"}}"#,
                artifact_root.display()
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_missing_explicit_artifact_is_skipped_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("traffic");
        fs::create_dir_all(&root).unwrap();
        write_identity(temp_dir.path(), "vm1", &root);

        let good = root.join("flows.csv");
        fs::write(&good, "string DNS_NAME\nexample.com\n").unwrap();

        let config = test_config(temp_dir.path());
        let ctx = RunContext::new(&config);
        let opts = SingleRun {
            machine: "vm1".to_string(),
            output: Some(temp_dir.path().join("out.csv")),
            artifacts: Some(vec![good, root.join("never_recorded.csv")]),
            append: false,
        };

        let summary = run_single(&ctx, &DnsExtractor, &opts).unwrap();
        assert_eq!(summary.artifacts, 1);
        assert_eq!(summary.skipped_artifacts, 1);
        assert_eq!(summary.rows, 1);
    }

    #[test]
    fn test_default_destination_requires_fresh_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("traffic");
        fs::create_dir_all(&root).unwrap();
        write_identity(temp_dir.path(), "vm1", &root);
        fs::write(root.join("dns.csv"), "stale").unwrap();

        let config = test_config(temp_dir.path());
        let ctx = RunContext::new(&config);
        let opts = SingleRun {
            machine: "vm1".to_string(),
            ..Default::default()
        };

        let result = run_single(&ctx, &DnsExtractor, &opts);
        assert!(matches!(
            result,
            Err(HarvestError::DestinationExists { .. })
        ));
    }

    #[test]
    fn test_unknown_machine_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let ctx = RunContext::new(&config);
        let opts = SingleRun {
            machine: "ghost".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            run_single(&ctx, &DnsExtractor, &opts),
            Err(HarvestError::IdentityNotFound { .. })
        ));
    }
}
