use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::parameters::ensure_parent_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// Accumulated iteration counts of one kind of linear solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStatistics {
    pub solves: usize,
    pub total_iterations: usize,
    pub max_iterations: usize,
}

impl SolveStatistics {
    pub fn record(&mut self, iterations: usize) {
        self.solves += 1;
        self.total_iterations += iterations;
        self.max_iterations = self.max_iterations.max(iterations);
    }

    pub fn average_iterations(&self) -> f64 {
        if self.solves == 0 {
            0.0
        } else {
            self.total_iterations as f64 / self.solves as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub case_name: String,
    pub fluid_scheme: String,
    pub scalar_scheme: String,
    pub status: RunStatus,
    pub message: String,
    /// RFC 3339 creation time
    pub created_at: String,
    pub n_cells: usize,
    pub fluid_steps: usize,
    pub scalar_steps: usize,
    pub time_step_size: f64,
    pub final_time: f64,
    pub wall_time_seconds: f64,
    pub solver_statistics: BTreeMap<String, SolveStatistics>,
    /// L2 errors against the analytical solution, keyed by field name
    pub errors: BTreeMap<String, f64>,
}

impl RunReport {
    pub fn new(
        case_name: impl Into<String>,
        fluid_scheme: impl Into<String>,
        scalar_scheme: impl Into<String>,
    ) -> Self {
        Self {
            case_name: case_name.into(),
            fluid_scheme: fluid_scheme.into(),
            scalar_scheme: scalar_scheme.into(),
            status: RunStatus::Success,
            message: String::new(),
            created_at: chrono::Local::now().to_rfc3339(),
            n_cells: 0,
            fluid_steps: 0,
            scalar_steps: 0,
            time_step_size: 0.0,
            final_time: 0.0,
            wall_time_seconds: 0.0,
            solver_statistics: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = RunStatus::Failed;
        self.message = message.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json_path: PathBuf,
    pub sta_path: PathBuf,
}

/// Writes `<case>.json` and a short `<case>.sta` status table into `dir`.
pub fn write_report(dir: impl AsRef<Path>, report: &RunReport) -> Result<ReportPaths> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let json_path = dir.join(format!("{}.json", report.case_name));
    let sta_path = dir.join(format!("{}.sta", report.case_name));

    fs::write(&json_path, serde_json::to_vec_pretty(report)?)?;
    write_sta(&sta_path, report)?;

    Ok(ReportPaths {
        json_path,
        sta_path,
    })
}

pub fn load_report(path: impl AsRef<Path>) -> Result<RunReport> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn write_sta(path: impl AsRef<Path>, report: &RunReport) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let mut body = format!(
        "*DGFLOW STA REPORT\n\
         CASE: {}\n\
         CREATED: {}\n\
         STATUS: {}\n\
         FLUID: {} ({} steps)\n\
         SCALAR: {} ({} steps)\n\
         DT: {:e}  FINAL TIME: {:e}\n",
        report.case_name,
        report.created_at,
        report.status.as_str(),
        report.fluid_scheme,
        report.fluid_steps,
        report.scalar_scheme,
        report.scalar_steps,
        report.time_step_size,
        report.final_time,
    );
    body.push_str("SOLVE                     N     AVG-IT  MAX-IT\n");
    for (name, stats) in &report.solver_statistics {
        body.push_str(&format!(
            "{:<24}{:>6}{:>10.1}{:>8}\n",
            name,
            stats.solves,
            stats.average_iterations(),
            stats.max_iterations
        ));
    }
    for (field, error) in &report.errors {
        body.push_str(&format!("ERROR {field}: {error:e}\n"));
    }
    if !report.message.is_empty() {
        body.push_str(&format!("# {}\n", report.message));
    }
    fs::write(path, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        let mut report = RunReport::new("channel", "BDFDualSplittingScheme", "ExplicitRungeKutta");
        report.fluid_steps = 4;
        report.scalar_steps = 4;
        report.time_step_size = 0.25;
        report.final_time = 1.0;
        let mut stats = SolveStatistics::default();
        stats.record(3);
        stats.record(5);
        report.solver_statistics.insert("viscous".to_string(), stats);
        report.errors.insert("velocity".to_string(), 1.5e-6);
        report
    }

    #[test]
    fn statistics_track_average_and_maximum() {
        let mut stats = SolveStatistics::default();
        assert_eq!(stats.average_iterations(), 0.0);
        stats.record(2);
        stats.record(6);
        assert_eq!(stats.solves, 2);
        assert_eq!(stats.max_iterations, 6);
        assert_eq!(stats.average_iterations(), 4.0);
    }

    #[test]
    fn writes_json_and_sta() {
        let dir = tempfile::tempdir().expect("temp dir");
        let report = sample_report();
        let paths = write_report(dir.path(), &report).expect("report should write");

        let loaded = load_report(&paths.json_path).expect("report should load");
        assert_eq!(loaded, report);

        let sta = fs::read_to_string(&paths.sta_path).expect("sta should be readable");
        assert!(sta.contains("STATUS: SUCCESS"));
        assert!(sta.contains("viscous"));
        assert!(sta.contains("ERROR velocity"));
    }

    #[test]
    fn failed_report_carries_message() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sta = dir.path().join("job.sta");
        let report = sample_report().failed("GMRES did not converge");
        write_sta(&sta, &report).expect("sta should write");
        let content = fs::read_to_string(&sta).expect("sta should be readable");
        assert!(content.contains("STATUS: FAILED"));
        assert!(content.contains("# GMRES did not converge"));
    }
}
