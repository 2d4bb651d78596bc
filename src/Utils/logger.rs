//! Logger initialization and saving of the comparison into files:
//! - `comparison_results.csv`: one row per method, error metrics, wall time and status
//! - `solution_profiles.csv`: every compared profile sampled on the common grid
//! - `performance_metrics.json`: timings, diagnostics, failures, flags, full report and system info
use crate::Utils::sys_info::SystemInfo;
use crate::numerical::Analysis::analyzer::ComparisonReport;
use crate::numerical::Comparison_api::{ComparisonConfig, ComparisonOutcome};
use crate::numerical::Solver_api::{Diagnostics, Method, SoftFlag};
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use chrono::Local;
use csv::Writer;
use log::{LevelFilter, info};
use serde::Serialize;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const COMPARISON_CSV: &str = "comparison_results.csv";
pub const PROFILES_CSV: &str = "solution_profiles.csv";
pub const METRICS_JSON: &str = "performance_metrics.json";

/// Terminal + file logger, the file is named `log_<date>_<time>.txt`.
/// Returns the log file name. Fails if a global logger is already set.
pub fn init_logging(level: LevelFilter) -> CorneaResult<String> {
    let name = format!("log_{}.txt", Local::now().format("%Y-%m-%d_%H-%M-%S"));
    let file = File::create(&name)?;
    CombinedLogger::init(vec![
        TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(level, Config::default(), file),
    ])
    .map_err(|e| CorneaError::Config(format!("logger already initialized: {}", e)))?;
    info!("logging into {}", name);
    Ok(name)
}

pub fn save_comparison_to_csv(report: &ComparisonReport, path: &Path) -> CorneaResult<()> {
    let mut writer = Writer::from_path(path)?;
    for row in report.comparison_rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// x column followed by one column per method, all on the common grid
pub fn save_profiles_to_csv(report: &ComparisonReport, path: &Path) -> CorneaResult<()> {
    let mut writer = Writer::from_path(path)?;
    let mut headers = vec!["x".to_string()];
    headers.extend(report.profiles_on_grid.keys().map(|m| m.to_string()));
    writer.write_record(&headers)?;
    for (i, x) in report.grid.iter().enumerate() {
        let mut row_data = vec![x.to_string()];
        row_data.extend(report.profiles_on_grid.values().map(|h| h[i].to_string()));
        writer.write_record(&row_data)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ModelSummary {
    a: f64,
    b: f64,
    x_min: f64,
    x_max: f64,
}

#[derive(Debug, Serialize)]
struct MethodMetrics<'a> {
    method: Method,
    succeeded: bool,
    /// seconds
    wall_time: f64,
    diagnostics: Option<&'a Diagnostics>,
    flags: &'a [SoftFlag],
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PerformanceMetrics<'a> {
    created: String,
    model: ModelSummary,
    parallel: bool,
    /// seconds
    total_time: f64,
    methods: Vec<MethodMetrics<'a>>,
    report: Option<&'a ComparisonReport>,
    analysis_error: Option<String>,
    system: &'a [SystemInfo],
}

pub fn save_metrics_to_json(
    config: &ComparisonConfig,
    outcome: &ComparisonOutcome,
    system: &[SystemInfo],
    path: &Path,
) -> CorneaResult<()> {
    let mut methods: Vec<MethodMetrics> = outcome
        .results
        .values()
        .map(|r| MethodMetrics {
            method: r.method,
            succeeded: true,
            wall_time: r.wall_time,
            diagnostics: Some(&r.diagnostics),
            flags: &r.flags,
            error: None,
        })
        .collect();
    methods.extend(outcome.failures.values().map(|f| MethodMetrics {
        method: f.method,
        succeeded: false,
        wall_time: f.wall_time,
        diagnostics: None,
        flags: &[],
        error: Some(f.error.to_string()),
    }));
    methods.sort_by_key(|m| m.method);
    let metrics = PerformanceMetrics {
        created: Local::now().to_rfc3339(),
        model: ModelSummary {
            a: config.a,
            b: config.b,
            x_min: config.x_min,
            x_max: config.x_max,
        },
        parallel: config.parallel,
        total_time: outcome.total_time,
        methods,
        report: outcome.report.as_ref().ok(),
        analysis_error: outcome.report.as_ref().err().map(|e| e.to_string()),
        system,
    };
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &metrics)?;
    Ok(())
}

/// Writes every report file into `dir` (created if missing) and returns their paths.
/// The csv files need a successful analysis; the json file is always written.
pub fn save_outcome(
    config: &ComparisonConfig,
    outcome: &ComparisonOutcome,
    system: &[SystemInfo],
    dir: &Path,
) -> CorneaResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    if let Ok(report) = &outcome.report {
        let path = dir.join(COMPARISON_CSV);
        save_comparison_to_csv(report, &path)?;
        written.push(path);
        let path = dir.join(PROFILES_CSV);
        save_profiles_to_csv(report, &path)?;
        written.push(path);
    }
    let path = dir.join(METRICS_JSON);
    save_metrics_to_json(config, outcome, system, &path)?;
    written.push(path);
    for path in &written {
        info!("result saved into {}", path.display());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::Analysis::analyzer::{AnalysisConfig, PerformanceAnalyzer};
    use crate::numerical::Solver_api::{Profile, SolverFailure, SolverResult};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn result(method: Method, shift: f64) -> SolverResult {
        let x: Vec<f64> = (0..11).map(|i| i as f64 / 10.0).collect();
        let h: Vec<f64> = x.iter().map(|x| 0.1 * (1.0 - x * x) + shift * (1.0 - x)).collect();
        SolverResult {
            method,
            profile: Profile::new(x, h).unwrap(),
            wall_time: 0.25,
            diagnostics: Diagnostics::FiniteDifference {
                n_nodes: 11,
                iterations: 3,
                residual: 1e-12,
                step_norm: 1e-13,
                jacobian: crate::numerical::Solver_api::JacobianKind::Analytic,
            },
            flags: vec![],
        }
    }

    fn outcome() -> ComparisonOutcome {
        let mut results = BTreeMap::new();
        results.insert(Method::MOL, result(Method::MOL, 0.0));
        results.insert(Method::FiniteDiff, result(Method::FiniteDiff, 1e-4));
        let mut failures = BTreeMap::new();
        failures.insert(
            Method::Shooting,
            SolverFailure {
                method: Method::Shooting,
                error: CorneaError::ShootingDivergence {
                    last_guess: 3.0,
                    last_mismatch: 0.5,
                    iterations: 50,
                    trace: vec![],
                },
                wall_time: 0.5,
            },
        );
        let analyzer = PerformanceAnalyzer::new(AnalysisConfig {
            resolution: 21,
            ..AnalysisConfig::default()
        })
        .unwrap();
        let report = analyzer.analyze(&results, &failures);
        ComparisonOutcome {
            results,
            failures,
            report,
            total_time: Duration::from_millis(750).as_secs_f64(),
        }
    }

    #[test]
    fn every_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let system = vec![SystemInfo {
            key: "CPU Cores",
            value: "4".to_string(),
        }];
        let written =
            save_outcome(&ComparisonConfig::default(), &outcome(), &system, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn comparison_csv_has_one_row_per_method() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMPARISON_CSV);
        let outcome = outcome();
        save_comparison_to_csv(outcome.report.as_ref().unwrap(), &path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "method");
        assert!(headers.iter().any(|h| h == "rmse"));
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        // MOL, Shooting (failed), FiniteDiff
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|r| &r[0] == "Shooting"));
    }

    #[test]
    fn profiles_csv_uses_common_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROFILES_CSV);
        let outcome = outcome();
        save_profiles_to_csv(outcome.report.as_ref().unwrap(), &path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 3);
        assert_eq!(&headers[0], "x");
        assert_eq!(reader.records().count(), 21);
    }

    #[test]
    fn metrics_json_keeps_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METRICS_JSON);
        save_metrics_to_json(&ComparisonConfig::default(), &outcome(), &[], &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let methods = json["methods"].as_array().unwrap();
        assert_eq!(methods.len(), 3);
        let shooting = methods
            .iter()
            .find(|m| m["method"] == "Shooting")
            .unwrap();
        assert_eq!(shooting["succeeded"], false);
        assert!(shooting["error"].as_str().unwrap().contains("shooting diverged"));
        assert_eq!(json["report"]["reference"], "MOL");
        assert!(json["analysis_error"].is_null());
    }
}
