//! Dataset builder: directory scan, scenario matching, series extraction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use doaskit_series::{ResultContainer, ResultSeries, SeriesKey};
use tracing::{debug, info, instrument, warn};

use crate::error::ImportError;
use crate::locator;
use crate::reader::ResultFileReader;
use crate::report::{DuplicateRecord, FileFailure, ImportReport};
use crate::spec::{select_spec, ImportSpec, TimestampColumns};

/// Result of a build pass: the aggregated container plus the error report.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Aggregated series, one per (scenario, parameter) pair.
    pub container: ResultContainer,
    /// Diagnostics: unmatched files, dropped files, resolved duplicates.
    pub report: ImportReport,
}

/// One extracted (start, stop, value) point before finalization.
#[derive(Debug, Clone, Copy)]
struct Point {
    start: NaiveDateTime,
    stop: Option<NaiveDateTime>,
    value: f64,
}

/// Everything extracted from one successfully read file.
#[derive(Debug)]
struct FileContribution {
    path: PathBuf,
    first_start: Option<NaiveDateTime>,
    /// Keys the file's specification declares, pre-seeded as empty series
    /// so "no data in window" stays distinguishable from "never imported".
    declared: Vec<SeriesKey>,
    points: Vec<(SeriesKey, Point)>,
}

/// Scans files, matches them to fit scenarios, and aggregates extracted
/// series into a [`ResultContainer`].
///
/// A pure function of (files, specifications, time window): no global
/// state, deterministic output regardless of directory iteration order
/// (contributions are deposited sorted by first start timestamp).
///
/// Construct via [`DatasetBuilder::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter             | Default              |
/// |-----------------------|----------------------|
/// | `time_window`         | unbounded            |
/// | `extension`           | no filename filter   |
/// | `duplicate_tolerance` | 0.0 (exact equality) |
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    specs: Vec<ImportSpec>,
    window: Option<(NaiveDateTime, NaiveDateTime)>,
    extension: Option<String>,
    tolerance: f64,
}

impl DatasetBuilder {
    /// Create a builder over a set of import specifications, validating
    /// each one up front.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ImportError::InvalidSpecification`] | Any spec fails [`ImportSpec::validate`], or two specs share a scenario ID |
    pub fn new(specs: Vec<ImportSpec>) -> Result<Self, ImportError> {
        for (i, spec) in specs.iter().enumerate() {
            spec.validate()?;
            if specs[..i].iter().any(|s| s.scenario_id() == spec.scenario_id()) {
                return Err(ImportError::InvalidSpecification {
                    scenario: spec.scenario_id().to_string(),
                    reason: "scenario ID registered more than once".to_string(),
                });
            }
        }
        Ok(Self {
            specs,
            window: None,
            extension: None,
            tolerance: 0.0,
        })
    }

    /// Restrict extraction to rows whose start timestamp lies in
    /// `[start, stop]` inclusive.
    #[must_use]
    pub fn with_time_window(mut self, start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        self.window = Some((start, stop));
        self
    }

    /// Only consider candidate files with this extension (without the dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Set the numeric tolerance under which duplicate-timestamp values are
    /// considered equal and silently deduplicated. Defaults to exact
    /// equality.
    #[must_use]
    pub fn with_duplicate_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Scan a directory and build from every regular file in it.
    ///
    /// # Errors
    ///
    /// All of [`DatasetBuilder::build_files`], plus
    /// [`ImportError::FileNotFound`] when the directory cannot be read.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn build_dir(&self, dir: &Path) -> Result<BuildOutcome, ImportError> {
        let entries = std::fs::read_dir(dir).map_err(|e| ImportError::FileNotFound {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        debug!(n_files = files.len(), "directory enumerated");
        self.build_files(&files)
    }

    /// Build from an explicit list of candidate files.
    ///
    /// Per-file problems are recorded in the report and skipped; the call
    /// itself fails only when zero files could be matched and read, or on a
    /// configuration-level error.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ImportError::AmbiguousScenarioMatch`] | Two equal-length scenario IDs match one filename |
    /// | [`ImportError::MissingHeader`] | Substring rule hit a header-less file |
    /// | [`ImportError::NoUsableFiles`] | No file matched and read successfully |
    #[instrument(skip_all, fields(n_files = files.len()))]
    pub fn build_files(&self, files: &[PathBuf]) -> Result<BuildOutcome, ImportError> {
        let candidates: Vec<&PathBuf> = files
            .iter()
            .filter(|p| self.extension_matches(p))
            .collect();
        let n_candidates = candidates.len();

        let mut report = ImportReport::default();
        let mut contributions: Vec<FileContribution> = Vec::new();

        for path in candidates {
            let filename = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            match select_spec(&filename, &self.specs)? {
                None => {
                    debug!(file = %path.display(), "no scenario matches, skipping");
                    report.unmatched.push(path.clone());
                }
                Some(spec) => match self.extract_file(path, spec) {
                    Ok(contribution) => contributions.push(contribution),
                    Err(e) if e.is_configuration() => return Err(e),
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "file dropped");
                        report.failures.push(FileFailure {
                            path: path.clone(),
                            scenario: Some(spec.scenario_id().to_string()),
                            error: e,
                        });
                    }
                },
            }
        }

        if contributions.is_empty() {
            return Err(ImportError::NoUsableFiles { n_candidates });
        }
        report.n_imported = contributions.len();

        // Fixed deposit order: ascending first start timestamp, files with
        // no extracted rows last, path as tie-breaker. Keeps output
        // deterministic regardless of scan order.
        contributions.sort_by(|a, b| {
            let key_a = (a.first_start.is_none(), a.first_start, &a.path);
            let key_b = (b.first_start.is_none(), b.first_start, &b.path);
            key_a.cmp(&key_b)
        });

        let mut accumulated: BTreeMap<SeriesKey, Vec<Point>> = BTreeMap::new();
        for contribution in contributions {
            for key in contribution.declared {
                accumulated.entry(key).or_default();
            }
            for (key, point) in contribution.points {
                accumulated.entry(key).or_default().push(point);
            }
        }

        let mut container = ResultContainer::new();
        for (key, points) in accumulated {
            let series = self.finalize_series(&key, points, &mut report)?;
            container.insert(key, series);
        }

        info!(
            n_series = container.len(),
            n_imported = report.n_imported,
            n_unmatched = report.unmatched.len(),
            n_failures = report.failures.len(),
            "build pass complete"
        );
        Ok(BuildOutcome { container, report })
    }

    fn extension_matches(&self, path: &Path) -> bool {
        match &self.extension {
            None => true,
            Some(ext) => path
                .extension()
                .map_or(false, |e| e.to_string_lossy() == ext.as_str()),
        }
    }

    /// Read one file and extract every declared parameter.
    fn extract_file(
        &self,
        path: &Path,
        spec: &ImportSpec,
    ) -> Result<FileContribution, ImportError> {
        let table = ResultFileReader::new(path)
            .with_delimiter(spec.delimiter())
            .with_comment_prefix(spec.comment_prefix())
            .read(spec.file_type())?;

        let mut declared = Vec::new();
        for (name, _) in spec.parameters() {
            declared.push(SeriesKey::new(spec.scenario_id(), name.as_str()));
            if spec.fit_err_offset().is_some() {
                declared.push(SeriesKey::new(spec.scenario_id(), format!("{name}_err")));
            }
        }

        let mut contribution = FileContribution {
            path: path.to_path_buf(),
            first_start: None,
            declared,
            points: Vec::new(),
        };
        if table.rows.is_empty() {
            debug!(file = %path.display(), "no data rows");
            return Ok(contribution);
        }

        let header = table.header.as_deref();
        // Column resolution is checked against the widest context we have:
        // the header when present, otherwise the first data row.
        let width = header.map_or(table.rows[0].fields.len(), <[String]>::len);

        let (start_col, stop_col) = match spec.timestamp_rule().columns() {
            TimestampColumns::Single(col) => (locator::resolve(header, col, width)?, None),
            TimestampColumns::StartStop { start, stop } => (
                locator::resolve(header, start, width)?,
                Some(locator::resolve(header, stop, width)?),
            ),
        };
        let param_cols: Vec<(String, usize)> = spec
            .parameters()
            .iter()
            .map(|(name, rule)| Ok((name.clone(), locator::resolve(header, rule, width)?)))
            .collect::<Result<_, ImportError>>()?;

        for row in &table.rows {
            let required = required_width(start_col, stop_col, &param_cols);
            if row.fields.len() < required {
                return Err(ImportError::MalformedRow {
                    path: path.to_path_buf(),
                    line: row.line,
                    expected: required,
                    got: row.fields.len(),
                });
            }

            let start = self.parse_timestamp(spec, &table.path, row.line, &row.fields[start_col])?;
            let stop = match stop_col {
                Some(col) => {
                    let stop =
                        self.parse_timestamp(spec, &table.path, row.line, &row.fields[col])?;
                    if stop < start {
                        return Err(ImportError::BadTimestamp {
                            path: path.to_path_buf(),
                            line: row.line,
                            raw: row.fields[col].clone(),
                        });
                    }
                    Some(stop)
                }
                None => None,
            };
            if let Some((window_start, window_stop)) = self.window {
                if start < window_start || start > window_stop {
                    continue;
                }
            }
            contribution.first_start = Some(match contribution.first_start {
                Some(current) => current.min(start),
                None => start,
            });

            for (name, col) in &param_cols {
                if let Some(value) = parse_cell(&row.fields[*col]) {
                    contribution.points.push((
                        SeriesKey::new(spec.scenario_id(), name.as_str()),
                        Point { start, stop, value },
                    ));
                } else {
                    debug!(
                        parameter = name.as_str(),
                        line = row.line,
                        "missing or non-numeric cell, skipped"
                    );
                }
                if let Some(offset) = spec.fit_err_offset() {
                    let err_col = col + offset;
                    if let Some(value) = row.fields.get(err_col).and_then(|raw| parse_cell(raw)) {
                        // Raw fit errors are underestimated; scale by the
                        // configured correction factor.
                        let value = value * spec.fit_err_corr();
                        contribution.points.push((
                            SeriesKey::new(spec.scenario_id(), format!("{name}_err")),
                            Point { start, stop, value },
                        ));
                    }
                }
            }
        }
        debug!(
            file = %path.display(),
            scenario = spec.scenario_id(),
            n_points = contribution.points.len(),
            "file extracted"
        );
        Ok(contribution)
    }

    fn parse_timestamp(
        &self,
        spec: &ImportSpec,
        path: &Path,
        line: u64,
        raw: &str,
    ) -> Result<NaiveDateTime, ImportError> {
        spec.timestamp_rule()
            .parse(raw)
            .ok_or_else(|| ImportError::BadTimestamp {
                path: path.to_path_buf(),
                line,
                raw: raw.to_string(),
            })
    }

    /// Sort one key's points by timestamp and resolve duplicates: values
    /// within the configured tolerance deduplicate silently, conflicting
    /// values keep the first-deposited point and are recorded.
    fn finalize_series(
        &self,
        key: &SeriesKey,
        mut points: Vec<Point>,
        report: &mut ImportReport,
    ) -> Result<ResultSeries, ImportError> {
        points.sort_by_key(|p| p.start);

        let mut timestamps: Vec<NaiveDateTime> = Vec::with_capacity(points.len());
        let mut values: Vec<f64> = Vec::with_capacity(points.len());
        let mut stops: Vec<NaiveDateTime> = Vec::with_capacity(points.len());
        let mut all_have_stop = true;
        for point in points {
            if timestamps.last() == Some(&point.start) {
                let kept = values.last().copied().unwrap_or(f64::NAN);
                if (kept - point.value).abs() > self.tolerance {
                    warn!(
                        key = %key,
                        timestamp = %point.start,
                        kept,
                        dropped = point.value,
                        "conflicting duplicate timestamp, first value kept"
                    );
                    report.duplicates.push(DuplicateRecord {
                        key: key.clone(),
                        timestamp: point.start,
                        kept,
                        dropped: point.value,
                    });
                }
                continue;
            }
            timestamps.push(point.start);
            values.push(point.value);
            match point.stop {
                Some(stop) => stops.push(stop),
                None => all_have_stop = false,
            }
        }

        let series = if all_have_stop && !timestamps.is_empty() {
            ResultSeries::with_stop_times(timestamps, values, stops)?
        } else {
            ResultSeries::new(timestamps, values)?
        };
        Ok(series)
    }
}

fn required_width(
    start_col: usize,
    stop_col: Option<usize>,
    param_cols: &[(String, usize)],
) -> usize {
    let mut max = start_col;
    if let Some(col) = stop_col {
        max = max.max(col);
    }
    for (_, col) in param_cols {
        max = max.max(*col);
    }
    max + 1
}

/// Parse one numeric cell. Empty, non-numeric, and non-finite cells are
/// missing values — never coerced to zero.
fn parse_cell(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::ColumnRule;
    use crate::reader::FileType;
    use crate::spec::TimestampRule;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        // Matches the anchor date used for time-only formats.
        NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn header_spec(scenario: &str, substring: &str) -> ImportSpec {
        ImportSpec::new(
            scenario,
            FileType::DelimitedWithHeader,
            TimestampRule::single(
                ColumnRule::HeaderSubstring("time".into()),
                vec!["%H:%M".into()],
            ),
        )
        .with_delimiter(b',')
        .with_parameter(substring, ColumnRule::HeaderSubstring(substring.into()))
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn two_scenarios_from_one_directory() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_2017.txt", "time,SO2-SCD\n12:00,1.2e18\n");
        write(&dir, "f02bro_2017.txt", "time,BrO-SCD\n12:00,3.1e13\n");

        let builder = DatasetBuilder::new(vec![
            header_spec("f01so2", "SO2-SCD"),
            header_spec("f02bro", "BrO-SCD"),
        ])
        .unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        assert!(outcome.report.is_clean());

        let so2 = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(so2.timestamps(), &[ts(12, 0)]);
        assert_eq!(so2.values(), &[1.2e18]);
        let bro = outcome.container.get("f02bro", "BrO-SCD").unwrap();
        assert_eq!(bro.values(), &[3.1e13]);

        let ratio = outcome
            .container
            .combine(
                &SeriesKey::new("f02bro", "BrO-SCD"),
                &SeriesKey::new("f01so2", "SO2-SCD"),
                |a, b| a / b,
            )
            .unwrap();
        assert_eq!(ratio.timestamps(), &[ts(12, 0)]);
        assert!((ratio.values()[0] - 3.1e13 / 1.2e18).abs() < 1e-20);
    }

    #[test]
    fn malformed_file_is_recorded_and_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_a.txt", "time,SO2-SCD\n12:00\n");
        write(&dir, "f01so2_b.txt", "time,SO2-SCD\n12:05,2.0e18\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();

        assert_eq!(outcome.report.failures.len(), 1);
        assert!(matches!(
            outcome.report.failures[0].error,
            ImportError::MalformedRow { line: 2, .. }
        ));
        assert_eq!(outcome.report.n_imported, 1);
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.values(), &[2.0e18]);
    }

    #[test]
    fn unparseable_timestamp_is_recorded_and_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_a.txt", "time,SO2-SCD\nnoon-ish,1.0e18\n");
        write(&dir, "f01so2_b.txt", "time,SO2-SCD\n12:05,2.0e18\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();

        assert_eq!(outcome.report.failures.len(), 1);
        assert!(matches!(
            outcome.report.failures[0].error,
            ImportError::BadTimestamp { line: 2, .. }
        ));
        assert_eq!(outcome.report.n_imported, 1);
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.values(), &[2.0e18]);
    }

    #[test]
    fn longest_scenario_id_wins_in_build() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_x.txt", "time,SO2-SCD\n12:00,1.0\n");

        let builder = DatasetBuilder::new(vec![
            header_spec("f01", "SO2-SCD"),
            header_spec("f01so2", "SO2-SCD"),
        ])
        .unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        assert!(outcome.container.contains("f01so2", "SO2-SCD"));
        assert!(!outcome.container.contains("f01", "SO2-SCD"));
    }

    #[test]
    fn unmatched_files_are_not_errors() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_x.txt", "time,SO2-SCD\n12:00,1.0\n");
        let readme = write(&dir, "readme.txt", "not a result file\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        assert_eq!(outcome.report.unmatched, vec![readme]);
        assert_eq!(outcome.report.n_imported, 1);
    }

    #[test]
    fn zero_usable_files_fails() {
        let dir = TempDir::new().unwrap();
        write(&dir, "other.txt", "nothing here\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")]).unwrap();
        let err = builder.build_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ImportError::NoUsableFiles { n_candidates: 1 }));
    }

    #[test]
    fn duplicate_scenario_id_rejected_up_front() {
        let err = DatasetBuilder::new(vec![
            header_spec("f01", "SO2-SCD"),
            header_spec("f01", "BrO-SCD"),
        ])
        .unwrap_err();
        assert!(matches!(err, ImportError::InvalidSpecification { .. }));
    }

    #[test]
    fn time_window_is_inclusive() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "f01so2_x.txt",
            "time,SO2-SCD\n11:55,1.0\n12:00,2.0\n12:05,3.0\n12:10,4.0\n",
        );

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")])
            .unwrap()
            .with_time_window(ts(12, 0), ts(12, 5));
        let outcome = builder.build_dir(dir.path()).unwrap();
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.values(), &[2.0, 3.0]);
    }

    #[test]
    fn window_outside_data_keeps_empty_series() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_x.txt", "time,SO2-SCD\n12:00,1.0\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")])
            .unwrap()
            .with_time_window(ts(15, 0), ts(16, 0));
        let outcome = builder.build_dir(dir.path()).unwrap();
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert!(s.is_empty(), "declared parameter stays queryable");
    }

    #[test]
    fn missing_cells_are_skipped_not_zeroed() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "f01so2_x.txt",
            "time,SO2-SCD\n12:00,\n12:05,bad\n12:10,3.0\n",
        );

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.timestamps(), &[ts(12, 10)]);
        assert_eq!(s.values(), &[3.0]);
    }

    #[test]
    fn files_merge_sorted_by_start_time() {
        let dir = TempDir::new().unwrap();
        // Later file sorts first alphabetically; deposit order must follow
        // start timestamps instead.
        write(&dir, "f01so2_a.txt", "time,SO2-SCD\n13:00,2.0\n");
        write(&dir, "f01so2_b.txt", "time,SO2-SCD\n12:00,1.0\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.timestamps(), &[ts(12, 0), ts(13, 0)]);
        assert_eq!(s.values(), &[1.0, 2.0]);
    }

    #[test]
    fn conflicting_duplicate_recorded_first_value_kept() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_a.txt", "time,SO2-SCD\n12:00,1.0\n");
        write(&dir, "f01so2_b.txt", "time,SO2-SCD\n12:00,2.0\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        assert_eq!(outcome.report.duplicates.len(), 1);
        let dup = &outcome.report.duplicates[0];
        assert_eq!(dup.kept, 1.0);
        assert_eq!(dup.dropped, 2.0);
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.values(), &[1.0]);
    }

    #[test]
    fn duplicate_within_tolerance_dedups_silently() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_a.txt", "time,SO2-SCD\n12:00,1.0\n");
        write(&dir, "f01so2_b.txt", "time,SO2-SCD\n12:00,1.000001\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")])
            .unwrap()
            .with_duplicate_tolerance(1e-3);
        let outcome = builder.build_dir(dir.path()).unwrap();
        assert!(outcome.report.duplicates.is_empty());
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.values(), &[1.0]);
    }

    #[test]
    fn no_header_files_with_explicit_indices() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "f01_x.csv",
            "190001011200;190001011205;4.2e17\n190001011205;190001011210;4.4e17\n",
        );

        let spec = ImportSpec::new(
            "f01",
            FileType::DelimitedNoHeader,
            TimestampRule::start_stop(
                ColumnRule::Index(0),
                ColumnRule::Index(1),
                vec!["%Y%m%d%H%M".into()],
            ),
        )
        .with_delimiter(b';')
        .with_parameter("so2", ColumnRule::Index(2));

        let builder = DatasetBuilder::new(vec![spec]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        let s = outcome.container.get("f01", "so2").unwrap();
        assert_eq!(s.values(), &[4.2e17, 4.4e17]);
        assert_eq!(s.stop_times().unwrap().len(), 2);
    }

    #[test]
    fn fit_err_offset_imports_error_series() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "f01so2_x.txt",
            "time,SO2-SCD,SO2-err\n12:00,1.2e18,4.0e16\n",
        );

        let spec = header_spec("f01so2", "SO2-SCD").with_fit_err_offset(1);
        let builder = DatasetBuilder::new(vec![spec]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        let err_series = outcome.container.get("f01so2", "SO2-SCD_err").unwrap();
        assert_eq!(err_series.values(), &[4.0e16]);
    }

    #[test]
    fn fit_err_corr_scales_error_series_only() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "f01so2_x.txt",
            "time,SO2-SCD,SO2-err\n12:00,1.2e18,4.0e16\n",
        );

        let spec = header_spec("f01so2", "SO2-SCD")
            .with_fit_err_offset(1)
            .with_fit_err_corr(3.0);
        let builder = DatasetBuilder::new(vec![spec]).unwrap();
        let outcome = builder.build_dir(dir.path()).unwrap();
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.values(), &[1.2e18], "data values are not scaled");
        let err_series = outcome.container.get("f01so2", "SO2-SCD_err").unwrap();
        assert_eq!(err_series.values(), &[3.0 * 4.0e16]);
    }

    #[test]
    fn extension_filter_limits_candidates() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_x.dat", "time,SO2-SCD\n12:00,1.0\n");
        write(&dir, "f01so2_y.txt", "time,SO2-SCD\n13:00,9.0\n");

        let builder = DatasetBuilder::new(vec![header_spec("f01so2", "SO2-SCD")])
            .unwrap()
            .with_extension("dat");
        let outcome = builder.build_dir(dir.path()).unwrap();
        let s = outcome.container.get("f01so2", "SO2-SCD").unwrap();
        assert_eq!(s.values(), &[1.0], "only the .dat file is considered");
    }

    #[test]
    fn substring_rule_against_headerless_file_type_is_fatal() {
        // Caller configuration error: spec declares a header but the rule
        // is checked at validation time against the declared file type, so
        // this must surface before any file is read.
        let spec = ImportSpec::new(
            "f01",
            FileType::DelimitedNoHeader,
            TimestampRule::single(ColumnRule::Index(0), vec!["%H:%M".into()]),
        )
        .with_parameter("so2", ColumnRule::HeaderSubstring("SO2".into()));
        let err = DatasetBuilder::new(vec![spec]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn ambiguous_scenario_match_aborts_build() {
        let dir = TempDir::new().unwrap();
        write(&dir, "f01so2_x.txt", "time,SO2-SCD\n12:00,1.0\n");

        let builder = DatasetBuilder::new(vec![
            header_spec("f01", "SO2-SCD"),
            header_spec("so2", "SO2-SCD"),
        ])
        .unwrap();
        let err = builder.build_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ImportError::AmbiguousScenarioMatch { .. }));
    }
}
