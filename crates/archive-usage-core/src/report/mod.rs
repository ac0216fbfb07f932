/// Cumulative monthly usage report.
///
/// The report walks every month from the archive epoch through the last
/// fully elapsed month, carrying a running total of the bytes recorded in
/// the [`UsageMap`]. Months absent from the map add zero, so the month
/// column has no gaps and the byte column never decreases.
///
/// Output is tab-separated UTF-8:
///
/// ```text
/// Date	bytes
/// 200501	0
/// ...
/// 201510	1024
/// ```
use crate::error::UsageError;
use crate::model::{MonthKey, UsageMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column names of the header line.
pub const REPORT_HEADER: [&str; 2] = ["Date", "bytes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLine {
    pub month: MonthKey,
    pub cumulative: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
    final_month: MonthKey,
    lines: Vec<ReportLine>,
}

impl UsageReport {
    /// Collate `usage` into one line per month from `epoch` through the
    /// month before `current_month`.
    ///
    /// When that final month precedes `epoch` the report has no lines.
    pub fn collate(usage: &UsageMap, epoch: MonthKey, current_month: MonthKey) -> Self {
        let final_month = current_month.pred();
        let mut running_total: u64 = 0;
        let lines: Vec<ReportLine> = epoch
            .months_through(final_month)
            .map(|month| {
                running_total = running_total.saturating_add(usage.get(month));
                debug!("Collated usage: {month} {running_total}");
                ReportLine {
                    month,
                    cumulative: running_total,
                }
            })
            .collect();
        info!(
            "Collated {} months of data usage up to {final_month}",
            lines.len()
        );
        Self { final_month, lines }
    }

    #[inline]
    pub fn final_month(&self) -> MonthKey {
        self.final_month
    }

    #[inline]
    pub fn lines(&self) -> &[ReportLine] {
        &self.lines
    }

    /// Cumulative total on the last line, or zero for an empty report.
    pub fn total(&self) -> u64 {
        self.lines.last().map_or(0, |l| l.cumulative)
    }

    /// Render the header and every line as tab-separated text.
    pub fn render(&self) -> Result<Vec<u8>, UsageError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(Vec::with_capacity(16 * (self.lines.len() + 1)));

        writer.write_record(REPORT_HEADER)?;
        for line in &self.lines {
            writer.write_record([line.month.to_string(), line.cumulative.to_string()])?;
        }
        writer
            .into_inner()
            .map_err(|e| UsageError::Render(e.into_error().into()))
    }

    /// `<final month>_<subdivision>_<track>.txt`
    pub fn file_name(&self, subdivision: &str, track: &str) -> String {
        format!("{}_{subdivision}_{track}.txt", self.final_month)
    }

    /// Write the rendered report into `dir`, returning the file's path.
    ///
    /// `dir` must already exist. Any write failure is fatal for the run.
    pub fn write_to(&self, dir: &Path, subdivision: &str, track: &str) -> Result<PathBuf, UsageError> {
        let path = dir.join(self.file_name(subdivision, track));
        let body = self.render()?;
        info!("Writing report file: {}", path.display());
        std::fs::write(&path, body).map_err(|source| UsageError::ReportWrite {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
