//! Fan results out to the requested report sinks

use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::{HarnessError, HarnessResult};
use crate::executor::TestResult;
use crate::report::{create_sink, ReportSelection, ReportSink, SubjectInfo};

/// Ordered set of sinks, flushed one after another
pub struct ReporterDispatch {
    sinks: Vec<Box<dyn ReportSink>>,
    reports_dir: PathBuf,
    subject: String,
}

impl ReporterDispatch {
    pub fn new(reports_dir: impl Into<PathBuf>, subject: impl Into<String>) -> Self {
        Self {
            sinks: Vec::new(),
            reports_dir: reports_dir.into(),
            subject: subject.into(),
        }
    }

    /// Stock sinks for every selected format, in earl, html, json order
    pub fn for_selection(
        selection: ReportSelection,
        subject: &SubjectInfo,
        reports_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut dispatch = Self::new(reports_dir, subject.name.clone());
        for format in selection.formats() {
            dispatch.push(create_sink(format, subject));
        }
        dispatch
    }

    pub fn push(&mut self, sink: Box<dyn ReportSink>) -> &mut Self {
        self.sinks.push(sink);
        self
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Feed every result to each sink, then flush it.
    ///
    /// Stops at the first sink that fails; files already written stay on disk.
    pub async fn emit(&mut self, results: &[TestResult]) -> HarnessResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.sinks.len());

        for sink in self.sinks.iter_mut() {
            let format = sink.format();
            for result in results {
                sink.add_result(result);
            }

            let path = format.output_path(&self.reports_dir, &self.subject);
            match sink.generate_report(&path).await {
                Ok(path) => {
                    info!("{} report: {}", format.as_str().to_uppercase(), path.display());
                    written.push(path);
                }
                Err(e) => {
                    error!("Failed to generate {} report: {}", format, e);
                    return Err(match e {
                        HarnessError::Reporter { .. } => e,
                        other => HarnessError::reporter(format, other),
                    });
                }
            }
        }

        Ok(written)
    }
}
