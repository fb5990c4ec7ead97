// ==========================================
// Repooler - Report Emitter
// ==========================================
// Writes {project_name}_summary_{timestamp}.txt and
// {project_name}_repool_{timestamp}.csv into the output directory
// ==========================================

use crate::domain::pool_plan::PoolPlan;
use crate::engine::error::{PlanError, PlanResult};
use crate::report::robot_csv::{RobotSheet, RobotSheetBuilder, SkippedPool};
use crate::report::summary::render_summary;
use crate::repository::SampleLocationDirectory;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq)]
pub struct EmittedReport {
    pub summary_path: PathBuf,
    pub csv_path: PathBuf,
    pub skipped: Vec<SkippedPool>,
}

pub struct ReportEmitter {
    out_dir: PathBuf,
}

impl ReportEmitter {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    /// Output paths for a plan and project name
    pub fn paths(&self, plan: &PoolPlan, project_name: &str) -> (PathBuf, PathBuf) {
        let stem = file_stem(project_name);
        let timestamp = plan.generated_at.format(TIMESTAMP_FORMAT).to_string();
        (
            self.out_dir.join(format!("{}_summary_{}.txt", stem, timestamp)),
            self.out_dir.join(format!("{}_repool_{}.csv", stem, timestamp)),
        )
    }

    /// Writes the robot sheet, then the summary
    ///
    /// The summary is written even when the sheet cannot be built or
    /// written; in that case the sheet error is returned afterwards.
    pub fn emit<D: SampleLocationDirectory + ?Sized>(
        &self,
        plan: &PoolPlan,
        directory: &D,
    ) -> PlanResult<EmittedReport> {
        let project_name = directory
            .project_name(&plan.project_id)?
            .unwrap_or_else(|| plan.project_id.clone());
        let (summary_path, csv_path) = self.paths(plan, &project_name);

        let sheet = RobotSheetBuilder::new(directory)
            .build(plan)
            .and_then(|sheet| write_sheet(&csv_path, &sheet).map(|_| sheet));

        let (skipped, sheet_error) = match &sheet {
            Ok(sheet) => (sheet.skipped.clone(), None),
            Err(e) => {
                warn!(error = %e, "robot sheet not written");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let summary = render_summary(plan, &project_name, &skipped, sheet_error.as_deref());
        std::fs::write(&summary_path, summary).map_err(|e| PlanError::Output {
            path: summary_path.display().to_string(),
            message: e.to_string(),
        })?;

        let sheet = sheet?;
        info!(
            summary = %summary_path.display(),
            csv = %csv_path.display(),
            rows = sheet.rows.len(),
            "reports written"
        );

        Ok(EmittedReport {
            summary_path,
            csv_path,
            skipped,
        })
    }
}

fn write_sheet(path: &Path, sheet: &RobotSheet) -> PlanResult<()> {
    let output_error = |message: String| PlanError::Output {
        path: path.display().to_string(),
        message,
    };
    let file = File::create(path).map_err(|e| output_error(e.to_string()))?;
    sheet
        .write_csv(BufWriter::new(file))
        .map_err(|e| output_error(e.to_string()))
}

/// Project name made safe for a file name
pub fn file_stem(project_name: &str) -> String {
    project_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}
