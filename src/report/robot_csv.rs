// ==========================================
// Repooler - Robot Transfer Sheet
// ==========================================
// One row per pipetted sample, no header:
// source plate, source well, volume (µL, 2 decimals),
// destination plate, destination well
// One destination well per pool
// ==========================================

use crate::domain::pool_plan::{PoolPlan, StructurePlan};
use crate::domain::structure::StructureKey;
use crate::domain::types::PlateWell;
use crate::engine::error::{PlanError, PlanResult};
use crate::report::wells::DestinationWells;
use crate::repository::SampleLocationDirectory;
use csv::WriterBuilder;
use std::io::Write;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct RobotRow {
    pub sample_id: String,
    pub source: PlateWell,
    pub volume_ul: f64,
    pub destination: PlateWell,
}

impl RobotRow {
    fn record(&self) -> [String; 5] {
        [
            self.source.plate_id.clone(),
            self.source.well.clone(),
            format!("{:.2}", self.volume_ul),
            self.destination.plate_id.clone(),
            self.destination.well.clone(),
        ]
    }
}

/// Pool left out of the sheet, with the reason shown to the operator
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPool {
    pub key: StructureKey,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotSheet {
    pub rows: Vec<RobotRow>,
    pub skipped: Vec<SkippedPool>,
}

impl RobotSheet {
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
        for row in &self.rows {
            wtr.write_record(row.record())?;
        }
        wtr.flush()?;
        Ok(())
    }
}

// ==========================================
// RobotSheetBuilder
// ==========================================
pub struct RobotSheetBuilder<'a, D: SampleLocationDirectory + ?Sized> {
    directory: &'a D,
}

impl<'a, D: SampleLocationDirectory + ?Sized> RobotSheetBuilder<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Resolves source wells and assigns destination wells
    ///
    /// A pool with an unresolvable sample is skipped and consumes no
    /// destination well; the other pools are still written.
    ///
    /// # Errors
    /// - `PlanError::PlateOverflow`: more pools than destination wells
    /// - `PlanError::Repository`: directory lookup failed
    #[instrument(skip_all, fields(project_id = %plan.project_id, pools = plan.structures.len()))]
    pub fn build(&self, plan: &PoolPlan) -> PlanResult<RobotSheet> {
        let mut wells = DestinationWells::new(&plan.config.dest_plates);
        let mut sheet = RobotSheet::default();

        for pool in &plan.structures {
            if pool.pipetted().next().is_none() {
                continue;
            }

            let sources = match self.resolve_sources(&plan.project_id, pool) {
                Ok(sources) => sources,
                Err(e @ PlanError::MissingLocation { .. }) => {
                    error!(structure = %pool.key, error = %e, "pool left out of the robot sheet");
                    sheet.skipped.push(SkippedPool {
                        key: pool.key.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let destination = wells.next().ok_or(PlanError::PlateOverflow {
                wells_used: wells.used(),
            })?;

            for (sample_id, source, volume_ul) in sources {
                sheet.rows.push(RobotRow {
                    sample_id,
                    source,
                    volume_ul,
                    destination: destination.clone(),
                });
            }
        }

        info!(
            rows = sheet.rows.len(),
            skipped = sheet.skipped.len(),
            wells = wells.used(),
            "robot sheet built"
        );
        Ok(sheet)
    }

    fn resolve_sources(
        &self,
        project_id: &str,
        pool: &StructurePlan,
    ) -> PlanResult<Vec<(String, PlateWell, f64)>> {
        pool.pipetted()
            .map(|alloc| {
                let source = self
                    .directory
                    .locate(project_id, &alloc.sample_id)?
                    .ok_or_else(|| PlanError::MissingLocation {
                        project_id: project_id.to_string(),
                        sample: alloc.sample_id.clone(),
                    })?;
                Ok((alloc.sample_id.clone(), source, alloc.volume_ul))
            })
            .collect()
    }
}
