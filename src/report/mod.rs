// ==========================================
// Repooler - Report Layer
// ==========================================
// Summary text and robot-ready CSV for a finished plan
// ==========================================

pub mod emitter;
pub mod robot_csv;
pub mod summary;
pub mod wells;

pub use emitter::{EmittedReport, ReportEmitter};
pub use robot_csv::{RobotRow, RobotSheet, RobotSheetBuilder, SkippedPool};
pub use summary::render_summary;
pub use wells::DestinationWells;
