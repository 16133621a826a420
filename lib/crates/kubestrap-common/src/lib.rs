pub mod hosts;
pub mod report;

pub use hosts::{Host, HostFileError, HostRegistry};
pub use report::{HostReport, HostStatus, RunReport, StepOutcome, StepReport};
