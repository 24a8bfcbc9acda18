pub mod aggregate;
pub mod error;
pub mod load;
pub mod metrics;
pub mod record;
pub mod selection;
pub mod table;

pub use error::{LoadError, PipelineError};
pub use load::load;
pub use metrics::{recompute, DerivedMetrics};
pub use record::StudentRecord;
pub use selection::Selection;
pub use table::{StudentTable, Subset};
