mod context;
mod state;
mod variant;

pub use context::{RunContext, RunFlag, RunReport};
pub use state::{PipelineState, resolve_next};
pub use variant::{Classification, Stage, Wood, classify, default_woods};
