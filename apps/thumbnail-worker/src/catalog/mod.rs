// Resume catalog: the shared list cache that completed regenerations are
// merged into, plus the auto-scan that triggers regeneration for stale rows.

pub mod cache;
pub mod scan;
pub mod sync;

pub use cache::ResumeCache;
pub use scan::StaleScanner;
pub use sync::{run_resume_sync, ResumeSync};
