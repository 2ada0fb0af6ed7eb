mod job;
mod store;

pub use job::{Job, JobStatus, Transition};
pub use store::JobStore;
