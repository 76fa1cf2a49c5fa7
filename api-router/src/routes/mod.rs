pub mod answer;
pub mod indexing;
pub mod liveness;
pub mod readiness;
pub mod summary;
