pub mod jobs;
pub mod pipeline;
pub mod source;
