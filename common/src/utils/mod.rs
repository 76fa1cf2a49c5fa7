pub mod chat;
pub mod chunking;
pub mod config;
pub mod embedding;
