pub mod assembler;
pub mod config;
pub mod ingest;
pub mod rules;
