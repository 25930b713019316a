pub mod config;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod ex;
pub mod model;
pub mod parse;
pub mod provers;
pub mod report;
pub mod sanitize;
pub mod scoring;
