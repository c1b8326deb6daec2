pub mod agent;
pub mod audit;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod navigation;
pub mod pipeline;
pub mod scoring;
