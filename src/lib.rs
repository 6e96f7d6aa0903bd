pub mod cache;
pub mod comeback;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod impact;
pub mod phase;
pub mod sample_data;
pub mod state;
