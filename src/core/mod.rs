pub mod analysis;
pub mod config;
pub mod error;
pub mod scoring;
pub mod verdict;
pub mod video;
