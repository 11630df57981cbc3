pub mod aggregate;
pub mod scan;
pub mod scoring;
pub mod stats;
