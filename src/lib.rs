pub mod analyzers;
pub mod config;
pub mod error;
pub mod features;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod quality;
pub mod table;
