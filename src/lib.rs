pub mod cli;
pub mod config;
pub mod engine;
pub mod entities;
pub mod overview;
pub mod pipeline;
pub mod postprocess;
pub mod render;
pub mod report;
pub mod selection;
pub mod structure;
pub mod util;
