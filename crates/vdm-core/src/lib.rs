pub mod config;
pub mod logging;

pub mod controller;
pub mod extractor;
pub mod job;
pub mod naming;
pub mod registry;
pub mod store;
