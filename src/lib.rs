pub mod config;
pub mod duck;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod process;
pub mod reference;
pub mod stats;
pub mod store;
