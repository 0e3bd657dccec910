pub mod channels;
pub mod config;
pub mod orchestration;
pub mod provider;
pub mod runtime;
