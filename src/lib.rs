pub mod access;
pub mod app_service;
pub mod app_state;
pub mod commands;
pub mod config;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod plot;
pub mod storage;
pub mod supervisor;
pub mod task;
#[cfg(test)]
mod test_support;
