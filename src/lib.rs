pub mod api;
pub mod config;
pub mod creator;
pub mod driver;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod purge;
pub mod queues;
pub mod rate_limit;
pub mod sink;
pub mod state;
pub mod worker;

#[cfg(test)]
mod test_helpers;
