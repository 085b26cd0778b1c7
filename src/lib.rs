// Library for tests to access modules

pub mod config;
pub mod docker_client;
pub mod error;
pub mod joiner;
pub mod maintenance;
pub mod metrics;
pub mod models;
pub mod routes;
