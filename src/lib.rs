pub mod api_football;
pub mod beta;
pub mod config;
pub mod edge;
pub mod http_client;
pub mod live;
pub mod model;
pub mod notifier;
pub mod predict;
pub mod stats;
