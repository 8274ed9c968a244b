pub mod app_config;
pub mod client;
pub mod directory;
pub mod domain;
pub mod geodesy;
pub mod rpc;
