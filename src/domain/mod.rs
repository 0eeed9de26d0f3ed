// Domain layer: core models and ports (interfaces) for provisioning.

pub mod app_config;
pub mod model;
pub mod ports;
