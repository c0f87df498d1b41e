pub mod logger;
pub mod settings;

pub mod broker;
pub mod interceptor;

pub mod application_impl;
pub mod application_port;
pub mod domain_model;
pub mod domain_port;
pub mod infra;
pub mod infra_grpc;

#[cfg(test)]
mod testutil;
