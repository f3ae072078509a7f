#![doc = "gitea-bridge-core: core logic library for gitea-bridge."]

//! This crate holds the domain types, collaborator contracts and request
//! handlers of the bridge between the service mesh and a Gitea instance.
//! Transport (HTTP clients, the HTTP server) lives in the `gitea-bridge` crate.
//!
//! # Usage
//! Implement [`contract::GiteaApi`], [`contract::ServiceMesh`] and
//! [`contract::EventBus`] for your transport, then call the handlers in
//! [`webhook`], [`provisioning`] and [`admin`].

pub mod admin;
pub mod config;
pub mod contract;
pub mod error;
pub mod provisioning;
pub mod webhook;

pub use error::BridgeError;
