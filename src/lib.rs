//! Archivo Server Library
//!
//! A self-hosted user registry that can ship itself out: the registry is
//! exported as a JSON document and delivered to a relay messaging backend
//! through a chunked upload, falling back to durable local storage when the
//! relay path fails.
//!
//! # Modules
//!
//! - `export`: the chunked-upload-and-commit pipeline with fallback
//! - `relay`: the transport seam to the remote backend
//! - `db`: SQLite-backed user registry
//! - `routes`: HTTP surface (registry touch point, admin export trigger)

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod relay;
pub mod routes;
pub mod state;
