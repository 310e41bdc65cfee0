//! assetsync - browse, synchronize and download community 3D-character assets
//!
//! This crate provides:
//! - A remote catalog loaded from the server manifest
//! - Installed-state tracking rebuilt from the filesystem
//! - Filtering over the catalog
//! - A background download pipeline and a three-phase sync

pub const APP_VERSION: &str = "0.1.0";

pub mod app;
pub mod assets;
pub mod config;
pub mod db;
pub mod download;
pub mod sync;

pub use app::App;
pub use config::Config;
