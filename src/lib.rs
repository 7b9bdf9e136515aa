//! Category administration for the sage blog.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
