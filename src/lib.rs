//! Library crate for ulti-live-back, exposing modules for the binary and
//! integration tests.

pub mod cache;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod services;
pub mod state;
