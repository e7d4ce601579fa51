//! Larder - a recipe sharing backend
//!
//! Users publish recipes built from a shared ingredient catalogue, tag
//! them, keep favorites and a shopping cart, follow other authors and
//! download an aggregated shopping list.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
