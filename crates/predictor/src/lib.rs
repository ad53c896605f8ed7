//! HTTP front end for the diabetes risk predictor

pub mod api;
pub mod config;
