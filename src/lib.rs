//! Folio: a portfolio and blog backend with engagement tracking and
//! related-post recommendations.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
