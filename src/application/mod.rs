//! Application services over the repository traits.

pub mod admin;
pub mod engagement;
pub mod error;
pub mod recommendations;
pub mod repos;
