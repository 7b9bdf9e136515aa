//! Application services for the administrative surface.

pub mod audit;
pub mod categories;
pub mod descriptor;
