//! Catalog Application Library
//!
//! This library provides the author and book modules of the catalog API.

pub mod modules;
