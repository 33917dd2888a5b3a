//! HTTP request handlers.

pub mod site;
