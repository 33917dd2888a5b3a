//! Object store backends.
//!
//! The [`backend::ObjectStore`] trait abstracts over where site content
//! lives.  Implementations include an S3-compatible client and an
//! in-memory store.

pub mod backend;
pub mod memory;
pub mod s3;

pub use backend::{ObjectBody, ObjectMeta, ObjectReader, ObjectStore};
