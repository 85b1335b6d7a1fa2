//! # Integration Flows
//!
//! Every flow runs the real service, composer and confirmation engine
//! against [`app_lifecycle::adapters::InMemoryAlgod`].

pub mod failures;
pub mod fixtures;
pub mod lifecycle;
pub mod method_calls;
