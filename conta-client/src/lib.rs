//! conta-client: HTTP access to the bank API

pub mod http;
pub mod models;

pub use http::{HttpBankApi, Reply, classify_rejection};
