//! Per-entity request builders.
//!
//! Each builder maps its arguments onto an [`ApiRequest`] and the fixed path of the
//! service operation. Nothing is sent here; hand the result to
//! [`ApiClient::send`](crate::pipeline::ApiClient::send).

use std::marker::PhantomData;

use serde_json::Value;

use crate::models::ApiRequest;

pub mod permissions;
pub mod roles;
pub mod users;

/// Endpoint
///
/// A ready-to-send call: path, envelope, and the type `data` decodes into.
#[derive(Debug, Clone)]
pub struct Endpoint<T> {
    pub path: &'static str,
    pub envelope: ApiRequest,
    response: PhantomData<fn() -> T>,
}

impl<T> Endpoint<T> {
    /// An envelope for `perm_code` at `path`; `params` become `bizParams` (`"{}"` if `None`).
    pub fn new(path: &'static str, token: &str, perm_code: &str, params: Option<Value>) -> Self {
        let envelope = ApiRequest::new(token, perm_code);
        let envelope = match params {
            Some(params) => envelope.with_params(&params),
            None => envelope,
        };

        Self {
            path,
            envelope,
            response: PhantomData,
        }
    }

    pub fn perm_code(&self) -> &str {
        &self.envelope.perm_code
    }

    pub fn into_parts(self) -> (&'static str, ApiRequest) {
        (self.path, self.envelope)
    }
}
