//! Authenticated client for the Cloudland API

use std::sync::Arc;

use tracing::instrument;

use crate::application::services::Transport;
use crate::application::ApplicationResult;
use crate::domain::{decode_or_raise, decode_record, Request, Row, Session};
use crate::infrastructure::traits::HttpBackend;

/// Sends requests on behalf of a logged-in user.
///
/// Built only from a [`Session`], so every call carries authentication tokens.
#[derive(Clone)]
pub struct CloudlandClient {
    transport: Transport,
}

impl CloudlandClient {
    pub fn new(
        endpoint: impl Into<String>,
        backend: Arc<dyn HttpBackend>,
        session: Session,
    ) -> Self {
        Self {
            transport: Transport::authenticated(endpoint, backend, session),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn session(&self) -> Option<&Session> {
        self.transport.session()
    }

    /// Raw response text for `request`.
    pub fn fetch(&self, request: &Request) -> ApplicationResult<String> {
        self.transport.send(request)
    }

    /// Send `request` and decode the row list, raising on a non-zero status.
    #[instrument(skip(self), fields(operation = request.operation()))]
    pub fn call(&self, request: &Request) -> ApplicationResult<Vec<Row>> {
        let body = self.fetch(request)?;
        Ok(decode_or_raise(&body)?)
    }

    /// Send `request` and decode a single record as `KEY|VALUE` rows.
    #[instrument(skip(self), fields(operation = request.operation()))]
    pub fn call_record(&self, request: &Request) -> ApplicationResult<Vec<Row>> {
        let body = self.fetch(request)?;
        Ok(decode_record(&body)?)
    }
}
