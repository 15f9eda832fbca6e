//! Request transport bound to one endpoint
//!
//! Every exchange is logged with its outgoing fields and the raw response text.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{FieldMap, Request, Session, Verb};
use crate::infrastructure::traits::{HttpBackend, HttpReply};

/// Sends field maps to the endpoint, presenting the session tokens if any.
#[derive(Clone)]
pub struct Transport {
    endpoint: String,
    backend: Arc<dyn HttpBackend>,
    session: Option<Session>,
}

impl Transport {
    /// Transport without credentials, used for the login call.
    pub fn anonymous(endpoint: impl Into<String>, backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            endpoint: endpoint.into(),
            backend,
            session: None,
        }
    }

    /// Transport presenting `session` on every call.
    pub fn authenticated(
        endpoint: impl Into<String>,
        backend: Arc<dyn HttpBackend>,
        session: Session,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            backend,
            session: Some(session),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Read request: fields go out as query parameters.
    pub fn get(&self, params: &FieldMap) -> ApplicationResult<String> {
        Ok(self.exchange(Verb::Read, params)?.body)
    }

    /// Mutate request: fields go out as form body.
    pub fn post(&self, fields: &FieldMap) -> ApplicationResult<String> {
        Ok(self.exchange(Verb::Mutate, fields)?.body)
    }

    /// Send `request` with the method its verb calls for.
    pub fn send(&self, request: &Request) -> ApplicationResult<String> {
        Ok(self.exchange(request.verb(), request.fields())?.body)
    }

    /// One HTTP exchange, returning status, body and any cookies set.
    ///
    /// # Errors
    /// [`ApplicationError::Transport`] on network failure. Not retried.
    pub fn exchange(&self, verb: Verb, fields: &FieldMap) -> ApplicationResult<HttpReply> {
        info!(endpoint = %self.endpoint, ?verb, "request {}", fields);
        let tokens = self
            .session
            .as_ref()
            .map(|s| s.tokens.as_slice())
            .unwrap_or_default();

        let result = match verb {
            Verb::Read => self.backend.get(&self.endpoint, fields, tokens),
            Verb::Mutate => self.backend.post(&self.endpoint, fields, tokens),
        };
        let reply = result.map_err(|source| ApplicationError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if !(200..300).contains(&reply.status) {
            warn!(
                status = reply.status,
                "server answered with non-success HTTP status"
            );
        }
        info!(status = reply.status, "response {}", reply.body.trim());
        Ok(reply)
    }
}
