//! Test helpers: logging setup and a scripted HTTP backend.

use std::collections::VecDeque;
use std::env;
use std::sync::{Mutex, Once, PoisonError};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{FieldMap, Token, Verb};
use crate::infrastructure::traits::{BackendError, HttpBackend, HttpReply};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // reqwest and its connection pool are noisy at trace level
    let noisy_modules = ["hyper", "reqwest"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// One call seen by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub verb: Verb,
    pub url: String,
    pub fields: FieldMap,
    pub tokens: Vec<Token>,
}

/// HTTP backend answering from a queue of canned replies.
///
/// Each call pops the next reply and records what was sent. Running out of
/// replies is reported as a network failure.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<HttpReply, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: HttpReply) -> Self {
        self.push(Ok(reply));
        self
    }

    /// Queue a 200 reply with `body` and no cookies.
    pub fn reply_body(self, body: &str) -> Self {
        self.reply(HttpReply::ok(body))
    }

    /// Queue a network failure.
    pub fn fail(self, message: &str) -> Self {
        self.push(Err(message.to_string()));
        self
    }

    /// Everything sent so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replies not consumed yet.
    pub fn pending(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(&self, reply: Result<HttpReply, String>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    fn answer(
        &self,
        verb: Verb,
        url: &str,
        fields: &FieldMap,
        tokens: &[Token],
    ) -> Result<HttpReply, BackendError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                verb,
                url: url.to_string(),
                fields: fields.clone(),
                tokens: tokens.to_vec(),
            });
        match self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(BackendError::new(message)),
            None => Err(BackendError::new("no scripted reply left")),
        }
    }
}

impl HttpBackend for ScriptedBackend {
    fn get(
        &self,
        url: &str,
        fields: &FieldMap,
        tokens: &[Token],
    ) -> Result<HttpReply, BackendError> {
        self.answer(Verb::Read, url, fields, tokens)
    }

    fn post(
        &self,
        url: &str,
        fields: &FieldMap,
        tokens: &[Token],
    ) -> Result<HttpReply, BackendError> {
        self.answer(Verb::Mutate, url, fields, tokens)
    }
}
