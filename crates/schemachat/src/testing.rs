//! Test doubles shared by module tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::tests::create_test_config;
use crate::conversation::{ChatBackend, ChatMessage};
use crate::identity::{Identity, StaticIdentityProvider};
use crate::project_db::ProjectDatabase;
use crate::shared_state::AppState;

pub(crate) const ADA_TOKEN: &str = "tok-ada";
pub(crate) const ADA_EMAIL: &str = "ada@example.com";
pub(crate) const GRACE_TOKEN: &str = "tok-grace";
pub(crate) const GRACE_EMAIL: &str = "grace@example.com";

enum Script {
    Queue(VecDeque<Option<String>>),
    Repeat(String),
    Fail(String),
}

/// Chat backend that replays canned outputs and records every request.
pub(crate) struct ScriptedBackend {
    script: Mutex<Script>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One output per call; calls past the end get `None`.
    pub(crate) fn new(outputs: Vec<Option<String>>) -> Self {
        Self::with_script(Script::Queue(outputs.into()))
    }

    pub(crate) fn repeating(output: &str) -> Self {
        Self::with_script(Script::Repeat(output.to_string()))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::with_script(Script::Fail(message.to_string()))
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<Option<String>> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match &mut *self.script.lock().unwrap() {
            Script::Queue(outputs) => Ok(outputs.pop_front().flatten()),
            Script::Repeat(output) => Ok(Some(output.clone())),
            Script::Fail(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

/// In-memory state with two known callers: Ada and Grace.
pub(crate) fn test_state(backend: Arc<ScriptedBackend>) -> AppState {
    let identity = StaticIdentityProvider::new()
        .with_token(ADA_TOKEN, Identity::new(ADA_EMAIL))
        .with_token(GRACE_TOKEN, Identity::new(GRACE_EMAIL));
    AppState::new(
        create_test_config(),
        Arc::new(ProjectDatabase::new_in_memory().unwrap()),
        backend,
        Arc::new(identity),
    )
}
