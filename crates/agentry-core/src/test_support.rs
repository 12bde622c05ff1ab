//! Scripted language model for unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::Error;
use crate::llm::{GenerateFuture, Generation, LanguageModel};

pub(crate) const RESEARCH_RESPONSE: &str = "SUMMARY:\nUse a write-through cache\nANALYSIS:\nRedis vs in-process\nRECOMMENDATIONS:\n- Redis\nCONSIDERATIONS:\nEviction policy";

pub(crate) const PLANNING_RESPONSE: &str = "## IMPLEMENTATION_PLAN:\n1. Add Redis\n## TECHNICAL_SPECIFICATIONS:\nGET /cache/:key\n## TIMELINE:\n2 weeks\n## RESOURCES:\nredis 7\n## RISKS_AND_MITIGATIONS:\nStale reads: short TTL";

enum Reply {
    Text(String),
    Fail(String),
}

/// Returns a fixed reply and counts calls
pub(crate) struct ScriptedModel {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn replying(text: &str) -> Self {
        Self::with_reply(Reply::Text(text.to_string()))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Reply::Text(text) => Ok(Generation::from_text("scripted", text.clone())),
                Reply::Fail(message) => Err(Error::LLMError(message.clone())),
            }
        })
    }
}
