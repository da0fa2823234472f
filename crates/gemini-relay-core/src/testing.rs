//! Scripted in-memory provider for tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use futures::StreamExt;

use crate::{ChunkStream, CompletionChunk, CompletionProvider, ProviderError};

enum Script {
    Units(Vec<Result<CompletionChunk, ProviderError>>),
    FailToStart(ProviderError),
    Hang,
}

/// Provider that replays queued scripts, one per request.
///
/// Requests beyond the queued scripts receive an empty stream.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    prompts: Mutex<Vec<String>>,
    dropped_hangs: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response made of one unit per fragment.
    #[must_use]
    pub fn then_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let units = fragments
            .into_iter()
            .map(|f| Ok(CompletionChunk::from_fragments([f])))
            .collect();
        self.push(Script::Units(units))
    }

    /// Queue a response made of explicit units and errors.
    #[must_use]
    pub fn then_units(self, units: Vec<Result<CompletionChunk, ProviderError>>) -> Self {
        self.push(Script::Units(units))
    }

    /// Queue a request that fails before streaming.
    #[must_use]
    pub fn then_fail(self, error: ProviderError) -> Self {
        self.push(Script::FailToStart(error))
    }

    /// Queue a response that never produces a unit.
    #[must_use]
    pub fn then_hang(self) -> Self {
        self.push(Script::Hang)
    }

    fn push(self, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(script);
        self
    }

    /// Prompts received so far, in request order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of hanging streams that have been dropped.
    #[must_use]
    pub fn dropped_hangs(&self) -> usize {
        self.dropped_hangs.load(Ordering::SeqCst)
    }
}

struct DropSignal(Arc<AtomicUsize>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn stream(&self, prompt: &str) -> Result<ChunkStream, ProviderError> {
        self.prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(prompt.to_string());

        let script = self
            .scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();

        match script {
            Some(Script::Units(units)) => Ok(futures::stream::iter(units).boxed()),
            Some(Script::FailToStart(e)) => Err(e),
            Some(Script::Hang) => {
                let signal = DropSignal(Arc::clone(&self.dropped_hangs));
                Ok(futures::stream::pending::<Result<CompletionChunk, ProviderError>>()
                    .map(move |chunk| {
                        let _signal = &signal;
                        chunk
                    })
                    .boxed())
            }
            None => Ok(futures::stream::empty().boxed()),
        }
    }
}
