//! Streaming relay: one message in, a growing response out.

use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};

use crate::{Accumulator, CompletionProvider, Envelope, ExchangeId, PromptTemplate, ProviderError};

/// Lazy stream of envelopes for one exchange.
///
/// A provider failure is yielded once as the final item.
pub type EnvelopeStream = BoxStream<'static, Result<Envelope, ProviderError>>;

/// Relays single messages to a completion provider.
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn CompletionProvider>,
    template: PromptTemplate,
}

impl Relay {
    /// Create a relay using the default prompt template.
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
        }
    }

    /// Replace the prompt template.
    #[must_use]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Start an exchange for one inbound message.
    ///
    /// Nothing is sent to the provider until the envelope stream is first polled.
    #[must_use]
    pub fn start(&self, message: &str) -> Exchange {
        let id = ExchangeId::new();
        let prompt = self.template.render(message);
        let provider = Arc::clone(&self.provider);

        let envelopes = async_stream::stream! {
            let mut units = match provider.stream(&prompt).await {
                Ok(units) => units,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut acc = Accumulator::new(id);
            while let Some(next) = units.next().await {
                match next {
                    Ok(unit) => {
                        if !unit.has_content() {
                            tracing::trace!(exchange_id = %id, "Skipping unit without candidates");
                            continue;
                        }
                        for fragment in unit.into_fragments() {
                            yield Ok(acc.push(&fragment));
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            tracing::debug!(
                exchange_id = %id,
                fragments = acc.fragments(),
                chars = acc.text().len(),
                "Exchange complete"
            );
        };

        Exchange {
            id,
            envelopes: envelopes.boxed(),
        }
    }
}

/// One in-flight request/response cycle.
pub struct Exchange {
    id: ExchangeId,
    envelopes: EnvelopeStream,
}

impl Exchange {
    #[must_use]
    pub const fn id(&self) -> ExchangeId {
        self.id
    }

    /// Consume the exchange into its envelope stream.
    #[must_use]
    pub fn into_stream(self) -> EnvelopeStream {
        self.envelopes
    }
}
