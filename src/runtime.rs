//! Assistant control loop
//!
//! The single consumer of the utterance queue. Each utterance flows
//! sequentially through classification, parsing, dispatch, and speech
//! output; only capture runs concurrently with these steps. Nothing here
//! may terminate the process - an `Exit` command ends the loop gracefully
//! after its batch finishes.

use std::sync::Arc;

use crate::classifier::Classifier;
use crate::dispatch::Dispatcher;
use crate::queue::UtteranceReceiver;
use crate::routing::{Module, RoutingCommand, parse_routing};
use crate::voice::SpeechOutputSession;

/// Fallback batch when the classifier call itself fails
const CLASSIFIER_DOWN_REPLY: &str = "Sorry, something went wrong.";

/// Consumes utterances and drives replies
pub struct Runtime {
    receiver: UtteranceReceiver,
    classifier: Arc<dyn Classifier>,
    dispatcher: Dispatcher,
    output: SpeechOutputSession,
}

impl Runtime {
    /// Assemble the control loop
    #[must_use]
    pub fn new(
        receiver: UtteranceReceiver,
        classifier: Arc<dyn Classifier>,
        dispatcher: Dispatcher,
        output: SpeechOutputSession,
    ) -> Self {
        Self {
            receiver,
            classifier,
            dispatcher,
            output,
        }
    }

    /// Run until an `Exit` command lands or every producer is gone
    pub async fn run(mut self) {
        while let Some(utterance) = self.receiver.recv().await {
            tracing::info!(text = %utterance.text, "processing utterance");

            let commands = self.classify(&utterance.text).await;
            let outcome = self.dispatcher.dispatch(&commands).await;

            if !outcome.reply.is_empty() {
                tracing::info!(reply = %outcome.reply, "speaking reply");
                self.output.speak(&outcome.reply).await;
            }

            if outcome.terminate {
                tracing::info!("exit requested, finishing run loop");
                break;
            }
        }

        tracing::info!("control loop ended");
    }

    /// Classify one utterance into a command batch, never failing
    async fn classify(&self, text: &str) -> Vec<RoutingCommand> {
        match self.classifier.classify(text).await {
            Ok(raw) => parse_routing(&raw),
            Err(e) => {
                tracing::error!(error = %e, "classifier call failed");
                vec![RoutingCommand::new(Module::Chatbot, CLASSIFIER_DOWN_REPLY)]
            }
        }
    }
}
