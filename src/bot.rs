use std::sync::Arc;

use tracing::{debug, error, info};

use crate::commands::{CommandEntry, CommandTable};
use crate::config::{Config, TextsConfig, WorkflowConfig};
use crate::error::{ConfigError, WebhookError};
use crate::llm::Completion;
use crate::platform::{AdminNotification, InboundMessage, OutboundReply, Transport, WebhookPayload};

const AI_PREFIX: &str = "/ai ";

/// What a message asks for, decided in a fixed order.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent<'a> {
    SelfEcho,
    /// Prompt after the `/ai ` prefix, already trimmed. May be empty.
    Ai(&'a str),
    Workflow,
    Faq(&'a CommandEntry),
    Menu,
    Fallback,
}

/// Output of classifying one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub reply: Option<OutboundReply>,
    pub notifications: Vec<AdminNotification>,
}

/// Returns the prompt when `text` carries the `/ai` prefix in any case.
///
/// `text` is already trimmed, so a bare `/ai` counts as an empty prompt.
fn strip_ai_prefix(text: &str) -> Option<&str> {
    if text.eq_ignore_ascii_case(AI_PREFIX.trim_end()) {
        return Some("");
    }
    let head = text.get(..AI_PREFIX.len())?;
    if head.eq_ignore_ascii_case(AI_PREFIX) {
        Some(text[AI_PREFIX.len()..].trim())
    } else {
        None
    }
}

pub struct Classifier {
    table: CommandTable,
    texts: TextsConfig,
    workflow: WorkflowConfig,
    ai: Arc<dyn Completion>,
}

impl Classifier {
    pub fn new(
        table: CommandTable,
        texts: TextsConfig,
        workflow: WorkflowConfig,
        ai: Arc<dyn Completion>,
    ) -> Self {
        Self {
            table,
            texts,
            workflow,
            ai,
        }
    }

    pub fn from_config(config: &Config, ai: Arc<dyn Completion>) -> Result<Self, ConfigError> {
        let table = CommandTable::new(config.commands.clone())?;
        Ok(Self::new(
            table,
            config.texts.clone(),
            config.workflow.clone(),
            ai,
        ))
    }

    /// Decide the intent without side effects. First match wins.
    pub fn intent<'a>(&'a self, message: &'a InboundMessage) -> Intent<'a> {
        if message.from_me {
            return Intent::SelfEcho;
        }

        let text = message.text_body.trim();

        if let Some(prompt) = strip_ai_prefix(text) {
            return Intent::Ai(prompt);
        }

        if self.workflow.operator_chat_id.is_some() && text == self.workflow.key {
            return Intent::Workflow;
        }

        if let Some(entry) = self.table.get(text) {
            return Intent::Faq(entry);
        }

        if text.eq_ignore_ascii_case("menu") {
            Intent::Menu
        } else {
            Intent::Fallback
        }
    }

    /// Build the reply and any operator notifications for one message.
    ///
    /// Never fails: completion errors become the reply text.
    pub async fn classify(&self, message: &InboundMessage) -> Classification {
        let intent = self.intent(message);
        debug!("Message from {} classified as {:?}", message.chat_id, intent);

        let reply = |body: String| OutboundReply {
            to: message.chat_id.clone(),
            body,
        };

        match intent {
            Intent::SelfEcho => Classification::default(),
            Intent::Ai(prompt) => {
                let body = if prompt.is_empty() {
                    self.texts.ai_prompt_missing.clone()
                } else {
                    match self.ai.complete(prompt).await {
                        Ok(answer) => answer.trim().to_string(),
                        Err(e) => {
                            error!("Completion failed for {}: {}", message.chat_id, e);
                            format!("{}{}", self.texts.ai_error_prefix, e)
                        }
                    }
                };
                Classification {
                    reply: Some(reply(body)),
                    notifications: Vec::new(),
                }
            }
            Intent::Workflow => {
                let notifications = self
                    .workflow
                    .operator_chat_id
                    .iter()
                    .map(|operator| AdminNotification {
                        to: operator.clone(),
                        body: self
                            .workflow
                            .notification
                            .replace("{sender}", &message.chat_id),
                    })
                    .collect();
                Classification {
                    reply: Some(reply(self.workflow.reply.clone())),
                    notifications,
                }
            }
            Intent::Faq(entry) => Classification {
                reply: Some(reply(entry.render(&self.texts))),
                notifications: Vec::new(),
            },
            // The fallback deliberately repeats the menu.
            Intent::Menu | Intent::Fallback => Classification {
                reply: Some(reply(self.table.render_menu(&self.texts))),
                notifications: Vec::new(),
            },
        }
    }
}

/// Per-batch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub received: usize,
    pub skipped: usize,
    pub replies_sent: usize,
    pub notifications_sent: usize,
    pub failed: usize,
}

pub struct Dispatcher {
    classifier: Classifier,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(classifier: Classifier, transport: Arc<dyn Transport>) -> Self {
        Self {
            classifier,
            transport,
        }
    }

    /// Parse a raw webhook body and dispatch its messages.
    ///
    /// A body that does not parse aborts the whole call before any send.
    pub async fn handle_webhook(&self, body: &[u8]) -> Result<DispatchReport, WebhookError> {
        let payload: WebhookPayload = serde_json::from_slice(body)?;
        Ok(self.dispatch(&payload.messages).await)
    }

    /// Classify and send each message in order. Send failures are logged and counted.
    pub async fn dispatch(&self, messages: &[InboundMessage]) -> DispatchReport {
        let mut report = DispatchReport {
            received: messages.len(),
            ..Default::default()
        };

        for message in messages {
            if message.from_me {
                report.skipped += 1;
                continue;
            }

            let Classification {
                reply,
                notifications,
            } = self.classifier.classify(message).await;

            if let Some(reply) = reply {
                if self.send(&reply).await {
                    report.replies_sent += 1;
                } else {
                    report.failed += 1;
                }
            }

            for notification in notifications {
                if self.send(&OutboundReply::from(notification)).await {
                    report.notifications_sent += 1;
                } else {
                    report.failed += 1;
                }
            }
        }

        info!(
            "Webhook batch done: {} received, {} skipped, {} replies, {} notifications, {} failed",
            report.received,
            report.skipped,
            report.replies_sent,
            report.notifications_sent,
            report.failed
        );
        report
    }

    async fn send(&self, reply: &OutboundReply) -> bool {
        match self.transport.send_text(reply).await {
            Ok(_) => {
                info!("Sent message to {}", reply.to);
                true
            }
            Err(e) => {
                error!("Failed to send message to {}: {}", reply.to, e);
                false
            }
        }
    }
}
