//! Pure state transition function
//!
//! Given the current session, the (immutable) conversation tree, and one
//! event, produce the next session plus the effects the runtime must
//! execute. No I/O happens here; timers, persistence, and broadcast are
//! all expressed as [`Effect`]s.

use super::link::{default_contact_body, whatsapp_link};
use super::state::{ChatContext, ChatLink, ChatMessage, ChatSession, Phase};
use super::template::interpolate;
use super::{Effect, Event};
use crate::pricing::{self, format_brl};
use crate::tree::{ChoiceOption, ConversationTree, NodeKind, START_NODE_ID};
use std::time::Duration;
use thiserror::Error;

/// Pause shown as "typing" before the first message and before a node's
/// closing decision.
pub const TYPING_DELAY: Duration = Duration::from_millis(300);
/// Pause between consecutive bot messages of one node.
pub const MESSAGE_DELAY: Duration = Duration::from_millis(600);
/// Grace period before client-side navigation on an internal redirect.
pub const NAV_DELAY: Duration = Duration::from_millis(800);

/// Upload cap, 10 MB.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
const ALLOWED_FILE_TYPES: [&str; 4] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "application/pdf",
];

/// Result of a state transition.
#[derive(Debug)]
pub struct TransitionResult {
    pub session: ChatSession,
    pub effects: Vec<Effect>,
}

/// Recoverable, user-facing rejections. The session is untouched when one
/// of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Nenhuma opção disponível no momento")]
    NoActiveOptions,
    #[error("Não estou aguardando uma resposta de texto")]
    NotAwaitingInput,
    #[error("Digite uma mensagem")]
    EmptyInput,
    #[error("Envio de arquivo não disponível aqui")]
    FileNotAccepted,
    #[error("Arquivo > 10MB")]
    FileTooLarge,
    #[error("Tipo inválido")]
    InvalidFileType,
}

/// Apply one event. Pure relative to the event loop: same session, tree,
/// and event always make the same decisions (message ids/timestamps aside).
pub fn transition(
    session: &ChatSession,
    tree: &ConversationTree,
    ctx: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let mut work = Work {
        tree,
        ctx,
        session: session.clone(),
        effects: Vec::new(),
        dirty: false,
    };

    match event {
        Event::Started => {
            let entry = work.session.current_node_id.clone();
            work.enter(entry);
        }
        Event::Opened => work.resume(),
        Event::Closed => {
            work.effects.push(Effect::CancelTimers);
            work.effects.push(Effect::SetTyping(false));
        }
        Event::PacerElapsed { seq } => work.tick(seq),
        Event::OptionSelected { label, target } => work.select_option(&label, &target)?,
        Event::TextSubmitted { text } => work.submit_text(&text)?,
        Event::FileSubmitted {
            name,
            size_bytes,
            mime_type,
        } => work.submit_file(&name, size_bytes, &mime_type)?,
        Event::Reset => work.reset(),
    }

    if work.dirty {
        work.effects.push(Effect::SaveSession);
    }
    Ok(TransitionResult {
        session: work.session,
        effects: work.effects,
    })
}

/// Re-rank options descending by historical click count for each target.
/// Stable: ties keep the tree's original order.
pub(crate) fn rank_options(
    options: &[ChoiceOption],
    click_counts: &std::collections::BTreeMap<String, u32>,
) -> Vec<ChoiceOption> {
    let mut ranked = options.to_vec();
    ranked.sort_by_key(|o| std::cmp::Reverse(click_counts.get(&o.target).copied().unwrap_or(0)));
    ranked
}

struct Work<'t> {
    tree: &'t ConversationTree,
    ctx: &'t ChatContext,
    session: ChatSession,
    effects: Vec<Effect>,
    dirty: bool,
}

impl Work<'_> {
    fn next_seq(&mut self) -> u64 {
        self.session.pacer_seq += 1;
        self.session.pacer_seq
    }

    fn schedule(&mut self, delay: Duration) -> u64 {
        let seq = self.next_seq();
        self.effects.push(Effect::SchedulePacer { delay, seq });
        seq
    }

    fn append(&mut self, message: ChatMessage) {
        self.session.messages.push(message);
        self.dirty = true;
    }

    /// Enter a node: calculation nodes run synchronously and chain onward;
    /// everything else starts the paced message sequence.
    fn enter(&mut self, node_id: String) {
        let tree = self.tree;
        let mut node_id = node_id;
        loop {
            self.session.current_node_id.clone_from(&node_id);
            if node_id == START_NODE_ID {
                self.effects.push(Effect::MarkWelcomed);
            }

            let Some(node) = tree.get(&node_id) else {
                // Missing node: stop progression on this path, no crash.
                self.session.phase = Phase::Halted { missing: node_id };
                return;
            };

            if let NodeKind::Calculation { next_node_id } = &node.kind {
                self.run_calculation();
                node_id = next_node_id.clone();
                continue;
            }

            self.effects.push(Effect::CancelTimers);
            self.effects.push(Effect::SetTyping(true));
            let seq = self.schedule(TYPING_DELAY);
            self.session.phase = Phase::Typing { node: node_id, seq };
            return;
        }
    }

    /// Reschedule the interrupted delivery step after the widget reopens.
    /// Already-delivered messages are never replayed.
    fn resume(&mut self) {
        match self.session.phase.clone() {
            Phase::Typing { node, .. } => {
                self.effects.push(Effect::SetTyping(true));
                let seq = self.schedule(TYPING_DELAY);
                self.session.phase = Phase::Typing { node, seq };
            }
            Phase::Delivering { node, next, .. } => {
                self.effects.push(Effect::SetTyping(true));
                let seq = self.schedule(MESSAGE_DELAY);
                self.session.phase = Phase::Delivering { node, next, seq };
            }
            Phase::Concluding { node, .. } => {
                self.effects.push(Effect::SetTyping(true));
                let seq = self.schedule(TYPING_DELAY);
                self.session.phase = Phase::Concluding { node, seq };
            }
            _ => {}
        }
    }

    fn tick(&mut self, seq: u64) {
        match self.session.phase.clone() {
            Phase::Typing { node, seq: s } if s == seq => {
                let Some(n) = self.tree.get(&node) else {
                    self.session.phase = Phase::Halted { missing: node };
                    return;
                };
                if n.bot_messages.is_empty() {
                    let seq = self.schedule(TYPING_DELAY);
                    self.session.phase = Phase::Concluding { node, seq };
                } else {
                    let seq = self.schedule(MESSAGE_DELAY);
                    self.session.phase = Phase::Delivering { node, next: 0, seq };
                }
            }
            Phase::Delivering { node, next, seq: s } if s == seq => {
                let tree = self.tree;
                let Some(n) = tree.get(&node) else {
                    self.session.phase = Phase::Halted { missing: node };
                    return;
                };
                if let Some(raw) = n.bot_messages.get(next) {
                    let text = interpolate(raw, &self.session.collected_data);
                    self.append(ChatMessage::bot_text(text));
                }
                if next + 1 < n.bot_messages.len() {
                    let seq = self.schedule(MESSAGE_DELAY);
                    self.session.phase = Phase::Delivering {
                        node,
                        next: next + 1,
                        seq,
                    };
                } else {
                    let seq = self.schedule(TYPING_DELAY);
                    self.session.phase = Phase::Concluding { node, seq };
                }
            }
            Phase::Concluding { node, seq: s } if s == seq => {
                self.effects.push(Effect::SetTyping(false));
                self.conclude(&node);
            }
            // Stale or unexpected tick: the timer belonged to a node we
            // already left.
            _ => {}
        }
    }

    /// The node's closing decision once all its messages are out.
    fn conclude(&mut self, node_id: &str) {
        let tree = self.tree;
        let Some(node) = tree.get(node_id) else {
            self.session.phase = Phase::Halted {
                missing: node_id.to_string(),
            };
            return;
        };

        match &node.kind {
            NodeKind::OptionsQuestion { options, .. } => {
                let ranked = rank_options(options, &self.session.context.click_counts);
                self.append(ChatMessage::bot_options(ranked));
                self.session.phase = Phase::AwaitingOption;
            }
            NodeKind::InputQuestion {
                requests_file_upload,
                ..
            } => {
                self.session.phase = Phase::AwaitingInput {
                    file_upload: *requests_file_upload,
                };
            }
            NodeKind::Message { next_node_id } => match next_node_id.clone() {
                Some(next) => self.enter(next),
                None => self.session.phase = Phase::Idle,
            },
            NodeKind::MessageWithLink {
                next_node_id,
                link_text,
                whatsapp_template,
                icon_name,
            } => {
                let data = &self.session.collected_data;
                let body = match whatsapp_template {
                    Some(template) => interpolate(template, data),
                    None => default_contact_body(
                        data.get("userName").map_or("", String::as_str),
                        data.get("projectInfo").map_or("", String::as_str),
                    ),
                };
                let url = whatsapp_link(&self.ctx.whatsapp_number, &body);
                self.append(ChatMessage::bot_link(ChatLink {
                    text: link_text.clone(),
                    url,
                    external: true,
                    icon: icon_name.clone(),
                }));
                self.enter(next_node_id.clone());
            }
            NodeKind::InternalRedirect { link, next_node_id } => {
                self.effects.push(Effect::Navigate {
                    path: link.clone(),
                    delay: NAV_DELAY,
                });
                self.enter(next_node_id.clone());
            }
            NodeKind::ExternalRedirect {
                link,
                link_text,
                next_node_id,
                icon_name,
            } => {
                self.append(ChatMessage::bot_link(ChatLink {
                    text: link_text.clone(),
                    url: link.clone(),
                    external: true,
                    icon: icon_name.clone(),
                }));
                match next_node_id.clone() {
                    Some(next) => self.enter(next),
                    None => self.session.phase = Phase::Idle,
                }
            }
            NodeKind::Calculation { next_node_id } => {
                self.run_calculation();
                self.enter(next_node_id.clone());
            }
        }
    }

    /// Fold the estimator output into collected data as display strings.
    /// Unparseable or unknown inputs just skip the fold; the flow advances
    /// either way.
    fn run_calculation(&mut self) {
        let data = &self.session.collected_data;
        let service = data
            .get("quoteService")
            .and_then(|s| pricing::Service::from_slug(s));
        let quality = data
            .get("quoteQuality")
            .and_then(|q| pricing::Quality::from_slug(q));
        let area = data
            .get("quoteArea")
            .and_then(|a| a.trim().parse::<f64>().ok());

        let (Some(service), Some(quality), Some(area)) = (service, quality, area) else {
            return;
        };
        let Some(estimate) = pricing::estimate(service, area, quality) else {
            return;
        };

        let data = &mut self.session.collected_data;
        data.insert("estimateTotal".to_string(), format_brl(estimate.total));
        data.insert(
            "estimateMaterials".to_string(),
            format_brl(estimate.material_cost),
        );
        data.insert("estimateLabor".to_string(), format_brl(estimate.labor_cost));
        data.insert(
            "estimateDays".to_string(),
            format!("{} dias úteis", estimate.estimated_days),
        );
        self.dirty = true;
    }

    fn select_option(&mut self, label: &str, target: &str) -> Result<(), TransitionError> {
        if self.session.phase != Phase::AwaitingOption {
            return Err(TransitionError::NoActiveOptions);
        }

        self.append(ChatMessage::user_text(label));
        *self
            .session
            .context
            .click_counts
            .entry(target.to_string())
            .or_insert(0) += 1;

        if let Some(node) = self.tree.get(&self.session.current_node_id) {
            if let NodeKind::OptionsQuestion {
                options,
                next_state_key: Some(key),
            } = &node.kind
            {
                let value = options
                    .iter()
                    .find(|o| o.target == target && o.label == label)
                    .and_then(|o| o.value.clone())
                    .unwrap_or_else(|| label.trim().to_string());
                self.session.collected_data.insert(key.clone(), value);
            }
        }

        // A choice was made; stale option lists must not stay clickable.
        for message in &mut self.session.messages {
            message.options = None;
        }

        let visited = self.session.current_node_id.clone();
        self.session.history.push(visited);
        self.dirty = true;
        self.enter(target.to_string());
        Ok(())
    }

    fn submit_text(&mut self, text: &str) -> Result<(), TransitionError> {
        let Phase::AwaitingInput { .. } = self.session.phase else {
            return Err(TransitionError::NotAwaitingInput);
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TransitionError::EmptyInput);
        }

        let Some(node) = self.tree.get(&self.session.current_node_id) else {
            return Err(TransitionError::NotAwaitingInput);
        };
        let NodeKind::InputQuestion {
            next_state_key,
            next_node_id,
            ..
        } = &node.kind
        else {
            return Err(TransitionError::NotAwaitingInput);
        };
        let (key, next) = (next_state_key.clone(), next_node_id.clone());

        self.session
            .collected_data
            .insert(key, trimmed.to_string());
        self.append(ChatMessage::user_text(trimmed));
        let visited = self.session.current_node_id.clone();
        self.session.history.push(visited);
        self.enter(next);
        Ok(())
    }

    fn submit_file(
        &mut self,
        name: &str,
        size_bytes: u64,
        mime_type: &str,
    ) -> Result<(), TransitionError> {
        let Phase::AwaitingInput { file_upload } = self.session.phase else {
            return Err(TransitionError::FileNotAccepted);
        };
        if !file_upload {
            return Err(TransitionError::FileNotAccepted);
        }
        if size_bytes > MAX_FILE_BYTES {
            return Err(TransitionError::FileTooLarge);
        }
        if !ALLOWED_FILE_TYPES.contains(&mime_type) {
            return Err(TransitionError::InvalidFileType);
        }

        let Some(node) = self.tree.get(&self.session.current_node_id) else {
            return Err(TransitionError::FileNotAccepted);
        };
        let NodeKind::InputQuestion { next_node_id, .. } = &node.kind else {
            return Err(TransitionError::FileNotAccepted);
        };
        let next = next_node_id.clone();

        self.session
            .collected_data
            .insert("file".to_string(), name.to_string());
        self.append(ChatMessage::user_text(format!("📎 {name}")));
        let visited = self.session.current_node_id.clone();
        self.session.history.push(visited);
        self.enter(next);
        Ok(())
    }

    fn reset(&mut self) {
        self.effects.push(Effect::CancelTimers);
        self.effects.push(Effect::SetTyping(false));
        self.effects.push(Effect::ClearSaved);
        self.effects.push(Effect::ClearWelcomed);

        // Keep the sequence counter so ticks from before the reset can
        // never match a freshly scheduled timer.
        let seq = self.session.pacer_seq;
        self.session = ChatSession::fresh(START_NODE_ID);
        self.session.pacer_seq = seq;
        self.dirty = false;
        self.enter(START_NODE_ID.to_string());
    }
}
