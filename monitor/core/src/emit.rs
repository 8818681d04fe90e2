//! Emit Wizard
//!
//! Three prompts that compose an event and send it to one socket or all of
//! them:
//!
//! ```text
//!   Idle ──e/b──► PickedTarget ──► TypingEventName ──Enter──► TypingPayload
//!    ▲                                  │                       │     │
//!    │                                 Esc                  bad JSON  Enter (valid)
//!    │                                  ▼                       │     ▼
//!    └──────────── Idle ◄──────────────┘    (buffer cleared) ◄─┘  Dispatched
//!    └──────────────────────── display delay ──────────────────────────┘
//! ```
//!
//! The target is captured when the wizard opens. Later selection changes or
//! reaps never retarget an emit already in progress.

use serde_json::Value;

use crate::transport::ConnectionId;

/// Wizard state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitStage {
    /// Not emitting; keys go to the list
    #[default]
    Idle,
    /// Target captured, about to prompt
    PickedTarget,
    /// Typing the event name
    TypingEventName,
    /// Typing the JSON payload
    TypingPayload,
    /// Sent; summary shown until the display delay elapses
    Dispatched,
}

/// Who receives the event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmitTarget {
    /// Every registered socket
    Broadcast,
    /// One socket, as selected when the wizard opened
    Connection {
        /// Socket ID
        id: ConnectionId,
        /// Address shown in the summary line
        remote_address: String,
    },
}

/// Inline notice under the payload prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitNotice {
    /// The payload did not parse as JSON
    InvalidPayload,
}

/// A composed event ready to send
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    /// Recipient(s)
    pub target: EmitTarget,
    /// Event name
    pub name: String,
    /// Parsed payload
    pub data: Value,
    /// Identifies this dispatch when its display timer fires
    pub generation: u64,
}

/// What a confirm keypress did
#[derive(Clone, Debug, PartialEq)]
pub enum ConfirmOutcome {
    /// Nothing to confirm (idle, dispatched, or empty event name)
    Ignored,
    /// Event name accepted; now prompting for the payload
    AwaitingPayload,
    /// Payload parsed; send it
    Dispatched(Dispatch),
    /// Payload did not parse; buffer cleared for another try
    Rejected,
}

/// The emit wizard
#[derive(Clone, Debug, Default)]
pub struct EmitMachine {
    stage: EmitStage,
    target: Option<EmitTarget>,
    event_name: String,
    payload: String,
    notice: Option<EmitNotice>,
    generation: u64,
}

impl EmitMachine {
    /// Idle wizard
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage
    #[must_use]
    pub fn stage(&self) -> EmitStage {
        self.stage
    }

    /// Whether the wizard owns the screen
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.stage != EmitStage::Idle
    }

    /// Captured target
    #[must_use]
    pub fn target(&self) -> Option<&EmitTarget> {
        self.target.as_ref()
    }

    /// Event name typed so far
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Payload typed so far
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Inline notice, if any
    #[must_use]
    pub fn notice(&self) -> Option<EmitNotice> {
        self.notice
    }

    /// Open the wizard. Only valid from `Idle`.
    pub fn begin(&mut self, target: EmitTarget) -> bool {
        if self.stage != EmitStage::Idle {
            return false;
        }
        self.stage = EmitStage::PickedTarget;
        tracing::debug!(emit_target = ?target, "Emit target picked");
        self.target = Some(target);
        self.stage = EmitStage::TypingEventName;
        true
    }

    fn buffer_mut(&mut self) -> Option<&mut String> {
        match self.stage {
            EmitStage::TypingEventName => Some(&mut self.event_name),
            EmitStage::TypingPayload => Some(&mut self.payload),
            _ => None,
        }
    }

    /// Append a typed character to the active buffer
    pub fn push_char(&mut self, c: char) -> bool {
        let Some(buffer) = self.buffer_mut() else {
            return false;
        };
        buffer.push(c);
        self.notice = None;
        true
    }

    /// Delete the last character of the active buffer
    pub fn backspace(&mut self) -> bool {
        self.buffer_mut().and_then(String::pop).is_some()
    }

    /// Accept the active prompt
    pub fn confirm(&mut self) -> ConfirmOutcome {
        match self.stage {
            EmitStage::TypingEventName if !self.event_name.is_empty() => {
                self.stage = EmitStage::TypingPayload;
                ConfirmOutcome::AwaitingPayload
            }
            EmitStage::TypingPayload => match serde_json::from_str::<Value>(&self.payload) {
                Ok(data) => {
                    let Some(target) = self.target.clone() else {
                        return ConfirmOutcome::Ignored;
                    };
                    self.generation += 1;
                    self.stage = EmitStage::Dispatched;
                    self.notice = None;
                    ConfirmOutcome::Dispatched(Dispatch {
                        target,
                        name: self.event_name.clone(),
                        data,
                        generation: self.generation,
                    })
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Rejected emit payload");
                    self.payload.clear();
                    self.notice = Some(EmitNotice::InvalidPayload);
                    ConfirmOutcome::Rejected
                }
            },
            _ => ConfirmOutcome::Ignored,
        }
    }

    /// Abandon the wizard from any typing stage
    pub fn cancel(&mut self) -> bool {
        match self.stage {
            EmitStage::PickedTarget | EmitStage::TypingEventName | EmitStage::TypingPayload => {
                self.reset();
                true
            }
            EmitStage::Idle | EmitStage::Dispatched => false,
        }
    }

    /// Close the summary of dispatch `generation`.
    ///
    /// A timer left over from an earlier dispatch is ignored.
    pub fn finish(&mut self, generation: u64) -> bool {
        if self.stage == EmitStage::Dispatched && self.generation == generation {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Return to `Idle` unconditionally, clearing buffers
    pub fn reset(&mut self) {
        let generation = self.generation;
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn type_str(machine: &mut EmitMachine, text: &str) {
        for c in text.chars() {
            assert!(machine.push_char(c));
        }
    }

    fn target() -> EmitTarget {
        EmitTarget::Connection {
            id: ConnectionId::from_raw(1),
            remote_address: "10.0.0.1:5000".to_string(),
        }
    }

    #[test]
    fn test_full_emit_flow() {
        let mut machine = EmitMachine::new();
        assert!(machine.begin(target()));
        assert_eq!(machine.stage(), EmitStage::TypingEventName);

        type_str(&mut machine, "ping");
        assert_eq!(machine.confirm(), ConfirmOutcome::AwaitingPayload);
        type_str(&mut machine, r#"{"x":1}"#);

        let ConfirmOutcome::Dispatched(dispatch) = machine.confirm() else {
            panic!("expected dispatch");
        };
        assert_eq!(dispatch.name, "ping");
        assert_eq!(dispatch.data, json!({"x": 1}));
        assert_eq!(dispatch.target, target());
        assert_eq!(machine.stage(), EmitStage::Dispatched);

        assert!(machine.finish(dispatch.generation));
        assert_eq!(machine.stage(), EmitStage::Idle);
        assert!(machine.event_name().is_empty());
        assert!(machine.target().is_none());
    }

    #[test]
    fn test_invalid_payload_clears_buffer() {
        let mut machine = EmitMachine::new();
        machine.begin(EmitTarget::Broadcast);
        type_str(&mut machine, "ping");
        machine.confirm();
        type_str(&mut machine, "{bad");

        assert_eq!(machine.confirm(), ConfirmOutcome::Rejected);
        assert_eq!(machine.stage(), EmitStage::TypingPayload);
        assert_eq!(machine.payload(), "");
        assert_eq!(machine.notice(), Some(EmitNotice::InvalidPayload));

        machine.push_char('1');
        assert_eq!(machine.notice(), None);
    }

    #[test]
    fn test_empty_event_name_is_not_accepted() {
        let mut machine = EmitMachine::new();
        machine.begin(EmitTarget::Broadcast);
        assert_eq!(machine.confirm(), ConfirmOutcome::Ignored);
        assert_eq!(machine.stage(), EmitStage::TypingEventName);
    }

    #[test]
    fn test_cancel_from_each_typing_stage() {
        let mut machine = EmitMachine::new();
        machine.begin(EmitTarget::Broadcast);
        type_str(&mut machine, "a");
        assert!(machine.cancel());
        assert_eq!(machine.stage(), EmitStage::Idle);
        assert_eq!(machine.event_name(), "");

        machine.begin(EmitTarget::Broadcast);
        type_str(&mut machine, "a");
        machine.confirm();
        type_str(&mut machine, "[1");
        assert!(machine.cancel());
        assert_eq!(machine.payload(), "");
        assert!(!machine.cancel());
    }

    #[test]
    fn test_dispatched_ignores_input_and_cancel() {
        let mut machine = EmitMachine::new();
        machine.begin(EmitTarget::Broadcast);
        type_str(&mut machine, "a");
        machine.confirm();
        type_str(&mut machine, "1");
        assert!(matches!(machine.confirm(), ConfirmOutcome::Dispatched(_)));

        assert!(!machine.push_char('x'));
        assert!(!machine.backspace());
        assert!(!machine.cancel());
        assert_eq!(machine.confirm(), ConfirmOutcome::Ignored);
        assert!(!machine.begin(EmitTarget::Broadcast));
    }

    #[test]
    fn test_stale_finish_is_ignored() {
        let mut machine = EmitMachine::new();
        machine.begin(EmitTarget::Broadcast);
        type_str(&mut machine, "a");
        machine.confirm();
        type_str(&mut machine, "1");
        let ConfirmOutcome::Dispatched(first) = machine.confirm() else {
            panic!("expected dispatch");
        };
        machine.reset();

        machine.begin(EmitTarget::Broadcast);
        type_str(&mut machine, "b");
        machine.confirm();
        type_str(&mut machine, "2");
        let ConfirmOutcome::Dispatched(second) = machine.confirm() else {
            panic!("expected dispatch");
        };

        assert!(!machine.finish(first.generation));
        assert_eq!(machine.stage(), EmitStage::Dispatched);
        assert!(machine.finish(second.generation));
    }

    #[test]
    fn test_backspace_edits_active_buffer() {
        let mut machine = EmitMachine::new();
        assert!(!machine.backspace());
        machine.begin(EmitTarget::Broadcast);
        type_str(&mut machine, "pin");
        assert!(machine.backspace());
        assert_eq!(machine.event_name(), "pi");
        machine.backspace();
        machine.backspace();
        assert!(!machine.backspace());
    }
}
