//! Conversational assistant about the deck's subject.

pub mod markup;

use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

use crate::error::ServiceError;

pub const ASSISTANT_NAME: &str = "Project Advisor";

const GREETING: &str = "Good day. I am your **Project Advisor**. I am pleased to assist you with any \
inquiries regarding the **Google** and **AfDB** Affordable Device Financing Model Project.\n\n\
This research framework outlines strategic interventions for bridging the usage gap in Sub-Saharan \
Africa, with a primary focus on the **Nigeria** pilot.\n\n\
How may I provide strategic clarity for you today?";

pub const APOLOGY: &str =
    "I am currently experiencing a connectivity issue. Please retry your inquiry shortly.";
pub const EMPTY_REPLY: &str = "I apologize, I couldn't process that response.";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a Senior Project Expert and Advisor for the Google and AfDB \
Device Financing Project. Your tone is professional, authoritative, and data-driven.\n\
Use the following context from the project report to answer questions:\n\
- Project Goal: Designing a scalable model to accelerate smartphone access in Nigeria.\n\
- The Problem: 80M Nigerians are unconnected; 4G handsets cost >80% of monthly income for the poorest 20%.\n\
- Core Barriers: Affordability, Digital Literacy, and Gender gap (32% in SSA).\n\
- Proposed Models: (1) Blended Finance BNPL (repaid over 6-12 months for consumers >$5 DDI) and \
(2) Smartphone-as-a-Service Subscription (Lease model for <$1.39 DDI).\n\
- Pilot States: Focus on high 4G coverage but low penetration (e.g., Kano, Kaduna, Imo, Osun). \
States with >100% penetration like Lagos are excluded from the initial pilot.\n\
- Key Partners: AfDB (funding/de-risking), Google (Android/skills), MNOs like MTN, and Fintechs.\n\
- Success Metrics: 30% of unconnected Nigerians (24M) migrating to smartphones within 5 years.\n\n\
FORMATTING RULES:\n\
- Use **double asterisks** for emphasis on critical data or entities.\n\
- Use * for bulleted lists.\n\
- Keep responses concise and focused on the report's strategic findings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            text: text.to_string(),
        }
    }

    pub fn model(text: &str) -> Self {
        Self {
            role: Role::Model,
            text: text.to_string(),
        }
    }
}

/// Remote chat model. `history` ends with the newest user message.
pub trait ChatCompleter {
    fn complete(&self, system_prompt: &str, history: &[ChatMessage]) -> Result<String, ServiceError>;
}

/// Transcript plus the "waiting for reply" flag.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    waiting: bool,
    system_prompt: String,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Conversation {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::model(GREETING)],
            waiting: false,
            system_prompt: system_prompt.to_string(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Append a user message and start waiting for the reply.
    ///
    /// Returns `false` (and changes nothing) for blank input or while a reply
    /// is still pending.
    pub fn begin_turn(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.waiting {
            return false;
        }
        self.messages.push(ChatMessage::user(text));
        self.waiting = true;
        true
    }

    /// Record the reply to the pending turn. Failures become a canned apology.
    pub fn finish_turn(&mut self, result: Result<String, ServiceError>) {
        let text = match result {
            Ok(reply) if reply.trim().is_empty() => EMPTY_REPLY.to_string(),
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Chat request failed: {e}");
                APOLOGY.to_string()
            }
        };
        self.messages.push(ChatMessage::model(&text));
        self.waiting = false;
    }

    /// One full turn against `completer`. Returns the reply text, if a turn
    /// was started.
    pub fn send(&mut self, completer: &dyn ChatCompleter, text: &str) -> Option<&str> {
        if !self.begin_turn(text) {
            return None;
        }
        let result = completer.complete(&self.system_prompt, &self.messages);
        self.finish_turn(result);
        self.messages.last().map(|m| m.text.as_str())
    }
}

/// Complete the pending turn on a worker thread and send the result back.
pub fn spawn_reply<C>(
    completer: C,
    conversation: &Conversation,
    tx: Sender<Result<String, ServiceError>>,
) -> JoinHandle<()>
where
    C: ChatCompleter + Send + 'static,
{
    let system_prompt = conversation.system_prompt.clone();
    let history = conversation.messages.clone();
    std::thread::spawn(move || {
        let result = completer.complete(&system_prompt, &history);
        let _ = tx.send(result);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String, ServiceError>,
        seen: Mutex<Vec<usize>>,
    }

    impl Canned {
        fn new(reply: Result<String, ServiceError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatCompleter for Canned {
        fn complete(&self, _system: &str, history: &[ChatMessage]) -> Result<String, ServiceError> {
            self.seen.lock().unwrap().push(history.len());
            self.reply.clone()
        }
    }

    #[test]
    fn test_seeded_with_greeting() {
        let conversation = Conversation::default();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::Model);
        assert!(!conversation.is_waiting());
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut conversation = Conversation::default();
        assert!(!conversation.begin_turn("   "));
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn test_no_second_turn_while_waiting() {
        let mut conversation = Conversation::default();
        assert!(conversation.begin_turn("first"));
        assert!(!conversation.begin_turn("second"));
        assert_eq!(conversation.messages().len(), 2);
        conversation.finish_turn(Ok("reply".to_string()));
        assert!(conversation.begin_turn("second"));
    }

    #[test]
    fn test_send_appends_reply() {
        let completer = Canned::new(Ok("Pay as you go.".to_string()));
        let mut conversation = Conversation::default();
        let reply = conversation.send(&completer, " What is PAYGo? ").map(str::to_string);
        assert_eq!(reply.as_deref(), Some("Pay as you go."));
        assert_eq!(conversation.messages()[1], ChatMessage::user("What is PAYGo?"));
        assert_eq!(*completer.seen.lock().unwrap(), vec![2]);
        assert!(!conversation.is_waiting());
    }

    #[test]
    fn test_failure_becomes_apology() {
        let completer = Canned::new(Err(ServiceError::Failed("offline".to_string())));
        let mut conversation = Conversation::default();
        assert_eq!(conversation.send(&completer, "hello"), Some(APOLOGY));
        assert!(!conversation.is_waiting());
    }

    #[test]
    fn test_empty_reply_is_replaced() {
        let completer = Canned::new(Ok("  ".to_string()));
        let mut conversation = Conversation::default();
        assert_eq!(conversation.send(&completer, "hello"), Some(EMPTY_REPLY));
    }

    #[test]
    fn test_spawn_reply_delivers_result() {
        let mut conversation = Conversation::new("be brief");
        assert!(conversation.begin_turn("hi"));
        let (tx, rx) = std::sync::mpsc::channel();
        spawn_reply(Canned::new(Ok("hello".to_string())), &conversation, tx)
            .join()
            .unwrap();
        conversation.finish_turn(rx.recv().unwrap());
        assert_eq!(conversation.messages().last().unwrap().text, "hello");
        assert_eq!(conversation.system_prompt(), "be brief");
    }
}
