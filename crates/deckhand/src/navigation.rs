//! Slide navigation, the authoring-mode gate and the keyboard command surface.

/// Built-in authoring secret, used when `authoring.password` is not configured.
pub const DEFAULT_PASSWORD: &str = "deckhand-author";

/// Next index, clamped at the last slide (no wraparound).
pub fn next_index(current: usize, len: usize) -> usize {
    if current + 1 < len {
        current + 1
    } else {
        current
    }
}

/// Previous index, clamped at zero.
pub fn prev_index(current: usize) -> usize {
    current.saturating_sub(1)
}

/// Resolve 1-based user input to an index. Out-of-range input yields `None`.
pub fn jump_index(n: usize, len: usize) -> Option<usize> {
    if (1..=len).contains(&n) {
        Some(n - 1)
    } else {
        None
    }
}

/// Open password challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Challenge {
    pub input: String,
    /// Set after a wrong submission, cleared on the next keystroke.
    pub incorrect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordOutcome {
    Accepted,
    Rejected,
    /// No challenge was open.
    Ignored,
}

/// Authoring-mode state: off by default, entered through a password challenge.
#[derive(Debug, Clone, Default)]
pub struct AuthoringGate {
    authoring: bool,
    challenge: Option<Challenge>,
    manager_open: bool,
    jump_input: Option<String>,
}

impl AuthoringGate {
    pub fn is_authoring(&self) -> bool {
        self.authoring
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    pub fn is_manager_open(&self) -> bool {
        self.manager_open
    }

    pub fn jump_input_mut(&mut self) -> Option<&mut String> {
        self.jump_input.as_mut()
    }

    pub fn is_jump_open(&self) -> bool {
        self.jump_input.is_some()
    }

    /// Enter (via challenge) or leave authoring mode.
    ///
    /// Leaving also closes the slide manager.
    pub fn request_toggle(&mut self) {
        if self.authoring {
            self.authoring = false;
            self.manager_open = false;
        } else {
            self.challenge = Some(Challenge::default());
        }
    }

    /// Compare the challenge input against `secret`.
    pub fn submit_password(&mut self, secret: &str) -> PasswordOutcome {
        let Some(challenge) = self.challenge.as_mut() else {
            return PasswordOutcome::Ignored;
        };
        if challenge.input == secret {
            self.challenge = None;
            self.authoring = true;
            log::info!("Entered authoring mode");
            PasswordOutcome::Accepted
        } else {
            challenge.input.clear();
            challenge.incorrect = true;
            PasswordOutcome::Rejected
        }
    }

    /// Record a keystroke in the challenge input.
    pub fn challenge_keystroke(&mut self, ch: char) {
        if let Some(challenge) = self.challenge.as_mut() {
            challenge.input.push(ch);
            challenge.incorrect = false;
        }
    }

    pub fn challenge_backspace(&mut self) {
        if let Some(challenge) = self.challenge.as_mut() {
            challenge.input.pop();
            challenge.incorrect = false;
        }
    }

    pub fn cancel_challenge(&mut self) {
        self.challenge = None;
    }

    /// Open or close the slide manager. Only available in authoring mode.
    pub fn toggle_manager(&mut self) {
        if self.authoring {
            self.manager_open = !self.manager_open;
        }
    }

    pub fn close_manager(&mut self) {
        self.manager_open = false;
    }

    /// Open the jump-to-slide input, pre-filled with the current 1-based position.
    pub fn open_jump(&mut self, current: usize) {
        self.jump_input = Some((current + 1).to_string());
    }

    /// Close the jump input and return the parsed slide number, if any.
    pub fn submit_jump(&mut self) -> Option<usize> {
        self.jump_input
            .take()
            .and_then(|input| input.trim().parse::<usize>().ok())
    }

    pub fn cancel_jump(&mut self) {
        self.jump_input = None;
    }
}

/// Keys that carry a meaning in the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowRight,
    ArrowDown,
    ArrowLeft,
    ArrowUp,
    Space,
    M,
    A,
    J,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    ToggleAuthoring,
    ToggleManager,
    OpenJump,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext {
    pub text_focused: bool,
    pub challenge_open: bool,
    pub authoring: bool,
}

/// Map a key press to a command.
///
/// The surface is inert while a text input has focus or the password
/// challenge is open.
pub fn command_for(key: Key, ctx: KeyContext) -> Option<Command> {
    if ctx.text_focused || ctx.challenge_open {
        return None;
    }
    match key {
        Key::ArrowRight | Key::ArrowDown | Key::Space => Some(Command::Next),
        Key::ArrowLeft | Key::ArrowUp => Some(Command::Prev),
        Key::M => Some(Command::ToggleAuthoring),
        Key::A if ctx.authoring => Some(Command::ToggleManager),
        Key::A => None,
        Key::J => Some(Command::OpenJump),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prev_clamp() {
        assert_eq!(next_index(0, 3), 1);
        assert_eq!(next_index(2, 3), 2);
        assert_eq!(prev_index(1), 0);
        assert_eq!(prev_index(0), 0);
    }

    #[test]
    fn test_jump_index_range() {
        assert_eq!(jump_index(1, 3), Some(0));
        assert_eq!(jump_index(3, 3), Some(2));
        assert_eq!(jump_index(0, 3), None);
        assert_eq!(jump_index(4, 3), None);
    }

    #[test]
    fn test_wrong_password_keeps_challenge_open() {
        let mut gate = AuthoringGate::default();
        gate.request_toggle();
        for ch in "nope".chars() {
            gate.challenge_keystroke(ch);
        }
        assert_eq!(gate.submit_password("secret"), PasswordOutcome::Rejected);
        assert!(!gate.is_authoring());
        let challenge = gate.challenge().unwrap();
        assert!(challenge.incorrect);
        assert!(challenge.input.is_empty());

        gate.challenge_keystroke('s');
        assert!(!gate.challenge().unwrap().incorrect);
        gate.challenge_backspace();
        assert!(gate.challenge().unwrap().input.is_empty());
    }

    #[test]
    fn test_correct_password_enters_authoring() {
        let mut gate = AuthoringGate::default();
        gate.request_toggle();
        for ch in "secret".chars() {
            gate.challenge_keystroke(ch);
        }
        assert_eq!(gate.submit_password("secret"), PasswordOutcome::Accepted);
        assert!(gate.is_authoring());
        assert!(gate.challenge().is_none());
    }

    #[test]
    fn test_submit_without_challenge_is_ignored() {
        let mut gate = AuthoringGate::default();
        assert_eq!(gate.submit_password("secret"), PasswordOutcome::Ignored);
    }

    #[test]
    fn test_leaving_authoring_closes_manager() {
        let mut gate = AuthoringGate::default();
        gate.request_toggle();
        for ch in DEFAULT_PASSWORD.chars() {
            gate.challenge_keystroke(ch);
        }
        gate.submit_password(DEFAULT_PASSWORD);
        gate.toggle_manager();
        assert!(gate.is_manager_open());

        gate.request_toggle();
        assert!(!gate.is_authoring());
        assert!(!gate.is_manager_open());
    }

    #[test]
    fn test_manager_requires_authoring() {
        let mut gate = AuthoringGate::default();
        gate.toggle_manager();
        assert!(!gate.is_manager_open());
    }

    #[test]
    fn test_jump_input_prefilled() {
        let mut gate = AuthoringGate::default();
        gate.open_jump(4);
        assert_eq!(gate.jump_input_mut().map(|s| s.clone()), Some("5".to_string()));
        assert_eq!(gate.submit_jump(), Some(5));
        assert!(!gate.is_jump_open());

        gate.open_jump(0);
        *gate.jump_input_mut().unwrap() = "abc".to_string();
        assert_eq!(gate.submit_jump(), None);
    }

    #[test]
    fn test_keys_inert_while_typing_or_challenged() {
        let typing = KeyContext {
            text_focused: true,
            ..KeyContext::default()
        };
        assert_eq!(command_for(Key::ArrowRight, typing), None);

        let challenged = KeyContext {
            challenge_open: true,
            ..KeyContext::default()
        };
        assert_eq!(command_for(Key::M, challenged), None);
    }

    #[test]
    fn test_key_bindings() {
        let ctx = KeyContext::default();
        assert_eq!(command_for(Key::Space, ctx), Some(Command::Next));
        assert_eq!(command_for(Key::ArrowDown, ctx), Some(Command::Next));
        assert_eq!(command_for(Key::ArrowUp, ctx), Some(Command::Prev));
        assert_eq!(command_for(Key::M, ctx), Some(Command::ToggleAuthoring));
        assert_eq!(command_for(Key::J, ctx), Some(Command::OpenJump));
        assert_eq!(command_for(Key::A, ctx), None);

        let authoring = KeyContext {
            authoring: true,
            ..KeyContext::default()
        };
        assert_eq!(command_for(Key::A, authoring), Some(Command::ToggleManager));
    }
}
