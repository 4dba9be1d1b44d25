use anyhow::Result;
use colored::Colorize;
use inquire::InquireError;

use crate::chat::{ASSISTANT_NAME, Conversation, DEFAULT_SYSTEM_PROMPT, markup};
use crate::config::Config;
use crate::gemini::GeminiClient;

/// Interactive transcript with the assistant. Empty input or Esc ends the session.
pub fn run() -> Result<()> {
    let config = Config::load_or_default();
    let client = GeminiClient::from_config(&config)?;
    let mut conversation =
        Conversation::new(config.system_prompt().unwrap_or(DEFAULT_SYSTEM_PROMPT));

    if let Some(greeting) = conversation.messages().first() {
        print_reply(&greeting.text);
    }

    loop {
        let input = match inquire::Text::new("You:")
            .with_placeholder("Inquire about project specifics...")
            .prompt()
        {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };
        if input.trim().is_empty() {
            break;
        }
        if let Some(reply) = conversation.send(&client, &input) {
            print_reply(reply);
        }
    }
    Ok(())
}

fn print_reply(text: &str) {
    println!();
    println!("{}", format!("{ASSISTANT_NAME}:").blue().bold());
    println!("{}", markup::to_plain(text));
    println!();
}
