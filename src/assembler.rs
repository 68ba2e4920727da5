use anyhow::{anyhow, Result};

use crate::api::{ChatClient, Message};

/// The synthetic user turn appended after a truncated response, asking the
/// model to resume generating from where it stopped.
pub const CONTINUE_PROMPT: &str = "Please continue generating your response where you stopped previously. Do not repeat anything from your previous response.";

/// Cumulative token usage across every request made for one assembled response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A complete model response stitched together from one or more completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub text: String,
    pub tokens: TokenTotals,
}

/// Obtains the model's complete answer to the latest turn in `messages`.
///
/// Sends the history to the chat-completion endpoint and inspects the finish
/// reason. If the output was cut off at the token ceiling, the partial
/// content is appended to the history as an assistant turn followed by a
/// fixed continuation instruction, and the request is reissued with the
/// extended history. Text and token usage accumulate across every cycle, and
/// the ordered concatenation of all partial outputs is returned once the
/// model finishes naturally.
///
/// `max_continuations` bounds how many continuation requests may follow the
/// initial one; a model that never finishes naturally yields an error instead
/// of looping forever. Any request failure ends the chain immediately and
/// discards the text and totals accumulated by earlier cycles.
pub async fn assemble(
    client: &dyn ChatClient,
    model: &str,
    mut messages: Vec<Message>,
    max_continuations: u32,
) -> Result<Assembled> {
    let mut text = String::new();
    let mut tokens = TokenTotals::default();

    for _ in 0..=max_continuations {
        let completion = client.complete(model, &messages).await?;

        tokens.input_tokens += completion.usage.prompt_tokens;
        tokens.output_tokens += completion.usage.completion_tokens;
        text.push_str(&completion.content);

        if !completion.truncated() {
            return Ok(Assembled { text, tokens });
        }

        eprintln!(
            "note: the model returned before finishing (reason: {}); requesting a continuation",
            completion.finish_reason.as_deref().unwrap_or("unknown")
        );

        messages.push(Message::assistant(completion.content));
        messages.push(Message::user(CONTINUE_PROMPT));
    }

    Err(anyhow!(
        "the response was still truncated after {} continuation requests",
        max_continuations
    ))
}
