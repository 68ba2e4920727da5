mod api;
mod assembler;
mod config;

use std::process::exit;

use api::{Message, OpenAiClient};
use assembler::assemble;
use config::Config;

#[tokio::main]
async fn main() {
    let config = match Config::from_cli() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            exit(1);
        }
    };

    let client = OpenAiClient::new(&config);
    let messages = vec![Message::user(config.prompt.as_str())];

    match assemble(
        &client,
        &config.model_id,
        messages,
        config.max_continuations,
    )
    .await
    {
        Ok(result) => {
            println!("{}", result.text);
            println!();
            println!(
                "Token usage: {} input, {} output",
                result.tokens.input_tokens, result.tokens.output_tokens
            );
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            exit(1);
        }
    }
}
