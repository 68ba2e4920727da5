use anyhow::{anyhow, Result};
use clap::Parser;
use std::env;

#[derive(Debug, Parser)]
#[clap(
    name = "restitch",
    version = "0.1.0",
    about = "A command-line tool that asks an AI model to continue past output-length truncation and stitches the pieces into one complete response."
)]
pub struct Config {
    #[clap(
        long("api"),
        value_name = "URL",
        help = "The API endpoint base URL to use.",
        default_value = "https://api.openai.com"
    )]
    pub api: String,

    #[clap(
        long("key"),
        value_name = "API_KEY",
        help = "Sets the API key for the remote endpoint; if absent, the envvar 'OPENAI_API_KEY' is checked",
        default_value = ""
    )]
    pub api_key: String,

    #[clap(
        long,
        value_name = "PROMPT",
        help = "Sets the user prompt that opens the conversation",
        default_value = "Give me a detailed overview of quantum computing."
    )]
    pub prompt: String,

    #[clap(
        short('n'),
        long,
        value_name = "INT",
        help = "Caps the tokens generated per request; a response cut off at this ceiling is continued automatically",
        default_value_t = 1000
    )]
    pub max_tokens: u32,

    #[clap(
        long,
        value_name = "MODEL_ID",
        help = "Sets the model to use for generating completions with the API",
        default_value = "gpt-4o"
    )]
    pub model_id: String,

    #[clap(
        long,
        value_name = "INT",
        help = "Gives up if the response is still truncated after this many continuation requests",
        default_value_t = 16
    )]
    pub max_continuations: u32,
}

impl Config {
    pub fn from_cli() -> Result<Self> {
        let mut config = Config::parse();

        // Fallback to environment variable if api_key is not provided
        if config.api_key.is_empty() {
            config.api_key = env::var("OPENAI_API_KEY").map_err(|_| {
                anyhow!(
                    "API key must be provided via --key or the OPENAI_API_KEY environment variable"
                )
            })?;
        }
        Ok(config)
    }
}
