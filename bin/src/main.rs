//! mailcheck - identify if a mail address exists.
//! This is the binary executable of mailcheck.

#![warn(clippy::all, clippy::pedantic)]

use std::env::args;

use mailcheck_lib::orchestrator::{VerifyConfig, verify_email};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match args().collect::<Vec<_>>().as_slice() {
        [argv0] => eprintln!("Usage: {argv0} [email address]..."),
        [_argv0, addresses @ ..] => {
            let config = VerifyConfig { verify_smtp: true, ..VerifyConfig::default() };
            for address in addresses {
                let result = verify_email(address, &config).await;
                match serde_json::to_string(&result) {
                    Ok(json) => println!("{json}"),
                    Err(err) => eprintln!("failed to serialize result for {address}: {err}"),
                }
            }
        }
        [] => unreachable!("You shouldn't be able to call programs without argv0"),
    }
}
