mod cli_args;
mod messaging_commands;
mod state_io;

use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli_args::Cli;
use crate::messaging_commands::{
    execute_messaging_dismiss_command, execute_messaging_next_command,
    execute_messaging_press_command, execute_messaging_validate_command,
};

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if cli.validate {
        return execute_messaging_validate_command(&cli);
    }
    if cli.next {
        return execute_messaging_next_command(&cli);
    }
    if let Some(message_id) = cli.press.as_deref() {
        return execute_messaging_press_command(&cli, message_id);
    }
    if let Some(message_id) = cli.dismiss.as_deref() {
        return execute_messaging_dismiss_command(&cli, message_id);
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
