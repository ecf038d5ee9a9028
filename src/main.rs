use clap::Parser;
use form_recall::cli::commands::{
    cmd_classify, cmd_entries_clear, cmd_entries_delete, cmd_entries_list, cmd_replay,
    cmd_restore, cmd_save,
};
use form_recall::cli::config::{Cli, Commands, EntriesAction, load_config, log_directive, resolve_store_path};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_directive(cli.verbose).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());

    // Resolve store path: CLI > config > default
    let store_path = resolve_store_path(cli.store.as_deref(), &config);

    match cli.command {
        Commands::Classify { page } => cmd_classify(&page)?,
        Commands::Save { page } => cmd_save(&page, &store_path, &config)?,
        Commands::Restore { page, output } => {
            cmd_restore(&page, output.as_deref(), &store_path, &config)?
        }
        Commands::Entries { action } => match action {
            EntriesAction::List => cmd_entries_list(&store_path, &config)?,
            EntriesAction::Delete { key } => cmd_entries_delete(&key, &store_path, &config)?,
            EntriesAction::Clear => cmd_entries_clear(&store_path, &config)?,
        },
        Commands::Replay { scenario } => {
            let completed = cmd_replay(&scenario, &store_path, &config)?;
            if !completed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
