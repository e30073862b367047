use clap::Parser;
use color_eyre::Result;
use track::{
    AppStore, Config, Profile, StorageMode,
    cli::{self, Cli, Commands},
    storage,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let mut config = Config::load_with_profile(profile)?;
    if cli.sandboxed {
        config.storage = StorageMode::Sandboxed;
    }

    let command = cli.command.unwrap_or(Commands::Show);

    // Commands that never touch application data
    match command {
        Commands::DataPath => {
            cli::handle_data_path(&config);
            return Ok(());
        }
        Commands::Prefs { toggle_dark_mode, sidebar_width, notes_height } => {
            cli::handle_prefs(&mut config, profile, toggle_dark_mode, sidebar_width, notes_height)?;
            return Ok(());
        }
        _ => {}
    }

    let backend = storage::open_backend(&config);
    let mut store = AppStore::open(backend, config.persist_debounce()).await;
    if let Some(date) = cli::resolve_date(cli.date.as_deref())? {
        store.set_current_date(&date);
    }

    // Dispatch to appropriate command handler
    let result = match command {
        Commands::Show => {
            cli::handle_show(&store);
            Ok(())
        }
        Commands::Projects { all } => {
            cli::handle_projects(&store, all);
            Ok(())
        }
        Commands::AddProject { name } => cli::handle_add_project(&mut store, &name),
        Commands::RenameProject { project, name } => cli::handle_rename_project(&mut store, &project, &name),
        Commands::ArchiveProject { project } => cli::handle_archive_project(&mut store, &project),
        Commands::Season { project, start, end } => cli::handle_season(&mut store, &project, start, end),
        Commands::Add { project, on_deck } => cli::handle_add_entry(&mut store, &project, on_deck),
        Commands::Remove { entry } => cli::handle_remove_entry(&mut store, &entry),
        Commands::Log { entry, hours } => cli::handle_log(&mut store, &entry, hours),
        Commands::Done { entry, undo } => cli::handle_done(&mut store, &entry, !undo),
        Commands::Todo { entry, text } => cli::handle_add_todo(&mut store, &entry, &text),
        Commands::Check { entry, todo, undo } => cli::handle_check(&mut store, &entry, &todo, !undo),
        Commands::Move { entry, section, index } => cli::handle_move(&mut store, &entry, section, index),
        Commands::Populate { source, todos } => cli::handle_populate(&mut store, &source, todos),
        Commands::Note { project, text } => cli::handle_note(&mut store, &project, &text),
        Commands::SaveNote { project, name } => cli::handle_save_note(&mut store, &project, &name),
        Commands::Report => cli::handle_report(&store),
        Commands::Export { dir } => cli::handle_export(&store, dir.as_deref()),
        Commands::Import { file } => cli::handle_import(&mut store, &file),
        Commands::DataPath | Commands::Prefs { .. } => Ok(()),
    };

    // Flush whatever the command changed before exiting
    store.close().await;
    result?;

    Ok(())
}
