mod args;

use args::{Cli, Commands, ConfigCommand, PromptCommand, ScoringCommand, SessionCommand};
use clap::Parser;
use sp_studio_lib::commands::{self, AppState, CommandError};
use sp_studio_lib::config::Settings;
use sp_studio_lib::confirm::{AutoConfirm, Confirm};
use sp_studio_lib::database::Database;
use sp_studio_lib::editor::{ActionOutcome, TestContext};
use sp_studio_lib::monitor::PollTarget;
use sp_studio_lib::session::SessionSource;
use sp_studio_lib::view;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose {
        "sp_studio=debug,sp_studio_lib=debug"
    } else {
        "sp_studio=warn,sp_studio_lib=warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn setup(cli: &Cli) -> Result<AppState, CommandError> {
    let db = match &cli.db {
        Some(path) if path.as_os_str() == ":memory:" => Database::open_in_memory()?,
        Some(path) => Database::open(path)?,
        None => Database::new()?,
    };

    let mut settings: Settings = db.get_settings()?.with_env_overrides();
    if let Some(url) = &cli.base_url {
        settings.set("base_url", url)?;
    }

    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(view::StdinConfirm)
    };

    tracing::debug!(base_url = %settings.base_url, "settings loaded");
    AppState::new(db, settings, confirm)
}

fn report(outcome: ActionOutcome) {
    if outcome == ActionOutcome::Declined {
        eprintln!("Cancelled");
    }
}

async fn run(state: &AppState, command: Commands) -> Result<(), CommandError> {
    match command {
        Commands::Health => view::print_json(&commands::health(state).await?),
        Commands::Presets => println!("{}", view::render_presets(&commands::list_presets(state).await?)),
        Commands::Watch { sessions } => {
            let target = if sessions {
                PollTarget::HealthAndSessions
            } else {
                PollTarget::Health
            };
            watch(state, target).await;
        }
        Commands::Config { action } => match action {
            ConfigCommand::Show => view::print_json(&state.settings),
            ConfigCommand::Set { key, value } => {
                view::print_json(&commands::set_setting(state, &key, &value)?)
            }
        },
        Commands::Prompt { action } => run_prompt(state, action).await?,
        Commands::Session { action } => run_session(state, action).await?,
        Commands::Scoring { action } => match action {
            ScoringCommand::Config { id } => view::print_json(&commands::scoring_config(state, &id).await?),
            ScoringCommand::Threshold { id, value } => {
                view::print_json(&commands::set_scoring_threshold(state, &id, value).await?)
            }
            ScoringCommand::Stats => view::print_json(&commands::scoring_stats(state).await?),
        },
    }
    Ok(())
}

async fn run_prompt(state: &AppState, action: PromptCommand) -> Result<(), CommandError> {
    match action {
        PromptCommand::List => view::print_lines(&commands::prompt_list(state).await?),
        PromptCommand::Show { name } => println!("{}", commands::prompt_show(state, &name).await?),
        PromptCommand::Create { name } => commands::prompt_create(state, &name).await?,
        PromptCommand::Edit { name, file } => {
            let content = std::fs::read_to_string(&file)?;
            let draft = commands::prompt_edit(state, &name, content).await?;
            println!("{}", view::render_drafts(&[draft]));
        }
        PromptCommand::Save { name, file } => {
            let content = match file {
                Some(path) => Some(std::fs::read_to_string(&path)?),
                None => None,
            };
            report(commands::prompt_save(state, &name, content).await?);
        }
        PromptCommand::Delete { name } => report(commands::prompt_delete(state, &name).await?),
        PromptCommand::Backups => view::print_lines(&commands::prompt_backups(state).await?),
        PromptCommand::Backup { name } => println!("{}", commands::prompt_backup(state, &name).await?),
        PromptCommand::BackupShow { backup } => {
            println!("{}", commands::prompt_backup_show(state, &backup).await?)
        }
        PromptCommand::Restore { backup, target } => {
            report(commands::prompt_restore(state, &backup, &target).await?)
        }
        PromptCommand::Vars { name } => view::print_lines(&commands::prompt_vars(state, &name).await?),
        PromptCommand::Test {
            name,
            message,
            preset,
            context,
        } => {
            let context = match (preset, context) {
                (Some(preset), _) => TestContext::Preset(preset),
                (None, Some(json)) => TestContext::Custom(json),
                (None, None) => return Err(CommandError::new("Provide --preset or --context")),
            };
            println!("{}", commands::prompt_test(state, &name, &message, context).await?);
        }
        PromptCommand::Draft { name, discard } => match name {
            Some(name) if discard => {
                if !commands::prompt_discard_draft(state, &name)? {
                    eprintln!("No draft stored for {}", name);
                }
            }
            Some(name) => match commands::prompt_draft(state, &name)? {
                Some(draft) => println!("{}", draft.content),
                None => eprintln!("No draft stored for {}", name),
            },
            None => println!("{}", view::render_drafts(&commands::list_drafts(state)?)),
        },
        PromptCommand::Format { name } => println!("{}", commands::prompt_format(state, &name).await?),
        PromptCommand::Current => println!("{}", commands::prompt_current(state).await?),
        PromptCommand::Use { name } => commands::prompt_use(state, &name).await?,
    }
    Ok(())
}

async fn run_session(state: &AppState, action: SessionCommand) -> Result<(), CommandError> {
    match action {
        SessionCommand::List => println!("{}", view::render_sessions(&commands::session_list(state).await?)),
        SessionCommand::Create { id, preset, custom } => {
            let source = match (preset, custom) {
                (Some(preset), _) => SessionSource::Preset(preset),
                (None, Some(json)) => SessionSource::Custom(json),
                (None, None) => return Err(CommandError::new("Provide --preset or --custom")),
            };
            view::print_json(&commands::session_create(state, &id, source).await?);
        }
        SessionCommand::Chat { id, message } => {
            let reply = commands::session_chat(state, &id, &message).await?;
            println!("{}", reply.sp_response);
        }
        SessionCommand::Info { id } => view::print_json(&commands::session_info(state, &id).await?),
        SessionCommand::History { id } => {
            println!("{}", view::render_history(&commands::session_history(state, &id).await?))
        }
        SessionCommand::Delete { id } => report(commands::session_delete(state, &id).await?),
        SessionCommand::Report { id } => view::print_json(&commands::session_report(state, &id).await?),
        SessionCommand::Summary { id } => view::print_json(&commands::session_summary(state, &id).await?),
        SessionCommand::Suggestions { id } => {
            view::print_json(&commands::session_suggestions(state, &id).await?)
        }
        SessionCommand::Exam { id } => view::print_json(&commands::session_exam(state, &id).await?),
        SessionCommand::Export { id } => view::print_json(&commands::session_export(state, &id).await?),
        SessionCommand::Validate { data } => {
            view::print_json(&commands::session_validate(state, &data).await?)
        }
    }
    Ok(())
}

async fn watch(state: &AppState, target: PollTarget) {
    let monitor = state.monitor(target);
    let mut status = monitor.subscribe();
    monitor.start();

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", view::render_status(&status.borrow_and_update()));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.stop();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let state = match setup(&cli) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let state = state.with_editor_events(events_tx);
    let printer = view::spawn_notification_printer(&state.notifications);
    let logger = view::spawn_event_logger(events_rx);

    let result = run(&state, cli.command).await;

    // closes both channels so the printers drain and exit
    drop(state);
    let _ = printer.await;
    let _ = logger.await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
