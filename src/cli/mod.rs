pub mod history;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use history::{HistoryCommand, process_history_command};
use tracing::level_filters::LevelFilter;

use crate::{
    metrics::csv::{EXPORT_FILE_NAME, build_csv},
    render::{DashboardPanels, render_frame},
    store::{
        STORE_FILE_NAME,
        adapter::{JsonStoreAdapter, StoreAdapter},
    },
    tracker::{WatchOptions, engine::DashboardState, ledger::SessionLedger, start_watch},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{CLI_PREFIX, WATCH_PREFIX, enable_logging},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Screentime", version, long_about = None)]
#[command(about = "Terminal screen time tracker", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Track focus time and repaint the live dashboard in this console")]
    Watch {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(
            long,
            default_value_t = 480,
            help = "Daily goal in minutes used for the progress meter"
        )]
        goal: u32,
        #[arg(
            long = "idle-timeout",
            default_value_t = 120,
            help = "Seconds without input before the user counts as away"
        )]
        idle_timeout: u32,
        #[arg(long, help = "Start with tracking paused")]
        paused: bool,
        #[arg(long = "export-to", help = "Where the export command writes its csv")]
        export_to: Option<PathBuf>,
        #[arg(long = "hide-progress", help = "Leave the goal meter out of the dashboard")]
        hide_progress: bool,
        #[arg(long = "hide-sessions", help = "Leave the session list out of the dashboard")]
        hide_sessions: bool,
        #[arg(long = "hide-week", help = "Leave the weekly chart out of the dashboard")]
        hide_week: bool,
    },
    #[command(about = "Render the dashboard once and exit")]
    Dashboard {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(
            long,
            default_value_t = 480,
            help = "Daily goal in minutes used for the progress meter"
        )]
        goal: u32,
    },
    #[command(about = "Write all recorded days as csv")]
    Export {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(short, long, help = "Output file")]
        output: Option<PathBuf>,
    },
    #[command(about = "Reset today's record")]
    Reset {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Display per-day totals for a date range")]
    History {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[command(flatten)]
        command: HistoryCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    match args.commands {
        Commands::Watch {
            dir,
            goal,
            idle_timeout,
            paused,
            export_to,
            hide_progress,
            hide_sessions,
            hide_week,
        } => {
            let dir = resolve_dir(dir)?;
            // The dashboard owns stdout, logs go to files only.
            enable_logging(WATCH_PREFIX, &dir, logging_level, false)?;
            let options = WatchOptions {
                goal_minutes: goal,
                idle_timeout_s: idle_timeout,
                start_paused: paused,
                export_path: export_to.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME)),
                panels: DashboardPanels {
                    progress: !hide_progress,
                    sessions: !hide_sessions,
                    week: !hide_week,
                    ..DashboardPanels::default()
                },
            };
            start_watch(dir, options).await
        }
        Commands::Dashboard { dir, goal } => {
            let dir = resolve_dir(dir)?;
            enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
            let adapter = JsonStoreAdapter::new(dir.join(STORE_FILE_NAME))?;
            let store = adapter.load().await;
            let panels = DashboardPanels {
                hints: false,
                ..DashboardPanels::default()
            };
            print!(
                "{}",
                render_frame(&store, &DashboardState::default(), DefaultClock.now(), goal, &panels)
            );
            Ok(())
        }
        Commands::Export { dir, output } => {
            let dir = resolve_dir(dir)?;
            enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
            let adapter = JsonStoreAdapter::new(dir.join(STORE_FILE_NAME))?;
            let csv = build_csv(&adapter.load().await);
            let output = output.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            tokio::fs::write(&output, csv).await?;
            println!("CSV written to {}", output.display());
            Ok(())
        }
        Commands::Reset { dir, yes } => {
            let dir = resolve_dir(dir)?;
            enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
            if !yes && !confirm_reset().await? {
                println!("Aborted");
                return Ok(());
            }
            let adapter = JsonStoreAdapter::new(dir.join(STORE_FILE_NAME))?;
            let mut ledger = SessionLedger::new(adapter, Box::new(DefaultClock), false);
            ledger.reset_today().await?;
            println!("Today reset");
            Ok(())
        }
        Commands::History { dir, command } => {
            let dir = resolve_dir(dir)?;
            enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
            process_history_command(dir, command).await
        }
    }
}

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        }
        None => create_application_default_path(),
    }
}

async fn confirm_reset() -> Result<bool> {
    use std::io::Write as _;

    use tokio::io::{AsyncBufReadExt, BufReader};

    print!("Reset today's data? This cannot be undone. [y/N] ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
