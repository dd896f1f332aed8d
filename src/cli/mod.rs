pub mod daemon_path;
pub mod manifest;
pub mod process;
pub mod report;

use std::{env, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use process::kill_stale_hosts;
use report::DateStyle;
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::start_daemon,
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Tabtime", version, long_about = None)]
#[command(about = "Tracks time spent per website domain", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Run the tracking host directly in the current console. The browser normally starts it through the native-messaging manifest, this is for debugging"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
    #[command(about = "Stop tracking hosts whose browser is already gone")]
    Stop {},
    #[command(about = "Print the native-messaging host manifest for the browser to launch the daemon")]
    Manifest {
        #[arg(long = "extension-id", help = "Id of the extension allowed to talk to the host")]
        extension_id: String,
    },
    #[command(about = "Display the tracked domains for a day, sorted by time")]
    Today {
        #[arg(long, help = "Day to display. Examples are \"yesterday\", \"15/03/2025\"")]
        date: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
        #[arg(short, long, help = "Show at most this many domains")]
        limit: Option<usize>,
    },
    #[command(about = "Display per-day totals for a week with summary stats")]
    Week {
        #[arg(long, help = "Any day inside the week to display")]
        date: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Display activity levels for the last days")]
    Heatmap {
        #[arg(long, default_value_t = 60, help = "Number of days to display")]
        days: u32,
        #[arg(long, help = "Last day of the range, defaults to today")]
        until: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Write the whole store into a backup file")]
    Export {
        #[arg(short, long, help = "Backup file path, defaults to tabtime-backup-<date>.json")]
        output: Option<PathBuf>,
    },
    #[command(about = "Restore week records from a backup file")]
    Import { file: PathBuf },
    #[command(about = "Delete all tracking data. Irreversible")]
    Clear {
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    match args.commands {
        Commands::Serve { dir } => {
            let dir = dir.map_or_else(create_application_default_path, Ok)?;
            start_daemon(dir).await
        }
        Commands::Stop {} => {
            let daemon = to_daemon_path(env::current_exe()?);
            let killed = kill_stale_hosts(&daemon);
            println!("Stopped {killed} tracking host(s)");
            Ok(())
        }
        Commands::Manifest { extension_id } => {
            println!("{}", manifest::render_manifest(&extension_id)?);
            Ok(())
        }
        Commands::Today {
            date,
            date_style,
            limit,
        } => report::process_today(date, date_style, limit).await,
        Commands::Week { date, date_style } => report::process_week(date, date_style).await,
        Commands::Heatmap {
            days,
            until,
            date_style,
        } => report::process_heatmap(days, date_style, until).await,
        Commands::Export { output } => report::process_export(output).await,
        Commands::Import { file } => report::process_import(file).await,
        Commands::Clear { yes } => report::process_clear(yes).await,
    }
}
