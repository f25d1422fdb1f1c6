use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::datetime::parse_month_arg;
use crate::event::EventId;
use crate::view::{ViewMode, ViewWindow};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "soulcal",
    version,
    about = "Soul Connection calendar layout engine",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file; defaults to $SOULCAL_CONFIG or the user config dir.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the day grid of a month or week.
    Grid {
        #[command(flatten)]
        window: WindowArgs,
        /// Mark days that carry events.
        #[arg(long)]
        events: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Place events on the grid.
    Layout {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        events: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Overlap lanes for the events of a month.
    Lanes {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        events: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Move the view window forward or back.
    Navigate {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        step: i32,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Details and placement of one event.
    Show {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        events: PathBuf,
        #[arg(long)]
        id: EventId,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub year: Option<i32>,

    /// Month name, 1-12 or YYYY-MM.
    #[arg(long)]
    pub month: Option<String>,

    #[arg(long, default_value = "month")]
    pub view: ViewMode,

    /// Week of the month; -1 is the last one.
    #[arg(long, allow_negative_numbers = true)]
    pub week: Option<i32>,
}

impl WindowArgs {
    /// Window from the flags, filling gaps from `today`.
    pub fn resolve(&self, today: NaiveDate) -> anyhow::Result<ViewWindow> {
        let window = match (&self.month, self.year) {
            (Some(raw), year) => {
                let (month_year, month_index) = parse_month_arg(raw)?;
                let year = month_year.or(year).unwrap_or(today.year());
                ViewWindow::month(year, month_index).with_view(self.view)
            }
            (None, Some(year)) => ViewWindow::month(year, today.month0()).with_view(self.view),
            (None, None) => ViewWindow::containing(today, self.view),
        };

        let window = match self.week {
            Some(week) => window.with_week(week),
            None => window,
        };
        debug!(?window, "resolved view window");
        Ok(window)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Write JSON to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
