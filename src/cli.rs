//! Command line front end.
//!
//! Every invocation wires a fresh runtime and reconciles with the surface registry
//! before running its command, the same way the app does on launch.

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use pt_app::{
    CopyPinToClipboard, EntryOutcome, PinFromClipboard, PinFromShareInbox, PinFromShareLink,
    SharedPinProcessingState,
};
use pt_core::app_dirs::AppDirs;
use pt_core::content::classify;
use pt_core::share::build_share_link;
use pt_core::{Pin, PinId, SharedPin, SurfaceId, TimestampMs};

use crate::bootstrap::config::load_resolved;
use crate::bootstrap::wiring::{wire_dependencies, AppRuntime};

/// Longest content excerpt printed in lists.
const EXCERPT_CHARS: usize = 60;

#[derive(Debug, Parser)]
#[command(
    name = "postit",
    version,
    about = "Pin text and links for eight hours, then keep them in history"
)]
pub struct Cli {
    /// Config file (default: config.toml in the data directory, if present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors to stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pin text or a link
    Pin { content: String },
    /// Pin whatever text is on the clipboard
    Paste,
    /// Hand content over through the share inbox, as the share sheet does
    Share {
        content: String,
        /// Print the share link instead of writing the inbox
        #[arg(long)]
        link: bool,
    },
    /// Pin the content waiting in the share inbox
    Inbox,
    /// Pin the content of a postit://share-sheet link
    Open { link: String },
    /// List active pins, newest first
    List,
    /// Copy an active pin's content to the clipboard, by its list index
    Copy { index: usize },
    /// Remove active pins by their list index
    Remove {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
    /// List historical pins, most recent first
    History,
    /// Pin a historical pin again
    Restore { pin_id: String },
    /// Delete a historical pin for good
    Delete { pin_id: String },
    /// Delete every historical pin
    ClearHistory,
    /// List live surfaces in the registry
    Surfaces,
    /// Dismiss a surface, as a user swipe would
    Dismiss { surface_id: String },
    /// Keep running, follow surface changes and print both lists as they change
    Watch,
}

pub async fn run(cli: Cli, app_dirs: &AppDirs) -> anyhow::Result<()> {
    let config = load_resolved(cli.config, app_dirs)?;
    let runtime = wire_dependencies(&config)?;

    match runtime.manager.sync_on_startup().await {
        Ok(report) => tracing::debug!(
            restored = report.restored,
            moved_to_history = report.moved_to_history,
            "reconciled with surface registry"
        ),
        Err(err) => tracing::warn!(error = %format!("{err:#}"), "reconciliation failed"),
    }

    let result = execute(cli.command, &runtime).await;
    runtime.shutdown();
    result
}

async fn execute(command: Command, runtime: &AppRuntime) -> anyhow::Result<()> {
    match command {
        Command::Pin { content } => {
            let surface_id = runtime.manager.add_pin_and_process(&content).await?;
            println!("Pinned (surface {surface_id})");
            print_pins(&runtime.manager.active_pins(), true);
        }
        Command::Paste => {
            let outcome = PinFromClipboard::new(runtime.clipboard.clone(), runtime.manager.clone())
                .execute()
                .await?;
            report_outcome(outcome)?;
        }
        Command::Share { content, link } => {
            if link {
                println!("{}", build_share_link(&content));
                return Ok(());
            }
            let (content, kind) = classify(&content)?;
            runtime
                .share_inbox
                .save(&SharedPin { content, kind })
                .await?;
            println!(
                "Saved to {}; run `postit inbox` to pin it",
                runtime.share_inbox.path().display()
            );
        }
        Command::Inbox => {
            let outcome = PinFromShareInbox::new(runtime.share_inbox_port(), runtime.manager.clone())
                .execute()
                .await?;
            report_outcome(outcome)?;
        }
        Command::Open { link } => {
            let outcome = PinFromShareLink::new(runtime.manager.clone())
                .execute(&link)
                .await;
            report_outcome(outcome)?;
        }
        Command::List => print_pins(&runtime.manager.active_pins(), true),
        Command::Copy { index } => {
            let copied = CopyPinToClipboard::new(runtime.clipboard.clone(), runtime.manager.clone())
                .execute(index)
                .await?;
            match copied {
                Some(content) => println!("Copied {}", excerpt(&content)),
                None => bail!("no active pin at index {index}"),
            }
        }
        Command::Remove { indices } => {
            let removed = runtime.manager.remove_pins(&indices).await;
            println!("Removed {removed} pin(s)");
        }
        Command::History => print_pins(&runtime.history.refresh().await?, false),
        Command::Restore { pin_id } => {
            let pin_id = PinId::from(pin_id);
            match runtime.manager.restore_pin(&pin_id).await? {
                Some(surface_id) => println!("Restored (surface {surface_id})"),
                None => bail!("could not start a surface for {pin_id}"),
            }
        }
        Command::Delete { pin_id } => {
            runtime.history.delete_pin(&PinId::from(pin_id)).await?;
            println!("Deleted");
        }
        Command::ClearHistory => {
            let deleted = runtime.history.clear_history().await?;
            println!("Deleted {deleted} pin(s) from history");
        }
        Command::Surfaces => {
            let records = runtime.registry.live_records().await?;
            if records.is_empty() {
                println!("No live surfaces");
            }
            for record in records {
                println!(
                    "{}  {:<4}  stale {}  {}",
                    record.id,
                    record.kind.as_str(),
                    format_timestamp(TimestampMs::from_epoch_millis(record.stale_date_ms)),
                    excerpt(&record.content.content)
                );
            }
        }
        Command::Dismiss { surface_id } => {
            runtime
                .registry
                .dismiss(&SurfaceId::from(surface_id))
                .await
                .context("dismiss surface")?;
            println!("Dismissed");
        }
        Command::Watch => watch(runtime).await?,
    }
    Ok(())
}

async fn watch(runtime: &AppRuntime) -> anyhow::Result<()> {
    let listener = runtime.spawn_history_listener();
    let mut active = runtime.manager.subscribe_active_pins();
    let mut history = runtime.history.subscribe();
    runtime.history.refresh().await?;

    println!("Active:");
    print_pins(&active.borrow_and_update(), true);
    history.mark_changed();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = active.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("Active:");
                print_pins(&active.borrow_and_update(), true);
            }
            changed = history.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("History:");
                print_pins(&history.borrow_and_update(), false);
            }
        }
    }

    listener.abort();
    Ok(())
}

fn report_outcome(outcome: EntryOutcome) -> anyhow::Result<()> {
    match outcome {
        EntryOutcome::NothingToPin => println!("Nothing to pin"),
        EntryOutcome::Ignored => println!("Another submission is still loading; ignored"),
        EntryOutcome::Finished(SharedPinProcessingState::Success { preview }) => {
            match &preview.metadata_title {
                Some(title) => println!("Pinned {} ({title})", excerpt(&preview.original_content)),
                None => println!("Pinned {}", excerpt(&preview.original_content)),
            }
        }
        EntryOutcome::Finished(SharedPinProcessingState::Error(err)) => bail!("{err}"),
        EntryOutcome::Finished(state) => {
            tracing::warn!(?state, "submission finished in a non-terminal state")
        }
    }
    Ok(())
}

fn print_pins(pins: &[Pin], active: bool) {
    if pins.is_empty() {
        println!("  (none)");
        return;
    }
    for (index, pin) in pins.iter().enumerate() {
        let when = if active {
            format!("until {}", format_timestamp(pin.show_in_history_at))
        } else {
            format!("since {}", format_timestamp(pin.show_in_history_at))
        };
        let title = pin
            .metadata_title
            .as_deref()
            .map(|title| format!(" [{title}]"))
            .unwrap_or_default();
        if active {
            println!("{index:>3}  {:<4}  {when}  {}{title}", pin.kind.as_str(), excerpt(&pin.content));
        } else {
            println!("{}  {:<4}  {when}  {}{title}", pin.id, pin.kind.as_str(), excerpt(&pin.content));
        }
    }
}

fn format_timestamp(ts: TimestampMs) -> String {
    DateTime::from_timestamp_millis(ts.as_millis())
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn excerpt(content: &str) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= EXCERPT_CHARS {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(EXCERPT_CHARS - 1).collect();
    cut.push('…');
    cut
}
