use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use serialloop::config::Config;
use serialloop::logging::init_tracing;
use serialloop::screen::{CounterScreen, ScreenStack};

#[derive(Debug, Parser)]
#[command(name = "serialloop", version, about = "Serialized async run loop playground")]
struct Cli {
    /// Config file (default: platform config dir/serialloop/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override counter.work_delay_ms
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Increment by 1, slow increment, increment by 5; print every change
    Demo,
    /// Drive a screen stack from stdin commands
    Interactive,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;
    if let Some(delay_ms) = cli.delay_ms {
        config.counter.work_delay_ms = delay_ms;
        config.validate().context("applying --delay-ms")?;
    }

    init_tracing(&config.logging);

    match cli.command.unwrap_or(Command::Demo) {
        Command::Demo => run_demo(&config).await,
        Command::Interactive => run_interactive(&config).await,
    }
}

async fn run_demo(config: &Config) -> anyhow::Result<()> {
    let stack = ScreenStack::new();
    let root = stack.push_root(config).context("starting run loop")?;
    bind_output(&root, 0);

    root.tap_increment_by(1);
    root.tap_increment();
    root.tap_increment_by(5);
    root.settle().await;

    println!("final: {}", root.title());
    stack.clear();
    root.run_loop().join().await;
    Ok(())
}

async fn run_interactive(config: &Config) -> anyhow::Result<()> {
    let stack = ScreenStack::new();
    let root = stack.push_root(config).context("starting run loop")?;
    bind_output(&root, 0);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line.context("reading stdin")?,
        };
        let Some(line) = line else {
            break;
        };
        if !handle_command(&stack, line.trim()).await {
            break;
        }
    }

    stack.clear();
    root.run_loop().join().await;
    Ok(())
}

/// Returns `false` when the session should end.
async fn handle_command(stack: &Arc<ScreenStack>, line: &str) -> bool {
    let Some(top) = stack.top() else {
        return false;
    };
    let mut words = line.split_whitespace();
    match words.next() {
        None => {}
        Some("inc") => match words.next().map(str::parse::<u64>) {
            None => top.tap_increment_by(1),
            Some(Ok(by)) => top.tap_increment_by(by),
            Some(Err(err)) => println!("bad amount: {}", err),
        },
        Some("tap") => top.tap_increment(),
        Some("present") => {
            let depth = stack.depth();
            top.tap_present();
            // The present action may be queued behind slow work.
            match tokio::time::timeout(Duration::from_secs(30), stack.wait_for_depth(depth + 1))
                .await
            {
                Ok(()) => {
                    if let Some(child) = stack.top() {
                        bind_output(&child, depth);
                    }
                }
                Err(_) => println!("child screen did not appear"),
            }
        }
        Some("dismiss") => {
            if stack.depth() <= 1 {
                println!("root screen cannot be dismissed; use quit");
            } else if let Some(count) = stack.dismiss_top() {
                println!("dismissed with count {}", count);
            }
        }
        Some("stats") => {
            let stats = top.run_loop().stats();
            println!(
                "submitted {} completed {} discarded {} pending {}",
                stats.submitted,
                stats.completed,
                stats.discarded,
                stats.pending()
            );
        }
        Some("help") => print_help(),
        Some("quit") => return false,
        Some(other) => println!("unknown command: {}", other),
    }
    true
}

fn bind_output(screen: &CounterScreen, depth: usize) {
    let indent = "  ".repeat(depth);
    {
        let indent = indent.clone();
        screen.on_title(move |title| println!("{}{}", indent, title));
    }
    screen.on_busy(move |busy| {
        if *busy {
            println!("{}working...", indent);
        }
    });
}

fn print_help() {
    println!("commands: inc [n] | tap | present | dismiss | stats | help | quit");
}
