use anyhow::Result;
use clap::Args;
use colored::Colorize;
use notesync_editor::{EditorConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Debounce ticks between the last edit and its flush
    #[arg(long)]
    pub max_ticks: Option<u32>,

    /// Tick period in milliseconds
    #[arg(long)]
    pub tick_period_ms: Option<u64>,

    /// Prefix used when rendering image references
    #[arg(long)]
    pub image_base_path: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = build_config(args);

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!(
        "  Edits flush {} ticks ({}ms each) after the last keystroke",
        config.max_ticks, config.tick_period_ms
    );

    Ok(())
}

fn build_config(args: InitArgs) -> EditorConfig {
    let mut config = EditorConfig::default();

    if let Some(max_ticks) = args.max_ticks {
        config.max_ticks = max_ticks;
    }
    if let Some(tick_period_ms) = args.tick_period_ms {
        config.tick_period_ms = tick_period_ms;
    }
    if let Some(image_base_path) = args.image_base_path {
        config.image_base_path = image_base_path;
    }

    config
}
