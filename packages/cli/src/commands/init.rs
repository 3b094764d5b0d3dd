use crate::config::{Config, ElementMapping, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use quire_conversion::ElementDefinition;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Merge blocks when deleting across them
    #[arg(long)]
    pub merge: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let mut config = Config {
        elements: vec![ElementMapping {
            model: "heading1".to_string(),
            view: ElementDefinition::new("h1"),
        }],
        ..Config::default()
    };
    config.editor.merge_blocks_on_delete = args.merge;

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Add element mappings to {}", DEFAULT_CONFIG_NAME);
    println!("  2. Run: quire convert page.html --to model");

    Ok(())
}
