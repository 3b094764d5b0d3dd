use crate::commands::convert::{load, render, write_output, Format};
use crate::config::Config;
use crate::editor::build_editor;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_conversion::Editor;
use quire_editor::{BatchType, Delta};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Replay script (JSON)
    pub input: PathBuf,

    /// Undo this many steps after replaying
    #[arg(long, default_value_t = 0)]
    pub undo: usize,

    /// Format to produce
    #[arg(long, value_enum, default_value = "model")]
    pub to: Format,

    /// Root name
    #[arg(long, default_value = "main")]
    pub root: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Starting content plus the batches to apply on top of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    /// Starting content as data markup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Starting content as model markup; wins over `data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub batches: Vec<ReplayBatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deltas: Vec<Delta>,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let content = fs::read_to_string(&args.input)?;
    let script: ReplayScript = serde_json::from_str(&content)
        .with_context(|| format!("Invalid replay script {}", args.input.display()))?;

    let mut editor = build_editor(&config, &args.root)?;
    let applied = run(&mut editor, &args.root, &script, &args.input)?;

    let mut undone = 0;
    while undone < args.undo && editor.undo()? {
        undone += 1;
    }

    let output = render(&editor, &args.root, args.to)?;
    write_output(&output, args.output.as_deref())?;

    eprintln!(
        "{} Replayed {} batches, undid {}",
        "✓".green(),
        applied,
        undone
    );
    Ok(())
}

/// Load the starting content and apply every batch as one undo step.
/// Returns the number of batches applied.
pub fn run(editor: &mut Editor, root: &str, script: &ReplayScript, path: &Path) -> Result<usize> {
    match (&script.model, &script.data) {
        (Some(model), _) => load(editor, root, Format::Model, model, path)?,
        (None, Some(data)) => load(editor, root, Format::Data, data, path)?,
        (None, None) => {}
    }

    for (index, entry) in script.batches.iter().enumerate() {
        let mut batch = editor.document.batch(BatchType::Default);
        if let Some(description) = &entry.description {
            batch = batch.with_description(description.clone());
        }

        let mut result = Ok(());
        for delta in &entry.deltas {
            result = editor.document.apply_delta(&mut batch, delta.clone());
            if result.is_err() {
                break;
            }
        }
        editor.document.commit(batch);
        editor.sync()?;
        result.with_context(|| format!("Batch {} failed", index + 1))?;
        info!(batch = index + 1, deltas = entry.deltas.len(), "Batch replayed");
    }
    Ok(script.batches.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "model": "<paragraph>foo</paragraph>",
        "batches": [
            {
                "description": "type",
                "deltas": [
                    {
                        "kind": "insert",
                        "operations": [
                            {
                                "type": "insert",
                                "position": { "root": "main", "path": [0, 3] },
                                "nodes": [{ "type": "text", "data": "!" }]
                            }
                        ]
                    }
                ]
            },
            {
                "deltas": [
                    {
                        "kind": "rename",
                        "operations": [
                            {
                                "type": "rename",
                                "position": { "root": "main", "path": [0] },
                                "oldName": "paragraph",
                                "newName": "heading1"
                            }
                        ]
                    }
                ]
            }
        ]
    }"#;

    fn editor() -> Editor {
        let config: Config = serde_json::from_str(
            r#"{ "elements": [{ "model": "heading1", "view": { "name": "h1" } }] }"#,
        )
        .unwrap();
        build_editor(&config, "main").unwrap()
    }

    #[test]
    fn test_replay_batches() {
        let script: ReplayScript = serde_json::from_str(SCRIPT).unwrap();
        let mut editor = editor();

        assert_eq!(run(&mut editor, "main", &script, Path::new("script.json")).unwrap(), 2);
        assert_eq!(render(&editor, "main", Format::Data).unwrap(), "<h1>foo!</h1>");
        assert_eq!(render(&editor, "main", Format::Editing).unwrap(), "<h1>foo!</h1>");

        assert!(editor.undo().unwrap());
        assert_eq!(render(&editor, "main", Format::Editing).unwrap(), "<p>foo!</p>");
    }

    #[test]
    fn test_failed_batch_is_reported() {
        let mut script: ReplayScript = serde_json::from_str(SCRIPT).unwrap();
        script.model = Some("<paragraph></paragraph>".to_string());

        let mut editor = editor();
        let err = run(&mut editor, "main", &script, Path::new("script.json")).unwrap_err();
        assert!(err.to_string().contains("Batch 1 failed"));
        assert_eq!(
            render(&editor, "main", Format::Model).unwrap(),
            "<paragraph></paragraph>"
        );
    }
}
