use crate::config::Config;
use crate::editor::build_editor;
use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use quire_conversion::{ConversionError, Editor};
use quire_editor::EditorError;
use quire_model::ModelError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Model markup (`<paragraph>`, `<$text bold="true">`, `[` `]`)
    Model,
    /// Data markup produced by the data pipeline
    Data,
    /// Editing view markup
    Editing,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input file
    pub input: PathBuf,

    /// Format of the input file
    #[arg(long, value_enum, default_value = "data")]
    pub from: Format,

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

pub fn convert(args: ConvertArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let source = fs::read_to_string(&args.input)?;
    let mut editor = build_editor(&config, &args.root)?;

    load(&mut editor, &args.root, args.from, &source, &args.input)?;
    let output = render(&editor, &args.root, args.to)?;
    write_output(&output, args.output.as_deref())?;

    eprintln!(
        "{} {} → {:?}",
        "✓".green(),
        args.input.display(),
        args.to
    );
    Ok(())
}

/// Fill `root` from `source` written in `format`.
pub fn load(editor: &mut Editor, root: &str, format: Format, source: &str, path: &Path) -> Result<()> {
    let result = match format {
        Format::Data => editor.set_data(root, source),
        Format::Model => editor
            .document
            .set_data(root, source)
            .map_err(ConversionError::from)
            .and_then(|_| editor.sync().map(|_| ())),
        Format::Editing => return Err(anyhow!("The editing view cannot be loaded, use `data` or `model`")),
    };
    result.map_err(|err| describe(err, source, path))
}

pub fn render(editor: &Editor, root: &str, format: Format) -> Result<String> {
    let output = match format {
        Format::Model => editor.model_data(root)?,
        Format::Data => editor.get_data(root)?,
        Format::Editing => editor.editing_data(root)?,
    };
    Ok(output)
}

pub fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, output)?;
        }
        None => println!("{}", output),
    }
    Ok(())
}

/// Markup errors get a source excerpt.
fn describe(err: ConversionError, source: &str, path: &Path) -> anyhow::Error {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("input");
    let markup = match &err {
        ConversionError::Markup(markup)
        | ConversionError::Model(ModelError::Markup(markup))
        | ConversionError::Editor(EditorError::Model(ModelError::Markup(markup))) => Some(markup),
        _ => None,
    };
    match markup {
        Some(markup) => anyhow!("\n{}", quire_markup::format_error(source, file_name, markup)),
        None => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_data_and_render_every_format() {
        let mut editor = build_editor(&Config::default(), "main").unwrap();
        load(
            &mut editor,
            "main",
            Format::Data,
            "<ul><p>A</p></ul><ul><p>B</p></ul>",
            Path::new("lists.html"),
        )
        .unwrap();

        assert_eq!(
            render(&editor, "main", Format::Data).unwrap(),
            "<ul><p>A</p></ul><ul><p>B</p></ul>"
        );
        assert!(render(&editor, "main", Format::Editing)
            .unwrap()
            .contains(r#"<div class="ck-list-separator ck-hidden"></div>"#));
        assert!(render(&editor, "main", Format::Model)
            .unwrap()
            .contains("<listSeparator></listSeparator>"));
    }

    #[test]
    fn test_load_model_markup() {
        let mut editor = build_editor(&Config::default(), "main").unwrap();
        load(
            &mut editor,
            "main",
            Format::Model,
            "<paragraph>f[o]o</paragraph>",
            Path::new("doc.model"),
        )
        .unwrap();

        assert_eq!(render(&editor, "main", Format::Model).unwrap(), "<paragraph>f[o]o</paragraph>");
        assert_eq!(render(&editor, "main", Format::Editing).unwrap(), "<p>foo</p>");
    }

    #[test]
    fn test_markup_errors_are_reported() {
        let mut editor = build_editor(&Config::default(), "main").unwrap();
        let err = load(&mut editor, "main", Format::Data, "<p>open", Path::new("broken.html")).unwrap_err();
        assert!(err.to_string().contains("broken.html"));
    }
}
