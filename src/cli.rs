//! Minimal CLI: descriptors → (ir | schema | show)
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::document::{Document, Extraction};
use crate::options::{ExtractOption, OptionSet};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// normalize reflected type descriptors and output the IR, a JSON schema, or a readable listing
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// normalize and print the IR (roots + collected catalog) as JSON
    Ir(JsonOut),
    /// normalize and print one JSON schema per root
    Schema(JsonOut),
    /// normalize and print type expressions
    Show(ShowOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the descriptor document inside each file (e.g. /payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// extraction option: collapse-optional, sort-fields, or any custom flag
    #[arg(long = "option", short = 'O')]
    options: Vec<ExtractOption>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct JsonOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct ShowOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// also list the collected classes, records and functions
    #[arg(long, default_value_t = false)]
    catalog: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn option_set(&self) -> OptionSet {
        self.options.iter().cloned().collect()
    }

    /// Every input file extracted with its own pipeline, in input order.
    fn extract_all(&self) -> Result<Vec<(String, Extraction)>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let options = self.option_set();
        debug!(files = source_paths.len(), ?options, "extracting");
        source_paths
            .par_iter()
            .map(|source_path| {
                let source_path_str = source_path.to_string_lossy().to_string();
                let extraction = self
                    .extract_one(source_path, &options)
                    .with_context(|| format!("failed to extract {source_path_str}"))?;
                Ok((source_path_str, extraction))
            })
            .collect()
    }

    fn extract_one(&self, source_path: &Path, options: &OptionSet) -> Result<Extraction> {
        let source = std::fs::read_to_string(source_path).context("failed to read source file")?;
        let json_value = serde_json::from_str::<serde_json::Value>(&source).context("failed to parse JSON")?;
        let json_value = match self.json_pointer.as_deref() {
            None => json_value,
            Some(pointer) => json_value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing"))?,
        };
        let document = Document::from_value(json_value)?;
        Ok(document.extract(options)?)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Ir(target) => {
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let extractions = target.input_settings.extract_all()?;
                let value = keyed_by_file(extractions, |x| serde_json::to_value(&x))?;
                target.write(&value)
            }
            Command::Schema(target) => {
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let extractions = target.input_settings.extract_all()?;
                let value = keyed_by_file(extractions, |x| {
                    let schemas = x.roots
                        .iter()
                        .map(|(name, node)| (name.clone(), crate::schema::document_schema(node, &x.catalog)))
                        .collect::<serde_json::Map<_, _>>();
                    Ok(serde_json::Value::Object(schemas))
                })?;
                target.write(&value)
            }
            Command::Show(target) => {
                for (path, extraction) in target.input_settings.extract_all()? {
                    println!("{}", path.bold());
                    for (name, node) in &extraction.roots {
                        let rendered = node.to_string();
                        let rendered = if node.is_unknown() { rendered.red() } else { rendered.green() };
                        println!("  {}: {rendered}", name.cyan());
                    }
                    if target.catalog {
                        print_catalog(&extraction);
                    }
                }
                Ok(())
            }
        }
    }
}

impl JsonOut {
    fn write(&self, value: &serde_json::Value) -> Result<()> {
        let src = serde_json::to_string_pretty(value)?;
        if let Some(out) = self.out.as_ref() {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &src).with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "wrote output");
        } else {
            println!("{src}");
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// A single file is emitted bare; several are keyed by path.
fn keyed_by_file<F>(extractions: Vec<(String, Extraction)>, mut render: F) -> Result<serde_json::Value>
where
    F: FnMut(&Extraction) -> serde_json::Result<serde_json::Value>,
{
    if let [(_, only)] = extractions.as_slice() {
        return Ok(render(only)?);
    }
    let mut out = serde_json::Map::new();
    for (path, extraction) in &extractions {
        out.insert(path.clone(), render(extraction)?);
    }
    Ok(serde_json::Value::Object(out))
}

fn print_catalog(extraction: &Extraction) {
    let sections = [
        ("classes", &extraction.catalog.classes),
        ("records", &extraction.catalog.records),
        ("functions", &extraction.catalog.functions),
        ("aliases", &extraction.catalog.aliases),
    ];
    for (title, table) in sections {
        if table.is_empty() {
            continue;
        }
        println!("  {}", title.yellow());
        for (name, node) in table {
            match node {
                crate::node::Node::Class(c) => {
                    println!("    {name}");
                    for (field, ty) in &c.fields {
                        println!("      {field}: {ty}");
                    }
                }
                crate::node::Node::Record(r) => {
                    println!("    {name} (total={})", r.total);
                    for (field, ty) in &r.fields {
                        println!("      {field}: {ty}");
                    }
                }
                other => println!("    {name} = {other}"),
            }
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
