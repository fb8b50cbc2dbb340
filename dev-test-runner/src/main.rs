//! End-to-end smoke run over the bundled sample documents.
use anyhow::{bail, Result};
use shape_ir::{Document, ExtractOption, Node, OptionSet};

const LIBRARY: &str = include_str!("../../samples/library.json");

fn main() -> Result<()> {
    let document = Document::parse(LIBRARY)?;

    for options in [
        OptionSet::default(),
        OptionSet::default().with(ExtractOption::CollapseOptional).with(ExtractOption::SortFields),
    ] {
        let extraction = document.extract(&options)?;
        eprintln!("—— options: {:?} ——", options.iter().map(|o| o.to_string()).collect::<Vec<_>>());
        for (name, node) in &extraction.roots {
            eprintln!("{name}: {node}");
        }

        // cycles must come back as references, not as infinite trees
        let Some(Node::Class(author)) = extraction.roots.get("author") else {
            bail!("author did not normalize to a class");
        };
        if author.fields["books"].to_string() != "List[library.Book]" {
            bail!("unexpected books field: {}", author.fields["books"]);
        }
        if !extraction.roots["opaque"].is_unknown() {
            bail!("opaque descriptor should fall back to unknown");
        }
        if extraction.catalog.classes.len() != 2 || extraction.catalog.functions.len() != 1 {
            bail!("unexpected catalog: {:#?}", extraction.catalog);
        }

        let schema = shape_ir::schema::document_schema(&extraction.roots["author"], &extraction.catalog);
        println!("{}", serde_json::to_string_pretty(&schema)?);
    }

    eprintln!("✅ success");
    Ok(())
}
