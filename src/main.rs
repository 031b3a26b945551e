use clap::{Parser, Subcommand};
use regex::Regex;
use sitetree::ingest::{self, IgnoreRules};
use sitetree::publish;
use sitetree::tree::{AssetTree, NodeId, NodeKind};
use std::path::PathBuf;

/// Shared flags for commands that read the assets directory.
#[derive(clap::Args, Clone)]
struct IngestArgs {
    /// Ignore entries matching this regex (directory names carry a trailing
    /// `/`); repeatable
    #[arg(long = "ignore", value_name = "REGEX")]
    ignores: Vec<Regex>,
}

#[derive(Parser)]
#[command(name = "sitetree")]
#[command(about = "Content-addressed asset publishing for static sites")]
#[command(long_about = "\
Content-addressed asset publishing for static sites

Mirrors an assets directory into a tree, bundles top-level stylesheets into
one minified style.css, and publishes everything under names that embed a
SHA-256 digest of the content:

  dist/assets/
  ├── css/
  ├── notes-4f2a….txt              # <stem>-<digest><ext>
  └── imgs/
      └── 9b01…/                   # digest directory per image
          ├── 640.jpg              # requested width
          └── 1280.jpg             # original width

Changed content changes the URL, so the output is safe to serve with
immutable cache headers.")]
#[command(version)]
struct Cli {
    /// Assets directory
    #[arg(long, default_value = "assets", global = true)]
    source: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest, bundle stylesheets, and publish the assets directory
    Build {
        #[command(flatten)]
        ingest: IngestArgs,

        /// Output directory; recreated from scratch on every build
        #[arg(long, default_value = "dist/assets")]
        output: PathBuf,

        /// Image widths to materialize for every image, comma separated
        /// (widths at or beyond an image's natural width are dropped)
        #[arg(long, value_delimiter = ',', value_name = "PX")]
        widths: Vec<u32>,
    },
    /// Print the ingested asset tree without publishing
    Tree {
        #[command(flatten)]
        ingest: IngestArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build {
            ingest: ingest_args,
            output,
            widths,
        } => {
            println!("==> Ingesting {}", cli.source.display());
            let ignores = IgnoreRules::new(ingest_args.ignores);
            let mut tree = ingest::ingest_tree(&cli.source, &ignores)?;

            println!("==> Bundling stylesheets");
            publish::bundle_stylesheets(&mut tree)?;

            println!("==> Publishing to {}", output.display());
            if output.exists() {
                std::fs::remove_dir_all(&output)?;
            }
            std::fs::create_dir_all(&output)?;
            publish::publish(&mut tree, &output, false)?;

            if !widths.is_empty() {
                println!("==> Materializing image widths {widths:?}");
                let images = collect_images(&mut tree);
                for id in images {
                    tree.add_sizes(id, &widths);
                    publish::process_sizes(&mut tree, id)?;
                }
            }

            let manifest = publish::manifest(&tree);
            let json = serde_json::to_string_pretty(&manifest)?;
            std::fs::write(output.join("manifest.json"), json)?;

            println!(
                "==> Published {} assets to {}",
                manifest.assets.len(),
                output.display()
            );
        }
        Command::Tree {
            ingest: ingest_args,
        } => {
            let ignores = IgnoreRules::new(ingest_args.ignores);
            let mut tree = ingest::ingest_tree(&cli.source, &ignores)?;
            print_tree(&mut tree);
        }
    }

    Ok(())
}

fn collect_images(tree: &mut AssetTree) -> Vec<NodeId> {
    let mut images = Vec::new();
    let root = tree.root();
    tree.for_each(root, |tree, id| {
        if tree.node(id).kind == NodeKind::Image {
            images.push(id);
        }
    });
    images
}

fn print_tree(tree: &mut AssetTree) {
    let root = tree.root();
    tree.for_each(root, |tree, id| {
        let depth = std::iter::successors(tree.node(id).parent, |&p| tree.node(p).parent).count();
        let node = tree.node(id);
        let suffix = match node.kind {
            NodeKind::Directory => "/".to_string(),
            NodeKind::Image => format!(" ({}px)", tree.original_width(id)),
            NodeKind::File => String::new(),
        };
        println!("{}{}{}", "  ".repeat(depth), node.name, suffix);
    });
}
