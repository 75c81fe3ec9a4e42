use clap::{Parser, Subcommand};
use std::path::PathBuf;
use websmith::render::PandocRenderer;
use websmith::site::{self, Selection};
use websmith::{config, document, layout::Layout};

/// Flags selecting which document families a command covers. No flag at all
/// means everything.
#[derive(clap::Args, Clone, Copy)]
struct SelectionArgs {
    /// Build only blog documents
    #[arg(long)]
    blog: bool,

    /// Build only choose-your-own-adventure documents
    #[arg(long)]
    cyoa: bool,

    /// Build only plain pages and resources
    #[arg(long)]
    pages: bool,
}

impl SelectionArgs {
    fn selection(&self) -> Selection {
        if !self.blog && !self.cyoa && !self.pages {
            return Selection::all();
        }
        Selection {
            blog: self.blog,
            cyoa: self.cyoa,
            pages: self.pages,
        }
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "websmith")]
#[command(about = "Static site builder for a personal website")]
#[command(long_about = "\
Static site builder for a personal website

The input tree is the data source: markdown files become pages, *.blog
files become a chronologically linked blog, and outline scripts become
choose-your-own-adventure games. Typesetting goes through pandoc.

Input structure:

  input/
  ├── config.toml                  # Site config (optional)
  ├── template.html                # Pandoc templates
  ├── template_blog.html
  ├── template_blog_index_compact.html
  ├── template_blog_index_expanded.html
  ├── template_cyoa.html
  ├── main/
  │   ├── about.md                 # Page → /about
  │   ├── robots.txt.nomove        # Kept in place → /robots.txt
  │   ├── photo.png                # Resource → /r/photo.png
  │   ├── notes.blog               # Blog posts → /posts/YYYYMMDD
  │   └── drafts.hide              # Ignored
  └── cyoa/
      └── menu                     # Game script → /cyoa/<unique id>

Blog posts carry @-prefixed headers (a leading year needs no keyword):

  @2020 01 05
  @title An optional title
  @tag facebook
  Body of the post.

Run 'websmith gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Input directory
    #[arg(long, default_value = "input", global = true)]
    source: PathBuf,

    /// Output directory (the website root)
    #[arg(long, default_value = "www", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the website: read inputs, typeset through pandoc, write output
    Build {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Only process documents modified within the recent window
        #[arg(long)]
        recent: bool,
    },
    /// Validate content and report what would be built, without writing
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let layout = Layout::new(&cli.source, &cli.output);

    match cli.command {
        Command::Build { selection, recent } => {
            let config = config::load_config(layout.input_dir())?;
            let mut docs = site::create_documents(&layout, &config, selection.selection())?;
            site::create_directories(&layout)?;
            site::process_all(&mut docs, &PandocRenderer, &layout, &config, recent)?;
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            let config = config::load_config(layout.input_dir())?;
            println!("==> Checking {}", cli.source.display());
            let docs = site::create_documents(&layout, &config, Selection::all())?;
            document::check_target_conflicts(&docs)?;
            println!("==> {} documents, content is valid", docs.len());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
