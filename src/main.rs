use clap::{Parser, Subcommand};
use distill::clean::SourceTreeCleaner;
use distill::config::{self, CONFIG_FILE};
use distill::fetch::HttpTransport;
use distill::output;
use distill::pipeline::BuildOrchestrator;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "distill")]
#[command(about = "Production builder for a bilingual PHP site")]
#[command(long_about = "\
Production builder for a bilingual PHP site

Cleans the development PHP tree, copies and minifies the static assets,
then renders every configured language from the running development
server into one self-contained page.

Output structure:

  dist/
  ├── assets/                      # images/ and fonts/ copied, *.min.css, *.min.js
  ├── html/                        # Templates from src/html as *.min.html
  ├── config.php                   # Site config, copied from the project root
  ├── index_en.php                 # One page per language: inlined assets,
  ├── index_hu.php                 #   static links, minified, PHP kept intact
  └── php/                         # Cleaned mirror of src/php
      ├── PHPMailer/               # Vendor directory, copied verbatim
      ├── APIClass.php
      └── autoload.php

Excluded modules (LanguageClass.php, LoggerClass.php, MinifierClass.php by
default) are left out of the mirror, and every include, use, and extends that
names them is removed from the remaining files.

Run 'distill gen-config' to generate a documented distill.toml.")]
#[command(version)]
struct Cli {
    /// Config file. Missing file means stock defaults.
    #[arg(long, default_value = CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full build: clean the source tree, build assets, then every language
    Build,
    /// Only clean the source tree into the output directory
    Clean,
    /// Print a stock distill.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            let config = config::load_config(&cli.config)?;
            let transport = HttpTransport::new(config.site.accept_invalid_certs)?;

            println!(
                "==> Building {} → {}",
                config.site.base_url,
                config.output_root().display()
            );
            let report = BuildOrchestrator::new(&config, &transport).run()?;
            output::print_build_output(&report);

            if report.built().count() == report.languages.len() {
                println!("==> Build complete: {}", report.output_root.display());
            } else {
                println!(
                    "==> Build finished with {} failed language(s): {}",
                    report.failed().count(),
                    report.output_root.display()
                );
            }
        }
        Command::Clean => {
            let config = config::load_config(&cli.config)?;
            println!(
                "==> Cleaning {} → {}",
                config.source_root().display(),
                config.php_output().display()
            );
            let report = SourceTreeCleaner::new(&config)?.run()?;
            output::print_clean_output(&report);
            println!("==> Source tree cleaned");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Route `tracing` events to stderr. `RUST_LOG` directives still apply on
/// top of the `-v` level.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
