// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use propdb::codec::{self, Encoding};
use propdb::query::{self, MatchMode, PACKAGES_KEY, Query};
use propdb::registry::{InstalledLookup, Registry};
use propdb::{Config, Dictionary, plist::xml};
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "propdb")]
#[command(author, version, about = "Inspect and query package metadata property lists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a plist file (plain or gzip) as XML
    Show {
        /// Path to the plist file
        path: PathBuf,
        /// Read this entry from a tar archive instead
        #[arg(short, long)]
        entry: Option<String>,
    },
    /// Find a package record in a package collection file
    Find {
        /// Path to the collection plist
        path: PathBuf,
        /// Package name, or pattern with --pattern
        target: String,
        /// Treat the target as a version pattern
        #[arg(short, long)]
        pattern: bool,
    },
    /// Remove a package record from a package collection file
    Remove {
        /// Path to the collection plist
        path: PathBuf,
        /// Package name to remove
        pkgname: String,
        /// Write the result gzip-compressed
        #[arg(short = 'z', long)]
        gzip: bool,
    },
    /// Look up a package in the installed-packages registry
    Installed {
        /// Package name, or pattern with --pattern
        target: String,
        /// Treat the target as a version pattern
        #[arg(short, long)]
        pattern: bool,
        /// Root directory
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn match_mode(pattern: bool) -> MatchMode {
    if pattern {
        MatchMode::ByPattern
    } else {
        MatchMode::ByName
    }
}

fn print_dict(dict: &Dictionary) {
    print!("{}", xml::externalize(dict));
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show { path, entry } => {
            let dict = match entry {
                Some(name) => {
                    let file = File::open(&path)
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    codec::read_tree_from_archive(file, &name)?.ok_or_else(|| {
                        anyhow::anyhow!("{} has no entry named {}", path.display(), name)
                    })?
                }
                None => codec::read_tree_from_file(&path)?,
            };
            print_dict(&dict);
            Ok(())
        }
        Commands::Find {
            path,
            target,
            pattern,
        } => {
            let collection = codec::read_tree_from_file(&path)?;
            let query = Query::default();
            match query.find_pkg_in_dict(&collection, PACKAGES_KEY, &target, match_mode(pattern)) {
                Some(pkg) => {
                    print_dict(pkg);
                    Ok(())
                }
                None => Err(anyhow::anyhow!(
                    "No package matching '{}' in {}",
                    target,
                    path.display()
                )),
            }
        }
        Commands::Remove {
            path,
            pkgname,
            gzip,
        } => {
            let encoding = if gzip { Encoding::Gzip } else { Encoding::Plain };
            if !query::remove_pkg_dict_from_plist_by_name(&path, &pkgname, encoding)? {
                return Err(anyhow::anyhow!(
                    "Package '{}' not found in {}",
                    pkgname,
                    path.display()
                ));
            }
            println!("Removed {} from {}", pkgname, path.display());
            Ok(())
        }
        Commands::Installed {
            target,
            pattern,
            root,
            config,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            if let Some(root) = root {
                config.root_dir = root;
            }

            info!("Using registry {}", config.registry_path().display());
            let registry = Registry::new(&config);

            match registry.find_installed(&target, match_mode(pattern))? {
                InstalledLookup::Found(pkg) => {
                    print_dict(&pkg);
                    Ok(())
                }
                InstalledLookup::ConfigFilesOnly => Err(anyhow::anyhow!(
                    "Package '{}' was removed; only its configuration files remain",
                    target
                )),
                InstalledLookup::Absent => {
                    Err(anyhow::anyhow!("Package '{}' is not installed", target))
                }
            }
        }
    }
}
