// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn pattern_arg() -> Arg {
    Arg::new("pattern")
        .short('p')
        .long("pattern")
        .action(ArgAction::SetTrue)
        .help("Treat the target as a version pattern")
}

fn build_cli() -> Command {
    Command::new("propdb")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Propdb Contributors")
        .about("Inspect and query package metadata property lists")
        .subcommand_required(true)
        .subcommand(
            Command::new("show")
                .about("Print a plist file (plain or gzip) as XML")
                .arg(Arg::new("path").required(true).help("Path to the plist file"))
                .arg(
                    Arg::new("entry")
                        .short('e')
                        .long("entry")
                        .value_name("NAME")
                        .help("Read this entry from a tar archive instead"),
                ),
        )
        .subcommand(
            Command::new("find")
                .about("Find a package record in a package collection file")
                .arg(Arg::new("path").required(true).help("Path to the collection plist"))
                .arg(Arg::new("target").required(true).help("Package name or pattern"))
                .arg(pattern_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a package record from a package collection file")
                .arg(Arg::new("path").required(true).help("Path to the collection plist"))
                .arg(Arg::new("pkgname").required(true).help("Package name to remove"))
                .arg(
                    Arg::new("gzip")
                        .short('z')
                        .long("gzip")
                        .action(ArgAction::SetTrue)
                        .help("Write the result gzip-compressed"),
                ),
        )
        .subcommand(
            Command::new("installed")
                .about("Look up a package in the installed-packages registry")
                .arg(Arg::new("target").required(true).help("Package name or pattern"))
                .arg(pattern_arg())
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .value_name("DIR")
                        .help("Root directory"),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("JSON configuration file"),
                ),
        )
}

fn render(cmd: Command, title: &str, path: &Path) -> io::Result<()> {
    let mut buffer = Vec::new();
    Man::new(cmd).title(title).render(&mut buffer)?;
    fs::write(path, buffer)
}

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");

    let man_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default()).join("man");
    fs::create_dir_all(&man_dir)?;

    // propdb.1 plus one page per subcommand (propdb-show.1, ...)
    let cmd = build_cli();
    for sub in cmd.get_subcommands() {
        let title = format!("propdb-{}", sub.get_name());
        render(sub.clone(), &title, &man_dir.join(format!("{}.1", title)))?;
    }
    render(cmd, "propdb", &man_dir.join("propdb.1"))
}
