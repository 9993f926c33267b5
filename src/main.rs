use clap::{App, Arg, SubCommand};
use inkpost::build::build_site;
use inkpost::config::Config;
use log::error;
use std::error::Error;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("inkpost")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site into the output directory")
                .arg(
                    Arg::with_name("project")
                        .long("project")
                        .short("p")
                        .takes_value(true)
                        .default_value(".")
                        .help("A directory inside the project"),
                )
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .default_value("./_site")
                        .help("The directory the site is written to"),
                ),
        )
        .get_matches();

    let result = match matches.subcommand() {
        ("build", Some(args)) => build(
            Path::new(args.value_of("project").unwrap_or(".")),
            Path::new(args.value_of("output").unwrap_or("./_site")),
        ),
        _ => {
            eprintln!("{}", matches.usage());
            std::process::exit(2);
        }
    };

    if let Err(err) = result {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn build(project: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let config = Config::from_directory(&std::fs::canonicalize(project)?, output)?;
    build_site(config)?;
    Ok(())
}
