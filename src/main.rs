use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches,
    Command,
};
use colored::Colorize;
use materialize::{
    api::{self, SyncRequest},
    BuildContext, MaterializeError, Options, OutputFileSystem,
};
use miette::IntoDiagnostic;
use std::path::PathBuf;

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("sync")
                .about("Replays a staging directory as build cycles and writes changed assets")
                .arg(
                    Arg::new("staging")
                        .help("directory holding the build output to materialize")
                        .value_parser(value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("output-path")
                        .long("output-path")
                        .help("the build's output directory")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("fallback-output-path")
                        .long("fallback-output-path")
                        .help("output directory used when --output-path is missing or '/'")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("toml file with `test`, `useHashIndex` and `log` options")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("test")
                        .short('t')
                        .long("test")
                        .help("only write assets whose path matches this regex"),
                )
                .arg(
                    Arg::new("no-hash-index")
                        .long("no-hash-index")
                        .help("write every asset on every cycle")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help("do not log per-asset decisions")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("filesystem")
                        .long("filesystem")
                        .help("the build's output filesystem")
                        .value_parser(["memory", "disk"])
                        .default_value("memory"),
                )
                .arg(
                    Arg::new("cycles")
                        .long("cycles")
                        .help("number of build cycles to replay")
                        .value_parser(value_parser!(usize))
                        .default_value("1"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validates an options file")
                .arg(
                    Arg::new("config")
                        .help("toml file to validate")
                        .value_parser(value_parser!(PathBuf))
                        .required(true),
                ),
        )
        .get_matches();

    let is_verbose = matches.get_flag("verbose");

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if is_verbose { "debug" } else { "warn" }),
    )
    .init();

    match matches.subcommand() {
        Some(("sync", args)) => handle_sync(args)?,
        Some(("check", args)) => handle_check(args)?,
        _ => unreachable!(),
    }

    Ok(())
}

fn build_options(args: &ArgMatches) -> Result<Options, MaterializeError> {
    let mut options = match args.get_one::<PathBuf>("config") {
        Some(path) => Options::from_file(path)?,
        None => Options::default(),
    };

    if let Some(pattern) = args.get_one::<String>("test") {
        options = options.with_test_pattern(pattern)?;
    }

    if args.get_flag("no-hash-index") {
        options = options.with_hash_index(false);
    }

    if args.get_flag("quiet") {
        options = options.with_log(false);
    }

    Ok(options)
}

fn handle_sync(args: &ArgMatches) -> miette::Result<()> {
    let staging = args
        .get_one::<PathBuf>("staging")
        .cloned()
        .ok_or_else(|| miette::miette!("staging directory required"))?;

    let filesystem = args
        .get_one::<String>("filesystem")
        .map(|value| value.parse::<OutputFileSystem>())
        .transpose()
        .map_err(|error| miette::miette!(error))?
        .unwrap_or(OutputFileSystem::Memory);

    let cycles = args.get_one::<usize>("cycles").copied().unwrap_or(1);

    let working_dir = std::env::current_dir().into_diagnostic()?;

    let mut context = BuildContext::new(filesystem, working_dir);
    context.output_path = args.get_one::<PathBuf>("output-path").cloned();
    context.fallback_output_path = args.get_one::<PathBuf>("fallback-output-path").cloned();

    let options = build_options(args)?;

    let reports = api::sync(SyncRequest {
        staging,
        context,
        options,
        cycles,
    })?;

    for (index, report) in reports.iter().enumerate() {
        if report.is_idle() {
            println!("{} idle", format!("cycle {}:", index + 1).bold());
            continue;
        }

        println!(
            "{} {} written, {} skipped, {} filtered",
            format!("cycle {}:", index + 1).bold(),
            report.written().to_string().green(),
            report.skipped().to_string().yellow(),
            report.filtered()
        );
    }

    Ok(())
}

fn handle_check(args: &ArgMatches) -> miette::Result<()> {
    let path = args
        .get_one::<PathBuf>("config")
        .ok_or_else(|| miette::miette!("config file required"))?;

    let options = api::check_options(path)?;

    println!("{} {}", "valid".green(), options);

    Ok(())
}
