//! upkern CLI entrypoint.
//!
//! This binary resolves the latest stable kernel, downloads the mainline
//! packages for one architecture and flavor, verifies them against the
//! archive's manifest, and optionally installs them with dpkg.

use camino::Utf8Path;
use clap::Parser;
use std::io::Write;
use upkern_installer::archive::http::UreqClient;
use upkern_installer::cli::{Cli, Command, DownloadArgs, ListArgs};
use upkern_installer::config::Config;
use upkern_installer::dirs::{BaseDirs, SystemBaseDirs};
use upkern_installer::error::{InstallerError, Result};
use upkern_installer::install::{DpkgGateway, InstallGateway};
use upkern_installer::output::{
    catalog_json, catalog_summary, render_catalog, render_run_report, run_report_json,
    write_stderr_line,
};
use upkern_installer::pipeline::{Pipeline, RunReport};
use upkern_installer::process::SystemCommandExecutor;
use upkern_installer::transfer::{PathToolLocator, select_transfer};

/// How a run that did not abort ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Every selected package verified.
    Clean,
    /// Some packages failed to transfer or verify.
    Incomplete,
}

struct Streams<'a> {
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
    quiet: bool,
}

impl Streams<'_> {
    fn progress(&mut self, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(self.stderr, message);
        }
    }

    fn emit(&mut self, text: impl std::fmt::Display) -> Result<()> {
        writeln!(self.stdout, "{text}").map_err(|source| InstallerError::WriteFailed { source })
    }
}

fn main() {
    let cli = Cli::parse();
    let dirs = SystemBaseDirs::new();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = {
        let mut streams = Streams {
            stdout: &mut stdout,
            stderr: &mut stderr,
            quiet: cli.global.quiet,
        };
        run(&cli, &dirs, &mut streams)
    };
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, dirs: &dyn BaseDirs, streams: &mut Streams<'_>) -> Result<Outcome> {
    let config = load_config(cli, dirs)?;
    let transfer = select_transfer(config.transfer, &PathToolLocator);
    let client = UreqClient;

    match &cli.command {
        Command::List(args) => {
            // Listing never writes to disk, so an unresolvable root is fine.
            let root = config.destination_root.clone().unwrap_or_default();
            let pipeline = Pipeline::new(&config, &client, transfer, root);
            run_list(&pipeline, args, streams)
        }
        Command::Download(args) => {
            let root = config.resolve_destination_root(dirs)?;
            let mechanism = transfer.mechanism().to_string();
            let pipeline = Pipeline::new(&config, &client, transfer, root.clone());
            let report = run_download(&pipeline, args, streams, &root, &mechanism)?;
            finish_download(&report, args, streams)
        }
    }
}

fn load_config(cli: &Cli, dirs: &dyn BaseDirs) -> Result<Config> {
    let config = Config::load(cli.global.config.as_deref(), dirs)?
        .with_overrides(cli.global.overrides())?;
    log::debug!("effective configuration: {config:?}");
    Ok(config)
}

fn run_list(
    pipeline: &Pipeline<'_>,
    args: &ListArgs,
    streams: &mut Streams<'_>,
) -> Result<Outcome> {
    streams.progress("Resolving kernel version...");
    let prepared = pipeline.prepare()?;
    if args.json {
        streams.emit(catalog_json(&prepared.version, &prepared.build))?;
    } else {
        streams.emit(render_catalog(&prepared.version, &prepared.build).trim_end())?;
    }
    Ok(Outcome::Clean)
}

fn run_download(
    pipeline: &Pipeline<'_>,
    args: &DownloadArgs,
    streams: &mut Streams<'_>,
    root: &Utf8Path,
    mechanism: &str,
) -> Result<RunReport> {
    streams.progress("Resolving kernel version...");
    let prepared = pipeline.prepare()?;
    streams.progress(catalog_summary(&prepared.version, &prepared.build));

    let selection = prepared.select(args.group(), &args.roles)?;
    streams.progress(format!(
        "Downloading {} package(s) for {} into {root}/{} using {mechanism}...",
        selection.len(),
        args.group(),
        prepared.version
    ));

    let report = pipeline.download(&prepared, &selection);
    if args.json {
        let value = run_report_json(&report).map_err(|err| InstallerError::WriteFailed {
            source: std::io::Error::other(err),
        })?;
        streams.emit(value)?;
    } else {
        streams.emit(render_run_report(&report))?;
    }
    Ok(report)
}

fn finish_download(
    report: &RunReport,
    args: &DownloadArgs,
    streams: &mut Streams<'_>,
) -> Result<Outcome> {
    if !report.is_clean() {
        if args.install {
            streams.progress("Not installing: some packages did not verify.");
        }
        return Ok(Outcome::Incomplete);
    }
    if args.install {
        install_verified(report, &DpkgGateway::new(SystemCommandExecutor), streams)?;
    }
    Ok(Outcome::Clean)
}

fn install_verified(
    report: &RunReport,
    gateway: &dyn InstallGateway,
    streams: &mut Streams<'_>,
) -> Result<()> {
    let packages = report.verified_paths();
    if packages.is_empty() {
        streams.progress("Nothing to install.");
        return Ok(());
    }
    streams.progress(format!("Installing {} package(s) with dpkg...", packages.len()));
    gateway.install(&packages)?;
    streams.progress(format!(
        "Kernel {} installed; reboot to start using it.",
        report.version
    ));
    Ok(())
}

fn exit_code_for_run_result(result: Result<Outcome>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(Outcome::Clean) => 0,
        Ok(Outcome::Incomplete) => 2,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
