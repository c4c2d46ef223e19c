//! tapbot - Android icon-tap automation over adb.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use tapbot::automation::{AutomationRequest, AutomationRun};
use tapbot::cli::{self, Cli, Commands, LedgerCommand};
use tapbot::config::AppConfig;
use tapbot::device::{AdbBridge, DeviceBridge};
use tapbot::error::{Result, TapError};
use tapbot::ledger::Ledger;
use tapbot::locator::{IconLocator, load_image, save_debug_image};
use tapbot::logging::init_logging;
use tapbot::output::{LocateResult, Output, OutputMode, ServerInfo};
use tapbot::server::{self, AppContext};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> Option<&'static str> {
        option_env!("VERGEN_GIT_SHA")
    }

    pub fn build_timestamp() -> Option<&'static str> {
        option_env!("VERGEN_BUILD_TIMESTAMP")
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    let output = OutputMode::from_cli(&cli).into_output();

    if let Err(e) = run(&cli, output.as_ref()) {
        output.error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, output: &dyn Output) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Serve(args)) => cmd_serve(cli, output, args),
        Some(Commands::Run(args)) => cmd_run(cli, output, args),
        Some(Commands::Locate(args)) => cmd_locate(cli, output, args),
        Some(Commands::Devices) => cmd_devices(cli, output),
        Some(Commands::Ledger(command)) => cmd_ledger(cli, output, command),
        Some(Commands::Config(args)) => cmd_config(cli, output, args),
        Some(Commands::Version) => {
            output.version_info(
                build_info::VERSION,
                build_info::git_sha(),
                build_info::build_timestamp(),
            );
            Ok(())
        }
        Some(Commands::Completions(args)) => {
            use clap::CommandFactory;
            clap_complete::generate(args.shell, &mut Cli::command(), "tapbot", &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<(AppConfig, Option<std::path::PathBuf>)> {
    let (config, source) = AppConfig::discover(cli.config.as_deref())?;
    debug!(source = ?source, "Configuration loaded");
    Ok((config, source))
}

fn bridge_for(config: &AppConfig) -> Arc<dyn DeviceBridge> {
    Arc::new(AdbBridge::new(config.automation.adb_path.clone()))
}

// === Quick Start (Robot Mode Optimized) ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    automation: RobotAutomation,
    ledger: RobotLedger,
    output_modes: OutputModes,
}

#[derive(Serialize)]
struct RobotAutomation {
    list_devices: &'static str,
    run_once: &'static str,
    locate_icon: &'static str,
    serve: &'static str,
    trigger: &'static str,
}

#[derive(Serialize)]
struct RobotLedger {
    refresh: &'static str,
    show: &'static str,
    set_user: &'static str,
    set_name: &'static str,
    export: &'static str,
}

#[derive(Serialize)]
struct OutputModes {
    human: &'static str,
    robot: &'static str,
    compact: &'static str,
}

/// Prints quick-start help optimized for both humans and AI agents.
#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        let help = RobotQuickStart {
            tool: "tapbot",
            version: build_info::VERSION,
            description: "Android icon-tap automation over adb with template matching",
            automation: RobotAutomation {
                list_devices: "tapbot devices --robot",
                run_once: "tapbot run --device <SERIAL> --url <URL> [--package <PKG>]",
                locate_icon: "tapbot locate <SCREEN> <TEMPLATE> --robot",
                serve: "tapbot serve --port 5000",
                trigger: "POST /run_bot {device_name, package_name, video_url}",
            },
            ledger: RobotLedger {
                refresh: "tapbot ledger refresh",
                show: "tapbot ledger show [DEVICE]",
                set_user: "tapbot ledger set-user <DEVICE> <PACKAGE> <USER>",
                set_name: "tapbot ledger set-name <DEVICE> <NAME>",
                export: "tapbot ledger export",
            },
            output_modes: OutputModes {
                human: "--format=text (default)",
                robot: "--robot or --format=json",
                compact: "--format=json-compact",
            },
        };
        let json = serde_json::to_string_pretty(&help)
            .map_err(|e| TapError::Other(format!("Failed to encode quick start: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "{} {} - Android icon-tap automation\n",
        style("tapbot").bold().cyan(),
        build_info::VERSION
    );
    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  List attached devices", style("tapbot devices").green());
    println!(
        "  {}  Run once",
        style("tapbot run -d <SERIAL> -u <URL>").green()
    );
    println!(
        "  {}  Find an icon",
        style("tapbot locate screen.png icon.png").green()
    );
    println!("  {}  Start the trigger server", style("tapbot serve").green());
    println!("  {}  Username ledger", style("tapbot ledger show").green());
    println!();
    println!("{}", style("ROBOT MODE (for AI agents)").bold().underlined());
    println!();
    println!("  {}  JSON output", style("tapbot --robot <command>").cyan());
    println!("  {}  Quick-start JSON", style("tapbot --robot").cyan());
    println!();
    println!("Run {} for full help", style("tapbot --help").yellow());
    Ok(())
}

// === Commands ===

fn cmd_serve(cli: &Cli, output: &dyn Output, args: &cli::ServeArgs) -> Result<()> {
    let (config, _) = load_config(cli)?;
    let bind = args.bind.clone().unwrap_or_else(|| config.server.bind.clone());
    let port = args.port.unwrap_or(config.server.port);

    let template_dir = config.automation.template_dir.clone();
    if !template_dir.exists() {
        info!(dir = %template_dir.display(), "Creating template directory");
        std::fs::create_dir_all(&template_dir)?;
    }
    let missing_templates = config.automation.missing_templates();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = server::bind(&bind, port).await?;
        let addr = listener
            .local_addr()
            .map_or_else(|_| format!("{bind}:{port}"), |a| a.to_string());
        output.server_started(&ServerInfo {
            addr,
            template_dir,
            missing_templates,
        });
        server::serve(listener, AppContext::with_adb(config)).await
    })
}

fn cmd_run(cli: &Cli, output: &dyn Output, args: &cli::RunArgs) -> Result<()> {
    let (config, _) = load_config(cli)?;
    let request = AutomationRequest {
        serial: args.device.clone(),
        package: args.package.clone(),
        url: args.url.clone(),
    };
    let mut run = AutomationRun::new(bridge_for(&config), &request, &config.automation)?;

    let spinner = (!cli.use_json() && !cli.quiet).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Running on {}", request.serial));
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });

    let report = run.run_with_report();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match report {
        Some(report) => {
            output.run_report(&request, &report);
            Ok(())
        }
        None => Err(TapError::RunFailed {
            serial: run.serial().to_string(),
        }),
    }
}

fn cmd_locate(cli: &Cli, output: &dyn Output, args: &cli::LocateArgs) -> Result<()> {
    let threshold = match args.threshold {
        Some(t) => t,
        None => load_config(cli)?.0.automation.threshold,
    };
    let locator = IconLocator::new(threshold)?;

    // Unreadable inputs are errors for this command, not a miss.
    let screen = load_image(&args.screen)?;
    let template = load_image(&args.template)?;

    let found = locator.locate(&screen, &template);
    if let (Some(found), Some(path)) = (&found, args.debug_out.as_deref()) {
        save_debug_image(&screen, found, path)?;
    }
    let result = LocateResult::new(&args.screen, &args.template, threshold, found)
        .with_debug_image(args.debug_out.as_deref());
    output.locate_result(&result);
    Ok(())
}

fn cmd_devices(cli: &Cli, output: &dyn Output) -> Result<()> {
    let (config, _) = load_config(cli)?;
    let devices = bridge_for(&config).list_devices()?;
    output.device_list(&devices);
    Ok(())
}

fn open_ledger(config: &AppConfig) -> Result<Ledger> {
    Ledger::open(&config.ledger.store, &config.ledger.packages)
}

fn cmd_ledger(cli: &Cli, output: &dyn Output, command: &LedgerCommand) -> Result<()> {
    let (config, _) = load_config(cli)?;
    let mut ledger = open_ledger(&config)?;

    match command {
        LedgerCommand::Refresh => {
            let devices = bridge_for(&config).attached_serials()?;
            let summary = ledger.refresh(&devices)?;
            output.ledger_refreshed(&summary);
        }
        LedgerCommand::Show(args) => match &args.device {
            Some(device) => show_device(&ledger, output, device)?,
            None => {
                let tables = ledger
                    .records()
                    .iter()
                    .map(|record| Ok((record, ledger.rows(&record.device_id)?)))
                    .collect::<Result<Vec<_>>>()?;
                output.ledger_tables(&tables);
            }
        },
        LedgerCommand::SetUser(args) => {
            ledger.set_user(&args.device, &args.package, &args.user)?;
            output.success(&format!(
                "{} / {} set to '{}'",
                args.device,
                args.package,
                args.user.trim()
            ));
        }
        LedgerCommand::SetName(args) => {
            ledger.set_device_name(&args.device, &args.name)?;
            let name = ledger
                .record(&args.device)
                .map_or(args.device.as_str(), |r| r.device_name.as_str());
            output.success(&format!("{} is now named '{name}'", args.device));
        }
        LedgerCommand::Export => output.ledger_records(ledger.records()),
    }
    Ok(())
}

fn show_device(ledger: &Ledger, output: &dyn Output, device: &str) -> Result<()> {
    let rows = ledger.rows(device)?;
    let record = ledger.record(device).ok_or_else(|| TapError::DeviceNotFound {
        device: device.to_string(),
    })?;
    output.ledger_table(record, &rows);
    Ok(())
}

fn cmd_config(cli: &Cli, output: &dyn Output, args: &cli::ConfigArgs) -> Result<()> {
    let (config, source) = load_config(cli)?;
    let source = source.as_deref().map(absolute);
    if args.path {
        output.config_path(source.as_deref());
    } else {
        output.config_info(&config, source.as_deref());
    }
    Ok(())
}

fn absolute(path: &Path) -> std::path::PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
