use crate::{
    app::App,
    backend::{LocalBackend, ModBackend},
    config::{self, AppConfig},
    game,
    library::MoveDirection,
};
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hymn")]
#[command(author, version, about = "Mod, pack and plugin profiles for Hytale", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Data directory override
    #[arg(long, env = "HYMN_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Install root override for this run (folder holding mods/, packs/, earlyplugins/)
    #[arg(long, global = true)]
    install_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the install and summarize what was found
    Scan,
    /// Show the active profile and warning counts
    Status,
    /// List every cataloged mod
    Mods,
    /// Show scan warnings and dependency warnings for the active profile
    Warnings,
    /// Show the active profile's load order
    Order,
    /// Enable or disable a mod in the active profile
    Toggle(ToggleArgs),
    /// Move a mod one slot up or down in the load order
    Move {
        /// Mod id
        id: String,
        /// up or down
        direction: MoveDirection,
    },
    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Dependency reports
    #[command(subcommand)]
    Deps(DepsCommand),
    /// Apply the active profile and take a snapshot
    Apply,
    /// Restore profiles from a snapshot (latest when omitted)
    Rollback {
        snapshot: Option<String>,
    },
    /// List snapshots, newest first
    Snapshots,
    /// Show detected install and data paths
    Paths,
    /// Print the end of the activity log
    Log {
        #[arg(short = 'n', long, default_value_t = 40)]
        lines: usize,
    },
    /// Show or change settings
    Config(ConfigArgs),
}

#[derive(Args)]
struct ToggleArgs {
    /// Mod id
    id: String,
    /// Enable the mod
    #[arg(long, conflicts_with = "off")]
    on: bool,
    /// Disable the mod
    #[arg(long)]
    off: bool,
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// List profiles
    List,
    /// Create a profile, optionally copying another one
    Create {
        name: String,
        #[arg(long)]
        copy_from: Option<String>,
    },
    /// Rename a profile
    Rename { id: String, name: String },
    /// Delete a profile
    Delete { id: String },
    /// Make a profile active
    Use { id: String },
    /// Write a profile's load order as a plain mod list
    Export {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DepsCommand {
    /// Dependencies no installed mod satisfies
    Missing,
}

#[derive(Args)]
struct ConfigArgs {
    /// Remember this install root
    #[arg(long)]
    install_root: Option<PathBuf>,
    /// Turn dependency warnings on or off
    #[arg(long)]
    dependency_warnings: Option<bool>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref())?;
    let mut app_config = AppConfig::load_or_create(&data_dir)?;

    if let Command::Config(args) = &cli.command {
        return run_config(&data_dir, &mut app_config, args, cli.json);
    }

    let root = cli
        .install_root
        .clone()
        .or_else(|| app_config.install_root.clone());
    let paths = game::detect_paths(root.as_deref())
        .context("no Hytale install found; pass --install-root or run `hymn config --install-root <dir>`")?;

    let backend = LocalBackend::new(&data_dir, paths);
    let mut app = App::new(backend, app_config, Some(data_dir.join("hymn.log")));
    app.refresh()?;
    run_command(&mut app, cli.command, cli.json)
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config(
    data_dir: &std::path::Path,
    app_config: &mut AppConfig,
    args: &ConfigArgs,
    as_json: bool,
) -> Result<()> {
    let mut changed = false;
    if let Some(root) = &args.install_root {
        if !game::looks_like_install_root(root) {
            bail!(
                "{} has no mods/, packs/ or earlyplugins/ folder",
                root.display()
            );
        }
        app_config.install_root = Some(root.clone());
        changed = true;
    }
    if let Some(enabled) = args.dependency_warnings {
        app_config.warn_missing_dependencies = enabled;
        changed = true;
    }
    if changed {
        app_config.save(data_dir)?;
    }

    if as_json {
        return print_json(&app_config);
    }
    println!(
        "Install root: {}",
        app_config
            .install_root
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "auto-detect".to_string())
    );
    println!(
        "Dependency warnings: {}",
        if app_config.warn_missing_dependencies { "on" } else { "off" }
    );
    Ok(())
}

fn run_command(app: &mut App<LocalBackend>, command: Command, as_json: bool) -> Result<()> {
    match command {
        Command::Scan => {
            let counts = app.counts();
            if as_json {
                return print_json(&json!({ "counts": counts, "warnings": app.warnings() }));
            }
            println!(
                "{} mod(s): {} pack(s), {} plugin(s), {} early plugin(s)",
                counts.total, counts.packs, counts.plugins, counts.early
            );
            print_lines("Scan warnings", app.warnings());
        }
        Command::Status => {
            let active = app.active_profile().cloned();
            let profile_warnings = app.profile_warnings();
            let last_applied = app.backend().last_applied()?;
            if as_json {
                return print_json(&json!({
                    "activeProfile": active,
                    "lastApplied": last_applied,
                    "counts": app.counts(),
                    "enabledModIds": app.enabled_mod_ids(),
                    "warnings": app.warnings().len(),
                    "profileWarnings": profile_warnings.len(),
                }));
            }
            match active {
                Some(profile) => {
                    let suffix = if profile.readonly { " (read-only)" } else { "" };
                    println!("Profile: {}{suffix} [{}]", profile.name, profile.id);
                }
                None => println!("Profile: none"),
            }
            if let Some(record) = &last_applied {
                let name = app
                    .find_profile(&record.profile_id)
                    .map(|profile| profile.name.as_str())
                    .unwrap_or(record.profile_id.as_str());
                println!("Last applied: {name} (snapshot {})", record.snapshot_id);
            }
            println!("{}", app.status);
            println!("Enabled: {}", app.enabled_mod_ids().len());
            println!(
                "Warnings: {} scan, {} dependency",
                app.warnings().len(),
                profile_warnings.len()
            );
        }
        Command::Mods => {
            if as_json {
                return print_json(&app.catalog());
            }
            for mod_entry in app.catalog() {
                let mark = if mod_entry.enabled { "x" } else { " " };
                println!(
                    "[{mark}] {:<40} {:<13} {:<14} {:<7} {}",
                    mod_entry.id,
                    mod_entry.mod_type.label(),
                    mod_entry.location.label(),
                    mod_entry.format.label(),
                    mod_entry.name
                );
            }
        }
        Command::Warnings => {
            let profile_warnings = app.profile_warnings();
            if as_json {
                return print_json(&json!({
                    "warnings": app.warnings(),
                    "profileWarnings": profile_warnings,
                }));
            }
            print_lines("Scan warnings", app.warnings());
            print_lines("Dependency warnings", &profile_warnings);
            if app.warnings().is_empty() && profile_warnings.is_empty() {
                println!("No warnings.");
            }
        }
        Command::Order => {
            let rows = app.load_order_entries();
            if as_json {
                return print_json(&rows);
            }
            for (index, row) in rows.iter().enumerate() {
                let missing = if row.missing { "  (missing)" } else { "" };
                println!(
                    "{:>3}. {:<40} {:<13} {}{missing}",
                    index + 1,
                    row.name,
                    row.type_label,
                    row.location_label
                );
            }
        }
        Command::Toggle(args) => {
            if args.on == args.off {
                bail!("pass exactly one of --on or --off");
            }
            app.handle_toggle_mod(&args.id, args.on)?;
            report_status(app, as_json)?;
        }
        Command::Move { id, direction } => {
            app.handle_move_load_order(&id, direction)?;
            report_status(app, as_json)?;
        }
        Command::Profile(command) => run_profile_command(app, command, as_json)?,
        Command::Deps(DepsCommand::Missing) => {
            let missing = app.missing_dependencies();
            if as_json {
                return print_json(&missing);
            }
            if missing.is_empty() {
                println!("No missing dependencies.");
            }
            for dep in missing {
                println!("{} (required by {})", dep.label, dep.required_by.join(", "));
            }
        }
        Command::Apply => {
            let report = app.apply()?;
            if as_json {
                return print_json(&report);
            }
            println!("Applied. Snapshot: {}", report.snapshot_id);
            print_lines("Warnings", &report.warnings);
        }
        Command::Rollback { snapshot } => {
            let restored = app.rollback(snapshot.as_deref())?;
            if as_json {
                return print_json(&json!({ "snapshotId": restored }));
            }
            println!("Restored profiles from {restored}");
        }
        Command::Snapshots => {
            let snapshots = app.snapshots()?;
            if as_json {
                return print_json(&snapshots);
            }
            for snapshot in snapshots {
                println!(
                    "{}  {}  {}",
                    snapshot.id, snapshot.created, snapshot.profile_name
                );
            }
        }
        Command::Paths => {
            let backend = app.backend();
            if as_json {
                return print_json(&json!({
                    "dataDir": backend.data_dir(),
                    "install": backend.paths(),
                }));
            }
            let paths = backend.paths();
            println!("Data dir:      {}", backend.data_dir().display());
            println!("Install root:  {}", paths.root.display());
            println!("Mods:          {}", paths.mods_dir.display());
            println!("Packs:         {}", paths.packs_dir.display());
            println!("Early plugins: {}", paths.early_plugins_dir.display());
        }
        Command::Log { lines } => {
            let text = app.log_tail_text(lines)?;
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Command::Config(_) => bail!("config runs before the install is scanned"),
    }
    Ok(())
}

fn run_profile_command<B: ModBackend>(
    app: &mut App<B>,
    command: ProfileCommand,
    as_json: bool,
) -> Result<()> {
    match command {
        ProfileCommand::List => {
            let Some(state) = app.profiles_state() else {
                return Ok(());
            };
            if as_json {
                return print_json(state);
            }
            for profile in &state.profiles {
                let active = if state.active_profile_id.as_deref() == Some(profile.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                let readonly = if profile.readonly { " (read-only)" } else { "" };
                println!(
                    "{active} {:<22} {}{readonly}  {} enabled",
                    profile.id,
                    profile.name,
                    profile.enabled_mods.len()
                );
            }
        }
        ProfileCommand::Create { name, copy_from } => {
            let created = app.create_profile(&name, copy_from.as_deref())?;
            if as_json {
                return print_json(&created);
            }
            println!("Created {} [{}]", created.name, created.id);
        }
        ProfileCommand::Rename { id, name } => {
            let renamed = app.rename_profile(&id, &name)?;
            if as_json {
                return print_json(&renamed);
            }
            println!("Renamed {} to {}", renamed.id, renamed.name);
        }
        ProfileCommand::Delete { id } => {
            app.delete_profile(&id)?;
            report_status(app, as_json)?;
        }
        ProfileCommand::Use { id } => {
            app.use_profile(&id)?;
            report_status(app, as_json)?;
        }
        ProfileCommand::Export { id, output } => {
            let list = app.export_mod_list(&id)?;
            match output {
                Some(path) => {
                    fs::write(&path, list)
                        .with_context(|| format!("write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{list}"),
            }
        }
    }
    Ok(())
}

fn report_status<B: ModBackend>(app: &App<B>, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&json!({
            "status": app.status,
            "activeProfile": app.active_profile(),
            "profileWarnings": app.profile_warnings(),
        }));
    }
    println!("{}", app.status);
    print_lines("Dependency warnings", &app.profile_warnings());
    Ok(())
}

fn print_lines(title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    println!("{title}:");
    for line in lines {
        println!("  - {line}");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{raw}");
    Ok(())
}
