//! soyboy-levels: inspect levels and score ledgers from the command line
//!
//! Usage:
//!   soyboy-levels list                          # Levels under the content root
//!   soyboy-levels show <file>                   # Summarize a descriptor
//!   soyboy-levels check <file> --templates <dir>
//!   soyboy-levels record --level Level1 --time 12.34
//!   soyboy-levels best --level Level1 -n 5
//!   soyboy-levels player Alice

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use soyboy_levels::descriptor::{read_descriptor, Vec3};
use soyboy_levels::scene::{ClampRect, FollowRig, SceneWorld, TemplateLibrary};
use soyboy_levels::scores::CompletionTime;
use soyboy_levels::settings::default_settings_path;
use soyboy_levels::storage::LocalStorage;
use soyboy_levels::{LevelLoader, LevelSession, LoadError, LoadReport, Settings, VERSION};

#[derive(Parser)]
#[command(name = "soyboy-levels", version = VERSION)]
#[command(about = "Level descriptors and completion times for SoyBoy")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List levels under the content root
    List,
    /// Print a summary of a level descriptor
    Show {
        path: PathBuf,
    },
    /// Dry-run a load into an empty scene and report unresolved references
    Check {
        path: PathBuf,
        /// Directory of template files
        #[arg(long)]
        templates: PathBuf,
    },
    /// Record a completion time
    Record {
        #[arg(long)]
        level: String,
        /// Seconds with up to two decimals, e.g. 12.34
        #[arg(long)]
        time: CompletionTime,
        /// Player name (defaults to the remembered one)
        #[arg(long)]
        player: Option<String>,
    },
    /// Show the best times for a level
    Best {
        #[arg(long)]
        level: String,
        #[arg(short, default_value_t = 3)]
        n: usize,
        #[arg(long)]
        player: Option<String>,
    },
    /// Remember the player name
    Player {
        name: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings_path = cli.settings.unwrap_or_else(default_settings_path);
    let settings = Settings::load_from(&settings_path);

    match cli.command {
        Commands::List => list(settings),
        Commands::Show { path } => show(&path),
        Commands::Check { path, templates } => check(settings, &path, &templates),
        Commands::Record { level, time, player } => record(settings, &level, time, player),
        Commands::Best { level, n, player } => best(settings, &level, n, player),
        Commands::Player { name } => {
            let mut session = LevelSession::new(settings, Some(settings_path.clone()));
            session
                .set_player_name(name.as_str())
                .with_context(|| format!("Failed to write {}", settings_path.display()))?;
            println!("Player name set to '{}'", name);
            Ok(())
        }
    }
}

fn list(settings: Settings) -> Result<()> {
    let session = LevelSession::new(settings, None);
    let levels = session.levels().context("Failed to list levels")?;
    if levels.is_empty() {
        println!("No levels in {}", session.repository().content_root().display());
    }
    for level in levels {
        println!("{:<24} {}", level.name, level.path.display());
    }
    Ok(())
}

fn fmt_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

fn show(path: &Path) -> Result<()> {
    let descriptor = read_descriptor(&LocalStorage::new(), path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    println!("Player start: {}", fmt_vec(descriptor.player_start));
    println!("Items: {}", descriptor.items.len());
    for item in &descriptor.items {
        let visual = match &item.visual {
            Some(v) => format!(" [{} #{}]", v.layer, v.order),
            None => String::new(),
        };
        println!("  {:<16} {}{}", item.template_name, fmt_vec(item.position), visual);
    }
    if let Some(camera) = &descriptor.camera {
        println!(
            "Camera: follows '{}' at z {:.1}, bounds ({:.1}, {:.1})..({:.1}, {:.1}), speed {:.1}",
            camera.track_target_name,
            camera.z_depth,
            camera.min_x,
            camera.min_y,
            camera.max_x,
            camera.max_y,
            camera.tracking_speed
        );
    }
    Ok(())
}

/// Minimal play scene: player, main camera and a camera rig
fn scratch_world(settings: &Settings) -> SceneWorld {
    let mut world = SceneWorld::new();
    world.spawn(&settings.names.player, Vec3::ZERO);
    world.spawn(&settings.names.view_anchor, Vec3::new(0.0, 0.0, -10.0));
    world.set_camera_rig(Some(FollowRig {
        target: None,
        z_depth: -10.0,
        bounds: ClampRect::default(),
        tracking_speed: 1.0,
    }));
    world
}

fn print_report<H>(world: &SceneWorld, report: &LoadReport<H>) {
    println!("Instantiated {} items", report.instantiated.len());
    for issue in &report.issues {
        println!("  ! {}", issue);
    }
    if report.is_faithful() {
        println!("OK");
    }
    log::debug!("Scene holds {} entities", world.entity_count());
}

fn check(settings: Settings, path: &Path, templates: &Path) -> Result<()> {
    let mut library = TemplateLibrary::new();
    let count = library
        .discover(templates)
        .with_context(|| format!("Failed to read templates from {}", templates.display()))?;
    println!("Loaded {} templates", count);

    let mut world = scratch_world(&settings);
    let loader = LevelLoader::new(settings.names.clone());
    match loader.load(&LocalStorage::new(), path, &library, &mut world) {
        Ok(report) => {
            print_report(&world, &report);
            Ok(())
        }
        Err(LoadError::MissingPlayerTarget { name, report }) => {
            print_report(&world, &report);
            anyhow::bail!("Player '{}' not found", name)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

fn session_for(mut settings: Settings, level: &str, player: Option<String>) -> Result<LevelSession> {
    if let Some(player) = player {
        settings.player_name = player;
    }
    let mut session = LevelSession::new(settings, None);
    session.select_named(level).context("Invalid level name")?;
    Ok(session)
}

fn record(settings: Settings, level: &str, time: CompletionTime, player: Option<String>) -> Result<()> {
    let session = session_for(settings, level, player)?;
    let entry = session
        .record_completion(time)
        .context("Failed to record completion")?;
    println!(
        "Recorded {} for {} on {} ({})",
        entry.time,
        session.player_name(),
        level,
        entry.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

fn best(settings: Settings, level: &str, n: usize, player: Option<String>) -> Result<()> {
    let session = session_for(settings, level, player)?;
    let entries = session.best_times(n).context("Failed to read scores")?;
    if entries.is_empty() {
        println!("No times recorded for {} on {}", session.player_name(), level);
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "{:>2}. {:>8}  {}",
            rank + 1,
            entry.time.to_string(),
            entry.timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
