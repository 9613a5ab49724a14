//! Headless driver for ragdoll rig scenes.
//!
//! # Commands
//!
//! - `ragdoll-rig simulate <scene>` - Run solver steps and optionally save the result
//! - `ragdoll-rig export <scene> <out>` - Write the engine ragdoll config
//! - `ragdoll-rig info <scene>` - Print a summary of a scene file
//!
//! No model importer is linked in, so joint bindings in a scene file are
//! attached to placeholder joints named `joint<N>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Vector3;
use rig_core::{EntityKind, RelaxSolver, Skeleton, SolverConfig};
use rig_io::{SceneFile, load_scene, save_scene, write_ragdoll_config};
use tracing::info;

/// Ragdoll rig authoring tools
#[derive(Parser)]
#[command(name = "ragdoll-rig")]
#[command(about = "Simulate, inspect and export ragdoll rigs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step the solver over a scene
    Simulate {
        /// Scene file to load
        scene: PathBuf,

        /// Number of steps to run
        #[arg(long, default_value_t = 60)]
        steps: u32,

        /// Step length in seconds
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,

        /// Relaxation passes per step (overrides the preset)
        #[arg(long)]
        iterations: Option<u32>,

        /// Solver preset
        #[arg(long, value_enum, default_value_t = Preset::Default)]
        preset: Preset,

        /// Save the simulated scene here
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write the engine-side ragdoll config
    Export {
        /// Scene file to load
        scene: PathBuf,

        /// Config file to write
        out: PathBuf,

        /// Model scale (defaults to the scene's model reference, or 1)
        #[arg(long)]
        scale: Option<f64>,

        /// Vertical model offset
        #[arg(long, default_value_t = 0.0)]
        offset: f64,
    },

    /// Print a summary of a scene file
    Info {
        /// Scene file to load
        scene: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Default,
    Realtime,
    Stiff,
    Settle,
}

impl Preset {
    fn config(self) -> SolverConfig {
        match self {
            Self::Default => SolverConfig::default(),
            Self::Realtime => SolverConfig::realtime(),
            Self::Stiff => SolverConfig::stiff(),
            Self::Settle => SolverConfig::settle(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            scene,
            steps,
            dt,
            iterations,
            preset,
            out,
        } => simulate(&scene, steps, dt, iterations, preset, out.as_deref()),
        Commands::Export {
            scene,
            out,
            scale,
            offset,
        } => export(&scene, &out, scale, offset),
        Commands::Info { scene } => print_info(&scene),
    }
}

fn load(path: &Path) -> Result<SceneFile> {
    let mut file = load_scene(path, Skeleton::new())
        .with_context(|| format!("failed to load {}", path.display()))?;
    if let Some(max) = file.unresolved_bindings.iter().map(|(j, _)| *j).max() {
        let placeholders = (0..=max).map(|i| (format!("joint{i}"), None, Vector3::zeros()));
        let attached = file.attach_skeleton(Skeleton::from_joints(placeholders));
        info!(attached, "attached bindings to placeholder joints");
    }
    Ok(file)
}

fn simulate(
    path: &Path,
    steps: u32,
    dt: f64,
    iterations: Option<u32>,
    preset: Preset,
    out: Option<&Path>,
) -> Result<()> {
    if !dt.is_finite() || dt < 0.0 {
        bail!("step length must be a non-negative number, got {dt}");
    }
    let mut config = preset.config();
    if let Some(iterations) = iterations {
        config = config.with_iterations(iterations);
    }
    config.validate().context("invalid solver configuration")?;

    let mut file = load(path)?;
    let mut solver = RelaxSolver::new(config);
    for _ in 0..steps {
        solver.step(&mut file.scene, dt);
    }

    let stats = solver.stats();
    println!("simulated {steps} steps of {dt}s");
    println!("  relax passes per step: {}", stats.iterations);
    println!("  active rotation limits: {}", stats.active_rotations);
    println!("  grounded particles:     {}", stats.grounded);
    println!("  max distance error:     {:.6}", stats.max_distance_error);
    if stats.degenerate_frames > 0 {
        println!("  degenerate frames:      {}", stats.degenerate_frames);
    }

    if let Some(out) = out {
        save_scene(&file, out).with_context(|| format!("failed to save {}", out.display()))?;
        println!("saved {}", out.display());
    }
    Ok(())
}

fn export(path: &Path, out: &Path, scale: Option<f64>, offset: f64) -> Result<()> {
    let file = load(path)?;
    let scale = scale
        .or_else(|| file.model.as_ref().map(|m| m.scale))
        .unwrap_or(1.0);
    write_ragdoll_config(&file.scene, out, scale, offset)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("wrote {} (scale {scale}, offset {offset})", out.display());
    Ok(())
}

fn print_info(path: &Path) -> Result<()> {
    let file = load(path)?;
    let scene = &file.scene;
    let pinned = scene.particles().iter().filter(|p| p.is_pinned()).count();
    let distance = scene
        .constraints()
        .iter()
        .filter(|c| c.as_distance().is_some())
        .count();

    println!("{}", path.display());
    println!(
        "  particles:   {} ({pinned} pinned)",
        scene.count(EntityKind::Particle)
    );
    println!("  frames:      {}", scene.count(EntityKind::Frame));
    println!(
        "  constraints: {} ({distance} distance, {} rotation)",
        scene.count(EntityKind::Constraint),
        scene.count(EntityKind::Constraint) - distance
    );
    println!("  bound joints: {}", scene.skeleton().bound_count());
    if let Some(eye) = scene.eye() {
        println!("  eye:         particle {eye}");
    }
    if let Some(model) = &file.model {
        println!("  model:       {} (scale {})", model.name, model.scale);
    }
    if let Some(camera) = &file.camera {
        let o = camera.origin;
        println!(
            "  camera:      ({}, {}, {}) yaw {} pitch {}",
            o.x, o.y, o.z, camera.yaw, camera.pitch
        );
    }
    if let Err(e) = scene.validate() {
        println!("  warning: {e}");
    }
    Ok(())
}
