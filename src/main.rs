use anyhow::Result;
use clap::Parser;
use immuno_sim::common::SimulationConfig;
use immuno_sim::Simulation;
use log::{debug, error, info, trace, warn};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Command-line arguments for the headless simulation driver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of ticks to run (overrides run.total_ticks)
    #[arg(long)]
    ticks: Option<u64>,

    /// RNG seed (overrides population.seed)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting immune-complex simulation...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.population.seed = seed;
    }
    let total_ticks = args.ticks.unwrap_or(config.run.total_ticks);
    let status_interval = config.run.status_interval_ticks.max(1);

    // --- Initialize Simulation ---
    let mut sim = Simulation::new(config)?;
    info!(
        "Initialized {} particles (seed {}).",
        sim.state().particle_count(),
        sim.config().population.seed
    );
    debug!("Simulation Parameters: {:#?}", sim.params());
    if !sim.is_running() {
        warn!("run.start_paused is set; ticks will advance without motion or kinetics.");
    }

    // --- Simulation Loop ---
    info!("Starting simulation loop for {} ticks...", total_ticks);
    let start_time = Instant::now();

    for tick in 0..total_ticks {
        let step_start_time = Instant::now();
        if let Err(e) = sim.step() {
            error!("Error during simulation tick {}: {}", tick + 1, e);
            anyhow::bail!("Simulation tick failed.");
        }
        let step_duration = step_start_time.elapsed();

        let is_status_tick = (tick + 1) % status_interval == 0;
        if is_status_tick || tick + 1 == total_ticks {
            let stats = sim.statistics();
            info!(
                "Tick [{}/{}] | Ratio: {:.2} ({}) | Occupancy: {:5.1}% | Bridges: {} | Max cluster: {} | Precipitation: {:5.1}% | Elapsed: {:.2} s",
                tick + 1,
                total_ticks,
                stats.ratio,
                stats.zone,
                stats.epitope_occupancy,
                stats.bridges,
                stats.max_cluster,
                stats.precipitation,
                start_time.elapsed().as_secs_f64()
            );
        } else {
            trace!(
                "Tick [{}/{}] completed in {:.3} ms",
                tick + 1,
                total_ticks,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    info!(
        "Simulation finished in {:.3} seconds.",
        start_time.elapsed().as_secs_f64()
    );

    if let Err(e) = sim.state().verify_bindings() {
        error!("Binding graph inconsistent at end of run: {}", e);
    }

    // --- Save Final Frame ---
    let base_filename = sim.config().output.base_filename.clone();
    let snapshot = sim.snapshot();

    if sim.config().output.save_final_snapshot {
        let filename = format!("{}_final_snapshot.json", base_filename);
        match File::create(&filename) {
            Ok(mut file) => match serde_json::to_string(&snapshot) {
                Ok(json_string) => {
                    if let Err(e) = file.write_all(json_string.as_bytes()) {
                        error!("Error writing snapshot JSON to file '{}': {}", filename, e);
                    } else {
                        info!("Final snapshot saved to {}", filename);
                    }
                }
                Err(e) => error!("Error serializing snapshot to JSON: {}", e),
            },
            Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping final snapshot as per config.");
    }

    if sim.config().output.save_positions {
        let filename = format!("{}_final_positions.csv", base_filename);
        match csv::Writer::from_path(&filename) {
            Ok(mut writer) => {
                writer.write_record(["id", "kind", "x", "y", "angle", "cluster", "bound"])?;
                for ag in &snapshot.antigens {
                    writer.write_record([
                        ag.id.to_string(),
                        "antigen".to_string(),
                        format!("{:.4}", ag.position.0),
                        format!("{:.4}", ag.position.1),
                        String::new(),
                        ag.cluster.to_string(),
                        ag.epitopes.iter().filter(|e| e.occupant.is_some()).count().to_string(),
                    ])?;
                }
                for ab in &snapshot.antibodies {
                    writer.write_record([
                        ab.id.to_string(),
                        ab.antibody_type.label().to_string(),
                        format!("{:.4}", ab.position.0),
                        format!("{:.4}", ab.position.1),
                        format!("{:.4}", ab.angle),
                        String::new(),
                        ab.arms.iter().filter(|a| a.target.is_some()).count().to_string(),
                    ])?;
                }
                writer.flush()?;
                info!("Final positions saved to {}", filename);
            }
            Err(e) => error!("Error saving CSV file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
