use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use gcode_zcomp::compensation::{
    CompensationReport, Compensator, CubicModel, LayerwiseCompensator, PlanarModel,
    StepQuantizedLayerCompensator, SurfaceCompensator,
};
use gcode_zcomp::config::{Args, Config, Mode};
use gcode_zcomp::core::Document;
use gcode_zcomp::table::{read_coefficients, read_lookup_table};

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    let config = Config::from_args(args)?;
    log::info!("using profile '{}'", config.profile.name);

    let report = run(&config)?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Load, compensate and write one toolpath. Nothing is written on error.
fn run(config: &Config) -> Result<CompensationReport> {
    let compensator = build_compensator(config)?;

    let gcode = config.gcode_path();
    let mut document = Document::from_file(gcode, &config.profile.parse_options())
        .with_context(|| format!("parsing {}", gcode.display()))?;

    let report = document
        .compensate(compensator.as_ref())
        .context("compensating toolpath")?;

    document
        .write_to(&config.output)
        .with_context(|| format!("writing {}", config.output.display()))?;

    Ok(report)
}

fn build_compensator(config: &Config) -> Result<Box<dyn Compensator>> {
    let profile = &config.profile;

    match &config.mode {
        Mode::Uniform { table, .. } => {
            let table: LayerwiseCompensator = read_lookup_table(table)
                .and_then(|rows| Ok(rows.into_compensator()?))
                .with_context(|| format!("loading lookup table {}", table.display()))?;
            let compensator =
                StepQuantizedLayerCompensator::new(table, profile.stepper.z_resolution)?;
            Ok(Box::new(compensator))
        }
        Mode::Surface {
            coefficients,
            planar,
            ..
        } => {
            let values = read_coefficients(coefficients)
                .with_context(|| format!("loading coefficients {}", coefficients.display()))?;

            let compensator = if *planar {
                SurfaceCompensator::new(PlanarModel::new(
                    &values,
                    profile.surface.reference_plane_offset,
                )?)
            } else {
                SurfaceCompensator::new(
                    CubicModel::new(&values)?
                        .with_reference_plane_offset(profile.surface.reference_plane_offset),
                )
            };

            let (x, y) = profile.fixture_offset();
            Ok(Box::new(
                compensator
                    .with_fixture_offset(x, y)
                    .with_rapid_policy(profile.surface.rapid_policy),
            ))
        }
    }
}
