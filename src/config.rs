//! Configuration management for the compensation tool.
//!
//! Handles:
//! - Command-line argument parsing
//! - Machine profile selection and CLI overrides
//! - Input validation and output path derivation

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::compensation::{CompensationMode, RapidPolicy};
use crate::profile::{DEFAULT_PROFILE_NAME, MachineProfile, ProfileRegistry};

/// Command-line arguments for the compensation tool
#[derive(Debug, Parser)]
#[command(name = "gcode-zcomp")]
#[command(about = "Correct systematic Z build-height errors in G-code toolpaths")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,

    /// Machine profile name or path to a profile TOML file
    #[arg(long, global = true, default_value = DEFAULT_PROFILE_NAME)]
    pub profile: String,

    /// Custom profile directory to search for profile files
    #[arg(long, global = true, help = "Directory containing profile TOML files")]
    pub profile_dir: Option<PathBuf>,

    /// Output file (defaults to a name derived from the input)
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    /// Keep every command as written: no splitting, no explicit axes
    #[arg(long, global = true)]
    pub no_split: bool,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Mode {
    /// Shift whole layers by whole stepper increments from a lookup table
    Uniform {
        /// Lookup table CSV (start,end,offset rows)
        table: PathBuf,
        /// Toolpath to compensate
        gcode: PathBuf,
        /// Z travel of one motor step in mm (overrides the profile)
        #[arg(long)]
        resolution: Option<f64>,
    },
    /// Correct every vertex from a fitted error surface
    Surface {
        /// Coefficient CSV (first column)
        coefficients: PathBuf,
        /// Toolpath to compensate
        gcode: PathBuf,
        /// Use the 3-term planar model instead of the 20-term cubic
        #[arg(long)]
        planar: bool,
        /// Height of the reference plane in mm (overrides the profile)
        #[arg(long)]
        reference_plane_offset: Option<f64>,
        /// Force position-less rapid moves to the layer height
        #[arg(long)]
        legacy_rapids: bool,
    },
}

impl Mode {
    pub fn compensation_mode(&self) -> CompensationMode {
        match self {
            Mode::Uniform { .. } => CompensationMode::Uniform,
            Mode::Surface { .. } => CompensationMode::Surface,
        }
    }

    pub fn gcode(&self) -> &Path {
        match self {
            Mode::Uniform { gcode, .. } | Mode::Surface { gcode, .. } => gcode,
        }
    }

    /// The CSV input of either mode
    pub fn table(&self) -> &Path {
        match self {
            Mode::Uniform { table, .. } => table,
            Mode::Surface { coefficients, .. } => coefficients,
        }
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// Profile with CLI overrides applied
    pub profile: MachineProfile,
    /// Profile directories that were searched
    pub profile_dirs: Vec<PathBuf>,
    pub output: PathBuf,
    pub json: bool,
    pub log_level: String,
}

impl Config {
    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        check_extension(args.mode.table(), "csv")?;
        check_extension(args.mode.gcode(), "gcode")?;

        let mut profile_dirs = Vec::new();

        // User-specified directory takes precedence
        if let Some(custom_dir) = args.profile_dir {
            profile_dirs.push(custom_dir);
        }

        if let Some(config_dir) = dirs::config_dir() {
            profile_dirs.push(config_dir.join("gcode-zcomp").join("profiles"));
        }

        let mut registry = ProfileRegistry::with_embedded();
        // Earlier directories win, so load them last
        for dir in profile_dirs.iter().rev() {
            registry
                .load_dir(dir)
                .with_context(|| format!("loading profiles from {}", dir.display()))?;
        }

        let mut profile = registry
            .resolve(&args.profile)
            .with_context(|| format!("selecting profile '{}'", args.profile))?;
        apply_overrides(&mut profile, &args.mode, args.no_split);
        profile.validate()?;

        let output = args
            .output
            .unwrap_or_else(|| output_path(args.mode.gcode(), args.mode.compensation_mode()));

        Ok(Config {
            mode: args.mode,
            profile,
            profile_dirs,
            output,
            json: args.json,
            log_level: args.log_level,
        })
    }

    pub fn gcode_path(&self) -> &Path {
        self.mode.gcode()
    }
}

fn apply_overrides(profile: &mut MachineProfile, mode: &Mode, no_split: bool) {
    if no_split {
        profile.splitting.enabled = false;
        profile.splitting.explicit = false;
    }

    match mode {
        Mode::Uniform { resolution, .. } => {
            if let Some(resolution) = resolution {
                profile.stepper.z_resolution = *resolution;
            }
        }
        Mode::Surface {
            reference_plane_offset,
            legacy_rapids,
            ..
        } => {
            if let Some(offset) = reference_plane_offset {
                profile.surface.reference_plane_offset = *offset;
            }
            if *legacy_rapids {
                profile.surface.rapid_policy = RapidPolicy::ForceNominal;
            }
        }
    }
}

fn check_extension(path: &Path, expected: &str) -> Result<()> {
    let matches = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected));
    if !matches {
        bail!("{} is not a .{expected} file", path.display());
    }
    Ok(())
}

/// Derive the output file name: `part.gcode` becomes
/// `part_uniform_compensated.gcode` or `part_3d_compensated.gcode`
pub fn output_path(input: &Path, mode: CompensationMode) -> PathBuf {
    let suffix = match mode {
        CompensationMode::Uniform => "_uniform_compensated.gcode",
        CompensationMode::Surface => "_3d_compensated.gcode",
    };

    let name = input
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let stem = name.strip_suffix(".gcode").unwrap_or(&name);

    input.with_file_name(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("gcode-zcomp").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/tmp/part.gcode"), CompensationMode::Uniform),
            PathBuf::from("/tmp/part_uniform_compensated.gcode")
        );
        assert_eq!(
            output_path(Path::new("benchy.v2.gcode"), CompensationMode::Surface),
            PathBuf::from("benchy.v2_3d_compensated.gcode")
        );
    }

    #[test]
    fn test_uniform_args() {
        let args = parse(&["uniform", "table.csv", "part.gcode", "--resolution", "0.02"]);
        let config = Config::from_args(args).unwrap();

        assert_eq!(config.mode.compensation_mode(), CompensationMode::Uniform);
        assert_eq!(config.profile.stepper.z_resolution, 0.02);
        assert_eq!(config.output, PathBuf::from("part_uniform_compensated.gcode"));
        assert_eq!(config.log_level, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_surface_overrides() {
        let args = parse(&[
            "surface",
            "coeffs.csv",
            "part.gcode",
            "--planar",
            "--reference-plane-offset",
            "1.5",
            "--legacy-rapids",
            "--json",
            "-o",
            "out.gcode",
        ]);
        let config = Config::from_args(args).unwrap();

        assert!(matches!(config.mode, Mode::Surface { planar: true, .. }));
        assert_eq!(config.profile.surface.reference_plane_offset, 1.5);
        assert_eq!(config.profile.surface.rapid_policy, RapidPolicy::ForceNominal);
        assert_eq!(config.output, PathBuf::from("out.gcode"));
        assert!(config.json);
    }

    #[test]
    fn test_no_split_disables_splitting() {
        let config = Config::from_args(parse(&["uniform", "t.csv", "p.gcode", "--no-split"])).unwrap();
        let options = config.profile.parse_options();

        assert_eq!(options.segment_length, None);
        assert!(!options.explicit);
    }

    #[test]
    fn test_rejects_wrong_extensions() {
        assert!(Config::from_args(parse(&["uniform", "table.txt", "part.gcode"])).is_err());
        assert!(Config::from_args(parse(&["surface", "c.csv", "part.nc"])).is_err());
    }

    #[test]
    fn test_rejects_bad_resolution() {
        let args = parse(&["uniform", "t.csv", "p.gcode", "--resolution", "0"]);
        assert!(Config::from_args(args).is_err());
    }

    #[test]
    fn test_profile_dir_is_searched_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fine.toml"),
            "[profile]\nname = \"fine\"\n[stepper]\nz_resolution = 0.0025\n",
        )
        .unwrap();

        let profile_dir = dir.path().to_str().unwrap();
        let args = parse(&[
            "uniform",
            "t.csv",
            "p.gcode",
            "--profile",
            "fine",
            "--profile-dir",
            profile_dir,
        ]);
        let config = Config::from_args(args).unwrap();

        assert_eq!(config.profile.stepper.z_resolution, 0.0025);
        assert_eq!(config.profile_dirs[0], dir.path());
    }

    #[test]
    fn test_unknown_profile() {
        let args = parse(&["uniform", "t.csv", "p.gcode", "--profile", "no-such-machine"]);
        assert!(Config::from_args(args).is_err());
    }
}
