use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueHint};
use edx_analyzer::export::{
    PlotSeries, group_intensities, group_intensity_table, summary_table, write_match_tables,
};
use edx_analyzer::reference::ElementSelection;
use edx_analyzer::{AnalysisConfig, EdxError, Pipeline};

#[derive(Parser, Debug)]
#[command(author, version, about = "EDX spectrum element identification", long_about = None)]
struct Cli {
    /// YAML run configuration; flags below override its values
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Spectrum file (up to 4, repeat the flag)
    #[arg(short, long = "spectrum", action = ArgAction::Append, value_hint = ValueHint::FilePath)]
    spectra: Vec<PathBuf>,

    /// Background spectrum subtracted from every sample
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    background: Option<PathBuf>,

    /// Reference emission line table (NIST CSV)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    reference: Option<PathBuf>,

    /// Only search for these elements (comma separated)
    #[arg(short, long, value_delimiter = ',', conflicts_with = "bio")]
    elements: Vec<String>,

    /// Only search for elements typical of biological substrates
    #[arg(long)]
    bio: bool,

    /// Peak/line matching tolerance in keV
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Matched lines required to report an element
    #[arg(long)]
    min_peaks: Option<usize>,

    /// Ignore peaks below this corrected count
    #[arg(long)]
    min_height: Option<f64>,

    /// Ignore peaks with a smaller prominence
    #[arg(long)]
    min_prominence: Option<f64>,

    /// Minimum spacing between peaks, in grid points
    #[arg(long)]
    min_distance: Option<usize>,

    /// Directory for the per-spectrum match tables
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// Write the plottable series set as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    plot_json: Option<PathBuf>,

    /// Do not write match tables
    #[arg(long)]
    no_export: bool,
}

impl Cli {
    fn into_config(self) -> Result<(AnalysisConfig, Option<PathBuf>, bool), EdxError> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_yaml_file(path)?,
            None => AnalysisConfig::default(),
        };

        if !self.spectra.is_empty() {
            config.spectrum_paths = self.spectra;
        }
        if self.background.is_some() {
            config.background_path = self.background;
        }
        if let Some(reference) = self.reference {
            config.reference_path = reference;
        }
        if self.bio {
            config.selection = ElementSelection::Biological;
        } else if !self.elements.is_empty() {
            config.selection = ElementSelection::Elements(self.elements);
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance_kev = tolerance;
        }
        if let Some(min_peaks) = self.min_peaks {
            config.min_peaks_required = min_peaks;
        }
        if self.min_height.is_some() {
            config.min_peak_height = self.min_height;
        }
        if self.min_prominence.is_some() {
            config.min_peak_prominence = self.min_prominence;
        }
        if self.min_distance.is_some() {
            config.min_peak_distance = self.min_distance;
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir;
        }

        Ok((config, self.plot_json, self.no_export))
    }
}

fn run(cli: Cli) -> Result<(), EdxError> {
    let (config, plot_json, no_export) = cli.into_config()?;

    let mut pipeline = Pipeline::new(config);
    let output = pipeline.run()?;

    for warning in &output.warnings {
        eprintln!("Warning: {}", warning);
    }

    if !no_export {
        let written = write_match_tables(&output.results, pipeline.config().output_dir.as_deref())?;
        for path in written {
            println!("Wrote {}", path.display());
        }
    }

    if let Some(path) = plot_json {
        PlotSeries::new(&output).write_json(&path)?;
        println!("Wrote {}", path.display());
    }

    print!("{}", summary_table(&output.results));
    println!();
    let intensities = group_intensities(&output.results, &output.grid, &output.reference);
    print!("{}", group_intensity_table(&intensities));

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
