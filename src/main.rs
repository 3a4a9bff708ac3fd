use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cmrhisto::data::custom_names::CustomNames;
use cmrhisto::data::scale_file;
use cmrhisto::error::{HistoError, Result};
use cmrhisto::processing::scale::{Scale, ScaleKind};
use cmrhisto::processing::statistics::Statistic;
use cmrhisto::processing::surface::SurfaceRequest;
use cmrhisto::report::export::{self, Delimiter};
use cmrhisto::report::grid::format_grid;
use cmrhisto::session::Session;
use cmrhisto::state::preferences::CellColor;
use cmrhisto::state::settings::{Settings, APP_NAME, DEFAULT_SETTINGS_FILE, VERSION};

#[derive(Parser)]
#[command(name = "cmrhisto", version = VERSION)]
#[command(about = "RPM x pressure-ratio histograms and surfaces from engine logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Args, Clone)]
struct LogArgs {
    /// CSV or Excel log file
    log: PathBuf,

    /// Load the log even when it is above the large-file threshold
    #[arg(long)]
    accept_large_file: bool,

    /// Use this PID as the Y-axis instead of the pressure ratio
    #[arg(long, value_name = "PID")]
    y_axis: Option<String>,

    /// Only use rows with coolant temperature at or above this
    #[arg(long, requires = "ect_max")]
    ect_min: Option<f64>,

    /// Only use rows with coolant temperature at or below this
    #[arg(long, requires = "ect_min")]
    ect_max: Option<f64>,

    /// RPM scale file
    #[arg(long, value_name = "FILE")]
    rpm_scale: Option<PathBuf>,

    /// Y-axis scale file
    #[arg(long, value_name = "FILE")]
    y_scale: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the PIDs a log provides
    Pids {
        #[command(flatten)]
        log: LogArgs,
    },
    /// Bin a log into the 17x17 grid and print it
    Histogram {
        #[command(flatten)]
        log: LogArgs,

        /// PIDs to show statistics for (repeatable)
        #[arg(short, long = "pid", value_name = "PID")]
        pids: Vec<String>,

        /// Write one PID's statistic as a table instead of printing the grid
        #[arg(long, value_name = "FILE", requires = "export_pid")]
        export: Option<PathBuf>,

        /// PID to export
        #[arg(long, value_name = "PID")]
        export_pid: Option<String>,

        /// Statistic to export: min, max, average or last
        #[arg(long, default_value = "average")]
        stat: Statistic,

        /// Tab separated output, for pasting into a spreadsheet
        #[arg(long)]
        tab: bool,
    },
    /// Reduce one PID to a triangulated surface
    Surface {
        #[command(flatten)]
        log: LogArgs,

        /// PID to plot
        #[arg(short, long, value_name = "PID")]
        pid: String,

        /// How samples at the same coordinate combine: min, max, average or last
        #[arg(long, default_value = "average")]
        stat: Statistic,
    },
    /// Scale file tools
    Scale {
        #[command(subcommand)]
        command: ScaleCommands,
    },
    /// Edit the custom PID name store
    Names {
        #[command(subcommand)]
        command: NameCommands,
    },
    /// Write the default settings file
    Init,
}

#[derive(Subcommand)]
enum ScaleCommands {
    /// Build an equal-width scale and write it to a file
    Create {
        #[arg(long, value_enum)]
        axis: Axis,
        #[arg(long)]
        lower: f64,
        #[arg(long)]
        upper: f64,
        /// Y-axis name written into the file label
        #[arg(long, default_value = "PRatio")]
        y_axis_name: String,
        output: PathBuf,
    },
    /// Print the buckets of a scale file
    Show {
        #[arg(long, value_enum)]
        axis: Axis,
        #[arg(long, default_value = "PRatio")]
        y_axis_name: String,
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum NameCommands {
    /// Set the alias shown for a PID
    Set { pid: String, alias: String },
    /// Remove a PID's alias
    Remove { pid: String },
    /// Print every alias
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Axis {
    Rpm,
    Y,
}

impl From<Axis> for ScaleKind {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Rpm => ScaleKind::Rpm,
            Axis::Y => ScaleKind::YAxis,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_target(false)
        .init();

    tracing::info!("{APP_NAME} {VERSION}");
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    if let Err(e) = run(cli.command, &config_path) {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        if e.is_recoverable() {
            eprintln!("Retry with --accept-large-file, --y-axis or a different scale file");
        }
        std::process::exit(1);
    }
}

fn run(command: Commands, config_path: &Path) -> Result<()> {
    if let Commands::Init = command {
        return Settings::default().save(config_path);
    }
    let settings = Settings::load(config_path)?;

    match command {
        Commands::Pids { log } => list_pids(&open(&log, &settings)?),
        Commands::Histogram { log, pids, export, export_pid, stat, tab } => {
            let mut session = open(&log, &settings)?;
            let selected = session.catalog().resolve(&pids)?;
            session.run_histogram(&selected)?;
            match (export, export_pid) {
                (Some(path), Some(pid)) => export_grid(&session, &settings, &path, &pid, stat, tab),
                _ => print_grid(&session, &settings),
            }
        }
        Commands::Surface { log, pid, stat } => {
            let session = open(&log, &settings)?;
            let kind = session
                .catalog()
                .find(&pid)
                .ok_or_else(|| HistoError::UnknownPid(pid.clone()))?
                .kind;
            print_surface(&session, SurfaceRequest { pid: kind, aggregation: stat })
        }
        Commands::Scale { command } => scale_command(command),
        Commands::Names { command } => names_command(command, &settings.custom_names_file),
        Commands::Init => Ok(()),
    }
}

fn open(args: &LogArgs, settings: &Settings) -> Result<Session> {
    let mut session = Session::open(&args.log, settings, args.accept_large_file)?;
    if let Some(pid) = &args.y_axis {
        session.set_custom_y_axis(pid)?;
    }
    if let (Some(low), Some(high)) = (args.ect_min, args.ect_max) {
        session.set_temperature_filter(Some((low, high)))?;
    }

    let y_axis_name = session.y_axis_name();
    if let Some(path) = &args.rpm_scale {
        session.set_scale(scale_file::read_scale(path, ScaleKind::Rpm, &y_axis_name)?);
    }
    if let Some(path) = &args.y_scale {
        session.set_scale(scale_file::read_scale(path, ScaleKind::YAxis, &y_axis_name)?);
    }
    for warning in session.warnings() {
        eprintln!("Warning: {warning}");
    }
    Ok(session)
}

fn list_pids(session: &Session) -> Result<()> {
    let table = session.table();
    println!(
        "{} rows, {} columns ({} rows dropped)",
        table.row_count(),
        table.column_count(),
        table.dropped_rows
    );
    println!("Y-axis: {}", session.y_axis_name());
    for pid in session.catalog().pids() {
        match &pid.custom_name {
            Some(alias) => println!("{} [{}] ({})", pid.name, alias, pid.unit),
            None => println!("{} ({})", pid.name, pid.unit),
        }
    }
    Ok(())
}

fn print_grid(session: &Session, settings: &Settings) -> Result<()> {
    let grid = session
        .grid()
        .ok_or_else(|| HistoError::EmptyInput("nothing has been processed".to_string()))?;
    let report = format_grid(grid, session.catalog(), &settings.preferences, &session.y_axis_name());

    println!(
        "{} of {} rows binned, {} samples",
        grid.rows_binned,
        grid.rows_read,
        grid.total_samples()
    );
    for row in &report.rows {
        for (column, cell) in report.columns.iter().zip(&row.cells) {
            if cell.color == CellColor::Empty {
                continue;
            }
            let marker = match cell.color {
                CellColor::Alert => " !",
                CellColor::Equal => " =",
                _ => "",
            };
            println!("[{} rpm, {} {}]{marker}", column.label, row.header.label, session.y_axis_name());
            for line in cell.text.lines() {
                println!("    {line}");
            }
        }
    }
    Ok(())
}

fn export_grid(
    session: &Session,
    settings: &Settings,
    path: &Path,
    pid_name: &str,
    stat: Statistic,
    tab: bool,
) -> Result<()> {
    let grid = session
        .grid()
        .ok_or_else(|| HistoError::EmptyInput("nothing has been processed".to_string()))?;
    let pid = session
        .catalog()
        .find(pid_name)
        .ok_or_else(|| HistoError::UnknownPid(pid_name.to_string()))?;
    let delimiter = if tab { Delimiter::Tab } else { Delimiter::Comma };
    let file = std::fs::File::create(path)?;
    export::write_grid(file, grid, pid.kind, stat, delimiter, settings.preferences.y_axis_sort)?;
    println!("Wrote {:?} of {} to {}", stat, pid.display_name(), path.display());
    Ok(())
}

fn print_surface(session: &Session, request: SurfaceRequest) -> Result<()> {
    let map = session.build_surface_map(request)?;
    let data = &map.data;
    println!("{} vs {} vs {}", data.x_label, data.z_label, data.y_label);
    println!("RPM {} - {}", data.lowest_x, data.highest_x);
    println!("{} {} - {}", data.z_label, data.lowest_z, data.highest_z);
    println!(
        "{} points, {} triangles, {} wireframe edges",
        data.points.len(),
        map.triangles.len(),
        map.mesh.line_indices.len() / 2
    );
    println!(
        "Legend: {} | {} | {}",
        map.mesh.legend.low, map.mesh.legend.mid, map.mesh.legend.high
    );
    Ok(())
}

fn scale_command(command: ScaleCommands) -> Result<()> {
    match command {
        ScaleCommands::Create { axis, lower, upper, y_axis_name, output } => {
            let scale = Scale::create(axis.into(), lower, upper)?;
            scale_file::write_scale(&output, &scale, &y_axis_name)?;
            println!("Wrote {}", output.display());
            Ok(())
        }
        ScaleCommands::Show { axis, y_axis_name, file } => {
            let scale = scale_file::read_scale(&file, axis.into(), &y_axis_name)?;
            for (i, b) in scale.buckets().iter().enumerate() {
                println!("{i:>2}  {} - {} ({})", b.min, b.max, b.value);
            }
            Ok(())
        }
    }
}

fn names_command(command: NameCommands, path: &Path) -> Result<()> {
    let mut names = CustomNames::load(path)?;
    match command {
        NameCommands::Set { pid, alias } => {
            names.insert(&pid, &alias);
            names.save(path)
        }
        NameCommands::Remove { pid } => {
            if !names.remove(&pid) {
                return Err(HistoError::UnknownPid(pid));
            }
            names.save(path)
        }
        NameCommands::List => {
            for (name, alias) in names.iter() {
                println!("{name} = {alias}");
            }
            Ok(())
        }
    }
}
