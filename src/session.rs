use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::channels::{ChannelMap, PidCatalog};
use crate::data::custom_names::CustomNames;
use crate::data::loader::{self, LogTable};
use crate::data::scale_file;
use crate::error::{HistoError, Result};
use crate::processing::derived::PidKind;
use crate::processing::histogram::{self, CellGrid};
use crate::processing::scale::{Scale, ScaleKind};
use crate::processing::surface::{self, SurfaceData, SurfaceRequest};
use crate::processing::worker::{spawn_job, Job, JobContext};
use crate::render::gpu_types::SurfaceMesh;
use crate::state::request::{ProcessingRequest, TemperatureFilter, YAxisSource, RATIO_AXIS_NAME};
use crate::state::settings::Settings;
use crate::triangulation::{self, Triangle};

/// Everything the 3D view needs for one channel.
#[derive(Debug, Clone)]
pub struct SurfaceMap {
    pub data: SurfaceData,
    pub triangles: Vec<Triangle>,
    pub mesh: SurfaceMesh,
}

/// One opened log and the state of its open/process cycle.
///
/// The table is an immutable snapshot shared with background jobs. Scales
/// are committed snapshots: a running job keeps the ones it started with
/// even if the user changes them meanwhile.
///
/// A log without a pressure ratio still opens; nothing can be processed
/// until a custom Y-axis is chosen.
pub struct Session {
    path: PathBuf,
    table: Arc<LogTable>,
    channels: ChannelMap,
    catalog: PidCatalog,
    settings: Settings,
    y_axis: Option<YAxisSource>,
    temperature_filter: Option<TemperatureFilter>,
    user_rpm_scale: Option<Arc<Scale>>,
    user_y_axis_scale: Option<Arc<Scale>>,
    rpm_scale: Arc<Scale>,
    y_axis_scale: Arc<Scale>,
    grid: Option<Arc<CellGrid>>,
    pending: Option<Job<CellGrid>>,
    warnings: Vec<String>,
}

impl Session {
    /// Load a log, identify its channels and build the PID catalogue.
    pub fn open(path: &Path, settings: &Settings, accept_large_file: bool) -> Result<Self> {
        let table = loader::load_file(path, &settings.load_options(accept_large_file))?;
        let channels = ChannelMap::identify(&table)?;

        let mut warnings = Vec::new();
        let y_axis = match channels.default_y_axis() {
            Ok(axis) => Some(axis),
            Err(e @ HistoError::MissingRatioChannel) => {
                tracing::warn!("{e}; a custom Y-axis is required");
                warnings.push(e.to_string());
                None
            }
            Err(e) => return Err(e),
        };
        let custom = match CustomNames::load(&settings.custom_names_file) {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Ignoring custom PID names: {e}");
                warnings.push(e.to_string());
                CustomNames::default()
            }
        };
        let catalog = PidCatalog::build(&table, &channels, Some(&custom));

        let mut session = Self {
            path: path.to_path_buf(),
            table: Arc::new(table),
            channels,
            catalog,
            settings: settings.clone(),
            y_axis,
            temperature_filter: None,
            user_rpm_scale: None,
            user_y_axis_scale: None,
            rpm_scale: Arc::new(Scale::default_for(ScaleKind::Rpm)),
            y_axis_scale: Arc::new(Scale::default_for(ScaleKind::YAxis)),
            grid: None,
            pending: None,
            warnings,
        };
        session.resolve_scales();
        tracing::info!("Opened {:?} with {} PIDs", session.path, session.catalog.pids().len());
        Ok(session)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &LogTable {
        &self.table
    }

    pub fn catalog(&self) -> &PidCatalog {
        &self.catalog
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    /// Recoverable problems met since the log was opened.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// `None` until a custom axis is set on a log without a pressure ratio.
    pub fn y_axis(&self) -> Option<YAxisSource> {
        self.y_axis
    }

    pub fn y_axis_name(&self) -> String {
        self.y_axis
            .map_or_else(|| RATIO_AXIS_NAME.to_string(), |axis| axis.name(&self.table))
    }

    /// Read the Y-axis from a logged PID instead of the pressure ratio.
    /// Scales are resolved again for the new axis.
    pub fn set_custom_y_axis(&mut self, pid_name: &str) -> Result<()> {
        let pid = self
            .catalog
            .find(pid_name)
            .ok_or_else(|| HistoError::UnknownPid(pid_name.to_string()))?;
        let PidKind::Column(col) = pid.kind else {
            return Err(HistoError::UnknownPid(format!(
                "{pid_name} is calculated and cannot be used as the Y-axis"
            )));
        };
        self.y_axis = Some(YAxisSource::Custom(col));
        self.user_y_axis_scale = None;
        self.resolve_scales();
        Ok(())
    }

    /// Keep only rows whose coolant temperature lies within `[low, high]`.
    pub fn set_temperature_filter(&mut self, window: Option<(f64, f64)>) -> Result<()> {
        self.temperature_filter = match window {
            None => None,
            Some((low, high)) => {
                let column = self.channels.coolant.ok_or_else(|| {
                    HistoError::MalformedInput("the log has no coolant temperature column".to_string())
                })?;
                Some(TemperatureFilter { column, low, high })
            }
        };
        Ok(())
    }

    pub fn rpm_scale(&self) -> &Scale {
        &self.rpm_scale
    }

    pub fn y_axis_scale(&self) -> &Scale {
        &self.y_axis_scale
    }

    /// Pick the committed scale of each axis. In priority order: a scale
    /// the user set, one built from the log's range, one read from the
    /// configured file, the default table.
    pub fn resolve_scales(&mut self) {
        self.rpm_scale = match self.user_rpm_scale.clone() {
            Some(scale) => scale,
            None => Arc::new(self.fallback_scale(ScaleKind::Rpm)),
        };
        self.y_axis_scale = match self.user_y_axis_scale.clone() {
            Some(scale) => scale,
            None => Arc::new(self.fallback_scale(ScaleKind::YAxis)),
        };
    }

    fn fallback_scale(&mut self, kind: ScaleKind) -> Scale {
        let (auto_scale, auto_load, file) = match kind {
            ScaleKind::Rpm => (
                self.settings.auto_scale_rpm,
                self.settings.auto_load_rpm_scale,
                self.settings.rpm_scale_file.clone(),
            ),
            ScaleKind::YAxis => (
                self.settings.auto_scale_y_axis,
                self.settings.auto_load_y_axis_scale,
                self.settings.y_axis_scale_file.clone(),
            ),
        };

        if auto_scale {
            if let Some((lower, upper)) = self.data_range(kind) {
                tracing::info!("Auto-scaled {kind:?} axis to {lower} - {upper}");
                return Scale::from_bounds(kind, lower, upper);
            }
            tracing::warn!("Not enough data to auto-scale the {kind:?} axis");
        }

        if let (true, Some(file)) = (auto_load, file) {
            match scale_file::read_scale(&file, kind, &self.y_axis_name()) {
                Ok(scale) => return scale,
                Err(e) => {
                    tracing::warn!("Using the default {kind:?} scale: {e}");
                    self.warnings.push(e.to_string());
                }
            }
        }

        Scale::default_for(kind)
    }

    /// Lowest and highest axis value in the log, `None` when the range is
    /// empty or zero-width.
    fn data_range(&self, kind: ScaleKind) -> Option<(f64, f64)> {
        let values: Vec<f64> = match kind {
            ScaleKind::Rpm => self.table.column_values(self.channels.rpm).filter(|v| *v > 0.0).collect(),
            ScaleKind::YAxis => {
                let axis = self.y_axis?;
                let boost_only = self.settings.auto_scale_boost_only;
                self.table
                    .rows
                    .iter()
                    .filter_map(|row| axis.read(row))
                    .filter(|v| !boost_only || *v > 1.0)
                    .collect()
            }
        };
        let lower = values.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lower < upper).then_some((lower, upper))
    }

    /// Commit a user scale for the axis the scale belongs to.
    pub fn set_scale(&mut self, scale: Scale) {
        let scale = Arc::new(scale);
        match scale.kind() {
            ScaleKind::Rpm => {
                self.user_rpm_scale = Some(Arc::clone(&scale));
                self.rpm_scale = scale;
            }
            ScaleKind::YAxis => {
                self.user_y_axis_scale = Some(Arc::clone(&scale));
                self.y_axis_scale = scale;
            }
        }
    }

    /// Drop a user scale and fall back to the configured sources.
    pub fn clear_scale(&mut self, kind: ScaleKind) {
        match kind {
            ScaleKind::Rpm => self.user_rpm_scale = None,
            ScaleKind::YAxis => self.user_y_axis_scale = None,
        }
        self.resolve_scales();
    }

    /// Zoom both scales onto a block of cells given as inclusive bucket
    /// index ranges. Each axis is replaced only if its new scale can be
    /// built; the first failure is returned after the other axis applied.
    pub fn scale_to_selection(&mut self, rpm: (usize, usize), y_axis: (usize, usize)) -> Result<()> {
        let rpm_scale = self.rpm_scale.select_range(rpm.0, rpm.1);
        let y_scale = self.y_axis_scale.select_range(y_axis.0, y_axis.1);

        let mut first_error = None;
        for result in [rpm_scale, y_scale] {
            match result {
                Ok(scale) => self.set_scale(scale),
                Err(e) => {
                    tracing::warn!("Scale to selection: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Snapshot of everything a pass over the log reads. Every catalogue
    /// PID is recorded; `selected` get statistics.
    pub fn request(&self, selected: &[PidKind]) -> Result<ProcessingRequest> {
        let y_axis = self.y_axis.ok_or(HistoError::MissingRatioChannel)?;
        Ok(ProcessingRequest {
            channels: self.channels,
            y_axis,
            temperature_filter: self.temperature_filter,
            recorded: self.catalog.pids().iter().map(|p| p.kind).collect(),
            selected: selected.to_vec(),
            rpm_scale: Arc::clone(&self.rpm_scale),
            y_axis_scale: Arc::clone(&self.y_axis_scale),
        })
    }

    /// Aggregate on the calling thread and make the result current.
    pub fn run_histogram(&mut self, selected: &[PidKind]) -> Result<&CellGrid> {
        let request = self.request(selected)?;
        let grid = histogram::aggregate(&self.table, &request, &JobContext::detached())?;
        Ok(&**self.grid.insert(Arc::new(grid)))
    }

    /// Aggregate in the background. A job already running is cancelled;
    /// the current grid stays visible until the new one is ready.
    pub fn start_histogram(&mut self, selected: &[PidKind]) -> Result<()> {
        let request = self.request(selected)?;
        self.cancel_histogram();
        let table = Arc::clone(&self.table);
        self.pending = Some(spawn_job("histogram", move |ctx| {
            histogram::aggregate(&table, &request, ctx)
        }));
        Ok(())
    }

    pub fn cancel_histogram(&mut self) {
        if let Some(job) = self.pending.take() {
            job.cancel();
        }
    }

    pub fn is_processing(&self) -> bool {
        self.pending.is_some()
    }

    /// Status messages from the running job.
    pub fn progress(&self) -> Vec<String> {
        self.pending.as_ref().map(Job::progress).unwrap_or_default()
    }

    /// Check on the background job. `None` while it runs or when none was
    /// started. On failure the previous grid is kept.
    pub fn poll_histogram(&mut self) -> Option<Result<()>> {
        let outcome = self.pending.as_ref()?.poll()?;
        self.pending = None;
        Some(outcome.map(|grid| {
            self.grid = Some(Arc::new(grid));
        }))
    }

    pub fn grid(&self) -> Option<&CellGrid> {
        self.grid.as_deref()
    }

    /// Reduce one PID to a surface, triangulate it and build the mesh.
    pub fn build_surface_map(&self, surface: SurfaceRequest) -> Result<SurfaceMap> {
        let request = self.request(&[])?;
        surface_map(&self.table, &request, &self.catalog, surface, &JobContext::detached())
    }

    /// [`Session::build_surface_map`] on a background thread.
    pub fn start_surface_map(&self, surface: SurfaceRequest) -> Result<Job<SurfaceMap>> {
        let request = self.request(&[])?;
        let table = Arc::clone(&self.table);
        let catalog = self.catalog.clone();
        Ok(spawn_job("surface", move |ctx| {
            surface_map(&table, &request, &catalog, surface, ctx)
        }))
    }

    /// Write a committed scale to a scale file.
    pub fn save_scale(&self, kind: ScaleKind, path: &Path) -> Result<()> {
        let scale = match kind {
            ScaleKind::Rpm => &self.rpm_scale,
            ScaleKind::YAxis => &self.y_axis_scale,
        };
        scale_file::write_scale(path, scale, &self.y_axis_name())
    }
}

fn surface_map(
    table: &LogTable,
    request: &ProcessingRequest,
    catalog: &PidCatalog,
    surface: SurfaceRequest,
    ctx: &JobContext,
) -> Result<SurfaceMap> {
    let data = surface::build_surface(table, request, catalog, surface, ctx)?;
    ctx.report("Triangulating");
    let triangles = triangulation::triangulate(&data.points)?;
    ctx.check()?;
    let mesh = SurfaceMesh::build(&data, &triangles);
    Ok(SurfaceMap { data, triangles, mesh })
}
