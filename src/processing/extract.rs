use crate::state::request::ProcessingRequest;

/// RPM and Y-axis readings of one accepted row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub rpm: f64,
    pub y: f64,
}

/// Read the two axis values of a row under the request's Y-axis mode and
/// temperature filter. `None` means the row contributes nothing.
pub fn sample_axes(row: &[Option<f64>], request: &ProcessingRequest) -> Option<AxisSample> {
    let cell = |idx: usize| row.get(idx).copied().flatten();

    let rpm = cell(request.channels.rpm)?;
    let y = request.y_axis.read(row)?;

    if let Some(filter) = &request.temperature_filter {
        if !filter.accepts(cell(filter.column)) {
            return None;
        }
    }

    Some(AxisSample { rpm, y })
}
