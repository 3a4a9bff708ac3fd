use std::path::{Path, PathBuf};

use cmrhisto::data::custom_names::CustomNames;
use cmrhisto::data::loader::{load_file, LoadOptions};
use cmrhisto::error::HistoError;
use cmrhisto::processing::derived::PidKind;
use cmrhisto::processing::scale::{Scale, ScaleKind};
use cmrhisto::processing::statistics::Statistic;
use cmrhisto::processing::surface::SurfaceRequest;
use cmrhisto::report::export::{write_grid, Delimiter};
use cmrhisto::report::grid::{cell_text, format_grid};
use cmrhisto::session::Session;
use cmrhisto::state::preferences::{CellColor, HighlightCriterion, HighlightRule, SortOrder};
use cmrhisto::state::request::YAxisSource;
use cmrhisto::state::settings::Settings;

const LOG: &str = "\
Exported by scanner
Time,RPM,Avg MAP To Use,Baro,ECT,Avg Total Working PW,Knock
s,rpm,psi,psi,F,us,deg
0.0,800,7.35,14.7,190,3000,0
0.1,810,7.35,14.7,190,3000,1
0.2,3000,22.05,14.7,195,6000,2
0.3,3000,22.05,14.7,100,6000,3
0.4,3100,22.05,14.7,190
0.5,,7.35,14.7,190,3000,0
";

fn fixture(dir: &Path) -> (PathBuf, Settings) {
    let log = dir.join("drive.csv");
    std::fs::write(&log, LOG).unwrap();

    let names_file = dir.join("CustomPidNames.xml");
    let mut names = CustomNames::default();
    names.insert("Knock", "Knock Retard");
    names.save(&names_file).unwrap();

    let settings = Settings {
        custom_names_file: names_file,
        ..Settings::default()
    };
    (log, settings)
}

#[test]
fn log_import_finds_header_units_and_derived_channels() {
    let dir = tempfile::tempdir().unwrap();
    let (log, settings) = fixture(dir.path());
    let session = Session::open(&log, &settings, false).unwrap();

    let table = session.table();
    assert_eq!(table.column_count(), 7);
    assert_eq!(table.row_count(), 5);
    assert_eq!(table.dropped_rows, 1);
    assert_eq!(
        session.y_axis(),
        Some(YAxisSource::MapOverBaro { map: 2, baro: 3 })
    );

    let catalog = session.catalog();
    let names: Vec<&str> = catalog.pids().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Avg MAP To Use",
            "Avg Total Working PW",
            "Baro",
            "Boost (calculated)",
            "ECT",
            "Injector Duty Cycle (calculated)",
            "Knock",
            "RPM",
        ]
    );
    assert_eq!(catalog.get(PidKind::Boost).unwrap().unit, "psi");
    assert_eq!(catalog.find("knock retard").unwrap().name, "Knock");
}

#[test]
fn histogram_cells_show_vacuum_and_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let (log, settings) = fixture(dir.path());
    let mut session = Session::open(&log, &settings, false).unwrap();
    let selected = session
        .catalog()
        .resolve(&["Boost (calculated)".to_string(), "Knock".to_string()])
        .unwrap();

    session.run_histogram(&selected).unwrap();
    let grid = session.grid().unwrap();
    assert_eq!(grid.rows_read, 5);
    assert_eq!(grid.rows_binned, 4);

    let cell = grid.cell(2, 7);
    assert_eq!(cell.sample_count(), 2);
    assert_eq!(
        cell_text(cell, session.catalog(), &settings.preferences),
        "Boost (calculated)\n14.96inHg | 14.96inHg | 14.96inHg\nKnock Retard\n0deg | 1deg | 0.5deg\nSampleSize: 2"
    );
    assert_eq!(cell.stats(PidKind::Boost).unwrap().min, -7.35);
}

#[test]
fn temperature_filter_and_highlight() {
    let dir = tempfile::tempdir().unwrap();
    let (log, mut settings) = fixture(dir.path());
    settings.preferences.highlight = Some(HighlightRule {
        pid: "Knock".to_string(),
        statistic: Statistic::Maximum,
        criterion: HighlightCriterion::Range { min: 0.5, max: 5.0, inside_is_alert: true },
    });

    let mut session = Session::open(&log, &settings, false).unwrap();
    session.set_temperature_filter(Some((160.0, 220.0))).unwrap();
    let knock = session.catalog().find("Knock").unwrap().kind;
    session.run_histogram(&[knock]).unwrap();

    let grid = session.grid().unwrap();
    assert_eq!(grid.total_samples(), 3);

    let report = format_grid(grid, session.catalog(), &settings.preferences, &session.y_axis_name());
    assert_eq!(report.rows[7].cells[2].color, CellColor::Alert);
    assert_eq!(report.rows[0].cells[0].color, CellColor::Empty);
    assert_eq!(report.rows[7].header.tooltip, "0.456 - 0.505 PRatio");
}

#[test]
fn exported_grid_holds_raw_values() {
    let dir = tempfile::tempdir().unwrap();
    let (log, settings) = fixture(dir.path());
    let mut session = Session::open(&log, &settings, false).unwrap();
    session.run_histogram(&[PidKind::Boost]).unwrap();

    let mut out = Vec::new();
    write_grid(
        &mut out,
        session.grid().unwrap(),
        PidKind::Boost,
        Statistic::Maximum,
        Delimiter::Comma,
        SortOrder::Ascending,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 17);
    assert_eq!(lines[7].split(',').nth(2), Some("-7.35"));
    assert_eq!(lines[7].split(',').next(), Some("0"));
}

#[test]
fn surface_map_reduces_repeated_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let (log, settings) = fixture(dir.path());
    let session = Session::open(&log, &settings, false).unwrap();
    let knock = session.catalog().find("Knock").unwrap().kind;

    let map = session
        .build_surface_map(SurfaceRequest { pid: knock, aggregation: Statistic::Average })
        .unwrap();
    assert_eq!(map.data.samples.len(), 3);
    assert_eq!(map.data.samples[2].value, 2.5);
    assert_eq!(map.data.z_label, "PRatio");
    assert_eq!(map.data.y_label, "Knock Retard (deg)");
    assert_eq!(map.triangles.len(), 1);
    assert_eq!(map.mesh.legend.low, "0 deg");
    assert_eq!(map.mesh.legend.mid, "1.25 deg");
    assert_eq!(map.mesh.legend.high, "2.5 deg");
}

#[test]
fn background_surface_job() {
    let dir = tempfile::tempdir().unwrap();
    let (log, settings) = fixture(dir.path());
    let session = Session::open(&log, &settings, false).unwrap();
    let job = session
        .start_surface_map(SurfaceRequest {
            pid: PidKind::InjectorDutyCycle,
            aggregation: Statistic::Maximum,
        })
        .unwrap();
    let map = job.wait().unwrap();
    assert_eq!(map.data.value_unit, "%");
    assert_eq!(map.data.highest_value, 15.0);
}

#[test]
fn file_gates() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _) = fixture(dir.path());

    let small = LoadOptions { accept_large_file: false, large_file_threshold: 10 };
    assert!(matches!(load_file(&log, &small), Err(HistoError::LargeFile { threshold: 10, .. })));
    let accepted = LoadOptions { accept_large_file: true, ..small };
    assert!(load_file(&log, &accepted).is_ok());

    let empty = dir.path().join("empty.csv");
    std::fs::write(&empty, "").unwrap();
    assert!(matches!(load_file(&empty, &LoadOptions::default()), Err(HistoError::EmptyInput(_))));

    let other = dir.path().join("drive.dat");
    std::fs::write(&other, LOG).unwrap();
    assert!(matches!(
        load_file(&other, &LoadOptions::default()),
        Err(HistoError::UnsupportedFormat(_))
    ));
}

#[test]
fn logs_without_rpm_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        custom_names_file: dir.path().join("none.xml"),
        ..Settings::default()
    };

    let no_rpm = dir.path().join("no_rpm.csv");
    std::fs::write(&no_rpm, "Baro,MAF\npsi,g/s\n14.7,3\n").unwrap();
    assert!(matches!(
        Session::open(&no_rpm, &settings, false),
        Err(HistoError::MissingRequiredChannel)
    ));

}

#[test]
fn logs_without_ratio_process_against_a_chosen_axis() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        custom_names_file: dir.path().join("none.xml"),
        ..Settings::default()
    };
    let log = dir.path().join("no_ratio.csv");
    std::fs::write(&log, "RPM,Knock,MAF\nrpm,deg,g/s\n800,1,3\n3000,2,40\n").unwrap();

    let mut session = Session::open(&log, &settings, false).unwrap();
    assert!(session.y_axis().is_none());
    assert!(matches!(session.run_histogram(&[]), Err(HistoError::MissingRatioChannel)));
    let knock = session.catalog().find("Knock").unwrap().kind;
    assert!(matches!(
        session.build_surface_map(SurfaceRequest { pid: knock, aggregation: Statistic::Average }),
        Err(HistoError::MissingRatioChannel)
    ));

    session.set_custom_y_axis("Knock").unwrap();
    assert_eq!(session.y_axis_name(), "Knock");
    session.set_scale(Scale::create(ScaleKind::YAxis, 0.0, 17.0).unwrap());
    let grid = session.run_histogram(&[knock]).unwrap();
    assert_eq!(grid.rows_binned, 2);
    assert_eq!(grid.total_samples(), 2);
}
