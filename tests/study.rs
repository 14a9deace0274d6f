// End-to-end runs of the study pipeline on small synthetic inputs:
//   grade coverage, residual, race shares and changes, join semantics,
//   deed fill, the wide output table, and CSV loading from disk.

use std::{fs, io::Write, path::Path};

use geo::{coord, MultiPolygon, Rect};
use redline::{
    census::{MetricsError, RaceCounts, RaceGroup, ZeroPopulationPolicy},
    deeds::{CoverageDegree, DeedRecord, RestrictionStatus, UNKNOWN},
    GradedRegion, HolcGrade, OverlayMode, Study, StudyConfig, StudyInputs, StudyOptions, TractId,
};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()])
}

fn counts(id: &str, year: u16, total: f64, white: f64, black: f64, mixed: f64) -> RaceCounts {
    RaceCounts { tract: TractId::new(id), year, total, white, black, mixed }
}

/// T1 is a unit square whose left half was graded A. T2 has race data but no
/// geometry. T3 is outside every graded polygon. T4 has geometry but no race data.
fn inputs() -> StudyInputs {
    StudyInputs {
        tracts: vec![
            (TractId::new("T1"), rect(0.0, 0.0, 1.0, 1.0)),
            (TractId::new("T3"), rect(5.0, 0.0, 6.0, 1.0)),
            (TractId::new("T4"), rect(9.0, 0.0, 10.0, 1.0)),
        ],
        regions: vec![GradedRegion::new(HolcGrade::A, rect(0.0, 0.0, 0.5, 1.0))],
        race: vec![
            counts("T1", 2010, 100.0, 55.0, 30.0, 5.0),
            counts("T1", 2018, 100.0, 61.0, 25.0, 5.0),
            counts("T2", 2010, 100.0, 10.0, 80.0, 5.0),
            counts("T2", 2018, 100.0, 12.0, 78.0, 5.0),
            counts("T3", 2010, 200.0, 20.0, 150.0, 10.0),
        ],
        deeds: vec![],
    }
}

fn row<'a>(study: &'a Study, id: &str) -> &'a redline::StudyRow {
    study.rows.iter().find(|r| r.tract.as_str() == id).unwrap()
}

#[test]
fn half_covered_tract_reports_half_and_residual() {
    let study = Study::run(inputs(), &StudyOptions::new(2010, 2018)).unwrap();
    let t1 = row(&study, "T1");

    assert!((t1.coverage.fraction(HolcGrade::A) - 0.5).abs() <= 1e-4);
    assert_eq!(t1.coverage.fraction(HolcGrade::D), 0.0);
    assert!((t1.coverage.unassigned - 0.5).abs() <= 1e-4);
    assert_eq!(t1.top_grade(), Some(HolcGrade::A));

    let redlined = study.redlined().map(|r| r.tract.as_str()).collect::<Vec<_>>();
    assert_eq!(redlined, ["T1"]);
}

#[test]
fn tract_without_geometry_is_excluded() {
    let study = Study::run(inputs(), &StudyOptions::new(2010, 2018)).unwrap();
    assert!(study.rows.iter().all(|r| r.tract.as_str() != "T2"));
}

#[test]
fn tract_outside_baseline_race_table_is_excluded() {
    let study = Study::run(inputs(), &StudyOptions::new(2010, 2018)).unwrap();
    assert!(study.rows.iter().all(|r| r.tract.as_str() != "T4"));
    assert_eq!(study.rows.len(), 2);
}

#[test]
fn missing_comparison_year_keeps_row_with_nulls() {
    let study = Study::run(inputs(), &StudyOptions::new(2010, 2018)).unwrap();
    let t3 = row(&study, "T3");

    assert_eq!(t3.share(2010, RaceGroup::Black), Some(0.75));
    assert_eq!(t3.share(2018, RaceGroup::Black), None);
    assert!(t3.change.is_none());
    assert_eq!(t3.coverage.unassigned, 1.0);
    assert_eq!(t3.top_grade(), None);
}

#[test]
fn white_share_change_is_six_points() {
    let study = Study::run(inputs(), &StudyOptions::new(2010, 2018)).unwrap();
    let change = row(&study, "T1").change.as_ref().unwrap();
    assert_eq!(change.white, 0.06);
    assert_eq!(change.black, -0.05);
    assert_eq!(change.mixed, 0.0);
    assert_eq!(study.years, [2010, 2018]);
}

#[test]
fn unmatched_tracts_get_unknown_deed_fields() {
    let study = Study::run(inputs(), &StudyOptions::new(2010, 2018)).unwrap();
    for r in &study.rows {
        assert_eq!(r.deed.neighborhood, UNKNOWN);
        assert_eq!(r.deed.restriction, RestrictionStatus::Unknown);
        assert_eq!(r.deed.degree, CoverageDegree::Unknown);
    }
}

#[test]
fn shared_tract_yields_one_row_per_neighborhood() {
    let mut inputs = inputs();
    inputs.deeds = vec![
        DeedRecord {
            tract: TractId::new("T1"),
            neighborhood: "Oak Forest East".into(),
            restriction: RestrictionStatus::Current,
            degree: CoverageDegree::Half,
        },
        DeedRecord {
            tract: TractId::new("T1"),
            neighborhood: "Oak Forest West".into(),
            restriction: RestrictionStatus::Never,
            degree: CoverageDegree::Half,
        },
    ];

    let study = Study::run(inputs, &StudyOptions::new(2010, 2018)).unwrap();
    let t1 = study.rows.iter().filter(|r| r.tract.as_str() == "T1").collect::<Vec<_>>();
    assert_eq!(t1.len(), 2);
    assert_eq!(t1[0].deed.neighborhood, "Oak Forest East");
    assert_eq!(t1[1].deed.restriction, RestrictionStatus::Never);

    let summary = study.mean_change_by_restriction();
    assert_eq!(summary[&RestrictionStatus::Current].mean(RaceGroup::White), Some(0.06));
    assert_eq!(summary[&RestrictionStatus::Unknown].rows, 1);
    assert_eq!(summary[&RestrictionStatus::Unknown].mean(RaceGroup::White), None);
}

#[test]
fn overlapping_same_grade_regions_double_count_unless_dissolved() {
    let mut inputs = inputs();
    inputs.regions = vec![
        GradedRegion::new(HolcGrade::D, rect(0.0, 0.0, 0.6, 1.0)),
        GradedRegion::new(HolcGrade::D, rect(0.4, 0.0, 1.0, 1.0)),
    ];

    let summed = Study::run(inputs.clone(), &StudyOptions::new(2010, 2018)).unwrap();
    let t1 = row(&summed, "T1");
    assert!((t1.coverage.fraction(HolcGrade::D) - 1.2).abs() <= 1e-4);
    assert!((t1.coverage.unassigned + 0.2).abs() <= 1e-4);

    let options = StudyOptions { overlay: OverlayMode::Dissolved, ..StudyOptions::new(2010, 2018) };
    let dissolved = Study::run(inputs, &options).unwrap();
    assert!((row(&dissolved, "T1").coverage.fraction(HolcGrade::D) - 1.0).abs() <= 1e-4);
}

#[test]
fn degenerate_tract_fails_the_run() {
    let mut inputs = inputs();
    inputs.tracts.push((TractId::new("T2"), rect(3.0, 0.0, 3.0, 1.0)));

    let err = Study::run(inputs, &StudyOptions::new(2010, 2018)).unwrap_err();
    let err = err.downcast::<redline::DegenerateGeometryError>().unwrap();
    assert_eq!(err.id, "T2");
}

#[test]
fn zero_population_fails_unless_omitted() {
    let mut inputs = inputs();
    inputs.race.push(counts("T4", 2010, 0.0, 0.0, 0.0, 0.0));

    assert!(Study::run(inputs.clone(), &StudyOptions::new(2010, 2018)).is_err());

    let options = StudyOptions { zero_population: ZeroPopulationPolicy::Omit, ..StudyOptions::new(2010, 2018) };
    let study = Study::run(inputs, &options).unwrap();
    let t4 = row(&study, "T4");
    assert_eq!(t4.share(2010, RaceGroup::White), None);
}

#[test]
fn missing_year_is_an_error() {
    assert!(Study::run(inputs(), &StudyOptions::new(2010, 2020)).is_err());
}

#[test]
fn years_out_of_order_are_rejected() {
    for (baseline, comparison) in [(2018, 2010), (2010, 2010)] {
        let err = Study::run(inputs(), &StudyOptions::new(baseline, comparison)).unwrap_err();
        let err = err.downcast::<MetricsError>().unwrap();
        assert_eq!(err, MetricsError::YearOrder { baseline, comparison });
    }
}

#[test]
fn dataframe_is_wide_with_one_row_per_study_row() {
    let study = Study::run(inputs(), &StudyOptions::new(2010, 2018)).unwrap();
    let df = study.to_dataframe().unwrap();

    assert_eq!(df.height(), 2);
    let names = df.get_column_names().iter().map(|s| s.to_string()).collect::<Vec<_>>();
    for expected in [
        "id", "percent_white_2010", "percent_other_2018", "white_change", "A", "D", "U",
        "top_grade", "neighborhood", "restriction", "degree",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing column {expected}: {names:?}");
    }
}

fn write(dir: &Path, name: &str, lines: &[&str]) {
    let mut file = fs::File::create(dir.join(name)).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

#[test]
fn race_and_deed_tables_load_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let header = "GEO_ID,NAME,B02001_001E,B02001_002E,B02001_003E,B02001_008E";
    let labels = "id,Geographic Area Name,Estimate!!Total,Estimate!!Total!!White alone,\
                  Estimate!!Total!!Black or African American alone,Estimate!!Total!!Two or more races";
    write(dir.path(), "race_2010.csv", &[header, labels, "1400000US48201510100,Tract 5101,200,110,50,10"]);
    write(dir.path(), "race_2018.csv", &[header, labels, "1400000US48201510100,Tract 5101,200,122,40,10"]);
    write(dir.path(), "deeds.csv", &[
        "tract_2010,Neighborhood,restriction,degree",
        "510100,Oak Forest East,current,most",
    ]);

    let config = StudyConfig::from_json(
        r#"{
            "race_tables": [
                { "year": 2010, "path": "race_2010.csv" },
                { "year": 2018, "path": "race_2018.csv" }
            ],
            "tracts_shapefile": "unused.shp",
            "grades_shapefile": "unused.shp",
            "deeds_csv": "deeds.csv"
        }"#,
        dir.path(),
    ).unwrap();

    let mut race = Vec::new();
    for table in &config.race_tables {
        race.extend(redline::census::read_race_table(
            &table.path, table.year, &config.race_columns, config.race_header_skip,
        ).unwrap());
    }
    let deeds = redline::deeds::read_deed_table(
        config.deeds_csv.as_deref().unwrap(), &config.deed_columns, &config.county_prefix,
    ).unwrap();

    let inputs = StudyInputs {
        tracts: vec![(TractId::new("1400000US48201510100"), rect(0.0, 0.0, 1.0, 1.0))],
        regions: vec![GradedRegion::new(HolcGrade::C, rect(0.0, 0.0, 1.0, 0.25))],
        race,
        deeds,
    };
    let study = Study::run(inputs, &StudyOptions::from(&config)).unwrap();

    assert_eq!(study.rows.len(), 1);
    let only = &study.rows[0];
    assert_eq!(only.deed.neighborhood, "Oak Forest East");
    assert_eq!(only.deed.degree, CoverageDegree::Most);
    assert_eq!(only.coverage.fraction(HolcGrade::C), 0.25);
    assert_eq!(only.change.as_ref().unwrap().white, 0.06);

    let out = dir.path().join("study.csv");
    study.write_csv(&out).unwrap();
    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("id,"));
    assert!(written.contains("Oak Forest East"));
}
