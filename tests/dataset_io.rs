use std::fs;
use std::path::PathBuf;

use overgoals::dataset;
use overgoals::features::FeatureRow;

fn temp_csv(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("overgoals_dataset_io_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir.join(name)
}

fn sample_row(seed: f64) -> FeatureRow {
    FeatureRow {
        home_attack_form_5: Some(seed),
        away_attack_form_5: Some(seed * 0.5),
        home_defensive_fragility_5: Some(1.25),
        home_shots_on_goal_avg_5: Some(4.3333),
        h2h_total_goals_avg_3: None,
        home_possession_avg_5: Some(58.6667),
        home_conversion_rate_5: Some(0.2308),
        total_goals: Some(3.0),
        is_over_2_5: Some(1),
        ..FeatureRow::default()
    }
}

#[test]
fn csv_round_trip_preserves_rows_and_missingness() {
    let path = temp_csv("round_trip.csv");
    let rows = vec![
        sample_row(1.4),
        FeatureRow {
            total_goals: Some(1.0),
            is_over_2_5: Some(0),
            ..FeatureRow::default()
        },
    ];
    dataset::write_dataset_csv(&path, &rows).expect("write csv");
    let loaded = dataset::read_dataset_csv(&path).expect("read csv");
    assert_eq!(loaded, rows);
    fs::remove_file(&path).ok();
}

#[test]
fn missing_column_is_fatal_and_named() {
    let path = temp_csv("bad_header.csv");
    // Everything except h2h_total_goals_avg_3.
    let mut header: Vec<&str> = overgoals::features::dataset_columns();
    header.retain(|c| *c != "h2h_total_goals_avg_3");
    let mut content = header.join(",");
    content.push('\n');
    content.push_str(&vec!["1.0"; header.len()].join(","));
    content.push('\n');
    fs::write(&path, content).expect("write csv");

    let err = dataset::read_dataset_csv(&path).expect_err("schema violation");
    assert!(err.to_string().contains("h2h_total_goals_avg_3"), "{err}");
    fs::remove_file(&path).ok();
}

#[test]
fn absent_file_is_fatal() {
    let path = temp_csv("never_written.csv");
    fs::remove_file(&path).ok();
    let err = dataset::read_dataset_csv(&path).expect_err("missing dataset");
    assert!(err.to_string().contains("not found"), "{err}");
}

#[test]
fn unparsable_cells_read_as_missing() {
    let path = temp_csv("dirty_cells.csv");
    let header = overgoals::features::dataset_columns();
    let mut cells = vec!["oops".to_string(); header.len()];
    let n = cells.len();
    cells[n - 2] = "4".to_string();
    cells[n - 1] = "1".to_string();
    let content = format!("{}\n{}\n", header.join(","), cells.join(","));
    fs::write(&path, content).expect("write csv");

    let rows = dataset::read_dataset_csv(&path).expect("read csv");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].home_attack_form_5, None);
    assert_eq!(rows[0].total_goals, Some(4.0));
    assert_eq!(rows[0].is_over_2_5, Some(1));
    fs::remove_file(&path).ok();
}

#[test]
fn split_keeps_earlier_rows_in_train() {
    // Rows arrive kickoff-ascending from the builder; totals stand in for
    // the time axis here.
    let rows: Vec<FeatureRow> = (0..10)
        .map(|i| FeatureRow {
            total_goals: Some(i as f64),
            is_over_2_5: Some(i64::from(i as f64 > 2.5)),
            ..FeatureRow::default()
        })
        .collect();
    let (train, test) = dataset::chronological_split(&rows, 0.8).expect("split");
    assert_eq!(train.len(), 8);
    assert_eq!(test.len(), 2);
    let max_train = train
        .iter()
        .map(|r| r.total_goals.unwrap())
        .fold(f64::MIN, f64::max);
    let min_test = test
        .iter()
        .map(|r| r.total_goals.unwrap())
        .fold(f64::MAX, f64::min);
    assert!(max_train < min_test);
}
