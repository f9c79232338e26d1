use std::fs;
use std::path::PathBuf;

use overgoals::classifier::{self, ClassifierConfig};
use overgoals::features::FeatureRow;
use overgoals::fixture_store::{self, FixtureUpsert};
use overgoals::goals_model::{self, GoalsModel, TrainConfig};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "overgoals_models_{}_{}",
        name,
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn training_rows() -> Vec<FeatureRow> {
    (0..60)
        .map(|i| {
            let attack = 0.5 + (i % 6) as f64 * 0.4;
            let total = (i % 6) as f64;
            FeatureRow {
                home_attack_form_5: Some(attack),
                away_attack_form_5: Some(attack * 0.7),
                home_defensive_fragility_5: Some(1.0 + (i % 3) as f64 * 0.3),
                home_shots_on_goal_avg_5: Some(2.0 + (i % 4) as f64),
                home_total_shots_avg_5: Some(8.0 + (i % 5) as f64),
                total_goals: Some(total),
                is_over_2_5: Some(i64::from(total > 2.5)),
                ..FeatureRow::default()
            }
        })
        .collect()
}

#[test]
fn goals_model_reload_is_bit_for_bit() {
    let rows = training_rows();
    let model = goals_model::train(&rows, TrainConfig::default()).expect("train");
    let path = temp_dir("poisson").join("overgoals_poisson_39.json");
    model.save(&path).expect("save");
    let reloaded = GoalsModel::load(&path).expect("load");

    for row in &rows {
        let a = model.predict_lambda(row);
        let b = reloaded.predict_lambda(row);
        assert_eq!(a.to_bits(), b.to_bits(), "lambda drifted: {a} vs {b}");
    }
    fs::remove_file(&path).ok();
}

#[test]
fn classifier_reload_is_bit_for_bit() {
    let rows = training_rows();
    let model = classifier::train(&rows, ClassifierConfig::default()).expect("train");
    let path = temp_dir("xg").join("overgoals_xg_39.json");
    model.save(&path).expect("save");
    let reloaded = classifier::OverClassifier::load(&path).expect("load");

    for row in &rows {
        let a = model.predict_proba(row);
        let b = reloaded.predict_proba(row);
        assert_eq!(a.to_bits(), b.to_bits());
    }
    fs::remove_file(&path).ok();
}

#[test]
fn schema_drift_refuses_to_load() {
    let rows = training_rows();
    let mut model = goals_model::train(&rows, TrainConfig::default()).expect("train");
    model.feature_names[0] = "renamed_feature".to_string();
    let path = temp_dir("drift").join("overgoals_poisson_bad.json");
    model.save(&path).expect("save");
    assert!(GoalsModel::load(&path).is_err());
    fs::remove_file(&path).ok();
}

#[test]
fn missing_artifact_is_none_for_inference() {
    let conn = fixture_store::open_in_memory().expect("open store");
    let comp = fixture_store::upsert_competition(&conn, 39, "Premier League", "England").unwrap();
    let home = fixture_store::upsert_team(&conn, 1, "Harborside").unwrap();
    let away = fixture_store::upsert_team(&conn, 2, "Eastfield").unwrap();
    fixture_store::upsert_fixture(
        &conn,
        &FixtureUpsert {
            api_id: 9,
            competition_id: comp,
            home_team_id: home,
            away_team_id: away,
            home_team: "h",
            away_team: "a",
            kickoff: Some(chrono::Utc::now()),
            status: "NS",
            home_goals: None,
            away_goals: None,
        },
    )
    .unwrap();
    let fixture = fixture_store::fixture_by_api_id(&conn, 9).unwrap().unwrap();

    let path = temp_dir("absent").join("no_such_model.json");
    let lambda = goals_model::predict_lambda_for_fixture(&conn, &path, &fixture).expect("infer");
    assert_eq!(lambda, None);
    let batch = goals_model::predict_lambdas(&conn, &path, &[fixture.clone()]).expect("batch");
    assert!(batch.is_empty());
    let prob = classifier::predict_probability_for_fixture(&conn, &path, &fixture).expect("infer");
    assert_eq!(prob, None);
}

#[test]
fn evaluation_reports_only_labeled_rows() {
    let rows = training_rows();
    let model = goals_model::train(&rows, TrainConfig::default()).expect("train");
    let mut test = training_rows();
    test[0].is_over_2_5 = None;
    let metrics = goals_model::evaluate_over25(&model, &test);
    assert_eq!(metrics.samples, test.len() - 1);
    assert!(metrics.log_loss.is_finite());
    assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
}
