use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;

use overgoals::features;
use overgoals::fixture_store::{self, FixtureUpsert, VenueRole};
use overgoals::stats_lookup::StatsCache;

fn kickoff(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap()
}

struct Seed {
    conn: Connection,
    comp: i64,
    home: i64,
    away: i64,
    filler: i64,
}

fn seed_store() -> Seed {
    let conn = fixture_store::open_in_memory().expect("open store");
    let comp = fixture_store::upsert_competition(&conn, 39, "Premier League", "England").unwrap();
    let home = fixture_store::upsert_team(&conn, 101, "Harborside").unwrap();
    let away = fixture_store::upsert_team(&conn, 102, "Eastfield").unwrap();
    let filler = fixture_store::upsert_team(&conn, 103, "Northgate").unwrap();
    Seed {
        conn,
        comp,
        home,
        away,
        filler,
    }
}

fn finished(
    seed: &Seed,
    api_id: i64,
    home_team: i64,
    away_team: i64,
    day: u32,
    home_goals: i64,
    away_goals: i64,
) -> i64 {
    fixture_store::upsert_fixture(
        &seed.conn,
        &FixtureUpsert {
            api_id,
            competition_id: seed.comp,
            home_team_id: home_team,
            away_team_id: away_team,
            home_team: "h",
            away_team: "a",
            kickoff: Some(kickoff(day)),
            status: "FT",
            home_goals: Some(home_goals),
            away_goals: Some(away_goals),
        },
    )
    .expect("seed fixture")
}

#[test]
fn window_never_leaks_the_cutoff_or_overflows_n() {
    let seed = seed_store();
    for day in 1..=7 {
        finished(&seed, day as i64, seed.home, seed.filler, day, 1, 0);
    }
    // Same-moment and later fixtures must be invisible at cutoff day 5.
    let cutoff = kickoff(5);
    let window =
        fixture_store::last_fixtures_for_team(&seed.conn, seed.home, seed.comp, cutoff, VenueRole::Home, 5)
            .unwrap();
    assert_eq!(window.len(), 4);
    for fixture in &window {
        assert!(fixture.kickoff.unwrap() < cutoff);
    }

    let cutoff = kickoff(20);
    let window =
        fixture_store::last_fixtures_for_team(&seed.conn, seed.home, seed.comp, cutoff, VenueRole::Home, 5)
            .unwrap();
    assert_eq!(window.len(), 5);
    // Most recent first.
    let days: Vec<u32> = window
        .iter()
        .map(|f| {
            use chrono::Datelike;
            f.kickoff.unwrap().day()
        })
        .collect();
    assert_eq!(days, vec![7, 6, 5, 4, 3]);
}

#[test]
fn window_excludes_unfinished_and_foreign_competition() {
    let seed = seed_store();
    finished(&seed, 1, seed.home, seed.filler, 1, 2, 1);
    // In-progress fixture: no goals yet.
    fixture_store::upsert_fixture(
        &seed.conn,
        &FixtureUpsert {
            api_id: 2,
            competition_id: seed.comp,
            home_team_id: seed.home,
            away_team_id: seed.filler,
            home_team: "h",
            away_team: "a",
            kickoff: Some(kickoff(2)),
            status: "1H",
            home_goals: None,
            away_goals: None,
        },
    )
    .unwrap();
    let other_comp = fixture_store::upsert_competition(&seed.conn, 2, "FA Cup", "England").unwrap();
    fixture_store::upsert_fixture(
        &seed.conn,
        &FixtureUpsert {
            api_id: 3,
            competition_id: other_comp,
            home_team_id: seed.home,
            away_team_id: seed.filler,
            home_team: "h",
            away_team: "a",
            kickoff: Some(kickoff(3)),
            status: "FT",
            home_goals: Some(4),
            away_goals: Some(0),
        },
    )
    .unwrap();

    let window = fixture_store::last_fixtures_for_team(
        &seed.conn,
        seed.home,
        seed.comp,
        kickoff(10),
        VenueRole::Home,
        5,
    )
    .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].api_id, 1);
}

#[test]
fn head_to_head_sees_both_venue_configurations() {
    let seed = seed_store();
    finished(&seed, 1, seed.home, seed.away, 1, 1, 1);
    finished(&seed, 2, seed.away, seed.home, 3, 0, 2);
    finished(&seed, 3, seed.home, seed.filler, 4, 3, 0);

    let meetings =
        fixture_store::head_to_head(&seed.conn, seed.home, seed.away, seed.comp, kickoff(10), 3)
            .unwrap();
    assert_eq!(meetings.len(), 2);
    assert_eq!(meetings[0].api_id, 2);
    assert_eq!(meetings[1].api_id, 1);
}

#[test]
fn three_prior_home_games_average_without_padding() {
    let seed = seed_store();
    finished(&seed, 1, seed.home, seed.filler, 1, 1, 0);
    finished(&seed, 2, seed.home, seed.filler, 2, 2, 1);
    finished(&seed, 3, seed.home, seed.filler, 3, 0, 2);

    let target_id = fixture_store::upsert_fixture(
        &seed.conn,
        &FixtureUpsert {
            api_id: 50,
            competition_id: seed.comp,
            home_team_id: seed.home,
            away_team_id: seed.away,
            home_team: "h",
            away_team: "a",
            kickoff: Some(kickoff(10)),
            status: "NS",
            home_goals: None,
            away_goals: None,
        },
    )
    .unwrap();
    let target = fixture_store::fixture_by_api_id(&seed.conn, 50)
        .unwrap()
        .expect("target stored");
    assert_eq!(target.id, target_id);

    let mut stats = StatsCache::new(&seed.conn);
    let row = features::fixture_features(&seed.conn, &mut stats, &target, true)
        .unwrap()
        .expect("featurizable");

    // Exactly the three observed games: average(1, 2, 0), no zero padding.
    assert_eq!(row.home_attack_form_5, Some(1.0));
    assert_eq!(row.home_defensive_fragility_5, Some(1.0));
    // No away history, no meetings: missing, not zero.
    assert_eq!(row.away_attack_form_5, None);
    assert_eq!(row.h2h_total_goals_avg_3, None);
    // Inference mode: no targets on an unplayed fixture.
    assert_eq!(row.total_goals, None);
    assert_eq!(row.is_over_2_5, None);
}

#[test]
fn shots_features_average_only_recorded_values() {
    let seed = seed_store();
    let f1 = finished(&seed, 1, seed.home, seed.filler, 1, 2, 0);
    let f2 = finished(&seed, 2, seed.home, seed.filler, 2, 1, 1);
    let f3 = finished(&seed, 3, seed.home, seed.filler, 3, 0, 0);

    fixture_store::upsert_statistics(
        &seed.conn,
        f1,
        seed.home,
        r#"[{"type":"Shots on Goal","value":6},{"type":"Total Shots","value":15},{"type":"Ball Possession","value":"61%"}]"#,
    )
    .unwrap();
    fixture_store::upsert_statistics(
        &seed.conn,
        f2,
        seed.home,
        r#"[{"type":"Shots on Goal","value":2},{"type":"Big Chances","value":3}]"#,
    )
    .unwrap();
    // f3 has a record, but nothing that matches shots-on-target keywords.
    fixture_store::upsert_statistics(
        &seed.conn,
        f3,
        seed.home,
        r#"[{"type":"Total Shots","value":"12"}]"#,
    )
    .unwrap();
    // Opponent shots against in f1 only.
    fixture_store::upsert_statistics(
        &seed.conn,
        f1,
        seed.filler,
        r#"[{"type":"Shots on Goal","value":4}]"#,
    )
    .unwrap();

    fixture_store::upsert_fixture(
        &seed.conn,
        &FixtureUpsert {
            api_id: 60,
            competition_id: seed.comp,
            home_team_id: seed.home,
            away_team_id: seed.away,
            home_team: "h",
            away_team: "a",
            kickoff: Some(kickoff(10)),
            status: "NS",
            home_goals: None,
            away_goals: None,
        },
    )
    .unwrap();
    let target = fixture_store::fixture_by_api_id(&seed.conn, 60)
        .unwrap()
        .expect("target stored");

    let mut stats = StatsCache::new(&seed.conn);
    let row = features::fixture_features(&seed.conn, &mut stats, &target, true)
        .unwrap()
        .expect("featurizable");

    // Two recorded values (6 and 2); the keyword miss in f3 is skipped.
    assert_eq!(row.home_shots_on_goal_avg_5, Some(4.0));
    // Total shots seen in f1 and f3: average(15, 12).
    assert_eq!(row.home_total_shots_avg_5, Some(13.5));
    assert_eq!(row.home_possession_avg_5, Some(61.0));
    assert_eq!(row.home_big_chances_avg_5, Some(3.0));
    // Defensive exposure comes from the opponents' records.
    assert_eq!(row.home_shots_on_target_allowed_avg_5, Some(4.0));
    // attack_form 1.0 over shots 4.0.
    assert_eq!(row.home_conversion_rate_5, Some(0.25));
    // Away side has no history at all.
    assert_eq!(row.away_shots_on_goal_avg_5, None);
    assert_eq!(row.away_conversion_rate_5, None);
    // The pass reused one memoized lookup per (fixture, team) pair.
    assert!(stats.cached_pairs() > 0);
}

#[test]
fn dataset_rows_follow_kickoff_order() {
    let seed = seed_store();
    // Totals 1, 3, 5 on days 1, 2, 3.
    finished(&seed, 1, seed.home, seed.away, 1, 1, 0);
    finished(&seed, 2, seed.away, seed.home, 2, 1, 2);
    finished(&seed, 3, seed.home, seed.away, 3, 4, 1);

    let rows = features::build_dataset_rows(&seed.conn, seed.comp, None).unwrap();
    assert_eq!(rows.len(), 3);
    let totals: Vec<f64> = rows.iter().map(|r| r.total_goals.unwrap()).collect();
    assert_eq!(totals, vec![1.0, 3.0, 5.0]);
    // The earliest fixture has no history yet.
    assert_eq!(rows[0].home_attack_form_5, None);
    assert_eq!(rows[0].is_over_2_5, Some(0));
    assert_eq!(rows[2].is_over_2_5, Some(1));

    // limit keeps the last fixtures by kickoff, still ascending.
    let rows = features::build_dataset_rows(&seed.conn, seed.comp, Some(2)).unwrap();
    let totals: Vec<f64> = rows.iter().map(|r| r.total_goals.unwrap()).collect();
    assert_eq!(totals, vec![3.0, 5.0]);
}
