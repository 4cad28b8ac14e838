// tests/scoring.rs
//
// Scorer contracts: value ranges, verdict thresholds, defaults on missing
// signals, and the wind step table boundaries.

mod common;

use std::sync::atomic::Ordering;

use approx::assert_abs_diff_eq;
use common::{loc, FakeClimate, FakeTerrain, Harness, TerrainValues};
use sustainability_analyzer::scoring::{afforestation, water, windmill, Feasibility};
use sustainability_analyzer::signals::normalize::{rainfall_score, slope_score, soil_score, wind_score};

#[test]
fn wind_step_table_boundaries() {
    let cases = [
        (0.0, 0.0),
        (2.99, 0.0),
        (3.0, 0.2),
        (4.99, 0.2),
        (5.0, 0.5),
        (7.0, 0.75),
        (9.0, 1.0),
        (12.0, 1.0),
        (12.01, 0.0),
        (40.0, 0.0),
    ];
    for (speed, expected) in cases {
        assert_eq!(wind_score(speed), expected, "speed {speed}");
    }
}

#[test]
fn wind_score_only_takes_table_values() {
    let allowed = [0.0, 0.2, 0.5, 0.75, 1.0];
    for i in 0..400 {
        let s = wind_score(i as f64 * 0.05);
        assert!(allowed.contains(&s), "{s}");
    }
}

#[test]
fn normalized_signals_stay_in_unit_interval() {
    for x in [-50.0, -1.0, 0.0, 0.5, 10.0, 44.9, 45.0, 99.0, 1e6, f64::NAN] {
        for s in [rainfall_score(x), soil_score(x), slope_score(x)] {
            assert!((0.0..=1.0).contains(&s), "{x} -> {s}");
        }
    }
}

#[test]
fn final_scores_stay_in_unit_interval() {
    let grid = [-1.0, 0.0, 0.25, 0.5, 0.75, 1.0, 2.0];
    for a in grid {
        for b in grid {
            for c in grid {
                let w = water::score(a, b, c).scored().cloned().unwrap();
                assert!((0.0..=1.0).contains(&w.water_harvesting_score));
                let m = windmill::score(a, c * 20.0, b).scored().cloned().unwrap();
                assert!((0.0..=1.0).contains(&m.windmill_feasibility_score));
            }
        }
    }
}

#[test]
fn water_extremes() {
    let best = water::score(1.0, 1.0, 0.0).scored().cloned().unwrap();
    assert_abs_diff_eq!(best.water_harvesting_score, 1.0);
    assert_eq!(best.verdict, Feasibility::Feasible);

    let worst = water::score(0.0, 0.0, 1.0).scored().cloned().unwrap();
    assert_abs_diff_eq!(worst.water_harvesting_score, 0.0);
    assert_eq!(worst.verdict, Feasibility::NotFeasible);
}

#[test]
fn windmill_slope_cutoff() {
    assert_eq!(windmill::slope_suitability(15.0), 0.0);
    assert_eq!(windmill::slope_suitability(16.0), 0.0);
    assert_eq!(windmill::slope_suitability(0.0), 1.0);
}

#[tokio::test]
async fn water_assessment_from_signals() {
    let h = Harness::new(FakeClimate::default(), FakeTerrain::default());
    let w = water::assess(&h.fetcher, loc(12.97, 77.59))
        .await
        .scored()
        .cloned()
        .unwrap();
    // rainfall 730mm -> 0.73, soil 7/100, slope 3/45 inverted
    let expected = 0.5 * 0.73 + 0.2 * 0.07 + 0.3 * (1.0 - 3.0 / 45.0);
    assert_abs_diff_eq!(w.water_harvesting_score, (expected * 100.0_f64).round() / 100.0);
    assert_eq!(w.rainfall_score, 0.73);
    assert_eq!(w.slope_score, 0.93);
    assert_eq!(w.verdict, Feasibility::Feasible);
}

#[tokio::test]
async fn water_defaults_to_zero_when_upstreams_fail() {
    let climate = FakeClimate::default();
    climate.fail.store(true, Ordering::SeqCst);
    let terrain = FakeTerrain::default();
    terrain.fail.store(true, Ordering::SeqCst);
    let h = Harness::new(climate, terrain);

    let w = water::assess(&h.fetcher, loc(1.0, 1.0)).await.scored().cloned().unwrap();
    // rainfall 0, soil 0, slope 0 -> only the flatness term remains
    assert_abs_diff_eq!(w.water_harvesting_score, 0.3);
    assert_eq!(w.verdict, Feasibility::NotFeasible);
}

#[tokio::test]
async fn windmill_uses_barren_cover_as_land_score() {
    let h = Harness::new(FakeClimate::default(), FakeTerrain::default());
    let m = windmill::assess(&h.fetcher, loc(23.0, 72.5))
        .await
        .scored()
        .cloned()
        .unwrap();
    // wind 6 m/s -> 0.5, slope 3° -> 0.8, barren 0.4
    assert_eq!(m.wind_score, 0.5);
    assert_eq!(m.slope_score, 0.8);
    assert_eq!(m.land_score, 0.4);
    assert_abs_diff_eq!(m.windmill_feasibility_score, 0.57);
    assert_eq!(m.verdict, Feasibility::ModeratelyFeasible);
}

#[tokio::test]
async fn windmill_land_score_is_zero_without_cover() {
    let terrain = FakeTerrain::with(TerrainValues {
        green: None,
        ..TerrainValues::default()
    });
    let h = Harness::new(FakeClimate::default(), terrain);
    let m = windmill::assess(&h.fetcher, loc(23.0, 72.5))
        .await
        .scored()
        .cloned()
        .unwrap();
    assert_eq!(m.land_score, 0.0);
}

#[tokio::test]
async fn afforestation_verdicts() {
    let feasible = Harness::new(
        FakeClimate::default(),
        FakeTerrain::with(TerrainValues {
            green: Some(0.25),
            potential: Some(0.15),
            ..TerrainValues::default()
        }),
    );
    let r = afforestation::assess(&feasible.fetcher, loc(10.0, 10.0))
        .await
        .scored()
        .cloned()
        .unwrap();
    assert!(r.feasible);
    assert_eq!(r.green_cover_percent, 25.0);
    assert_eq!(r.afforestation_potential_percent, 15.0);

    let sparse = Harness::new(
        FakeClimate::default(),
        FakeTerrain::with(TerrainValues {
            green: Some(0.15),
            potential: Some(0.15),
            ..TerrainValues::default()
        }),
    );
    let r = afforestation::assess(&sparse.fetcher, loc(10.0, 10.0))
        .await
        .scored()
        .cloned()
        .unwrap();
    assert!(!r.feasible);
}
