use integration_tests::canopy::{Canopy, Plant};
use pspm::{Method, Solver, default_cohort_schedule, trapezium};
use tracing_subscriber::EnvFilter;

const HORIZON: f64 = 20.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn light_competition_with_scheduled_cohorts() {
    init_tracing();

    let plant = Plant::default();
    let mut solver = Solver::new(Method::Cm, Canopy::new(plant, 0.5, 20));
    solver.add_species(&[0.1], plant, &Plant::EXTRAS, 1.0).unwrap();

    let schedule = default_cohort_schedule(HORIZON).unwrap();
    solver.set_cohort_schedule(schedule.clone()).unwrap();
    solver.initialize().unwrap();

    let mut times = vec![0.0];
    for &t in schedule.iter().skip(1).chain(&[HORIZON]) {
        solver.step_to(t).unwrap();
        times.push(t);
    }

    let species = solver.species(0).unwrap();
    assert_eq!(species.varnames(), ["X", "u", "mortality", "fecundity"]);
    assert_eq!(species.xsize(), schedule.len());
    assert!(solver.state().iter().all(|v| v.is_finite()));

    let mut it = species.iterators(solver.state()).unwrap();
    let height = it.get("X").unwrap();
    let mortality = it.get("mortality").unwrap();

    // Oldest cohort first: tallest, with the most accumulated mortality.
    it.begin();
    let (oldest_height, oldest_mortality) = (it.value(&height).unwrap(), it.value(&mortality).unwrap());
    it.rbegin();
    let (newest_height, newest_mortality) = (it.value(&height).unwrap(), it.value(&mortality).unwrap());
    assert!(oldest_height > newest_height);
    assert!(oldest_mortality > newest_mortality);
    assert!(newest_mortality >= 0.0);
    assert!(oldest_height < plant.max_height);

    let heights: Vec<f64> = it.records().map(|r| r[0]).collect();
    assert!(heights.windows(2).all(|w| w[0] >= w[1]));

    // The canopy shades the ground but not the top.
    let canopy = solver.environment();
    assert!(canopy.openness(0.0) < 1.0);
    assert_eq!(canopy.openness(solver.max_size()), 1.0);

    // Seed rain over the run, one output flux per step.
    let history = species.birth_flux_out_history();
    assert_eq!(history.len(), times.len() - 1);
    let seed_rain = trapezium(&times[1..], history);
    assert!(seed_rain > 0.0);
}
