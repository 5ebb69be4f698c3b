use approx::assert_abs_diff_eq;
use integration_tests::reference::{Competition, ReferenceModel};
use pspm::{Control, Method, Solver};

// Expected values below are snapshots computed for `ReferenceModel` by an
// independent implementation of the same EBT scheme. They pin this model's
// behaviour and are not published reference results.

/// Rates at t = 1 of the initial state: interleaved `[X, u]`, largest cohort
/// first, boundary `[pi0, N0]` last.
const INITIAL_RATES: [f64; 52] = [
    0.0086497068, -0.0001759425, 0.0254248958, -0.0005727247, 0.0415011185, -0.0010374979,
    0.0568783750, -0.0015815316, 0.0715566654, -0.0022181380, 0.0855359895, -0.0029630862,
    0.0988163474, -0.0038351113, 0.1113977391, -0.0048565424, 0.1232801647, -0.0060540804,
    0.1344636240, -0.0074597651, 0.1449481171, -0.0091121856, 0.1547336439, -0.0110579995,
    0.1638202046, -0.0133538528, 0.1722077991, -0.0160688188, 0.1798964274, -0.0192875130,
    0.1868860894, -0.0231140985, 0.1931767853, -0.0276774680, 0.1987685149, -0.0331379964,
    0.2036612784, -0.0396964029, 0.2078550756, -0.0476054742, 0.2113499067, -0.0571856997,
    0.2141457715, -0.0688463090, 0.2162426701, -0.0831138470, 0.2176406025, -0.1006713768,
    0.2183395687, -0.1224128486, 0.0000000000, 0.4368538790,
];

fn reference_solver() -> Solver<ReferenceModel, Competition> {
    let control = Control::default().with_log_densities(false);
    let mut solver = Solver::with_control(Method::Ebt, control, Competition::default());
    solver
        .add_species_on_grid(25, 0.0, 1.0, false, ReferenceModel, &[], 2.0)
        .unwrap();
    solver.species_mut(0).unwrap().set_bfin_is_u0in(true);
    solver.initialize().unwrap();
    solver
}

#[test]
fn initial_rates() {
    let mut solver = reference_solver();
    solver.compute_env(0.0);

    let state = solver.state().to_vec();
    let mut rates = vec![0.0; state.len()];
    solver.calc_rates_ebt(1.0, &state, &mut rates).unwrap();

    assert_eq!(rates.len(), INITIAL_RATES.len());
    for (i, (actual, expected)) in rates.iter().zip(INITIAL_RATES).enumerate() {
        assert_abs_diff_eq!(*actual, expected, epsilon = 1e-6);
        assert!(actual.is_finite(), "rate {i} is not finite");
    }

    // The empty boundary cohort only receives the inflow.
    assert_eq!(rates[50], 0.0);
    let g0 = 0.25 / (1.0 + solver.environment().level.powi(2));
    assert_abs_diff_eq!(rates[51], 2.0 * g0, epsilon = 1e-12);
}

#[test]
fn boundary_density_after_stepping() {
    let mut solver = reference_solver();
    for i in 1..=160 {
        solver.step_to(0.05 * f64::from(i)).unwrap();
    }

    assert_eq!(solver.current_time(), 8.0);
    let species = solver.species(0).unwrap();
    assert_eq!(species.xsize(), 186);
    assert_eq!(species.birth_flux_out_history().len(), 160);

    let u0 = solver.u0_out();
    assert_eq!(u0.len(), 1);
    assert_abs_diff_eq!(u0[0], 0.261_526_930_867_271_2, epsilon = 2e-5);
}

#[test]
fn cohorts_stay_sorted_and_finite() {
    let mut solver = reference_solver();
    for i in 1..=20 {
        solver.step_to(0.1 * f64::from(i)).unwrap();
    }

    let species = solver.species(0).unwrap();
    let it = species.iterators(solver.state()).unwrap();
    let internal: Vec<&[f64]> = it.records().take(species.xsize() - 1).collect();
    assert!(internal.windows(2).all(|w| w[0][0] >= w[1][0]));
    assert!(solver.state().iter().all(|v| v.is_finite()));
    assert!(solver.max_size() <= 1.0);
    assert_eq!(species.xm(), 1.0);
}
