//! End-to-end equilibrium calculations with the ideal mixture model.
//!
//! # Systems
//!
//! - **Hydrogen-oxygen gas**: H2, O2, H2O, OH, H, O in one ideal gas phase with 4 mol H and
//!   2 mol O, standard potentials `g0/RT = [0, 0, −10, −2, 3, 4]`
//! - **Gas with condensed water**: H2, O2, H2O(g) in a gas phase plus pure liquid water with
//!   `g0/RT = −10.5`, 4 mol H and 4 mol O

use equilibrium_solver::equilibrium::{
    EquilibriumOptions, EquilibriumProblem, EquilibriumSolver, EquilibriumState, GibbsHessian,
    GibbsModel, IdealMixture,
};
use equilibrium_solver::observers::TraceRecorder;
use equilibrium_solver::optimizer::OptimizerType;
use equilibrium_solver::optimizer::options::OptimumOptions;
use equilibrium_solver::{EquilibriumSolverError, OptimizationStatus};
use nalgebra::{DVector, dmatrix, dvector};

const TOLERANCE: f64 = 1e-5;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn hydrogen_oxygen() -> Result<EquilibriumProblem<IdealMixture>, EquilibriumSolverError> {
    let model = IdealMixture::single_phase(dvector![0.0, 0.0, -10.0, -2.0, 3.0, 4.0]);
    let formula = dmatrix![
        2.0, 0.0, 2.0, 1.0, 1.0, 0.0;
        0.0, 2.0, 1.0, 1.0, 0.0, 1.0
    ];
    let problem = EquilibriumProblem::new(model, formula, dvector![4.0, 2.0])?
        .with_species_names(
            ["H2", "O2", "H2O", "OH", "H", "O"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )?;
    Ok(problem)
}

fn hydrogen_oxygen_solution() -> DVector<f64> {
    dvector![0.00547107, 0.000545693, 1.98553, 0.0127673, 0.00522116, 0.000606611]
}

fn condensing_water() -> Result<EquilibriumProblem<IdealMixture>, EquilibriumSolverError> {
    let model = IdealMixture::new(dvector![0.0, 0.0, -10.0, -10.5], &[3, 1])?;
    let formula = dmatrix![
        2.0, 0.0, 2.0, 2.0;
        0.0, 2.0, 1.0, 1.0
    ];
    Ok(EquilibriumProblem::new(model, formula, dvector![4.0, 4.0])?)
}

fn tight(hessian: GibbsHessian) -> EquilibriumOptions {
    EquilibriumOptions::new().with_hessian(hessian).with_optimum(
        OptimumOptions::new()
            .with_tolerance(1e-8)
            .with_max_iterations(200),
    )
}

#[test]
fn test_gas_equilibrium_for_both_hessians() -> TestResult {
    let problem = hydrogen_oxygen()?;
    let expected = hydrogen_oxygen_solution();

    for hessian in [GibbsHessian::Exact, GibbsHessian::Diagonal] {
        let mut state = EquilibriumState::default();
        let result = EquilibriumSolver::new(tight(hessian)).solve(&problem, &mut state)?;

        assert!(result.succeeded(), "{hessian} Hessian did not converge");
        assert_eq!(result.status(), OptimizationStatus::Converged);
        assert!(result.optimum.iterations < 200);
        for (n, reference) in state.n.iter().zip(expected.iter()) {
            assert!(
                ((n - reference) / reference).abs() < TOLERANCE,
                "{hessian}: {n} vs {reference}"
            );
        }
    }
    Ok(())
}

#[test]
fn test_element_potentials_reproduce_chemical_potentials() -> TestResult {
    let problem = hydrogen_oxygen()?;
    let mut state = EquilibriumState::default();
    let result = EquilibriumSolver::new(tight(GibbsHessian::Exact)).solve(&problem, &mut state)?;
    assert!(result.succeeded());

    // At equilibrium μ = Wᵀy, up to the vanishing bound multipliers
    let mu = problem.model().chemical_potentials(&state.n);
    let from_elements = problem.formula_matrix().transpose() * &state.y;
    assert!((mu - from_elements).amax() < 1e-6);
    assert!(problem.mass_balance_residual(&state.n).amax() < 1e-8);
    Ok(())
}

#[test]
fn test_feasibility_prepass_then_solve() -> TestResult {
    let problem = hydrogen_oxygen()?;
    let expected = hydrogen_oxygen_solution();

    for hessian in [GibbsHessian::Exact, GibbsHessian::Diagonal] {
        let options = tight(hessian).with_feasibility_prepass(true);
        let mut state = EquilibriumState::default();
        let result = EquilibriumSolver::new(options).solve(&problem, &mut state)?;

        let prepass = result
            .feasibility
            .as_ref()
            .ok_or("pre-pass result missing")?;
        assert!(prepass.succeeded);
        assert!(result.succeeded(), "{hessian} Hessian did not converge after the pre-pass");
        assert!(((state.n[2] - expected[2]) / expected[2]).abs() < TOLERANCE);
    }
    Ok(())
}

#[test]
fn test_initialize_alone() -> TestResult {
    let problem = hydrogen_oxygen()?;
    let mut solver = EquilibriumSolver::new(EquilibriumOptions::default());
    let mut state = EquilibriumState::default();

    let result = solver.initialize(&problem, &mut state)?;

    assert!(result.succeeded);
    assert_eq!(state.n.len(), 6);
    assert!(state.n.min() > 0.0);
    assert!(problem.mass_balance_residual(&state.n).amax() < 1e-6);
    Ok(())
}

#[test]
fn test_backends_agree() -> TestResult {
    let problem = hydrogen_oxygen()?;
    let mut amounts = Vec::new();

    for algorithm in [OptimizerType::IpNewton, OptimizerType::IpOpt] {
        for hessian in [GibbsHessian::Exact, GibbsHessian::Diagonal] {
            let options = tight(hessian).with_algorithm(algorithm);
            let mut state = EquilibriumState::default();
            let result = EquilibriumSolver::new(options).solve(&problem, &mut state)?;
            assert!(result.succeeded(), "{algorithm} with {hessian} Hessian did not converge");
            amounts.push(state.n);
        }
    }

    for n in &amounts[1..] {
        assert!((n - &amounts[0]).amax() < 1e-7);
    }
    Ok(())
}

#[test]
fn test_warm_start_converges_immediately() -> TestResult {
    let problem = hydrogen_oxygen()?;
    let mut solver = EquilibriumSolver::new(tight(GibbsHessian::Exact));
    let mut state = EquilibriumState::default();

    let cold = solver.solve(&problem, &mut state)?;
    let warm = solver.solve(&problem, &mut state)?;

    assert!(cold.succeeded() && warm.succeeded());
    assert!(warm.optimum.iterations <= 2);
    assert!(warm.optimum.iterations < cold.optimum.iterations);
    Ok(())
}

#[test]
fn test_condensed_phase_equilibrium() -> TestResult {
    let problem = condensing_water()?;
    let mut state = EquilibriumState::default();

    let result = EquilibriumSolver::new(tight(GibbsHessian::Exact)).solve(&problem, &mut state)?;

    assert!(result.succeeded());
    let expected = dvector![1.1159340e-4, 1.0000558, 1.5417521, 0.4581363];
    assert!((&state.n - expected).amax() < 1e-6);

    // Water vapour coexists with the liquid: equal potentials
    let mu = problem.model().chemical_potentials(&state.n);
    assert!((mu[2] - mu[3]).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_observer_records_every_iteration() -> TestResult {
    let problem = hydrogen_oxygen()?;
    let recorder = TraceRecorder::new();
    let mut solver = EquilibriumSolver::new(tight(GibbsHessian::Diagonal));
    solver.add_observer(recorder.clone());

    let result = solver.solve(&problem, &mut EquilibriumState::default())?;

    let records = recorder.records()?;
    assert_eq!(records.len(), result.optimum.iterations);
    assert!(records.iter().all(|r| r.x.min() > 0.0 && r.z.min() > 0.0));
    let last = records.last().ok_or("no iterations recorded")?;
    assert!(last.metrics.errors.max() < 1e-8);
    Ok(())
}

#[test]
fn test_batch_over_compositions() -> TestResult {
    let base = hydrogen_oxygen()?;
    let problems = [
        dvector![4.0, 2.0],
        dvector![4.0, 4.0],
        dvector![6.0, 2.0],
        dvector![4.0, 3.0],
    ]
    .into_iter()
    .map(|amounts| base.with_element_amounts(amounts))
    .collect::<Result<Vec<_>, _>>()?;
    let mut states = vec![EquilibriumState::default(); problems.len()];

    let options = tight(GibbsHessian::Exact);
    let results = EquilibriumSolver::solve_batch(&problems, &mut states, &options)?;

    for ((result, state), problem) in results.into_iter().zip(&states).zip(&problems) {
        let result = result?;
        assert!(result.succeeded());
        assert!(problem.mass_balance_residual(&state.n).amax() < 1e-8);
        assert!(state.n.min() > 0.0);
    }

    let reference = &states[0].n;
    let expected = hydrogen_oxygen_solution();
    assert!(((reference[2] - expected[2]) / expected[2]).abs() < TOLERANCE);
    Ok(())
}
