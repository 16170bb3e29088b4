use clap::Parser;
use equilibrium_solver::equilibrium::{
    EquilibriumOptions, EquilibriumProblem, EquilibriumSolver, EquilibriumState, GibbsHessian,
    IdealMixture,
};
use equilibrium_solver::optimizer::OptimizerType;
use equilibrium_solver::optimizer::options::{OptimumOptions, OutputOptions};
use equilibrium_solver::{EquilibriumSolverError, init_logger_with_level};
use nalgebra::{DVector, dmatrix, dvector};
use tracing::{Level, info, warn};

const SPECIES: [&str; 6] = ["H2", "O2", "H2O", "OH", "H", "O"];
const ELEMENTS: [&str; 2] = ["H", "O"];

#[derive(Parser)]
#[command(name = "solve_equilibrium")]
#[command(about = "Equilibrium of a hydrogen-oxygen gas mixture by Gibbs energy minimization")]
struct Args {
    /// Hessian treatment: "exact" (Fullspace KKT), "diagonal" (Rangespace KKT) or "all"
    #[arg(long, default_value = "all")]
    hessian: String,

    /// Optimizer backend: "ipnewton", "ipopt" or "all"
    #[arg(short, long, default_value = "ipnewton")]
    algorithm: String,

    /// Amount of hydrogen atoms
    #[arg(long, default_value = "4.0")]
    hydrogen: f64,

    /// Amount of oxygen atoms
    #[arg(long, default_value = "2.0")]
    oxygen: f64,

    /// Convergence tolerance on the residual error
    #[arg(short, long, default_value = "1e-8")]
    tolerance: f64,

    /// Maximum number of Newton iterations
    #[arg(short, long, default_value = "200")]
    max_iterations: usize,

    /// Run the feasibility pre-pass before the main solve
    #[arg(long)]
    prepass: bool,

    /// Print the per-iteration trace
    #[arg(long)]
    trace: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

struct RunSummary {
    hessian: GibbsHessian,
    algorithm: OptimizerType,
    status: String,
    iterations: usize,
    prepass_iterations: usize,
    error: f64,
    time_ms: f64,
    amounts: DVector<f64>,
}

fn parse_hessians(name: &str) -> Result<Vec<GibbsHessian>, String> {
    match name.to_lowercase().as_str() {
        "exact" => Ok(vec![GibbsHessian::Exact]),
        "diagonal" => Ok(vec![GibbsHessian::Diagonal]),
        "all" => Ok(vec![GibbsHessian::Exact, GibbsHessian::Diagonal]),
        other => Err(format!(
            "Unknown Hessian: {other}. Valid options: exact, diagonal, all"
        )),
    }
}

fn parse_algorithms(name: &str) -> Result<Vec<OptimizerType>, String> {
    match name.to_lowercase().as_str() {
        "ipnewton" => Ok(vec![OptimizerType::IpNewton]),
        "ipopt" => Ok(vec![OptimizerType::IpOpt]),
        "all" => Ok(vec![OptimizerType::IpNewton, OptimizerType::IpOpt]),
        other => Err(format!(
            "Unknown algorithm: {other}. Valid options: ipnewton, ipopt, all"
        )),
    }
}

/// Ideal gas with standard potentials `g0/RT` of a hot H/O mixture
fn build_problem(args: &Args) -> Result<EquilibriumProblem<IdealMixture>, EquilibriumSolverError> {
    let model = IdealMixture::single_phase(dvector![0.0, 0.0, -10.0, -2.0, 3.0, 4.0]);
    let formula = dmatrix![
        2.0, 0.0, 2.0, 1.0, 1.0, 0.0;
        0.0, 2.0, 1.0, 1.0, 0.0, 1.0
    ];
    let problem = EquilibriumProblem::new(model, formula, dvector![args.hydrogen, args.oxygen])?
        .with_species_names(SPECIES.iter().map(|s| s.to_string()).collect())?
        .with_element_names(ELEMENTS.iter().map(|s| s.to_string()).collect())?;
    Ok(problem)
}

fn run(
    problem: &EquilibriumProblem<IdealMixture>,
    args: &Args,
    hessian: GibbsHessian,
    algorithm: OptimizerType,
) -> Result<RunSummary, EquilibriumSolverError> {
    let output = if args.trace {
        OutputOptions::active()
    } else {
        OutputOptions::default()
    };
    let options = EquilibriumOptions::new()
        .with_hessian(hessian)
        .with_algorithm(algorithm)
        .with_feasibility_prepass(args.prepass)
        .with_optimum(
            OptimumOptions::new()
                .with_tolerance(args.tolerance)
                .with_max_iterations(args.max_iterations)
                .with_output(output),
        );

    info!("Solving with {algorithm} ({hessian} Hessian)");
    let mut solver = EquilibriumSolver::new(options);
    let mut state = EquilibriumState::default();
    let result = solver.solve(problem, &mut state)?;

    if !result.succeeded() {
        warn!("{algorithm} ({hessian} Hessian) did not converge: {}", result.status());
    }

    Ok(RunSummary {
        hessian,
        algorithm,
        status: result.status().to_string(),
        iterations: result.optimum.iterations,
        prepass_iterations: result.feasibility.as_ref().map_or(0, |r| r.iterations),
        error: result.optimum.error,
        time_ms: result.optimum.time.as_secs_f64() * 1000.0,
        amounts: state.n,
    })
}

fn print_summary(summaries: &[RunSummary]) {
    info!("Final summary table:");
    info!(
        "{:<10} | {:<9} | {:<26} | {:<5} | {:<8} | {:<11} | {:<9}",
        "Algorithm", "Hessian", "Status", "Iters", "Pre-pass", "Error", "Time(ms)"
    );
    info!("{}", "-".repeat(94));
    for summary in summaries {
        info!(
            "{:<10} | {:<9} | {:<26} | {:<5} | {:<8} | {:<11.3e} | {:<9.3}",
            summary.algorithm.to_string(),
            summary.hessian.to_string(),
            summary.status,
            summary.iterations,
            summary.prepass_iterations,
            summary.error,
            summary.time_ms
        );
    }
    info!("{}", "-".repeat(94));

    if let Some(first) = summaries.first() {
        info!("Species amounts ({} {}):", first.algorithm, first.hessian);
        for (name, amount) in SPECIES.iter().zip(first.amounts.iter()) {
            info!("  {name:<4} {amount:.6e}");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logger_with_level(if args.verbose { Level::DEBUG } else { Level::INFO });

    let hessians = parse_hessians(&args.hessian)?;
    let algorithms = parse_algorithms(&args.algorithm)?;
    let problem = build_problem(&args)?;

    let mut summaries = Vec::new();
    for algorithm in &algorithms {
        for hessian in &hessians {
            match run(&problem, &args, *hessian, *algorithm) {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!("{algorithm} ({hessian} Hessian) failed: {}", e.chain_compact()),
            }
        }
    }

    print_summary(&summaries);
    Ok(())
}
