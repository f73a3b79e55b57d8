//! Bounded L-BFGS refinement of nonlinear shape parameters.

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use jc_core::{Error, Result};

const MAX_ITER: u64 = 500;
const GRADIENT_TOLERANCE: f64 = 1e-8;
const HISTORY: usize = 7;

/// Function of the fit parameters to minimize, e.g. a χ².
pub trait Objective: Send + Sync {
    /// Value at `params`.
    fn value(&self, params: &[f64]) -> Result<f64>;

    /// Gradient at `params`; central differences unless overridden.
    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>> {
        let mut shifted = params.to_vec();
        (0..params.len())
            .map(|i| {
                let step = 1e-7 * params[i].abs().max(1.0);
                shifted[i] = params[i] + step;
                let up = self.value(&shifted)?;
                shifted[i] = params[i] - step;
                let down = self.value(&shifted)?;
                shifted[i] = params[i];
                Ok((up - down) / (2.0 * step))
            })
            .collect()
    }
}

/// Best point found by [`minimize_bounded`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Parameters, inside the bounds
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`
    pub value: f64,
    /// Whether the solver met its tolerance
    pub converged: bool,
}

fn project(params: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    params.iter().zip(bounds).map(|(&v, &(lo, hi))| v.clamp(lo, hi)).collect()
}

fn solver_error(e: Error) -> argmin::core::Error {
    argmin::core::Error::msg(e.to_string())
}

/// The objective seen by argmin: parameters are projected into the box
/// before every evaluation.
struct Boxed<'a> {
    objective: &'a dyn Objective,
    bounds: &'a [(f64, f64)],
}

impl CostFunction for Boxed<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<f64, argmin::core::Error> {
        self.objective.value(&project(params, self.bounds)).map_err(solver_error)
    }
}

impl Gradient for Boxed<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> std::result::Result<Vec<f64>, argmin::core::Error> {
        let inside = project(params, self.bounds);
        let mut g = self.objective.gradient(&inside).map_err(solver_error)?;
        // A parameter sitting on a bound only moves back inside.
        for ((gi, &x), &(lo, hi)) in g.iter_mut().zip(&inside).zip(self.bounds) {
            if (x <= lo && *gi > 0.0) || (x >= hi && *gi < 0.0) {
                *gi = 0.0;
            }
        }
        Ok(g)
    }
}

/// Minimize `objective` from `start` with each parameter kept inside its
/// `(low, high)` bound.
pub fn minimize_bounded(objective: &dyn Objective, start: &[f64], bounds: &[(f64, f64)]) -> Result<Minimum> {
    if start.len() != bounds.len() {
        return Err(Error::Validation(format!("{} start values for {} bounds", start.len(), bounds.len())));
    }
    let solver = LBFGS::new(MoreThuenteLineSearch::new(), HISTORY)
        .with_tolerance_grad(GRADIENT_TOLERANCE)
        .map_err(|e| Error::Validation(format!("L-BFGS tolerance: {e}")))?;
    let problem = Boxed { objective, bounds };
    let res = Executor::new(problem, solver)
        .configure(|state| state.param(project(start, bounds)).max_iters(MAX_ITER))
        .run()
        .map_err(|e| Error::Computation(format!("L-BFGS failed: {e}")))?;

    let state = res.state();
    let best = state.get_best_param().ok_or_else(|| Error::Computation("L-BFGS found no point".to_string()))?;
    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    log::trace!("L-BFGS: {} iterations, best {}", state.get_iter(), state.get_best_cost());
    Ok(Minimum { parameters: project(best, bounds), value: state.get_best_cost(), converged })
}
