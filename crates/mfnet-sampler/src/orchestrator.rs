use crate::chain::{Chain, ChainOutcome, ChainSpec};
use mfnet_core::{ChainRng, NetworkConfig, NetworkError};
use mfnet_graph::Graph;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A chain that panicked instead of returning an outcome.
#[derive(Clone, Debug)]
pub struct ChainFailure {
    pub chain_id: u64,
    pub message: String,
}

/// Everything the orchestrator collected, in chain-id order.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub outcomes: Vec<ChainOutcome>,
    pub failures: Vec<ChainFailure>,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn timed_out(&self) -> usize {
        self.outcomes.iter().filter(|o| o.timed_out).count()
    }

    pub fn recorded_sweeps(&self) -> usize {
        self.outcomes.iter().map(|o| o.recorded_sweeps).sum()
    }
}

/// Inputs a chain runner receives for one task.
pub struct ChainTask<'a> {
    pub chain_id: u64,
    pub graph: &'a Graph,
    pub spec: &'a ChainSpec,
    pub rng: ChainRng,
}

/// Runs independent chains over one shared graph on a bounded worker pool.
#[derive(Clone, Debug)]
pub struct RunOrchestrator {
    chains: usize,
    workers: usize,
    seed: u64,
    time_limit: Option<Duration>,
    config: NetworkConfig,
}

impl RunOrchestrator {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            chains: config.chains,
            workers: config.workers,
            seed: config.seed,
            time_limit: config.time_limit_secs.and_then(|secs| match Duration::try_from_secs_f64(secs) {
                Ok(limit) => Some(limit),
                Err(_) => {
                    warn!(secs, "time limit does not fit a Duration, running without one");
                    None
                }
            }),
            config: config.clone(),
        }
    }

    pub fn run(&self, graph: Arc<Graph>) -> Result<RunOutcome, NetworkError> {
        self.run_with(graph, |task| {
            Chain::new(task.graph, task.rng, task.chain_id, task.spec.init).run(task.spec)
        })
    }

    /// Like [`run`](Self::run) with a custom per-chain body. A panic inside
    /// `runner` fails only that chain.
    pub fn run_with<R>(&self, graph: Arc<Graph>, runner: R) -> Result<RunOutcome, NetworkError>
    where
        R: Fn(ChainTask<'_>) -> ChainOutcome + Sync,
    {
        let start = Instant::now();
        let deadline = self.time_limit.and_then(|limit| {
            let deadline = start.checked_add(limit);
            if deadline.is_none() {
                warn!(secs = limit.as_secs_f64(), "deadline is past the clock's range, running without one");
            }
            deadline
        });
        let spec = ChainSpec::from_config(&self.config, deadline);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| NetworkError::ThreadPool(e.to_string()))?;

        info!(chains = self.chains, workers = self.workers, seed = self.seed, "starting chains");

        let results: Vec<Result<ChainOutcome, ChainFailure>> = pool.install(|| {
            (0..self.chains as u64)
                .into_par_iter()
                .map(|chain_id| {
                    let task = ChainTask {
                        chain_id,
                        graph: &graph,
                        spec: &spec,
                        rng: ChainRng::from_chain_id(self.seed, chain_id),
                    };
                    panic::catch_unwind(AssertUnwindSafe(|| runner(task))).map_err(|payload| {
                        let message = panic_message(payload.as_ref());
                        error!(chain = chain_id, %message, "chain panicked, it contributes no samples");
                        ChainFailure { chain_id, message }
                    })
                })
                .collect()
        });

        let mut outcomes = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(failure) => failures.push(failure),
            }
        }

        if outcomes.is_empty() {
            return Err(NetworkError::AllChainsFailed { chains: self.chains });
        }

        let outcome = RunOutcome {
            outcomes,
            failures,
            elapsed: start.elapsed(),
        };
        info!(
            ok = outcome.outcomes.len(),
            failed = outcome.failures.len(),
            timed_out = outcome.timed_out(),
            recorded = outcome.recorded_sweeps(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "chains finished"
        );
        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ResultAggregator;
    use approx::assert_relative_eq;
    use mfnet_core::{Candidate, Compound, Formula, IonType, F};
    use mfnet_graph::Edge;

    fn small_graph() -> Arc<Graph> {
        let compounds: Vec<Compound> = (0..3)
            .map(|i| {
                Compound::new(
                    format!("c{}", i),
                    vec![
                        Candidate::new(Formula::new("A"), IonType::new("[M+H]+"), 0.0),
                        Candidate::new(Formula::new("B"), IonType::new("[M+H]+"), 0.0),
                        Candidate::dummy(-10.0),
                    ],
                )
            })
            .collect();
        let scores = compounds.iter().map(|_| vec![0.0, 0.0, -10.0]).collect();
        let edges = vec![Edge::new((0, 0), (1, 0), 1.0), Edge::new((1, 1), (2, 1), 1.0)];
        Arc::new(Graph::new(compounds, scores, edges).unwrap())
    }

    fn config() -> NetworkConfig {
        NetworkConfig::default().with_sweeps(10, 50).with_chains(6).with_workers(2)
    }

    #[test]
    fn test_outcomes_in_chain_order() {
        let run = RunOrchestrator::new(&config()).run(small_graph()).unwrap();
        let ids: Vec<u64> = run.outcomes.iter().map(|o| o.chain_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(run.recorded_sweeps(), 6 * 50);
        assert!(run.failures.is_empty());
    }

    #[test]
    fn test_panicking_chain_is_isolated() {
        let run = RunOrchestrator::new(&config())
            .run_with(small_graph(), |task| {
                if task.chain_id == 3 {
                    panic!("injected failure");
                }
                Chain::new(task.graph, task.rng, task.chain_id, task.spec.init).run(task.spec)
            })
            .unwrap();
        assert_eq!(run.outcomes.len(), 5);
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].chain_id, 3);
        assert_eq!(run.failures[0].message, "injected failure");
    }

    #[test]
    fn test_all_chains_failing_is_fatal() {
        let result = RunOrchestrator::new(&config()).run_with(small_graph(), |_| panic!("boom"));
        assert!(matches!(result, Err(NetworkError::AllChainsFailed { chains: 6 })));
    }

    #[test]
    fn test_huge_time_limit_runs_without_deadline() {
        // 1e20 s overflows Duration, 1e19 s overflows Instant
        for secs in [1e19, 1e20, F::MAX] {
            let cfg = config().with_time_limit(secs);
            assert!(cfg.validate().is_ok());
            let run = RunOrchestrator::new(&cfg).run(small_graph()).unwrap();
            assert_eq!(run.timed_out(), 0);
            assert_eq!(run.recorded_sweeps(), 6 * 50);
        }
    }

    #[test]
    fn test_deadline_mid_sampling_keeps_partial_counts() {
        let g = small_graph();
        let cfg = config().with_sweeps(0, 1_000_000_000).with_chains(1).with_time_limit(0.2);
        let run = RunOrchestrator::new(&cfg).run(Arc::clone(&g)).unwrap();

        let outcome = &run.outcomes[0];
        assert!(outcome.timed_out);
        assert!(outcome.recorded_sweeps > 0);
        assert!(outcome.recorded_sweeps < cfg.sampling_sweeps);
        for c in 0..g.num_compounds() {
            assert_eq!(outcome.counts.total(c), outcome.recorded_sweeps as u64);
        }

        let posterior = ResultAggregator::posterior(&g, &run.outcomes).unwrap();
        for (c, probs) in posterior.iter().enumerate() {
            let expected = outcome.counts.frequencies(c).unwrap();
            for (p, q) in probs.iter().zip(&expected) {
                assert_relative_eq!(p, q, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_results_do_not_depend_on_worker_count() {
        let one = RunOrchestrator::new(&config().with_workers(1)).run(small_graph()).unwrap();
        let four = RunOrchestrator::new(&config().with_workers(4)).run(small_graph()).unwrap();
        for (a, b) in one.outcomes.iter().zip(&four.outcomes) {
            assert_eq!(a.counts, b.counts);
        }
    }
}
