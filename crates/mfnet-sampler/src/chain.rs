use mfnet_core::{ChainRng, InitStrategy, NetworkConfig, SweepOrder, F};
use mfnet_graph::Graph;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPhase {
    Initialized,
    BurningIn,
    Sampling,
    Done,
}

/// Run lengths and strategies for one chain.
#[derive(Clone, Debug)]
pub struct ChainSpec {
    pub burn_in_sweeps: usize,
    pub sampling_sweeps: usize,
    /// Record every `thinning`-th sampling sweep.
    pub thinning: usize,
    pub init: InitStrategy,
    pub order: SweepOrder,
    /// Checked before every sweep.
    pub deadline: Option<Instant>,
}

impl ChainSpec {
    pub fn new(burn_in_sweeps: usize, sampling_sweeps: usize) -> Self {
        Self {
            burn_in_sweeps,
            sampling_sweeps,
            thinning: 1,
            init: InitStrategy::BestScore,
            order: SweepOrder::Shuffled,
            deadline: None,
        }
    }

    pub fn from_config(config: &NetworkConfig, deadline: Option<Instant>) -> Self {
        Self {
            burn_in_sweeps: config.burn_in_sweeps,
            sampling_sweeps: config.sampling_sweeps,
            thinning: config.thinning.max(1),
            init: config.init,
            order: config.sweep_order,
            deadline,
        }
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    pub fn with_order(mut self, order: SweepOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_thinning(mut self, thinning: usize) -> Self {
        self.thinning = thinning.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Number of sweeps a chain records when it runs to completion.
    pub fn expected_recorded(&self) -> usize {
        self.sampling_sweeps / self.thinning.max(1)
    }
}

/// Compound × candidate table of how often each assignment was recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisitCounts {
    offsets: Vec<usize>,
    counts: Vec<u64>,
}

impl VisitCounts {
    pub fn new(sizes: impl IntoIterator<Item = usize>) -> Self {
        let mut offsets = vec![0];
        for n in sizes {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + n);
        }
        let total = offsets[offsets.len() - 1];
        Self {
            offsets,
            counts: vec![0; total],
        }
    }

    pub fn for_graph(graph: &Graph) -> Self {
        Self::new((0..graph.num_compounds()).map(|c| graph.num_candidates(c)))
    }

    pub fn num_compounds(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn row(&self, compound: usize) -> &[u64] {
        &self.counts[self.offsets[compound]..self.offsets[compound + 1]]
    }

    pub fn get(&self, compound: usize, candidate: usize) -> u64 {
        self.row(compound)[candidate]
    }

    pub fn total(&self, compound: usize) -> u64 {
        self.row(compound).iter().sum()
    }

    /// Adds one visit for every compound's assigned candidate.
    pub fn record(&mut self, assignment: &[usize]) {
        for (compound, &candidate) in assignment.iter().enumerate() {
            self.counts[self.offsets[compound] + candidate] += 1;
        }
    }

    /// Empirical posterior of one compound, or `None` before any record.
    pub fn frequencies(&self, compound: usize) -> Option<Vec<F>> {
        let total = self.total(compound);
        if total == 0 {
            return None;
        }
        Some(self.row(compound).iter().map(|&c| c as F / total as F).collect())
    }
}

/// What a chain hands back once it stops.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainOutcome {
    pub chain_id: u64,
    pub counts: VisitCounts,
    pub recorded_sweeps: usize,
    pub sweeps_run: usize,
    pub timed_out: bool,
    pub final_assignment: Vec<usize>,
}

/// One Gibbs chain over a shared graph.
///
/// The assignment vector is updated in place: a compound resampled late in a
/// sweep conditions on neighbors already resampled earlier in that sweep.
pub struct Chain<'g> {
    graph: &'g Graph,
    rng: ChainRng,
    chain_id: u64,
    assignment: Vec<usize>,
    counts: VisitCounts,
    order: Vec<usize>,
    logits: Vec<F>,
    scratch: Vec<F>,
    phase: ChainPhase,
    sweeps_run: usize,
    recorded: usize,
}

impl<'g> Chain<'g> {
    pub fn new(graph: &'g Graph, mut rng: ChainRng, chain_id: u64, init: InitStrategy) -> Self {
        let assignment = (0..graph.num_compounds())
            .map(|c| match init {
                InitStrategy::BestScore => graph.compound(c).best_index().unwrap_or(0),
                InitStrategy::Random => rng.index(graph.num_candidates(c)),
            })
            .collect();

        Self {
            graph,
            rng,
            chain_id,
            assignment,
            counts: VisitCounts::for_graph(graph),
            order: (0..graph.num_compounds()).collect(),
            logits: Vec::new(),
            scratch: Vec::new(),
            phase: ChainPhase::Initialized,
            sweeps_run: 0,
            recorded: 0,
        }
    }

    pub fn phase(&self) -> ChainPhase {
        self.phase
    }

    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn counts(&self) -> &VisitCounts {
        &self.counts
    }

    pub fn recorded_sweeps(&self) -> usize {
        self.recorded
    }

    /// Full conditional of `compound` given the current assignment of all
    /// other compounds.
    pub fn conditional(&self, compound: usize) -> Vec<F> {
        let mut logits = Vec::new();
        conditional_logits(self.graph, &self.assignment, compound, &mut logits);
        mfnet_core::softmax(&logits)
    }

    /// Resamples every compound once, in place.
    pub fn sweep(&mut self, order: SweepOrder) {
        if order == SweepOrder::Shuffled {
            self.rng.shuffle(&mut self.order);
        }
        for &compound in &self.order {
            if self.graph.num_candidates(compound) == 1 {
                continue;
            }
            conditional_logits(self.graph, &self.assignment, compound, &mut self.logits);
            self.assignment[compound] = self.rng.sample_log_categorical(&self.logits, &mut self.scratch);
        }
        self.sweeps_run += 1;
    }

    /// Adds the current assignment to the visit counts.
    pub fn record(&mut self) {
        self.counts.record(&self.assignment);
        self.recorded += 1;
    }

    /// Burn-in, then sampling, stopping early at the deadline.
    pub fn run(mut self, spec: &ChainSpec) -> ChainOutcome {
        debug!(chain = self.chain_id, burn_in = spec.burn_in_sweeps, sampling = spec.sampling_sweeps, "chain started");
        let expired = |spec: &ChainSpec| spec.deadline.map_or(false, |d| Instant::now() >= d);
        let mut timed_out = false;

        self.phase = ChainPhase::BurningIn;
        for _ in 0..spec.burn_in_sweeps {
            if expired(spec) {
                timed_out = true;
                break;
            }
            self.sweep(spec.order);
        }

        if !timed_out {
            self.phase = ChainPhase::Sampling;
            let thinning = spec.thinning.max(1);
            for step in 1..=spec.sampling_sweeps {
                if expired(spec) {
                    timed_out = true;
                    break;
                }
                self.sweep(spec.order);
                if step % thinning == 0 {
                    self.record();
                }
            }
        }

        self.phase = ChainPhase::Done;
        if timed_out {
            warn!(
                chain = self.chain_id,
                sweeps = self.sweeps_run,
                recorded = self.recorded,
                "chain hit the deadline, keeping partial counts"
            );
        } else {
            debug!(chain = self.chain_id, recorded = self.recorded, "chain finished");
        }

        ChainOutcome {
            chain_id: self.chain_id,
            counts: self.counts,
            recorded_sweeps: self.recorded,
            sweeps_run: self.sweeps_run,
            timed_out,
            final_assignment: self.assignment,
        }
    }
}

/// `node score + Σ neighbor edge weights` for every candidate of `compound`.
fn conditional_logits(graph: &Graph, assignment: &[usize], compound: usize, out: &mut Vec<F>) {
    out.clear();
    out.extend_from_slice(graph.node_scores(compound));
    for block in graph.neighbors(compound) {
        let other = assignment[block.compound];
        for (own, logit) in out.iter_mut().enumerate() {
            *logit += block.weight(own, other);
        }
    }
}
