use mfnet_core::{Candidate, Compound, Formula, InitStrategy, IonType, NetworkConfig, F};
use mfnet_graph::{Edge, Graph};
use mfnet_sampler::rerank_graph;
use std::sync::Arc;

/// Two modes, `(x, x)` and `(y, y)`, separated by a barrier no chain crosses
/// in a few hundred sweeps.
fn two_modes() -> Arc<Graph> {
    let compound = |id: &str| {
        Compound::new(
            id,
            vec![
                Candidate::new(Formula::new("x"), IonType::new("[M+H]+"), 0.3),
                Candidate::new(Formula::new("y"), IonType::new("[M+H]+"), 0.0),
                Candidate::dummy(-10.0),
            ],
        )
    };
    let compounds = vec![compound("A"), compound("B")];
    let scores = vec![vec![0.3, 0.0, -10.0]; 2];
    let edges = vec![Edge::new((0, 0), (1, 0), 12.0), Edge::new((0, 1), (1, 1), 12.0)];
    Arc::new(Graph::new(compounds, scores, edges).unwrap())
}

fn estimates(chains: usize, seeds: u64) -> Vec<F> {
    let graph = two_modes();
    (0..seeds)
        .map(|seed| {
            let config = NetworkConfig::default()
                .with_sweeps(100, 400)
                .with_chains(chains)
                .with_workers(4)
                .with_seed(1000 + seed)
                .with_init(InitStrategy::Random);
            let result = rerank_graph(Arc::clone(&graph), &config).unwrap();
            result.network_ranking[0].probability_of(0).unwrap()
        })
        .collect()
}

fn variance(xs: &[F]) -> F {
    let n = xs.len() as F;
    let mean = xs.iter().sum::<F>() / n;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<F>() / (n - 1.0)
}

#[test]
fn more_chains_cover_both_modes() {
    let single = estimates(1, 30);
    let many = estimates(20, 30);

    let var_single = variance(&single);
    let var_many = variance(&many);

    println!("Two-mode network, P(A=x) over 30 seeds:");
    println!("1 chain:   variance {:.5}, estimates {:?}", var_single, single);
    println!("20 chains: variance {:.5}", var_many);

    // a lone chain commits to whichever mode it falls into first
    let stuck = single.iter().filter(|&&p| p < 0.05 || p > 0.95).count();
    assert!(stuck >= 25, "only {} of 30 single chains stayed in one mode", stuck);
    assert!(single.iter().any(|&p| p < 0.5) && single.iter().any(|&p| p > 0.5));

    assert!(var_many < var_single / 4.0, "{} vs {}", var_many, var_single);
}
