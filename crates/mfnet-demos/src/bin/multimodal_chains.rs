use mfnet_core::{Candidate, Compound, Formula, InitStrategy, IonType, NetworkConfig};
use mfnet_graph::{Edge, Graph};
use mfnet_sampler::rerank_graph;
use std::sync::Arc;

/// A chain of compounds where neighbors agree strongly on either all-`x` or
/// all-`y`. Single chains lock into one mode; many chains recover the mix.
fn main() -> anyhow::Result<()> {
    let n = 6;
    let compounds: Vec<Compound> = (0..n)
        .map(|i| {
            Compound::new(
                format!("c{}", i),
                vec![
                    Candidate::new(Formula::new("x"), IonType::new("[M+H]+"), 0.2),
                    Candidate::new(Formula::new("y"), IonType::new("[M+H]+"), 0.0),
                    Candidate::dummy(-10.0),
                ],
            )
        })
        .collect();
    let scores = vec![vec![0.2, 0.0, -10.0]; n];
    let mut edges = Vec::new();
    for i in 0..n - 1 {
        edges.push(Edge::new((i, 0), (i + 1, 0), 10.0));
        edges.push(Edge::new((i, 1), (i + 1, 1), 10.0));
    }
    let graph = Arc::new(Graph::new(compounds, scores, edges)?);

    // exact mode weights: e^(0.2 n) vs 1
    let mode_x = (0.2 * n as f64).exp();
    println!("Exact P(c0 = x) ~ {:.4}", mode_x / (mode_x + 1.0));
    println!();
    println!("{:>7} {:>10} {:>10} {:>10}", "chains", "mean", "min", "max");

    for chains in [1, 4, 16, 64] {
        let mut estimates = Vec::new();
        for seed in 0..20 {
            let config = NetworkConfig::default()
                .with_sweeps(50, 500)
                .with_chains(chains)
                .with_seed(seed)
                .with_init(InitStrategy::Random)
                .with_max_isolated_fraction(1.0);
            let result = rerank_graph(Arc::clone(&graph), &config)?;
            estimates.push(result.network_ranking[0].probability_of(0).unwrap_or(0.0));
        }
        let mean = estimates.iter().sum::<f64>() / estimates.len() as f64;
        let min = estimates.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = estimates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        println!("{:>7} {:>10.4} {:>10.4} {:>10.4}", chains, mean, min, max);
    }

    Ok(())
}
