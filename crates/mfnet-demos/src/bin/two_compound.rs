use mfnet_core::{Candidate, Compound, Formula, IonType, NetworkConfig};
use mfnet_graph::{Edge, Graph};
use mfnet_sampler::rerank_graph;
use std::sync::Arc;

fn main() {
    // Two compounds, each slightly preferring its second candidate on its own
    let compound = |id: &str| {
        Compound::new(
            id,
            vec![
                Candidate::new(Formula::new(format!("{}-true", id)), IonType::new("[M+H]+"), 0.0),
                Candidate::new(Formula::new(format!("{}-decoy", id)), IonType::new("[M+H]+"), 0.5),
                Candidate::dummy(-10.0),
            ],
        )
    };
    let compounds = vec![compound("A"), compound("B")];
    let scores = vec![vec![0.0, 0.5, -10.0]; 2];

    println!("Two compounds, decoys score 0.5, true candidates 0.0");
    println!("{:>8} {:>10} {:>10} {:>10}", "weight", "prior", "network", "dummy");

    for weight in [0.0, 0.5, 1.0, 2.0, 4.0, 8.0] {
        let edges = if weight > 0.0 {
            vec![Edge::new((0, 0), (1, 0), weight)]
        } else {
            Vec::new()
        };
        let graph = match Graph::new(compounds.clone(), scores.clone(), edges) {
            Ok(graph) => Arc::new(graph),
            Err(e) => {
                eprintln!("invalid graph: {}", e);
                return;
            }
        };
        let config = NetworkConfig::default()
            .with_sweeps(200, 5000)
            .with_chains(4)
            .with_max_isolated_fraction(1.0);

        match rerank_graph(graph, &config) {
            Ok(result) => {
                let a = &result.network_ranking[0];
                println!(
                    "{:>8.1} {:>10.4} {:>10.4} {:>10.6}",
                    weight,
                    result.prior_ranking[0].probability_of(0).unwrap_or(0.0),
                    a.probability_of(0).unwrap_or(0.0),
                    a.probability_of(2).unwrap_or(0.0)
                );
            }
            Err(e) => eprintln!("weight {}: {}", weight, e),
        }
    }

    println!();
    println!("Exact P(A-true) for weight w: (e^w + e^0.5) / (e^w + 2e^0.5 + e^1)");
}
