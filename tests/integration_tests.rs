//! End-to-end construction, decomposition and persistence of small circuits.

use tncircuit::backend::{MemoryBackend, TensorBackend};
use tncircuit::gates::load_gate;
use tncircuit::io;
use tncircuit::tensornetwork::circuit::{GateNodes, TensorNetworkCircuit};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Hadamard on qubit 1 followed by CNOT(1, 2) and CNOT(2, 3), i.e. the
/// standard GHZ preparation chain.
fn ghz_chain(decompose: bool) -> (MemoryBackend, TensorNetworkCircuit) {
    let mut backend = MemoryBackend::new();
    let mut circuit = TensorNetworkCircuit::new(3).unwrap();
    circuit
        .add_gate(&mut backend, load_gate("h", &[]), &[1], false)
        .unwrap();
    circuit
        .add_gate(&mut backend, load_gate("cx", &[]), &[1, 2], decompose)
        .unwrap();
    circuit
        .add_gate(&mut backend, load_gate("cx", &[]), &[2, 3], decompose)
        .unwrap();
    (backend, circuit)
}

#[test]
fn ghz_chain_builds_the_expected_graph() {
    init_logging();
    let (mut backend, mut circuit) = ghz_chain(false);
    let inputs = circuit.add_input(&mut backend, "000").unwrap();
    assert_eq!(inputs.len(), 3);

    // 3 gate nodes and 3 input-boundary nodes.
    assert_eq!(circuit.nodes().len(), 6);
    let gate_nodes: Vec<_> = circuit
        .nodes()
        .iter()
        .filter(|(_, node)| node.rank() > 1)
        .map(|(&label, _)| label)
        .collect();
    let boundary_nodes: Vec<_> = circuit
        .nodes()
        .iter()
        .filter(|(_, node)| node.rank() == 1)
        .map(|(&label, _)| label)
        .collect();
    assert_eq!(gate_nodes.len(), 3);
    assert_eq!(boundary_nodes.len(), 3);

    // 3 initial wires plus 1 + 2 + 2 gate outputs.
    assert_eq!(circuit.edges().len(), 8);
    assert!(circuit.edges().values().all(|edge| !edge.is_virtual()));

    // Every input edge starts at a boundary node now.
    for &index in circuit.input_indices() {
        let source = circuit.edge(index).unwrap().source().unwrap();
        assert!(boundary_nodes.contains(&source));
    }

    // The chain is wired h -> cx(1,2) -> cx(2,3).
    let (h, cx12, cx23) = (gate_nodes[0], gate_nodes[1], gate_nodes[2]);
    assert_eq!(circuit.out_neighbors(h).unwrap(), vec![cx12]);
    assert!(circuit.in_neighbors(cx12).unwrap().contains(&h));
    assert!(circuit.out_neighbors(cx12).unwrap().contains(&cx23));
    assert!(circuit.virtual_neighbors(cx12).unwrap().is_empty());

    // Boundary binding is idempotent across the save/load cycle too.
    let repeated = circuit.add_input(&mut backend, "000").unwrap();
    assert!(repeated.is_empty());
}

#[test]
fn ghz_chain_survives_a_save_load_cycle() {
    init_logging();
    let (mut backend, mut circuit) = ghz_chain(false);
    circuit.add_input(&mut backend, "000").unwrap();

    let document = io::to_json(&circuit).unwrap();
    let reloaded = io::from_json(&document).unwrap();
    assert_eq!(reloaded, circuit);
    assert_eq!(io::to_json(&reloaded).unwrap(), document);

    // The structural round-trip law holds one level deeper as well.
    let structure = io::to_structure(&circuit);
    assert_eq!(io::to_structure(&io::from_structure(&structure).unwrap()), structure);
}

#[test]
fn decomposed_chain_tracks_virtual_bonds() {
    init_logging();
    let (mut backend, mut circuit) = ghz_chain(true);
    circuit.add_input(&mut backend, "000").unwrap();

    // Each CNOT became two single-qubit-acting factors.
    assert_eq!(circuit.nodes().len(), 1 + 4 + 3);
    assert_eq!(circuit.edges().len(), 8 + 2);
    assert_eq!(
        circuit.edges().values().filter(|e| e.is_virtual()).count(),
        2
    );
    for edge in circuit.edges().values() {
        if edge.is_virtual() {
            assert_eq!(edge.qubit(), None);
        } else {
            assert!(edge.qubit().is_some());
        }
    }

    // Factors see each other only through the virtual bond queries.
    for (&label, node) in circuit.nodes() {
        let virtual_count = node
            .indices()
            .iter()
            .filter(|&&i| circuit.edge(i).unwrap().is_virtual())
            .count();
        assert_eq!(
            circuit.virtual_neighbors(label).unwrap().len(),
            virtual_count
        );
    }

    // Directed adjacency stays symmetric after the rewiring.
    for edge in circuit.edges().values() {
        if edge.is_virtual() {
            continue;
        }
        let (Some(a), Some(b)) = (edge.source(), edge.destination()) else {
            continue;
        };
        assert!(circuit.out_neighbors(a).unwrap().contains(&b));
        assert!(circuit.in_neighbors(b).unwrap().contains(&a));
    }
}

#[test]
fn reloaded_graphs_keep_allocating_fresh_labels() {
    init_logging();
    let (mut backend, circuit) = ghz_chain(true);
    let mut reloaded = io::from_json(&io::to_json(&circuit).unwrap()).unwrap();

    let labels_before: Vec<_> = reloaded.nodes().keys().copied().collect();
    let GateNodes::Single(gate) = reloaded
        .add_gate(&mut backend, load_gate("h", &[]), &[3], false)
        .unwrap()
    else {
        panic!("single-qubit gate must not split")
    };
    // The fresh label was never used before, despite the sparse label space.
    assert!(!labels_before.contains(&gate));
    assert!(reloaded.node(gate).is_ok());
    assert!(backend.fetch_tensor(gate).is_ok());
}
