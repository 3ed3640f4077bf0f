use lazy_static::lazy_static;
use num_complex::Complex64;

use std::{
    borrow::Borrow,
    collections::HashSet,
    f64::consts::FRAC_1_SQRT_2,
    hash::{Hash, Hasher},
    sync::RwLock,
};

use crate::tensornetwork::tensordata::TensorData;

lazy_static! {
    static ref GATES: RwLock<HashSet<Box<dyn Gate>>> = {
        let mut gates = HashSet::new();
        gates.insert(Box::new(X) as _);
        gates.insert(Box::new(Y) as _);
        gates.insert(Box::new(Z) as _);
        gates.insert(Box::new(H) as _);
        gates.insert(Box::new(S) as _);
        gates.insert(Box::new(Sdg) as _);
        gates.insert(Box::new(T) as _);
        gates.insert(Box::new(Rx) as _);
        gates.insert(Box::new(Ry) as _);
        gates.insert(Box::new(Rz) as _);
        gates.insert(Box::new(Cx) as _);
        gates.insert(Box::new(Cz) as _);
        gates.insert(Box::new(Swap) as _);
        gates.insert(Box::new(Fsim) as _);
        RwLock::new(gates)
    };
}

/// Registers a gate definition to resolve a gate name to a gate implementation.
pub fn register_gate(gate: Box<dyn Gate>) {
    assert!(
        gate.name().to_ascii_lowercase() == gate.name(),
        "Gate name must be lowercase."
    );
    GATES.write().unwrap().insert(gate);
}

/// Computes the gate tensor for the given gate and angles.
#[must_use]
pub fn load_gate(gate: &str, angles: &[f64]) -> TensorData {
    let gates = &GATES.read().unwrap();
    let gate = gates
        .get(gate)
        .unwrap_or_else(|| panic!("Gate '{}' not found.", gate));
    gate.compute(angles)
}

/// Returns whether the given gate is known.
#[must_use]
pub fn is_gate_known(gate: &str) -> bool {
    let gates = &GATES.read().unwrap();
    gates.contains(gate)
}

/// Reindexes a `2^k x 2^k` unitary, given row-major with the row as the
/// output basis state, into the rank-`2k` tensor layout used by gate
/// insertion: input axes first, output axes second, one dimension-2 axis per
/// qubit.
fn gate_tensor(qubits: usize, matrix: Vec<Complex64>) -> TensorData {
    let dim = 1 << qubits;
    assert_eq!(matrix.len(), dim * dim);
    let mut data = vec![Complex64::ZERO; dim * dim];
    for output in 0..dim {
        for input in 0..dim {
            data[input * dim + output] = matrix[output * dim + input];
        }
    }
    TensorData::new_from_flat(&vec![2; 2 * qubits], data).expect("gate shape is consistent")
}

/// A quantum gate.
pub trait Gate: Send + Sync {
    /// Returns the name of the gate.
    fn name(&self) -> &str;

    /// Computes the gate tensor with the given angles, in the axis layout
    /// expected by gate insertion (inputs first, then outputs).
    fn compute(&self, angles: &[f64]) -> TensorData;
}

impl PartialEq for dyn Gate {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for dyn Gate {}

impl Hash for dyn Gate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

/// This allows us to use a `&str` as a key in a `HashSet` of gates.
impl Borrow<str> for Box<dyn Gate> {
    fn borrow(&self) -> &str {
        self.name()
    }
}

/// The Pauli-X gate.
struct X;
impl Gate for X {
    fn name(&self) -> &str {
        "x"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            z, o,
            o, z,
        ];
        gate_tensor(1, matrix)
    }
}

/// The Pauli-Y gate.
struct Y;
impl Gate for Y {
    fn name(&self) -> &str {
        "y"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let i = Complex64::I;
        #[rustfmt::skip]
        let matrix = vec![
            z, -i,
            i,  z,
        ];
        gate_tensor(1, matrix)
    }
}

/// The Pauli-Z gate.
struct Z;
impl Gate for Z {
    fn name(&self) -> &str {
        "z"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            o,  z,
            z, -o,
        ];
        gate_tensor(1, matrix)
    }
}

/// The Hadamard gate.
struct H;
impl Gate for H {
    fn name(&self) -> &str {
        "h"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        #[rustfmt::skip]
        let matrix = vec![
            h,  h,
            h, -h,
        ];
        gate_tensor(1, matrix)
    }
}

/// The phase gate.
struct S;
impl Gate for S {
    fn name(&self) -> &str {
        "s"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            o, z,
            z, Complex64::I,
        ];
        gate_tensor(1, matrix)
    }
}

/// The inverse phase gate.
struct Sdg;
impl Gate for Sdg {
    fn name(&self) -> &str {
        "sdg"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            o, z,
            z, -Complex64::I,
        ];
        gate_tensor(1, matrix)
    }
}

/// The T gate.
struct T;
impl Gate for T {
    fn name(&self) -> &str {
        "t"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            o, z,
            z, (Complex64::I * std::f64::consts::FRAC_PI_4).exp(),
        ];
        gate_tensor(1, matrix)
    }
}

/// Rotation around the X axis.
struct Rx;
impl Gate for Rx {
    fn name(&self) -> &str {
        "rx"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        let [theta] = angles else {
            panic!("Expected 1 angle, got {}", angles.len())
        };
        let (sin, cos) = (theta / 2.0).sin_cos();
        let c = Complex64::new(cos, 0.0);
        let s = Complex64::new(0.0, -sin);
        #[rustfmt::skip]
        let matrix = vec![
            c, s,
            s, c,
        ];
        gate_tensor(1, matrix)
    }
}

/// Rotation around the Y axis.
struct Ry;
impl Gate for Ry {
    fn name(&self) -> &str {
        "ry"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        let [theta] = angles else {
            panic!("Expected 1 angle, got {}", angles.len())
        };
        let (sin, cos) = (theta / 2.0).sin_cos();
        let c = Complex64::new(cos, 0.0);
        let s = Complex64::new(sin, 0.0);
        #[rustfmt::skip]
        let matrix = vec![
            c, -s,
            s,  c,
        ];
        gate_tensor(1, matrix)
    }
}

/// Rotation around the Z axis.
struct Rz;
impl Gate for Rz {
    fn name(&self) -> &str {
        "rz"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        let [theta] = angles else {
            panic!("Expected 1 angle, got {}", angles.len())
        };
        let z = Complex64::ZERO;
        #[rustfmt::skip]
        let matrix = vec![
            (-Complex64::I * (theta / 2.0)).exp(), z,
            z, (Complex64::I * (theta / 2.0)).exp(),
        ];
        gate_tensor(1, matrix)
    }
}

/// The controlled-X gate. The first target qubit is the control.
struct Cx;
impl Gate for Cx {
    fn name(&self) -> &str {
        "cx"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            o, z, z, z,
            z, o, z, z,
            z, z, z, o,
            z, z, o, z,
        ];
        gate_tensor(2, matrix)
    }
}

/// The controlled-Z gate.
struct Cz;
impl Gate for Cz {
    fn name(&self) -> &str {
        "cz"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            o, z, z,  z,
            z, o, z,  z,
            z, z, o,  z,
            z, z, z, -o,
        ];
        gate_tensor(2, matrix)
    }
}

/// The swap gate.
struct Swap;
impl Gate for Swap {
    fn name(&self) -> &str {
        "swap"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        assert!(angles.is_empty());
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let matrix = vec![
            o, z, z, z,
            z, z, o, z,
            z, o, z, z,
            z, z, z, o,
        ];
        gate_tensor(2, matrix)
    }
}

/// The fermionic simulation gate with two parameters.
struct Fsim;
impl Gate for Fsim {
    fn name(&self) -> &str {
        "fsim"
    }

    fn compute(&self, angles: &[f64]) -> TensorData {
        let [theta, phi] = angles else {
            panic!("Expected 2 angles, got {}", angles.len())
        };
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        let (sin, cos) = theta.sin_cos();
        let c = Complex64::new(cos, 0.0);
        let s = Complex64::new(0.0, -sin);
        let p = (-Complex64::I * *phi).exp();
        #[rustfmt::skip]
        let matrix = vec![
            o, z, z, z,
            z, c, s, z,
            z, s, c, z,
            z, z, z, p,
        ];
        gate_tensor(2, matrix)
    }
}
