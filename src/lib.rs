//! Tensor-network representation of quantum circuits.
//!
//! A quantum circuit is stored as a graph whose nodes are tensors (gates,
//! boundary states, decomposition factors) and whose edges are the indices
//! shared between them. The [`tensornetwork`] module owns the graph and all of
//! its mutation algorithms: gate insertion, boundary binding, adjacency
//! queries and truncated-SVD decomposition. Tensor payloads themselves live
//! behind the [`backend`] contract and are only ever addressed by label, so
//! the same graph can drive an immediate in-memory execution or a deferred
//! one. The [`io`] module maps the graph topology (without payloads) to a
//! plain nested document and back.

pub mod backend;
pub mod gates;
pub mod io;
pub mod tensornetwork;
pub mod types;
