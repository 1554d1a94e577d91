// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `flatvec`: flat vector with linear scans (small, simple, no tuning).
//! - `grid`: uniform cubic grid over `f32`/`f64`, keyed by integer cell coordinates.
//!
//! Both return query results in ascending slot order, so callers that iterate
//! results get a deterministic order regardless of the backend.

pub mod flatvec;
pub mod grid;

pub use grid::{Grid, GridF32, GridF64};
