// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_spatial --heading-base-level=0

//! Understory Spatial: a generic 3D AABB index.
//!
//! Understory Spatial is the broad phase used by `understory_interaction` to find which
//! interaction objects lie near a tracked controller, and a reusable building block for
//! any 3D proximity query.
//!
//! - Insert, update, and remove axis-aligned bounding boxes (AABBs) with user payloads.
//! - Query by point or overlapping box.
//! - Stage updates and apply them in one [`IndexGeneric::commit`].
//!
//! It is generic over the scalar type `T` and does not depend on any math crate.
//! Higher layers compute world-space AABBs (for example from collider shapes and poses)
//! and feed them here.
//!
//! # Example
//!
//! ```rust
//! use understory_spatial::{Aabb3D, Index};
//!
//! let mut idx: Index<f32, u32> = Index::new();
//! let k1 = idx.insert(Aabb3D::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0), 1);
//! let _k2 = idx.insert(Aabb3D::new(5.0, 5.0, 5.0, 6.0, 6.0, 6.0), 2);
//! idx.commit();
//!
//! // Move the first box next to the second and query around it.
//! idx.update(k1, Aabb3D::new(4.0, 5.0, 5.0, 4.5, 6.0, 6.0));
//! idx.commit();
//!
//! let near: Vec<u32> = idx
//!     .query_box(Aabb3D::around_point(4.8, 5.5, 5.5, 0.5))
//!     .map(|(_, payload)| payload)
//!     .collect();
//! assert_eq!(near, vec![1, 2]);
//! ```
//!
//! ## Choosing a backend
//!
//! - `FlatVec` (default): linear scans. Good for the tens to low hundreds of objects a
//!   typical interaction scene registers.
//! - `GridF32`/`GridF64`: uniform cubic grid with an explicit origin. Choose the cell size
//!   close to the query radius; avoid it for scenes with a few very large boxes.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod index;
pub mod types;

pub use backend::Backend;
pub use backends::flatvec::FlatVec;
pub use backends::grid::{Grid, GridF32, GridF64};
pub use index::{Index, IndexGeneric, Key};
pub use types::{Aabb3D, GridScalar};
