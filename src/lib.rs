//! Copyright (c) 2006-2016, Timothy A. Davis
//! Copyright (c) 2022, Richard W. Lincoln
//! All Rights Reserved.
//!
//! Concise sparse direct methods.
//!
//! Sparse matrices are assembled as [`Triplet`]s and compressed into
//! column form ([`CscMatrix`]). On top of the basic matrix algebra the crate
//! provides:
//!
//! - fill-reducing orderings by approximate minimum degree ([`amd`]) on
//!   `A+A'`, `A'A` or `S'S` where S is A with its dense rows removed;
//! - structural analysis: elimination trees, postorders, column counts,
//!   maximum matchings and the Dulmage-Mendelsohn decomposition
//!   ([`dmperm`]);
//! - symbolic and numeric Cholesky ([`schol`], [`chol`]), LU with threshold
//!   partial pivoting ([`sqr_lu`], [`lu`]) and Householder QR
//!   ([`sqr_qr`], [`qr`]) factorizations;
//! - direct solvers ([`cholsol`], [`lusol`], [`qrsol`]) and rank-1
//!   update/downdate of a Cholesky factor ([`updown`]).
//!
//! Numerical failures (an indefinite matrix, a singular or rank deficient
//! one) are reported as [`Error`] values. Diagnostics go through the `log`
//! facade.
//!
//! ```
//! use csparse::{lusol, Order, Triplet};
//!
//! let mut t = Triplet::new(2, 2);
//! t.push(0, 0, 2.0).unwrap();
//! t.push(1, 0, 1.0).unwrap();
//! t.push(1, 1, 4.0).unwrap();
//! let a = t.compress();
//! let mut b = [2.0, 5.0];
//! lusol(Order::Natural, &a, &mut b, 1.0).unwrap();
//! assert!((b[0] - 1.0).abs() < 1e-12 && (b[1] - 1.0).abs() < 1e-12);
//! ```

mod algebra;
mod amd;
mod cholesky;
pub mod codes;
mod csc;
mod dmperm;
mod error;
mod etree;
mod internal;
mod lu;
mod perm;
mod qr;
mod reach;
mod report;
mod solve;
pub mod stats;
mod symbolic;
mod triplet;
mod updown;

pub use crate::algebra::{add, gaxpy, make_symmetric, multiply, norm1, permute, symperm};
pub use crate::amd::{amd, amd_with, Order};
pub use crate::cholesky::{chol, CholeskyFactor};
pub use crate::csc::CscMatrix;
pub use crate::dmperm::{dmperm, maxtrans, scc, Dmperm, Matching, Scc};
pub use crate::error::{Error, Result};
pub use crate::etree::{counts, ereach, etree, post};
pub use crate::internal::Int;
pub use crate::lu::{lu, LuFactor};
pub use crate::perm::{ipvec, pinv, pvec, ColumnOrder, Permutation};
pub use crate::qr::{happly, house, qr, QrFactor};
pub use crate::reach::{reach, spsolve, ReachWork};
pub use crate::report::amd_report;
pub use crate::solve::{cholsol, lsolve, ltsolve, lusol, qrsol, usolve, utsolve};
pub use crate::symbolic::{schol, sqr_lu, sqr_qr, CholeskySymbolic, LuSymbolic, QrSymbolic};
pub use crate::triplet::Triplet;
pub use crate::updown::{updown, Direction};
