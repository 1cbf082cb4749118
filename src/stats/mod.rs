//! Statistical building blocks for trace comparison
//!
//! - Log-spaced histograms for inter-arrival times
//! - Contingency tables and the chi-square / Cramér's V test
//! - Discrete power-law fitting for resource popularity

pub mod chi_square;
pub mod contingency;
pub mod histogram;
pub mod powerlaw;

pub use chi_square::{chi2_and_cramers_v, chi2_contingency, ChiSquareTest};
pub use contingency::ContingencyTable;
pub use histogram::LogBins;
pub use powerlaw::{fit_discrete, hurwitz_zeta, PowerLawFit};
