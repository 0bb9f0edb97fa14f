/// kernels — pure, side-effect-free statistical building blocks (§4.B):
/// OLS, the ADF unit-root test, OU half-life, and Pearson correlation.
pub mod adf;
pub mod corr;
pub mod half_life;
pub mod ols;

pub use adf::adf_test;
pub use corr::{correlation_matrix, pearson};
pub use half_life::half_life;
pub use ols::{ols_bivariate, ols_general, OlsResult};
