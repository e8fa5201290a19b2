//! # Models
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Sample estimation, long-only mean-variance and Black-Litterman posterior.

pub mod black_litterman;
pub mod estimation;
pub mod mean_variance;

pub use black_litterman::identity_view_posterior;
pub use black_litterman::implied_equilibrium_returns;
pub use black_litterman::omega_from_confidence;
pub use black_litterman::posterior;
pub use black_litterman::Posterior;
pub use estimation::estimate_mean_cov;
pub use estimation::MeanCovEstimate;
pub use estimation::DEFAULT_MIN_OBSERVATIONS;
pub use mean_variance::long_only_weights;
pub use mean_variance::DEFAULT_RIDGE;
