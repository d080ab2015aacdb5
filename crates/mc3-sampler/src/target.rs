/// A target distribution the sampler explores.
///
/// Implementations provide unnormalized log densities. The chain combines
/// likelihood and prior into the posterior it tempers, so neither needs a
/// normalizing constant.
pub trait TargetDensity: Send + Sync {
    /// Dimension of the sample space.
    fn dimension(&self) -> usize;

    /// Unnormalized log likelihood at a point.
    fn ln_likelihood(&self, point: &[f64]) -> f64;

    /// Unnormalized log prior at a point.
    fn ln_prior(&self, point: &[f64]) -> f64;

    /// Starting point shared by every chain.
    fn initial_point(&self) -> Vec<f64>;
}

/// Isotropic standard Gaussian with a flat prior.
#[derive(Debug, Clone)]
pub struct StandardGaussian {
    dimension: usize,
}

impl StandardGaussian {
    /// A standard Gaussian over `dimension` coordinates.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl TargetDensity for StandardGaussian {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn ln_likelihood(&self, point: &[f64]) -> f64 {
        -0.5 * point.iter().map(|x| x * x).sum::<f64>()
    }

    fn ln_prior(&self, _point: &[f64]) -> f64 {
        0.0
    }

    fn initial_point(&self) -> Vec<f64> {
        vec![0.0; self.dimension]
    }
}

/// Equal-weight mixture of isotropic Gaussians.
///
/// With well-separated modes a single cold chain gets stuck in one of them,
/// which is exactly the regime heated chains are meant to unlock.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    modes: Vec<Vec<f64>>,
    scale: f64,
}

impl GaussianMixture {
    /// A mixture with the given mode centers and a common scale.
    ///
    /// All modes must share one dimension; the first mode defines it.
    pub fn new(modes: Vec<Vec<f64>>, scale: f64) -> Self {
        Self { modes, scale }
    }

    /// Symmetric two-mode mixture at `-separation/2` and `+separation/2` on
    /// every coordinate.
    pub fn two_wells(dimension: usize, separation: f64, scale: f64) -> Self {
        let low = vec![-separation / 2.0; dimension];
        let high = vec![separation / 2.0; dimension];
        Self::new(vec![low, high], scale)
    }
}

impl TargetDensity for GaussianMixture {
    fn dimension(&self) -> usize {
        self.modes.first().map(|mode| mode.len()).unwrap_or(0)
    }

    fn ln_likelihood(&self, point: &[f64]) -> f64 {
        let variance = self.scale * self.scale;
        let terms: Vec<f64> = self
            .modes
            .iter()
            .map(|mode| {
                let squared: f64 = point
                    .iter()
                    .zip(mode.iter())
                    .map(|(x, center)| (x - center) * (x - center))
                    .sum();
                -0.5 * squared / variance
            })
            .collect();
        ln_sum_exp(&terms)
    }

    fn ln_prior(&self, point: &[f64]) -> f64 {
        // Weak zero-centered Gaussian keeps the posterior proper.
        -0.5 * point.iter().map(|x| x * x).sum::<f64>() / 100.0
    }

    fn initial_point(&self) -> Vec<f64> {
        vec![0.0; self.dimension()]
    }
}

fn ln_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = terms.iter().map(|term| (term - max).exp()).sum();
    max + sum.ln()
}
