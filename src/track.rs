use crate::math::Point2d;
use crate::util::Interval;
use itertools::{izip, Itertools};
use thiserror::Error;

/// A bounded 2D corridor, represented as an upper and a lower boundary
/// curve sampled at a shared, strictly increasing sequence of x-positions.
///
/// A track is immutable once constructed and may be shared freely
/// between any number of vehicles.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    /// The x-position of each sample, strictly increasing.
    xs: Vec<f64>,
    /// The lower boundary's y-value at each sample.
    lower: Vec<f64>,
    /// The upper boundary's y-value at each sample.
    upper: Vec<f64>,
    /// The final x-position; reaching it ends the track.
    end: f64,
}

/// A construction-time violation of the track invariants.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("a track needs at least two samples")]
    TooShort,
    #[error("boundary sequences must be the same length as the x sequence")]
    LengthMismatch,
    #[error("x positions must be strictly increasing")]
    NonIncreasingXs,
    #[error("lower bound meets or exceeds upper bound at sample {index}")]
    InvertedBounds { index: usize },
}

impl Track {
    /// Creates a track from three aligned sample sequences.
    ///
    /// Fails fast on malformed input; this is the only part of the
    /// simulation that aborts rather than degrades.
    pub fn from_sequences(
        xs: Vec<f64>,
        lower_ys: Vec<f64>,
        upper_ys: Vec<f64>,
    ) -> Result<Self, TrackError> {
        if xs.len() < 2 {
            return Err(TrackError::TooShort);
        }
        if lower_ys.len() != xs.len() || upper_ys.len() != xs.len() {
            return Err(TrackError::LengthMismatch);
        }
        if !xs.iter().tuple_windows().all(|(a, b)| a < b) {
            return Err(TrackError::NonIncreasingXs);
        }
        if let Some(index) = izip!(&lower_ys, &upper_ys).position(|(l, u)| l >= u) {
            return Err(TrackError::InvertedBounds { index });
        }
        let end = xs[xs.len() - 1];
        Ok(Self {
            xs,
            lower: lower_ys,
            upper: upper_ys,
            end,
        })
    }

    /// The corridor's y-bounds at the given x-position, linearly
    /// interpolated between samples and clamped to the end samples
    /// outside the track's x-domain.
    ///
    /// Querying exactly at a sample point returns that sample's bounds.
    pub fn bound_at(&self, x: f64) -> Interval<f64> {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return Interval::new(self.lower[0], self.upper[0]);
        }
        if x >= self.end {
            return Interval::new(self.lower[n - 1], self.upper[n - 1]);
        }
        // First sample strictly beyond x; in (0, n) by the clamps above.
        let hi = self.xs.partition_point(|&x0| x0 <= x);
        let lo = hi - 1;
        let t = Interval::new(self.xs[lo], self.xs[hi]).inv_lerp(x);
        Interval::new(
            Interval::new(self.lower[lo], self.lower[hi]).lerp(t),
            Interval::new(self.upper[lo], self.upper[hi]).lerp(t),
        )
    }

    /// Whether a position lies strictly inside the corridor and
    /// strictly within the track's longitudinal extent.
    pub fn is_legal(&self, position: Point2d) -> bool {
        self.bound_at(position.x).surrounds(position.y)
            && Interval::new(0.0, self.end).surrounds(position.x)
    }

    /// The x-position of the end of the track.
    pub fn length(&self) -> f64 {
        self.end
    }

    /// The number of samples defining each boundary curve.
    pub fn samples(&self) -> usize {
        self.xs.len()
    }

    /// The sample x-positions.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// The lower boundary's y-value at each sample.
    pub fn lower_ys(&self) -> &[f64] {
        &self.lower
    }

    /// The upper boundary's y-value at each sample.
    pub fn upper_ys(&self) -> &[f64] {
        &self.upper
    }
}
