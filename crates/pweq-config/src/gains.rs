//! The fixed band layout and the sparse per-band gain table.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::error::ConfigError;

/// Center frequencies of the ten equalizer bands, in Hz, ascending.
pub const BAND_FREQUENCIES: [u32; 10] = [31, 63, 125, 250, 500, 1000, 2000, 4000, 8000, 16000];

/// Lowest gain a band accepts, in dB.
pub const MIN_GAIN: f32 = -12.0;

/// Highest gain a band accepts, in dB.
pub const MAX_GAIN: f32 = 12.0;

/// Increment used when nudging a band up or down interactively, in dB.
pub const GAIN_STEP: f32 = 0.5;

/// Returns `true` if `freq` is one of [`BAND_FREQUENCIES`].
pub fn is_band(freq: u32) -> bool {
    BAND_FREQUENCIES.contains(&freq)
}

/// Clamp a gain into `[MIN_GAIN, MAX_GAIN]`.
///
/// NaN maps to 0.0 dB; infinities map to the nearest bound.
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        return 0.0;
    }
    gain.clamp(MIN_GAIN, MAX_GAIN)
}

fn to_tenths(gain: f32) -> i16 {
    (clamp_gain(gain) * 10.0).round() as i16
}

fn from_tenths(tenths: i16) -> f32 {
    f32::from(tenths) / 10.0
}

/// Sparse mapping of band frequency to gain in dB.
///
/// Only bands that were explicitly set are present; everything else reads as
/// flat (0.0 dB) when rendered. Gains are clamped on every write and held at
/// 0.1 dB resolution, the precision of the rendered config, so a table
/// survives a render/parse round trip unchanged.
///
/// # Example
///
/// ```rust
/// use pweq_config::GainTable;
///
/// let mut gains = GainTable::new();
/// gains.set(1000, 2.5).unwrap();
/// gains.set(16000, 50.0).unwrap(); // clamped
///
/// assert_eq!(gains.get(1000), Some(2.5));
/// assert_eq!(gains.get(16000), Some(12.0));
/// assert_eq!(gains.gain_or_flat(31), 0.0);
/// ```
///
/// Equality and hashing compare the response, not the storage: an unset band
/// equals a band explicitly set to 0.0 dB.
#[derive(Debug, Clone, Default)]
pub struct GainTable {
    tenths: BTreeMap<u32, i16>,
}

impl GainTable {
    fn band_tenths(&self) -> impl Iterator<Item = i16> + '_ {
        BAND_FREQUENCIES
            .iter()
            .map(|f| self.tenths.get(f).copied().unwrap_or(0))
    }
}

impl PartialEq for GainTable {
    fn eq(&self, other: &Self) -> bool {
        self.band_tenths().eq(other.band_tenths())
    }
}

impl Eq for GainTable {}

impl Hash for GainTable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for tenths in self.band_tenths() {
            tenths.hash(state);
        }
    }
}

impl GainTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with every band explicitly set to 0.0 dB.
    pub fn flat() -> Self {
        Self {
            tenths: BAND_FREQUENCIES.iter().map(|&f| (f, 0)).collect(),
        }
    }

    /// Build a table from `(frequency, gain)` pairs, failing on the first
    /// frequency that is not a band.
    pub fn try_from_pairs(
        pairs: impl IntoIterator<Item = (u32, f32)>,
    ) -> Result<Self, ConfigError> {
        let mut table = Self::new();
        for (freq, gain) in pairs {
            table.set(freq, gain)?;
        }
        Ok(table)
    }

    /// Build a table from `(frequency, gain)` pairs, skipping non-band
    /// frequencies with a warning.
    pub fn from_pairs_lossy(pairs: impl IntoIterator<Item = (u32, f32)>) -> Self {
        let mut table = Self::new();
        for (freq, gain) in pairs {
            if let Err(e) = table.set(freq, gain) {
                tracing::warn!("skipping gain entry: {e}");
            }
        }
        table
    }

    /// Set the gain for a band, returning the stored (clamped) value.
    pub fn set(&mut self, freq: u32, gain: f32) -> Result<f32, ConfigError> {
        if !is_band(freq) {
            return Err(ConfigError::UnknownBand(freq));
        }
        let clamped = clamp_gain(gain);
        if clamped != gain {
            tracing::warn!(freq, gain, clamped, "gain out of range, clamping");
        }
        let tenths = to_tenths(clamped);
        self.tenths.insert(freq, tenths);
        Ok(from_tenths(tenths))
    }

    /// Gain for a band, if it was set.
    pub fn get(&self, freq: u32) -> Option<f32> {
        self.tenths.get(&freq).copied().map(from_tenths)
    }

    /// Gain for a band, or 0.0 dB if it was never set.
    pub fn gain_or_flat(&self, freq: u32) -> f32 {
        self.get(freq).unwrap_or(0.0)
    }

    /// Remove a band, returning its previous gain.
    pub fn remove(&mut self, freq: u32) -> Option<f32> {
        self.tenths.remove(&freq).map(from_tenths)
    }

    /// Overlay every band set in `other` onto this table.
    pub fn merge(&mut self, other: &GainTable) {
        self.tenths.extend(other.tenths.iter().map(|(&f, &t)| (f, t)));
    }

    /// Iterate over the bands that are set, in ascending frequency order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.tenths.iter().map(|(&f, &t)| (f, from_tenths(t)))
    }

    /// Iterate over all ten bands in ascending order, defaulting unset ones to 0.0.
    pub fn bands(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        BAND_FREQUENCIES
            .iter()
            .map(move |&f| (f, self.gain_or_flat(f)))
    }

    /// Number of bands that are set.
    pub fn len(&self) -> usize {
        self.tenths.len()
    }

    /// Check if no band is set.
    pub fn is_empty(&self) -> bool {
        self.tenths.is_empty()
    }
}
