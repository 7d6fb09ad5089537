use serde::{Deserialize, Serialize};

use crate::error::{LmError, Result};

/// Training configuration shared by the CLI and the server.
///
/// # Invariants (after `validate`)
/// - `order >= 2`
/// - `gamma` is finite and `> 0`
/// - `unk_cutoff >= 1`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LmConfig {
	/// Number of tokens in the longest n-gram (2 = bigram).
	pub order: usize,

	/// Lidstone pseudo-count added to every n-gram count.
	pub gamma: f64,

	/// Minimum corpus frequency for a token to stay out of `<UNK>`.
	pub unk_cutoff: usize,
}

impl Default for LmConfig {
	fn default() -> Self {
		Self { order: 2, gamma: 0.1, unk_cutoff: 2 }
	}
}

impl LmConfig {
	/// Checks every field and returns the first violation.
	///
	/// # Errors
	/// - `InvalidOrder` if `order < 2`
	/// - `InvalidGamma` if `gamma` is not a finite value `> 0`
	/// - `InvalidConfig` if `unk_cutoff` is 0
	pub fn validate(&self) -> Result<()> {
		if self.order < 2 {
			return Err(LmError::InvalidOrder(self.order));
		}
		if !(self.gamma.is_finite() && self.gamma > 0.0) {
			return Err(LmError::InvalidGamma(self.gamma));
		}
		if self.unk_cutoff == 0 {
			return Err(LmError::InvalidConfig("unk_cutoff must be at least 1".to_owned()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_matches_bigram_setup() {
		let config = LmConfig::default();
		assert_eq!(config.order, 2);
		assert_eq!(config.gamma, 0.1);
		assert_eq!(config.unk_cutoff, 2);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn rejects_bad_values() {
		let config = LmConfig { order: 1, ..LmConfig::default() };
		assert!(matches!(config.validate(), Err(LmError::InvalidOrder(1))));

		let config = LmConfig { gamma: 0.0, ..LmConfig::default() };
		assert!(matches!(config.validate(), Err(LmError::InvalidGamma(_))));

		let config = LmConfig { gamma: f64::NAN, ..LmConfig::default() };
		assert!(matches!(config.validate(), Err(LmError::InvalidGamma(_))));

		let config = LmConfig { unk_cutoff: 0, ..LmConfig::default() };
		assert!(matches!(config.validate(), Err(LmError::InvalidConfig(_))));
	}
}
