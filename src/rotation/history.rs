//! Bounded in-memory log of rotation attempts.

// self
use crate::_prelude::*;

/// One rotation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationInfo {
	/// Secret the rotation targeted.
	pub secret_name: String,
	/// When the attempt finished.
	pub timestamp: OffsetDateTime,
	/// Whether a usable replacement was produced.
	pub success: bool,
}

/// Ring buffer of the most recent [`RotationInfo`] entries. Lives only as long as the process.
#[derive(Debug)]
pub struct RotationHistory {
	entries: Mutex<VecDeque<RotationInfo>>,
	capacity: usize,
}
impl RotationHistory {
	/// Default number of retained entries.
	pub const DEFAULT_CAPACITY: usize = 64;

	/// Builds a history retaining at most `capacity` entries (minimum one).
	pub fn with_capacity(capacity: usize) -> Self {
		let capacity = capacity.max(1);

		Self { entries: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
	}

	/// Appends an entry, evicting the oldest one when full.
	pub fn record(&self, secret_name: impl Into<String>, success: bool) {
		let info = RotationInfo {
			secret_name: secret_name.into(),
			timestamp: OffsetDateTime::now_utc(),
			success,
		};
		let mut entries = self.entries.lock();

		if entries.len() == self.capacity {
			entries.pop_front();
		}

		entries.push_back(info);
	}

	/// Entries from oldest to newest.
	pub fn snapshot(&self) -> Vec<RotationInfo> {
		self.entries.lock().iter().cloned().collect()
	}

	/// Most recent entry for `secret_name`.
	pub fn last_for(&self, secret_name: &str) -> Option<RotationInfo> {
		self.entries.lock().iter().rev().find(|info| info.secret_name == secret_name).cloned()
	}

	/// Number of retained entries.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when nothing has been recorded.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.entries.lock().clear();
	}
}
impl Default for RotationHistory {
	fn default() -> Self {
		Self::with_capacity(Self::DEFAULT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn evicts_oldest_when_full() {
		let history = RotationHistory::with_capacity(2);

		history.record("A", true);
		history.record("B", false);
		history.record("C", true);

		let names = history.snapshot().into_iter().map(|info| info.secret_name).collect::<Vec<_>>();

		assert_eq!(names, ["B", "C"]);
	}

	#[test]
	fn last_for_returns_newest_attempt() {
		let history = RotationHistory::default();

		history.record("OPENAI_API_KEY", false);
		history.record("STRIPE_SECRET_KEY", true);
		history.record("OPENAI_API_KEY", true);

		let last = history.last_for("OPENAI_API_KEY").expect("Entry should be recorded.");

		assert!(last.success);
		assert_eq!(history.len(), 3);

		history.clear();

		assert!(history.is_empty());
	}
}
