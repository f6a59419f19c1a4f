use crate::MAX_LAYER_COUNT;

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

/// One on/off state for each selected layer.
///
/// The bits are packed most-significant first: layer 0 of the selection is the highest bit, so the packed [`index`](Combination::index)
/// is the [`bitstring`](Combination::bitstring) read as a binary number. The bitstring is the artifact filename, so this order is a
/// file format contract rather than an internal detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combination {
	bits: u32,
	len: u8,
}

impl Combination {
	/// Builds the combination at `index` in counting order over `len` layers.
	///
	/// # Panics
	/// If `len` exceeds [`MAX_LAYER_COUNT`] or `index` doesn't fit in `len` bits.
	pub fn from_index(index: u32, len: usize) -> Self {
		assert!(len <= MAX_LAYER_COUNT, "A combination can address at most {MAX_LAYER_COUNT} layers, not {len}");
		assert!((index as u64) < (1_u64 << len), "Index {index} is out of range for {len} layers");

		Self { bits: index, len: len as u8 }
	}

	/// Builds a combination from per-layer visibility, in selection order.
	///
	/// # Panics
	/// If more than [`MAX_LAYER_COUNT`] states are given.
	pub fn from_states(states: &[bool]) -> Self {
		assert!(states.len() <= MAX_LAYER_COUNT, "A combination can address at most {MAX_LAYER_COUNT} layers, not {}", states.len());

		let bits = states.iter().fold(0, |bits, &visible| (bits << 1) | visible as u32);
		Self { bits, len: states.len() as u8 }
	}

	pub fn len(&self) -> usize {
		self.len as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// The position of this combination in counting order, which is also the bitstring read as a binary number.
	pub fn index(&self) -> u32 {
		self.bits
	}

	/// Whether the layer at `position` in the selection is shown. Out of range positions are never visible.
	pub fn is_visible(&self, position: usize) -> bool {
		position < self.len() && (self.bits >> (self.len() - 1 - position)) & 1 == 1
	}

	/// The per-layer visibility, in selection order.
	pub fn states(&self) -> impl Iterator<Item = bool> + '_ {
		(0..self.len()).map(|position| self.is_visible(position))
	}

	/// The `'0'`/`'1'` encoding used in artifact filenames, first selected layer first.
	pub fn bitstring(&self) -> String {
		self.states().map(|visible| if visible { '1' } else { '0' }).collect()
	}
}

impl fmt::Display for Combination {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.bitstring())
	}
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseCombinationError {
	#[error("A combination needs between 1 and {max} digits, but {0} were given", max = MAX_LAYER_COUNT)]
	Length(usize),
	#[error("Unexpected character {0:?}, only '0' and '1' are allowed")]
	Digit(char),
}

impl FromStr for Combination {
	type Err = ParseCombinationError;

	/// Parses a bitstring such as `"010110"`, for example the stem of an artifact filename.
	fn from_str(bitstring: &str) -> Result<Self, Self::Err> {
		let states = bitstring
			.chars()
			.map(|character| match character {
				'0' => Ok(false),
				'1' => Ok(true),
				other => Err(ParseCombinationError::Digit(other)),
			})
			.collect::<Result<Vec<_>, _>>()?;

		if states.is_empty() || states.len() > MAX_LAYER_COUNT {
			return Err(ParseCombinationError::Length(states.len()));
		}

		Ok(Self::from_states(&states))
	}
}

/// Every combination over a fixed number of layers, in counting order: all layers hidden first, all layers shown last.
///
/// Restart the sequence by cloning it before iterating or by calling [`combinations`] again.
#[derive(Clone, Debug)]
pub struct Combinations {
	len: usize,
	front: u64,
	back: u64,
}

/// The `2^len` combinations over `len` layers.
///
/// # Panics
/// If `len` exceeds [`MAX_LAYER_COUNT`].
pub fn combinations(len: usize) -> Combinations {
	assert!(len <= MAX_LAYER_COUNT, "Cannot enumerate combinations of {len} layers, the maximum is {MAX_LAYER_COUNT}");

	Combinations { len, front: 0, back: 1 << len }
}

impl Combinations {
	/// The number of layers each combination covers.
	pub fn layer_count(&self) -> usize {
		self.len
	}
}

impl Iterator for Combinations {
	type Item = Combination;

	fn next(&mut self) -> Option<Combination> {
		if self.front == self.back {
			return None;
		}
		let combination = Combination::from_index(self.front as u32, self.len);
		self.front += 1;
		Some(combination)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let remaining = (self.back - self.front) as usize;
		(remaining, Some(remaining))
	}
}

impl DoubleEndedIterator for Combinations {
	fn next_back(&mut self) -> Option<Combination> {
		if self.front == self.back {
			return None;
		}
		self.back -= 1;
		Some(Combination::from_index(self.back as u32, self.len))
	}
}

impl ExactSizeIterator for Combinations {}

impl FusedIterator for Combinations {}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use std::collections::HashSet;

	#[test]
	fn covers_the_whole_space_exactly_once() {
		for len in 1..=10 {
			let all = combinations(len).collect::<Vec<_>>();
			let distinct = all.iter().map(Combination::bitstring).collect::<HashSet<_>>();

			assert_eq!(all.len(), 1 << len);
			assert_eq!(distinct.len(), 1 << len);
			assert!(all.iter().all(|combination| combination.len() == len));
		}
	}

	#[test]
	fn counts_with_the_first_layer_as_the_most_significant_digit() {
		let order = combinations(3).map(|combination| combination.bitstring()).collect::<Vec<_>>();

		assert_eq!(order, ["000", "001", "010", "011", "100", "101", "110", "111"]);
	}

	#[test]
	fn is_restartable_and_sized() {
		let sequence = combinations(6);
		assert_eq!(sequence.len(), 64);
		assert_eq!(sequence.layer_count(), 6);

		let first_pass = sequence.clone().collect::<Vec<_>>();
		let second_pass = sequence.collect::<Vec<_>>();
		assert_eq!(first_pass, second_pass);
		assert_eq!(first_pass, combinations(6).collect::<Vec<_>>());
	}

	#[test]
	fn can_be_walked_from_both_ends() {
		let mut sequence = combinations(2);

		assert_eq!(sequence.next_back().map(|combination| combination.bitstring()).as_deref(), Some("11"));
		assert_eq!(sequence.next().map(|combination| combination.bitstring()).as_deref(), Some("00"));
		assert_eq!(sequence.len(), 2);
		assert_eq!(sequence.rev().map(|combination| combination.index()).collect::<Vec<_>>(), [2, 1]);
	}

	#[test]
	fn zero_layers_is_a_single_empty_combination() {
		let all = combinations(0).collect::<Vec<_>>();

		assert_eq!(all.len(), 1);
		assert!(all[0].is_empty());
		assert_eq!(all[0].bitstring(), "");
	}

	#[test]
	fn states_map_to_bits_in_selection_order() {
		let combination = Combination::from_states(&[true, false, true, false, true, false]);

		assert_eq!(combination.bitstring(), "101010");
		assert_eq!(combination.index(), 0b101010);
		assert!(combination.is_visible(0));
		assert!(!combination.is_visible(1));
		assert!(!combination.is_visible(6));
		assert_eq!(combination.states().collect::<Vec<_>>(), [true, false, true, false, true, false]);
		assert_eq!(combination, Combination::from_index(42, 6));
	}

	#[test]
	fn parses_bitstrings() {
		let combination = "010110".parse::<Combination>().unwrap();

		assert_eq!(combination.index(), 0b010110);
		assert_eq!(combination.len(), 6);
		assert_eq!(combination.to_string(), "010110");

		assert_eq!("01x".parse::<Combination>(), Err(ParseCombinationError::Digit('x')));
		assert_eq!("".parse::<Combination>(), Err(ParseCombinationError::Length(0)));
		assert_eq!("0".repeat(MAX_LAYER_COUNT + 1).parse::<Combination>(), Err(ParseCombinationError::Length(MAX_LAYER_COUNT + 1)));
	}

	#[test]
	#[should_panic]
	fn rejects_indices_wider_than_the_layer_count() {
		Combination::from_index(4, 2);
	}
}
