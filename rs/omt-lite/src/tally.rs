/// Tally state of a source: whether it is live on preview and/or program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tally {
	pub preview: bool,
	pub program: bool,
}

impl Tally {
	pub fn new(preview: bool, program: bool) -> Self {
		Self { preview, program }
	}

	/// Combine the tally of several receivers: any receiver on air puts the source on air.
	pub fn merge(self, other: Tally) -> Tally {
		Tally {
			preview: self.preview || other.preview,
			program: self.program || other.program,
		}
	}
}

impl FromIterator<Tally> for Tally {
	fn from_iter<I: IntoIterator<Item = Tally>>(iter: I) -> Self {
		iter.into_iter().fold(Tally::default(), Tally::merge)
	}
}
