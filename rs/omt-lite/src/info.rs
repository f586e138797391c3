/// Optional description a sender publishes about itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SenderInfo {
	pub product_name: String,
	pub manufacturer: String,
	pub version: String,
}
