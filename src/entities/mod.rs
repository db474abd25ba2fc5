// Entity Directories
// Closed sets of merchants and locations the synthesizer draws from.
// Each directory owns one sentinel value that always trips a risk rule.

pub mod location;
pub mod merchant;

pub use location::LocationDirectory;
pub use merchant::MerchantDirectory;
