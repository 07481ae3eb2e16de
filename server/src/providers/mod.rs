pub mod base;
pub mod bse;
pub mod registry;
pub mod sancor;
pub mod sura;

pub use base::CompanyAdapter;
pub use registry::ProviderRegistry;
