mod policy;
mod vehicle;

pub use policy::*;
pub use vehicle::*;

/// Fixed certificate file names inside a vehicle folder.
pub const SOA_FILENAME: &str = "soa.pdf";
pub const MERCOSUR_FILENAME: &str = "mercosur.pdf";

// Observations recorded on a policy (shown to end users).
pub const OBS_EXPIRED: &str = "Vencida";
pub const OBS_NOT_AUTOMOBILE: &str = "No es automóvil";
pub const OBS_LOGIN_EXPIRED: &str = "Login expirado";
pub const OBS_VOIDED: &str = "Anulada";
