/// Embedded-data key holding the opportunity's display name.
pub const EMBEDDED_DISPLAY_NAME_KEY: &str = "nome";

/// Embedded-data key holding the contact email.
pub const EMBEDDED_EMAIL_KEY: &str = "email";

/// Embedded-data key that carried the lead id before the relational
/// `lead_master_id` column existed.
pub const EMBEDDED_LEGACY_LEAD_KEY: &str = "lead_id";

/// Default bound for a single store lookup.
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;

/// Default bound for a single opportunity write.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Env var overriding the lookup timeout (milliseconds).
pub const LOOKUP_TIMEOUT_ENV: &str = "LEADSYNC_LOOKUP_TIMEOUT_MS";

/// Env var overriding the write timeout (milliseconds).
pub const WRITE_TIMEOUT_ENV: &str = "LEADSYNC_WRITE_TIMEOUT_MS";
