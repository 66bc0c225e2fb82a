// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "flowgate";

// =============================================================================
// Configuration Files
// =============================================================================

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "FLOWGATE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "FLOWGATE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "FLOWGATE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "FLOWGATE_LOG";

/// Environment variable for demo data seeding
pub const ENV_DEMO_DATA: &str = "FLOWGATE_DEMO_DATA";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5480;
