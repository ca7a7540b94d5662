// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "TraceDeck";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "tracedeck";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".tracedeck";

/// Universal trace protocol version reported to clients
pub const PROTOCOL_VERSION: &str = "1.0";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tracedeck.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACEDECK_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "TRACEDECK_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "TRACEDECK_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRACEDECK_LOG";

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "TRACEDECK_DEBUG";

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "TRACEDECK_DATA_DIR";

/// Environment variable for store backend (sqlite or memory)
pub const ENV_STORE_BACKEND: &str = "TRACEDECK_STORE_BACKEND";

// =============================================================================
// Environment Variables - Ingestion
// =============================================================================

/// Environment variable for the metadata payload size ceiling (bytes)
pub const ENV_METADATA_MAX_BYTES: &str = "TRACEDECK_METADATA_MAX_BYTES";

/// Environment variable for the maximum traces per batch submission
pub const ENV_BATCH_MAX_TRACES: &str = "TRACEDECK_BATCH_MAX_TRACES";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5719;

/// Request body limit for submission endpoints (bytes)
pub const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

// =============================================================================
// Ingestion Defaults
// =============================================================================

/// Default metadata size ceiling before the validator flags payload bloat
pub const DEFAULT_METADATA_MAX_BYTES: usize = 64 * 1024;

/// Default maximum number of traces accepted in one batch
pub const DEFAULT_BATCH_MAX_TRACES: usize = 1_000;

/// Detection results below this confidence are logged as ambiguous
pub const DETECTION_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Upper bound on traces returned by session-state catch-up
pub const SESSION_STATE_MAX_TRACES: usize = 5_000;

// =============================================================================
// Shutdown
// =============================================================================

/// Seconds to wait for background tasks before giving up during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// SQLite
// =============================================================================

/// SQLite database file name
pub const SQLITE_DB_FILENAME: &str = "tracedeck.db";

/// Maximum SQLite pool connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;

/// SQLite cache size pragma (negative = KiB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL autocheckpoint pragma (pages)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";
