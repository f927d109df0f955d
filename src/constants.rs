//! Application constants for the geocode preparation tool
//!
//! Raw file names, raw column names, artifact names and default locations
//! shared by the loaders, the serializer and the CLI.

// =============================================================================
// Default Locations
// =============================================================================

/// Directory holding the raw reference snapshots
pub const DEFAULT_RAW_DIR: &str = "/data/raw/chorus-dt";

/// Directory receiving the prepared lookup artifacts
pub const DEFAULT_PREPARED_DIR: &str = "/data/prepared";

/// Cleaned emissions dataset read by the structure data reader
pub const DEFAULT_EMISSIONS_DATA: &str = "/data/cleaned/data_osfi.csv";

/// Upper bound on the default worker count (one worker per source)
pub const MAX_DEFAULT_WORKERS: usize = 4;

// =============================================================================
// Canonical Columns
// =============================================================================

/// Canonical latitude field in every lookup artifact
pub const LAT: &str = "lat";

/// Canonical longitude field in every lookup artifact
pub const LON: &str = "lon";

/// Key column of parquet artifacts
pub const CODE: &str = "code";

// =============================================================================
// Raw Sources
// =============================================================================

/// La Poste postal code registry (INSEE commune codes)
pub mod insee {
    pub const FILE_NAME: &str = "laposte_hexasmal.csv";
    pub const ARTIFACT: &str = "insee_codes";
    pub const CODE_COLUMN: &str = "Code_commune_INSEE";
    pub const GPS_COLUMN: &str = "coordonnees_gps";
}

/// SNCF station list (UIC codes)
pub mod uic {
    pub const FILE_NAME: &str = "liste-des-gares.csv";
    pub const ARTIFACT: &str = "uic_codes";
    pub const CODE_COLUMN: &str = "CODE_UIC";
    pub const GEO_COLUMN: &str = "C_GEO";
    pub const X_COLUMN: &str = "X_WGS84";
    pub const Y_COLUMN: &str = "Y_WGS84";
}

/// SNCF passenger station referential (TVS codes)
pub mod tvs {
    pub const FILE_NAME: &str = "referentiel-gares-voyageurs.csv";
    pub const ARTIFACT: &str = "tvs_codes";
    pub const CODE_COLUMN: &str = "TVS";
    pub const GPS_COLUMN: &str = "WGS 84";
    /// Prefix used for rail locations in the travel dataset
    pub const KEY_PREFIX: &str = "TR_FR";
}

/// OurAirports registry (IATA codes)
pub mod iata {
    pub const FILE_NAME: &str = "airports.csv";
    pub const ARTIFACT: &str = "iata_codes";
    pub const CODE_COLUMN: &str = "iata_code";
    pub const LAT_COLUMN: &str = "latitude_deg";
    pub const LON_COLUMN: &str = "longitude_deg";
}

// =============================================================================
// Emissions Dataset
// =============================================================================

/// Columns of the cleaned emissions dataset
pub mod emissions {
    pub const STRUCTURE_ID: &str = "id";
    pub const YEAR: &str = "Année";
}
