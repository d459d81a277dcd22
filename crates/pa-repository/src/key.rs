/// Normalizes a payer or medication name into its repository key form:
/// lower-cased with spaces replaced by underscores. Used both for the
/// repository's `(payer, medication, version)` key and for the on-disk
/// file-name scheme the pipeline reads from (§6).
pub fn normalize_key_part(raw: &str) -> String {
    raw.to_lowercase().replace(' ', "_")
}

pub const DEFAULT_VERSION: &str = "latest";
