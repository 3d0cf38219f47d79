use std::path::Path;

/// Loads `.env` from the crate directory, then from the working directory.
/// Variables already set in the process environment win.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/.env")));
    dotenvy::dotenv().ok();
}
