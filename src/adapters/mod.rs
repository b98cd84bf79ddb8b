// Adapters layer: concrete implementations of the domain ports (HTTP APIs, storage).

pub mod connectsafely;
pub mod google_auth;
pub mod google_sheets;
pub mod json_export;
pub mod storage;
