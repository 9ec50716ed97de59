//! Repository trait definitions.

pub mod apps;
pub mod uploads;

pub use apps::AppRepo;
pub use uploads::UploadRepo;
