//! HTTP request handlers.

pub mod apps;
pub mod assets;
pub mod health;
pub mod manifest;
pub mod uploads;

pub use apps::{
    delete_app, get_app, get_certificate, list_apps, put_certificate, put_settings, register_app,
};
pub use assets::get_asset;
pub use health::health_info;
pub use manifest::get_manifest;
pub use uploads::{list_uploads, release_namespaced, release_upload, upload_bundle};
