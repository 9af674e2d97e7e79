pub mod confirm_dialog;
pub mod empty_state;
pub mod image_viewer;
pub mod navbar;
pub mod results_sidebar;
pub mod server_settings;
pub mod sign_in;
pub mod upload_dialog;
