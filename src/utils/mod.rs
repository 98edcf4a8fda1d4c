pub mod card;
pub mod envelope;
pub mod format;
pub mod path;
pub mod validation;

// Export utilities that are used
pub use card::{format_card_number, mask_card_number, validate_card, CardBrand, CardValidation};
pub use envelope::{unwrap_data, unwrap_list};
pub use format::format_amount;
pub use path::{
    expand_path, format_path_for_display, get_config_dir, get_config_path, get_home_dir,
    get_log_dir, get_log_path, get_session_path,
};
pub use validation::{
    format_phone, format_rfc, validate_email, validate_password, validate_rfc, PasswordCheck,
};
