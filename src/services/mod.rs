pub mod admin_service;
pub mod balance_service;
pub mod flow_service;
pub mod permission_service;
pub mod rate_service;
pub mod referral_service;
pub mod review_service;
pub mod submission_service;
pub mod transaction_service;
pub mod user_service;
