pub mod admin_service;
pub mod animation_service;
pub mod broadcast_service;
pub mod gate_service;
pub mod referral_service;
pub mod wizard_service;
