pub mod channel_check;
pub mod delivery;
