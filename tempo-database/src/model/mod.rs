pub mod activity;
pub mod slowmode;
