pub mod home_controller;
pub mod cron_controller;
