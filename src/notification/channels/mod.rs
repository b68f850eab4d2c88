//! 具体渠道实现

pub mod telegram;
pub mod whatsapp;

pub use telegram::{TelegramConfig, TelegramSender};
pub use whatsapp::{WhatsAppConfig, WhatsAppSender};
