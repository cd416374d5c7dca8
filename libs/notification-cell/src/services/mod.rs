pub mod mailer;
pub mod notify;

pub use mailer::MailerClient;
pub use notify::NotificationService;
