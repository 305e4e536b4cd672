// Infra implementations of the verification ports: challenge storage plus
// the email and SMS delivery providers.

pub mod in_memory;
pub mod mail_client;
pub mod twilio_client;

pub use in_memory::InMemoryChallengeStore;
pub use mail_client::HttpMailClient;
pub use twilio_client::TwilioSmsClient;
