pub mod channel;
pub mod dispatcher;
pub mod email;
pub mod slack;

pub use channel::{LeadMessage, NotifyChannel};
pub use dispatcher::Dispatcher;
pub use email::EmailChannel;
pub use slack::SlackChannel;
