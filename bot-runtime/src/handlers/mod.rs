mod alert_notifier;
mod chat_id_command;

pub use alert_notifier::AlertNotifier;
pub use chat_id_command::ChatIdCommand;
