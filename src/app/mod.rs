pub mod config_resolver;
pub mod ports;
pub mod retry_queue;
pub mod sms_use_case;
pub mod stats_use_case;
