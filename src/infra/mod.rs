pub mod aws_stores;
pub mod notify_client;
