pub mod list;
pub mod nvme_cli;
pub mod smart_log;
