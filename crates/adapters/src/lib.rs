pub mod export;
pub mod history;
pub mod mysql;
pub mod result_store;

pub use mysql::MysqlExecutionBackend;
