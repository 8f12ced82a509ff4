pub mod ingestion_service;
pub mod monitor_service;
pub mod persistence_service;
pub mod recovery_service;
pub mod sol_price_service;

pub use ingestion_service::IngestionService;
pub use monitor_service::MonitorService;
pub use persistence_service::PersistenceService;
pub use recovery_service::RecoveryService;
pub use sol_price_service::SolPriceService;
