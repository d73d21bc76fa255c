pub mod metrics_service;
