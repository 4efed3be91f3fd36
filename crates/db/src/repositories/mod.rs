pub mod credit_repo;
pub mod entitlement_repo;
pub mod generated_image_repo;
pub mod generation_job_repo;
pub mod user_repo;
pub mod whitelist_repo;

pub use credit_repo::CreditRepo;
pub use entitlement_repo::EntitlementRepo;
pub use generated_image_repo::GeneratedImageRepo;
pub use generation_job_repo::GenerationJobRepo;
pub use user_repo::UserRepo;
pub use whitelist_repo::WhitelistRepo;
