pub mod credit;
pub mod entitlement;
pub mod generated_image;
pub mod generation_job;
pub mod status;
pub mod user;
pub mod whitelist;
