pub mod entity;
pub mod json_path;
pub mod migrations;
pub mod principals_repo;
pub mod record;

pub use principals_repo::SeaOrmPrincipalsRepository;
