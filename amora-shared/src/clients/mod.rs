pub mod db;
pub mod redis;
pub mod email;
pub mod minio;
