pub mod client_info;
pub mod geo;
pub mod hash_ip;
pub mod jwt;
