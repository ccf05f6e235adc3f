pub mod analytics;
pub mod scan_request;
pub mod scan_response;
