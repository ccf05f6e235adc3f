use actix_web::{HttpRequest, http};

/// Who is scanning, as far as the request tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

fn header(req: &HttpRequest, name: http::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Drop the IPv4-mapped IPv6 prefix so lookups and hashes see the plain address.
pub fn normalize_ip(ip: &str) -> String {
    let ip = ip.trim();
    ip.strip_prefix("::ffff:").unwrap_or(ip).to_string()
}

impl ClientInfo {
    pub fn from_request(req: &HttpRequest) -> Self {
        let ip = req
            .connection_info()
            .realip_remote_addr()
            .map(normalize_ip)
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            ip,
            user_agent: header(req, http::header::USER_AGENT),
            referer: header(req, http::header::REFERER),
        }
    }
}
