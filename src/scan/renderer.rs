//! Landing pages for scanned codes. Everything taken from a payload is escaped before it
//! is embedded, since anyone can create a code.

use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::qr_code::{QrCode, QrType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub title: String,
    pub body_html: String,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn content_box(heading: &str, inner: &str) -> String {
    format!("<div class=\"content-box\">\n<h3>{heading}</h3>\n{inner}\n</div>")
}

fn text_block(text: &str) -> String {
    format!("<div class=\"text-content\">{}</div>", escape_html(text))
}

fn raw_block(class: &str, text: &str) -> String {
    format!("<div class=\"{class}\"><pre>{}</pre></div>", escape_html(text))
}

fn field_list(fields: &[(&str, String)]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let mut html = String::from("<dl class=\"fields\">");
    for (label, value) in fields {
        let _ = write!(html, "<dt>{label}</dt><dd>{}</dd>", escape_html(value));
    }
    html.push_str("</dl>");
    html
}

fn instruction(text: &str) -> String {
    format!("<p class=\"instruction\">{text}</p>")
}

/// Bare `example.com/path` style text that reads as a web address.
fn looks_like_domain(text: &str) -> bool {
    let text = text.trim();
    text.contains('.')
        && !text.contains(char::is_whitespace)
        && !text.starts_with('.')
        && !text.contains("://")
        && !text.contains(':')
}

fn has_web_scheme(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Pull `KEY[;params]:value` lines out of vCard / iCalendar text.
fn content_lines(text: &str) -> impl Iterator<Item = (String, &str)> {
    text.lines().filter_map(|line| {
        let (name, value) = line.trim_end_matches('\r').split_once(':')?;
        let key = name.split(';').next().unwrap_or(name).trim().to_ascii_uppercase();
        Some((key, value.trim()))
    })
}

fn vcard_fields(text: &str) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    let mut has_full_name = false;
    for (key, value) in content_lines(text) {
        if value.is_empty() {
            continue;
        }
        let joined = || {
            value
                .split(';')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
        };
        match key.as_str() {
            "FN" => {
                has_full_name = true;
                fields.retain(|(label, _)| *label != "Name");
                fields.insert(0, ("Name", value.to_string()));
            }
            "N" if !has_full_name => {
                let mut parts = joined();
                // N is family;given;... so show given names first
                if parts.len() > 1 {
                    parts.rotate_left(1);
                }
                fields.insert(0, ("Name", parts.join(" ")));
                has_full_name = true;
            }
            "ORG" => fields.push(("Organization", joined().join(", "))),
            "TITLE" => fields.push(("Title", value.to_string())),
            "TEL" => fields.push(("Phone", value.to_string())),
            "EMAIL" => fields.push(("Email", value.to_string())),
            "ADR" => fields.push(("Address", joined().join(", "))),
            "URL" => fields.push(("Website", value.to_string())),
            _ => {}
        }
    }
    fields
}

/// Split `WIFI:T:WPA;S:name;P:pass;;` honouring backslash escapes.
fn wifi_fields(text: &str) -> Vec<(&'static str, String)> {
    let Some(body) = text.strip_prefix("WIFI:") else {
        return Vec::new();
    };
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }

    let mut fields = Vec::new();
    for part in parts {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        let label = match key {
            "S" => "Network",
            "T" => "Security",
            "P" => "Password",
            "H" => "Hidden",
            _ => continue,
        };
        if !value.is_empty() {
            fields.push((label, value.to_string()));
        }
    }
    fields
}

fn format_ical_time(value: &str) -> String {
    let (stamp, utc) = match value.strip_suffix('Z') {
        Some(stamp) => (stamp, true),
        None => (value, false),
    };
    if let Ok(datetime) = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S") {
        let formatted = datetime.format("%Y-%m-%d %H:%M").to_string();
        return if utc { format!("{formatted} UTC") } else { formatted };
    }
    if let Ok(date) = NaiveDate::parse_from_str(stamp, "%Y%m%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    value.to_string()
}

fn event_fields(text: &str) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    for (key, value) in content_lines(text) {
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "SUMMARY" => fields.insert(0, ("Event", value.to_string())),
            "DTSTART" => fields.push(("Starts", format_ical_time(value))),
            "DTEND" => fields.push(("Ends", format_ical_time(value))),
            "LOCATION" => fields.push(("Location", value.to_string())),
            "DESCRIPTION" => fields.push(("Details", value.replace("\\n", "\n"))),
            _ => {}
        }
    }
    fields
}

fn geo_coordinates(text: &str) -> Option<(String, String)> {
    let coords = text.strip_prefix("geo:")?;
    let coords = coords.split(['?', ';']).next().unwrap_or(coords);
    let mut parts = coords.split(',').map(str::trim);
    let pick = |part: Option<&str>| {
        part.filter(|p| !p.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    };
    let latitude = pick(parts.next());
    let longitude = pick(parts.next());
    Some((latitude, longitude))
}

fn render_fallback(text: &str) -> RenderedContent {
    if has_web_scheme(text) || looks_like_domain(text) {
        let href = if has_web_scheme(text) {
            text.to_string()
        } else {
            format!("https://{}", text.trim())
        };
        let link = format!(
            "<div class=\"url-content\"><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"action-link\">{}</a></div>",
            escape_html(&href),
            escape_html(text)
        );
        return RenderedContent {
            title: "Website".to_string(),
            body_html: content_box("🔗 Website", &link),
        };
    }
    RenderedContent {
        title: "QR Code Content".to_string(),
        body_html: content_box("📄 Content", &text_block(text)),
    }
}

/// Build the landing content for a code. Pure: the same code always renders the same bytes.
pub fn render(code: &QrCode) -> RenderedContent {
    let text = code.payload.as_str();
    let (title, heading, inner) = match code.content_type {
        QrType::Text => (
            "Text Message",
            "📝 Text Message",
            format!(
                "{}\n<button type=\"button\" class=\"action-link\" data-copy=\"{}\">📋 Copy Text</button>",
                text_block(text),
                escape_html(text)
            ),
        ),
        QrType::Vcard => (
            "Contact Information",
            "👤 Contact Information",
            format!(
                "{}\n{}\n{}",
                field_list(&vcard_fields(text)),
                raw_block("raw-content", text),
                instruction("Save this contact to your phone by scanning the QR code with your camera app.")
            ),
        ),
        QrType::Wifi => (
            "WiFi Network",
            "📶 WiFi Network",
            format!(
                "{}\n{}\n{}",
                field_list(&wifi_fields(text)),
                raw_block("raw-content", text),
                instruction("Connect to this WiFi network by scanning the QR code with your camera app.")
            ),
        ),
        QrType::Email if text.starts_with("mailto:") => {
            let address = text["mailto:".len()..].split('?').next().unwrap_or_default();
            (
                "Email",
                "✉️ Email",
                format!(
                    "{}\n<div class=\"email-content\"><a href=\"{}\" class=\"action-link\">Open Email</a></div>",
                    text_block(address),
                    escape_html(text)
                ),
            )
        }
        QrType::Email => ("Email", "✉️ Email", text_block(text)),
        QrType::Sms if text.starts_with("sms:") => (
            "SMS",
            "💬 SMS",
            format!(
                "<div class=\"sms-content\"><a href=\"{}\" class=\"action-link\">Send SMS</a></div>",
                escape_html(text)
            ),
        ),
        QrType::Sms => ("SMS", "💬 SMS", text_block(text)),
        QrType::Geo => match geo_coordinates(text) {
            Some((latitude, longitude)) => (
                "Location",
                "📍 Location",
                format!(
                    "<div class=\"geo-content\">\n<p>Latitude: {}</p>\n<p>Longitude: {}</p>\n<a href=\"{}\" class=\"action-link\">Open in Maps</a>\n</div>",
                    escape_html(&latitude),
                    escape_html(&longitude),
                    escape_html(text)
                ),
            ),
            None => ("Location", "📍 Location", text_block(text)),
        },
        QrType::Event => (
            "Calendar Event",
            "📅 Calendar Event",
            format!(
                "{}\n{}\n{}",
                field_list(&event_fields(text)),
                raw_block("raw-content", text),
                instruction("Add this event to your calendar by scanning the QR code with your camera app.")
            ),
        ),
        QrType::Url | QrType::Other => return render_fallback(text),
    };
    RenderedContent {
        title: title.to_string(),
        body_html: content_box(heading, &inner),
    }
}

/// Form shown for protected codes. Posts back to the verify endpoint as a form.
pub fn password_prompt(code_id: &str, tracking_id: Option<&str>, retry: bool) -> RenderedContent {
    let error = if retry {
        "<p class=\"error\">The password you entered is incorrect. Please try again.</p>\n"
    } else {
        ""
    };
    let tracking = tracking_id
        .map(|t| {
            format!(
                "<input type=\"hidden\" name=\"tracking_id\" value=\"{}\">\n",
                escape_html(t)
            )
        })
        .unwrap_or_default();
    let inner = format!(
        "<p>This QR code is password protected.</p>\n{error}<form method=\"post\" action=\"/scan/{}/verify-password\">\n{tracking}<input type=\"password\" name=\"password\" placeholder=\"Password\" required autofocus>\n<button type=\"submit\" class=\"action-link\">Unlock</button>\n</form>",
        escape_html(code_id)
    );
    RenderedContent {
        title: "Password Required".to_string(),
        body_html: content_box("🔒 Password Required", &inner),
    }
}

pub fn message_page(title: &str, message: &str) -> RenderedContent {
    RenderedContent {
        title: title.to_string(),
        body_html: content_box(
            &format!("⚠️ {}", escape_html(title)),
            &format!("<p>{}</p>", escape_html(message)),
        ),
    }
}

const PAGE_STYLE: &str = "body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;max-width:600px;margin:20px auto;padding:20px;background:#f5f5f5;line-height:1.6}\
.content-box{background:#fff;padding:30px;border-radius:12px;box-shadow:0 2px 10px rgba(0,0,0,.1);text-align:center}\
.text-content,.raw-content{background:#f8f9fa;padding:20px;border-radius:8px;margin:20px 0;word-break:break-word}\
.raw-content{text-align:left;font-family:monospace;font-size:14px;overflow-x:auto}\
.fields{text-align:left}.fields dt{font-weight:bold}.fields dd{margin:0 0 10px 0}\
.instruction{color:#666;font-style:italic}.error{color:#c0392b}\
.action-link{display:inline-block;background:#007bff;color:#fff;padding:12px 24px;text-decoration:none;border-radius:6px;margin:10px;border:none;cursor:pointer;font-size:16px}\
pre{white-space:pre-wrap;word-break:break-word}";

const COPY_SCRIPT: &str = "document.querySelectorAll('[data-copy]').forEach(function(b){b.addEventListener('click',function(){navigator.clipboard.writeText(b.dataset.copy).then(function(){alert('Text copied to clipboard!')},function(){alert('Unable to copy text')})})});";

/// Wrap rendered content into a complete HTML document.
pub fn landing_page(content: &RenderedContent) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n<style>{PAGE_STYLE}</style>\n</head>\n<body>\n{}\n<script>{COPY_SCRIPT}</script>\n</body>\n</html>\n",
        escape_html(&content.title),
        content.body_html
    )
}
