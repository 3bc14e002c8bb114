use reqwest::Url;

/// Parse "true"/"false"/"1"/"0" style flags from an env var value.
pub fn parse_bool_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read an env var, treating unset and whitespace-only values the same.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host.trim().to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "::1"
                || normalized == "[::1]"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}

/// Normalize a POSIX locale value ("en_US.UTF-8") into a BCP-47-ish tag ("en-US").
pub fn normalize_locale(raw: &str) -> Option<String> {
    let stripped = raw.split(['.', '@']).next().unwrap_or("").trim();
    if stripped.is_empty()
        || stripped.eq_ignore_ascii_case("c")
        || stripped.eq_ignore_ascii_case("posix")
    {
        return None;
    }
    Some(stripped.replace('_', "-"))
}
