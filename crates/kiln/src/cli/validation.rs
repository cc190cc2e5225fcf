/// Parse and validate a `--host` value.
///
/// Accepts IP addresses and host names made of letters, digits, dots and
/// hyphens. Resolution happens later, when the server binds.
///
/// # Errors
///
/// Returns an error message if the value cannot be a host.
pub fn parse_host(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("Host cannot be empty".to_string());
    }

    if s.parse::<std::net::IpAddr>().is_ok() {
        return Ok(s.to_string());
    }

    let valid = s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid || s.starts_with('-') || s.starts_with('.') {
        return Err(format!(
            "Host must be an IP address or a host name such as localhost: '{}'",
            s
        ));
    }

    Ok(s.to_string())
}
