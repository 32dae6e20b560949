use super::UserAgentParser;
use crate::models::request::DeclaredIdentity;

/// Family reported when nothing recognisable is found.
pub const OTHER: &str = "Other";

/// Browser tokens in match order. Chromium derivatives carry a
/// `Chrome/` token too, so they must be tested before Chrome itself.
const BROWSERS: &[(&str, &str)] = &[
    ("edg/", "Edge"),
    ("edge/", "Edge"),
    ("edga/", "Edge"),
    ("edgios/", "Edge"),
    ("opr/", "Opera"),
    ("samsungbrowser/", "Samsung Internet"),
    ("yabrowser/", "Yandex Browser"),
    ("fxios/", "Firefox iOS"),
    ("firefox/", "Firefox"),
    ("crios/", "Chrome Mobile iOS"),
    ("chromium/", "Chromium"),
    ("headlesschrome/", "HeadlessChrome"),
    ("chrome/", "Chrome"),
    ("msie ", "IE"),
    ("curl/", "curl"),
    ("wget/", "Wget"),
    ("python-requests/", "Python Requests"),
    ("go-http-client/", "Go-http-client"),
];

/// OS markers in match order. Android UAs also say "Linux" and iOS UAs say
/// "like Mac OS X", so the specific ones come first.
const OPERATING_SYSTEMS: &[(&str, &str)] = &[
    ("windows phone", "Windows Phone"),
    ("windows", "Windows"),
    ("android", "Android"),
    ("iphone", "iOS"),
    ("ipad", "iOS"),
    ("ipod", "iOS"),
    ("cros ", "Chrome OS"),
    ("mac os x", "Mac OS X"),
    ("macintosh", "Mac OS X"),
    ("ubuntu", "Ubuntu"),
    ("fedora", "Fedora"),
    ("freebsd", "FreeBSD"),
    ("openbsd", "OpenBSD"),
    ("linux", "Linux"),
];

/// Substring-based User-Agent parser producing ua-parser style family names.
pub struct BuiltinUaParser {}

impl BuiltinUaParser {
    pub fn new() -> Self {
        Self {}
    }

    fn browser(&self, lower: &str) -> (String, String) {
        for (token, family) in BROWSERS {
            if let Some(pos) = lower.find(token) {
                let version = leading_digits(&lower[pos + token.len()..]);
                return ((*family).to_string(), version);
            }
        }

        // IE 11 dropped the MSIE token
        if lower.contains("trident/") {
            if let Some(pos) = lower.find("rv:") {
                return ("IE".to_string(), leading_digits(&lower[pos + 3..]));
            }
        }

        // Safari keeps its marketing version in Version/x.y
        if lower.contains("safari/") {
            if let Some(pos) = lower.find("version/") {
                let family = if lower.contains("mobile") { "Mobile Safari" } else { "Safari" };
                return (family.to_string(), leading_digits(&lower[pos + 8..]));
            }
        }

        (OTHER.to_string(), String::new())
    }

    fn os(&self, lower: &str) -> String {
        OPERATING_SYSTEMS
            .iter()
            .find(|(marker, _)| lower.contains(marker))
            .map(|(_, family)| (*family).to_string())
            .unwrap_or_else(|| OTHER.to_string())
    }
}

impl Default for BuiltinUaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentParser for BuiltinUaParser {
    fn parse(&self, raw: &str) -> DeclaredIdentity {
        let lower = raw.to_lowercase();
        let (browser_family, browser_major_version) = self.browser(&lower);
        DeclaredIdentity {
            browser_family,
            browser_major_version,
            os_family: self.os(&lower),
        }
    }
}

fn leading_digits(s: &str) -> String {
    s.chars().take_while(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ua: &str) -> DeclaredIdentity {
        BuiltinUaParser::new().parse(ua)
    }

    #[test]
    fn test_chrome_on_windows() {
        let id = parse("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36");
        assert_eq!(id, DeclaredIdentity::new("Chrome", "120", "Windows"));
    }

    #[test]
    fn test_firefox_on_ubuntu() {
        let id = parse("Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0");
        assert_eq!(id, DeclaredIdentity::new("Firefox", "121", "Ubuntu"));
    }

    #[test]
    fn test_safari_on_mac() {
        let id = parse("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15");
        assert_eq!(id, DeclaredIdentity::new("Safari", "17", "Mac OS X"));
    }

    #[test]
    fn test_mobile_safari_on_iphone() {
        let id = parse("Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1");
        assert_eq!(id, DeclaredIdentity::new("Mobile Safari", "17", "iOS"));
    }

    #[test]
    fn test_edge_before_chrome() {
        let id = parse("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91");
        assert_eq!(id.browser_family, "Edge");
        assert_eq!(id.browser_major_version, "120");
    }

    #[test]
    fn test_chrome_on_android() {
        let id = parse("Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.6045.163 Mobile Safari/537.36");
        assert_eq!(id, DeclaredIdentity::new("Chrome", "119", "Android"));
    }

    #[test]
    fn test_ie11() {
        let id = parse("Mozilla/5.0 (Windows NT 6.1; Trident/7.0; rv:11.0) like Gecko");
        assert_eq!(id, DeclaredIdentity::new("IE", "11", "Windows"));
    }

    #[test]
    fn test_garbage_yields_other() {
        let id = parse("}{!!");
        assert_eq!(id.browser_family, OTHER);
        assert_eq!(id.browser_major_version, "");
        assert_eq!(id.os_family, OTHER);
        assert_eq!(id.major_version(), None);
    }

    #[test]
    fn test_tool_without_version() {
        let id = parse("curl/");
        assert_eq!(id.browser_family, "curl");
        assert_eq!(id.major_version(), None);
    }
}
