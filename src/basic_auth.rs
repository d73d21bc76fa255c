use actix_web::{HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::BasicAuthConfig;

/// Returns true when no credentials are configured or the request carries matching ones.
pub fn check_basic_auth(req: &HttpRequest, config: Option<&BasicAuthConfig>) -> bool {
    let Some(config) = config else {
        return true;
    };

    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|credentials| {
            credentials
                .split_once(':')
                .map(|(user, pass)| user == config.username && pass == config.password)
        })
        .unwrap_or(false)
}

pub fn unauthorized_response() -> HttpResponse {
    HttpResponse::Unauthorized()
        .append_header(("WWW-Authenticate", r#"Basic realm="unfurler""#))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn auth() -> BasicAuthConfig {
        BasicAuthConfig {
            username: "ops".into(),
            password: "pw".into(),
        }
    }

    #[test]
    fn open_when_unconfigured() {
        let req = TestRequest::default().to_http_request();
        assert!(check_basic_auth(&req, None));
    }

    #[test]
    fn accepts_matching_credentials() {
        let header = format!("Basic {}", STANDARD.encode("ops:pw"));
        let req = TestRequest::default()
            .insert_header(("Authorization", header))
            .to_http_request();
        assert!(check_basic_auth(&req, Some(&auth())));
    }

    #[test]
    fn rejects_missing_or_wrong_credentials() {
        let req = TestRequest::default().to_http_request();
        assert!(!check_basic_auth(&req, Some(&auth())));

        let header = format!("Basic {}", STANDARD.encode("ops:nope"));
        let req = TestRequest::default()
            .insert_header(("Authorization", header))
            .to_http_request();
        assert!(!check_basic_auth(&req, Some(&auth())));
    }
}
