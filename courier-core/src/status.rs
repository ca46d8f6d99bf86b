//! Human-readable descriptions for failed response status codes.

/// Map a failure status code to the message shown to end users.
///
/// Known codes get a specific description; anything else falls back to a
/// generic message that still carries the numeric code.
pub fn translate(status: u16) -> String {
    match describe(status) {
        Some(desc) => format!("{desc}，请检查网络或联系管理员！"),
        None => format!("连接出错{status}，请检查网络或联系管理员！"),
    }
}

fn describe(status: u16) -> Option<&'static str> {
    let desc = match status {
        400 => "请求错误(400)",
        401 => "未授权，请重新登录(401)",
        402 => "拒绝访问(402)",
        404 => "请求出错(404)",
        408 => "请求超时(408)",
        500 => "服务器错误(500)",
        501 => "服务未实现(501)",
        502 => "网络错误(502)",
        503 => "服务不可用(503)",
        504 => "网络超时(504)",
        505 => "HTTP版本不受支持(505)",
        _ => return None,
    };
    Some(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_uses_mapped_message() {
        assert_eq!(translate(404), "请求出错(404)，请检查网络或联系管理员！");
        assert_eq!(
            translate(401),
            "未授权，请重新登录(401)，请检查网络或联系管理员！"
        );
    }

    #[test]
    fn unknown_code_falls_back_with_number() {
        let msg = translate(999);
        assert!(msg.contains("999"));
        assert_eq!(msg, "连接出错999，请检查网络或联系管理员！");
    }

    #[test]
    fn every_known_code_mentions_itself() {
        for code in [400, 401, 402, 404, 408, 500, 501, 502, 503, 504, 505] {
            let msg = translate(code);
            assert!(msg.contains(&format!("({code})")), "{code}: {msg}");
            assert!(!msg.starts_with("连接出错"));
        }
    }
}
