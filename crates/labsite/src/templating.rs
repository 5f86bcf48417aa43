use maud::{DOCTYPE, PreEscaped, html};

/// A page that sends the visitor to `target` straight away, through both a script and a meta refresh.
pub fn redirect_page(target: &str) -> String {
    // JSON string literals are valid JS string literals; `</` is escaped so the URL can't close the script tag.
    let target_literal = serde_json::to_string(target)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace("</", "<\\/");

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Redirecting…" }
                meta http-equiv="refresh" content=(format!("0; url={}", target));
                link rel="canonical" href=(target);
                script {
                    (PreEscaped(format!("window.location.replace({});", target_literal)))
                }
            }
            body {
                p {
                    "Redirecting to "
                    a href=(target) { (target) }
                    "…"
                }
            }
        }
    }
    .into_string()
}
