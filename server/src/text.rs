//! Flattening of scraped HTML into one text line per table row.

const BLOCK_TAGS: [&str; 14] = [
    "br", "p", "div", "tr", "li", "ul", "ol", "table", "thead", "tbody", "h1", "h2", "h3", "h4",
];

const SKIPPED_TAGS: [&str; 2] = ["script", "style"];

pub fn looks_like_html(s: &str) -> bool {
    let head: String = s.trim_start().chars().take(512).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype")
        || head.starts_with("<html")
        || ["<table", "<tr", "<td", "<br", "<div", "<body"]
            .iter()
            .any(|tag| s.to_ascii_lowercase().contains(tag))
}

/// Plain text for the parsing strategies. Markdown and plain text pass
/// through untouched.
pub fn to_plain_text(raw: &str) -> String {
    if !looks_like_html(raw) {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut tag = String::new();
    let mut in_tag = false;
    let mut skipping: Option<&str> = None;

    for ch in raw.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let (name, closing) = tag_name(&tag);
                if let Some(skipped) = skipping {
                    if closing && name == skipped {
                        skipping = None;
                    }
                    continue;
                }
                if !closing {
                    if let Some(skipped) = SKIPPED_TAGS.iter().find(|t| **t == name) {
                        skipping = Some(*skipped);
                        continue;
                    }
                }
                if BLOCK_TAGS.contains(&name.as_str()) {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            _ if in_tag => tag.push(ch),
            _ if skipping.is_some() => {}
            _ => out.push(ch),
        }
    }

    decode_entities(&out)
        .lines()
        .map(normalize_ws)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn tag_name(tag: &str) -> (String, bool) {
    let tag = tag.trim();
    let closing = tag.starts_with('/');
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    (name, closing)
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&deg;", "°")
        .replace("&#176;", "°")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_passes_through() {
        let md = "| Data | Ora |\n|---|---|\n| 17/07/2025 | 11:27 |";
        assert_eq!(to_plain_text(md), md);
    }

    #[test]
    fn test_table_rows_become_lines() {
        let html = r#"<html><body><table>
            <tr><th>Data</th><th>Ora</th></tr>
            <tr><td>17/07/2025</td><td>11:27</td><td>6 nodi</td><td>7&nbsp;nodi</td><td>9 nodi</td><td>ENE</td><td>67</td><td>30&deg;C</td></tr>
            <tr><td>17/07/2025</td><td>11:17</td><td>5 nodi</td><td>6 nodi</td><td>8 nodi</td><td>NE</td><td>45</td><td>29&#176;C</td></tr>
        </table></body></html>"#;

        let text = to_plain_text(html);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Data Ora",
                "17/07/2025 11:27 6 nodi 7 nodi 9 nodi ENE 67 30°C",
                "17/07/2025 11:17 5 nodi 6 nodi 8 nodi NE 45 29°C",
            ]
        );
    }

    #[test]
    fn test_scripts_and_styles_are_dropped() {
        let html = "<html><head><style>td { color: red; }</style><script>var x = '<b>';</script></head><body>vento<br/>calmo</body></html>";
        assert_eq!(to_plain_text(html), "vento\ncalmo");
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(tag_name("td class=\"x\""), ("td".to_string(), false));
        assert_eq!(tag_name("/TR"), ("tr".to_string(), true));
        assert_eq!(tag_name("br/"), ("br".to_string(), false));
    }
}
