//! Coarse robots.txt scan
//!
//! This is not a directive parser. It only looks for a blanket
//! `Disallow: /` line and a `User-agent` line naming either `*` or the
//! caller's own agent token anywhere in the file. Group scoping is ignored,
//! so rules written in other forms are missed.

/// Returns the caller's agent token: the product name before the first `/` or space
///
/// `"SumiHarvest/1.0 (+https://example.com)"` yields `"sumiharvest"`.
pub fn agent_token(user_agent: &str) -> String {
    user_agent
        .trim()
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Lowercases a line, drops `#` comments and removes all whitespace
fn squash(line: &str) -> String {
    let line = line.split('#').next().unwrap_or_default();
    line.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Checks a robots.txt body for a disallow-all rule aimed at `*` or at `user_agent`
pub fn has_blanket_disallow(body: &str, user_agent: &str) -> bool {
    let lines: Vec<String> = body.lines().map(squash).collect();

    let disallows_everything = lines.iter().any(|l| l == "disallow:/");
    if !disallows_everything {
        return false;
    }

    let token = agent_token(user_agent);
    let full_agent: String = user_agent
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    lines.iter().any(|l| match l.strip_prefix("user-agent:") {
        Some(agent) => {
            agent == "*" || (!token.is_empty() && agent == token) || agent == full_agent
        }
        None => false,
    })
}
