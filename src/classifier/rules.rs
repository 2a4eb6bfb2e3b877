//! Keyword rules per fix category
//!
//! Each category has a message rule and a code rule. The message rule looks
//! at the commit message, the code rule at the lines the commit added or
//! removed. A category applies when either rule matches.

use regex::Regex;
use std::sync::OnceLock;

use super::FixCategory;

pub(super) struct Rule {
    pub category: FixCategory,
    pub message: Regex,
    pub code: Option<Regex>,
}

fn rule(category: FixCategory, message: &str, code: Option<&str>) -> Rule {
    Rule {
        category,
        message: Regex::new(&format!("(?i){}", message)).expect("valid regex"),
        code: code.map(|c| Regex::new(c).expect("valid regex")),
    }
}

pub(super) fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            rule(
                FixCategory::Conditional,
                r"\b(condition(al)?s?|when clause|if statement|check(s|ing)? (for|if))\b",
                Some(r"^\s*-?\s*(when|failed_when|changed_when|until|unless)\s*:|\{%-?\s*(if|elif)\b"),
            ),
            rule(
                FixCategory::ConfigurationData,
                r"\b(config(uration)?|value|default|variable|var|port|path|url|hostname|ip address|version)s?\b",
                Some(r#"^\s*-?\s*[A-Za-z_][\w.-]*\s*:\s*["']?([0-9][\w.:/-]*|/[\w./-]+|https?://\S+)["']?\s*$"#),
            ),
            rule(
                FixCategory::Dependency,
                r"\b(depend(s|ency|encies)?|include[sd]?|import(s|ed)?|requirements?|galaxy|module)\b",
                Some(r"^\s*-?\s*(include|include_tasks|include_role|import_tasks|import_role|import_playbook|dependencies|roles|require)\s*:"),
            ),
            rule(
                FixCategory::Documentation,
                r"\b(doc(s|umentation)?|readme|comments?|changelog|typo in (doc|readme|comment))\b",
                Some(r"^\s*#"),
            ),
            rule(
                FixCategory::Idempotency,
                r"\b(idempot\w*|re-?run|changed state|always changed)\b",
                Some(r"^\s*-?\s*(changed_when|creates|removes|force)\s*:"),
            ),
            rule(
                FixCategory::Security,
                r"\b(secur\w*|password|passwd|ssl|tls|vulnerab\w*|cve|permissions?|secrets?|tokens?|encrypt\w*|ssh key|sudo)\b",
                Some(r"^\s*-?\s*(mode|owner|password|become|become_user|no_log|validate_certs)\s*:"),
            ),
            rule(
                FixCategory::Service,
                r"\b(services?|restart(s|ed)?|daemon|systemd|handlers?|reload)\b",
                Some(r"^\s*-?\s*(service|systemd|notify|listen)\s*:|state\s*[:=]\s*(started|stopped|restarted|reloaded)"),
            ),
            rule(
                FixCategory::Syntax,
                r"\b(syntax|indent(ation)?|yaml|lint|quot(e|es|ing)|whitespace|parse error)\b",
                None,
            ),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_rule() {
        let categories: Vec<FixCategory> = rules().iter().map(|r| r.category).collect();
        assert_eq!(categories, FixCategory::ALL.to_vec());
    }
}
