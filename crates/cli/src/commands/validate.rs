use std::path::Path;

use spendgate_core::rules::validation::{validate_rule, IssueLocation, ValidationReport};

use crate::commands::{load_inputs, CommandResult, EXIT_VALIDATION};

pub fn run(draft: &Path) -> CommandResult {
    let (rule, _) = match load_inputs("validate", draft, None) {
        Ok(inputs) => inputs,
        Err(result) => return result,
    };

    let report = validate_rule(&rule);
    if report.is_valid() {
        let groups = rule.rules.len();
        return CommandResult::success(
            "validate",
            format!("policy `{}` is valid ({groups} rule group(s))", rule.name.trim()),
        );
    }

    CommandResult::failure("validate", "validation", render_issues(&report), EXIT_VALIDATION)
}

pub(crate) fn render_issues(report: &ValidationReport) -> String {
    let mut lines = vec![format!("{} issue(s) found:", report.issues.len())];
    lines.extend(report.issues.iter().map(|issue| {
        format!("- {}: {}", location_label(&issue.location), issue.message)
    }));
    lines.join("\n")
}

fn location_label(location: &IssueLocation) -> String {
    match location {
        IssueLocation::Rule => "policy".to_string(),
        IssueLocation::Group { group } => format!("rule {}", group + 1),
        IssueLocation::Condition { group, condition } => {
            format!("rule {} condition {}", group + 1, condition + 1)
        }
        IssueLocation::Action { group, action } => {
            format!("rule {} action {}", group + 1, action + 1)
        }
    }
}
