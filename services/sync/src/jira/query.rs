use chrono::{DateTime, Utc};

/// Build the JQL for a project's issue sync, optionally bounded by an
/// update-time floor.
///
/// Generates: `project = KEY [AND updated >= "2026-02-15 00:00"] ORDER BY updated ASC`
pub fn build_issue_sync_jql(project_key: &str, updated_after: Option<DateTime<Utc>>) -> String {
    let mut jql = format!("project = {}", escape_jql_value(project_key));
    if let Some(after) = updated_after {
        jql.push_str(&format!(
            " AND updated >= \"{}\"",
            after.format("%Y-%m-%d %H:%M")
        ));
    }
    jql.push_str(" ORDER BY updated ASC");
    jql
}

/// JQL for counting a project's issues, optionally restricted to a status.
pub fn build_issue_count_jql(project_key: &str, status: Option<&str>) -> String {
    let mut jql = format!("project = {}", escape_jql_value(project_key));
    if let Some(status) = status {
        jql.push_str(&format!(" AND status = {}", escape_jql_value(status)));
    }
    jql
}

/// JQL that surfaces the most recently updated issue first.
pub fn build_last_update_jql(project_key: &str) -> String {
    format!(
        "project = {} ORDER BY updated DESC",
        escape_jql_value(project_key)
    )
}

/// Escape a JQL value: wrap in quotes if it contains special characters.
fn escape_jql_value(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
