use uuid::Uuid;

use crate::domain::entities::{plan::Plan, subscription::SubscriptionStatus};

const BRAND_NAME: &str = "dosetrack";

/// Minimal escaping for user-supplied text placed into HTML.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn plan_label(plan: Option<&Plan>) -> String {
    plan.map(|p| format!("{} ({})", p.name, p.id))
        .unwrap_or_else(|| "none".to_string())
}

fn row(label: &str, value: &str) -> String {
    format!(
        r#"<tr><td style="padding:4px 12px 4px 0;color:#6b7280;">{label}</td><td style="padding:4px 0;color:#111827;">{value}</td></tr>"#
    )
}

/// Internal notification for support; returns (subject, html).
pub fn plan_change_request_email(
    user_id: Uuid,
    user_email: Option<&str>,
    status: Option<SubscriptionStatus>,
    current_plan: Option<&Plan>,
    requested_plan: Option<&Plan>,
    message: &str,
) -> (String, String) {
    let subject = match requested_plan {
        Some(plan) => format!("Plan change request: {}", plan.name),
        None => "Plan change request".to_string(),
    };

    let email = user_email
        .map(escape_html)
        .unwrap_or_else(|| "unknown".to_string());
    let status = status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no subscription".to_string());
    let message = escape_html(message).replace('\n', "<br>");

    let rows = [
        row("User", &user_id.to_string()),
        row("Email", &email),
        row("Status", &status),
        row("Current plan", &escape_html(&plan_label(current_plan))),
        row("Requested plan", &escape_html(&plan_label(requested_plan))),
    ]
    .join("");

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <body style="background:#f8fafc;margin:0;padding:24px;font-family:Arial,Helvetica,sans-serif;">
    <div style="max-width:560px;margin:0 auto;background:#ffffff;border:1px solid #e5e7eb;border-radius:12px;padding:24px;">
      <div style="font-size:12px;letter-spacing:0.08em;text-transform:uppercase;color:#6b7280;">{BRAND_NAME} billing</div>
      <h1 style="margin:12px 0 8px;font-size:20px;color:#111827;">{subject}</h1>
      <table style="font-size:14px;border-collapse:collapse;">{rows}</table>
      <p style="margin:16px 0 0;font-size:15px;color:#111827;line-height:1.6;">{message}</p>
    </div>
  </body>
</html>
"#,
        subject = escape_html(&subject),
    );

    (subject, html)
}
