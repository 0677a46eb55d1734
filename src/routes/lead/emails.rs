//! src/routes/lead/emails.rs

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::LeadSubmission;

pub struct ComposedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Escapes text for interpolation into HTML element content and quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

pub fn sales_notification(lead: &LeadSubmission, received_at: DateTime<Utc>) -> ComposedEmail {
    let full_name = lead.full_name();
    let subject = match &lead.model_code {
        Some(model) => format!("New lead: {} ({}) - {}", full_name, lead.company, model),
        None => format!("New lead: {} ({})", full_name, lead.company),
    };
    let received_at = received_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    let rows: [(&str, &str); 9] = [
        ("Name", full_name.as_str()),
        ("Company", lead.company.as_ref()),
        ("Email", lead.email.as_ref()),
        ("Phone", or_dash(&lead.phone)),
        ("Model", or_dash(&lead.model_code)),
        ("Source", or_dash(&lead.source)),
        ("Page", or_dash(&lead.page)),
        ("Variant", or_dash(&lead.variant)),
        ("User agent", or_dash(&lead.user_agent)),
    ];

    let mut text = String::from("New lead submitted from the website.\n\n");
    for (label, value) in rows {
        text.push_str(&format!("{}: {}\n", label, value));
    }
    text.push_str(&format!("\nMessage:\n{}\n", or_dash(&lead.message)));
    text.push_str(&format!("\nReceived at: {}\n", received_at));

    let mut html = String::from("<h2>New lead submitted from the website</h2>\n<table>\n");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>\n",
            label,
            escape_html(value)
        ));
    }
    html.push_str("</table>\n");
    let message = escape_html(or_dash(&lead.message)).replace('\n', "<br />");
    html.push_str(&format!("<h3>Message</h3>\n<p>{}</p>\n", message));
    html.push_str(&format!("<p><small>Received at {}</small></p>", received_at));

    ComposedEmail { subject, text, html }
}

pub fn acknowledgment(lead: &LeadSubmission) -> ComposedEmail {
    let subject = "Thanks for contacting us".to_string();
    let text = format!(
        "Hi {},\n\n\
        Thanks for reaching out. We received your request and a member of our \
        sales team will contact you shortly.\n\n\
        Best regards,\nThe Sales Team\n",
        lead.first_name
    );
    let html = format!(
        "<p>Hi {},</p>\
        <p>Thanks for reaching out. We received your request and a member of our \
        sales team will contact you shortly.</p>\
        <p>Best regards,<br />The Sales Team</p>",
        escape_html(lead.first_name.as_ref())
    );
    ComposedEmail { subject, text, html }
}
