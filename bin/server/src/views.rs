//! HTML pages.

use chrono::{DateTime, Utc};
use masked_sms_core::{BindingState, PhoneBinding};
use maud::{DOCTYPE, Markup, html};

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body {
                main { (body) }
            }
        }
    }
}

fn state_label(state: BindingState) -> &'static str {
    match state {
        BindingState::Active => "active",
        BindingState::ExpiredPendingRelease => "expired, pending release",
    }
}

/// Renders the list of bound numbers.
///
/// `local` adds a notice that the provider cannot reach this host.
#[must_use]
pub fn index(bindings: &[PhoneBinding], now: DateTime<Utc>, local: bool) -> Markup {
    layout(
        "Masked SMS",
        html! {
            h1 { "Masked SMS" }
            @if local {
                p class="notice" {
                    "This server is running on a local address. The provider cannot "
                    "deliver webhooks here, so inbound activity will not be recorded. "
                    "Expose it through a public tunnel before adding numbers."
                }
            }
            @if bindings.is_empty() {
                p { "No phone numbers have been added yet." }
            } @else {
                table {
                    thead {
                        tr {
                            th { "Number" }
                            th { "Expires after (minutes)" }
                            th { "Last activity" }
                            th { "State" }
                        }
                    }
                    tbody {
                        @for binding in bindings {
                            tr {
                                td { (binding.number.as_str()) }
                                td { (binding.expiration_minutes) }
                                td { (binding.last_activity_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()) }
                                td { (state_label(binding.state(now))) }
                            }
                        }
                    }
                }
            }
            p { a href="/add-phone" { "Add a phone number" } }
        },
    )
}

/// Renders the form for adding a number.
#[must_use]
pub fn phone_form() -> Markup {
    layout(
        "Add a phone number",
        html! {
            h1 { "Add a phone number" }
            form method="post" action="/add-phone" {
                label for="phoneNumber" { "Phone number (E.164)" }
                input id="phoneNumber" name="phoneNumber" type="tel" placeholder="+15550001" required;
                label for="expirationTime" { "Expiration time (minutes)" }
                input id="expirationTime" name="expirationTime" type="number" min="1" value="5" required;
                button type="submit" { "Add" }
            }
            p { a href="/" { "Back" } }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use masked_sms_core::{ConversationSid, ParticipantSid, PhoneNumber};

    fn binding(idle_minutes: i64, now: DateTime<Utc>) -> PhoneBinding {
        PhoneBinding::new(
            ParticipantSid::new("MB1"),
            ConversationSid::new("CH1"),
            PhoneNumber::parse("+15550001").unwrap(),
            5,
            now - Duration::minutes(idle_minutes),
        )
    }

    #[test]
    fn index_lists_bindings_with_state() {
        let now = Utc::now();
        let page = index(&[binding(7, now)], now, false).into_string();

        assert!(page.contains("+15550001"));
        assert!(page.contains("expired, pending release"));
        assert!(!page.contains("local address"));
    }

    #[test]
    fn index_shows_local_notice() {
        let page = index(&[], Utc::now(), true).into_string();

        assert!(page.contains("local address"));
        assert!(page.contains("No phone numbers"));
    }

    #[test]
    fn form_posts_expected_fields() {
        let page = phone_form().into_string();

        assert!(page.contains(r#"name="phoneNumber""#));
        assert!(page.contains(r#"name="expirationTime""#));
        assert!(page.contains(r#"action="/add-phone""#));
    }
}
