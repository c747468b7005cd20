//! User-facing strings keyed by error and template keys.

/// Localized text for a key. Unknown keys fall back to a generic message.
pub fn txt(key: &str) -> &'static str {
    match key {
        "no_action" => "The action you requested does not exist.",
        "post_required" => "This action must be submitted as a form post.",
        "missing_param" => "A required parameter is missing from the request.",
        "invalid_param" => "One of the request parameters is not a valid number.",
        "internal_error" => "An internal error occurred. Please try again later.",
        "validation_failed" => "The following errors occurred when submitting the form.",

        // Sessions and accounts
        "session_invalid" => "Your session is invalid or has expired. Please log in again.",
        "login_required" => "You must be logged in to do that.",
        "login_failed" => "That username and password combination is not valid.",
        "username_taken" => "That username is already in use.",
        "username_invalid" => "Usernames must be between 3 and 32 characters long.",
        "password_too_short" => "Passwords must be at least 8 characters long.",
        "email_invalid" => "That does not look like a valid email address.",

        // Boards and topics
        "no_board" => "The board you specified does not exist.",
        "no_topic" => "The topic you requested does not exist.",
        "no_access" => "You are not allowed to access this section.",
        "cannot_post_guest" => "Guests are not allowed to post.",
        "no_subject" => "No subject was filled in.",
        "no_message" => "The message body was left empty.",
        "subject_too_long" => "The subject may not be longer than 80 characters.",
        "topic_locked" => "This topic is locked. You are not allowed to reply to it.",
        "cannot_move" => "You are not allowed to move this topic.",
        "move_same_board" => "The topic is already in that board.",

        // Notifications
        "cannot_notify_guest" => "Guests cannot change notification settings. Please log in.",
        "unsubscribe_invalid" => "The unsubscribe link you used is invalid or has expired.",
        "invalid_mode" => "That notification setting is not valid.",

        // Search and attachments
        "search_string_too_short" => "Search strings must be at least 3 characters long.",
        "no_attachment" => "The attachment could not be found.",

        _ => "An unknown error occurred.",
    }
}

/// Subject and body of a notification email.
pub fn notify_email(new_topic: bool, subject: &str, topic_url: &str, unsubscribe_url: &str) -> (String, String) {
    let (mail_subject, intro) = if new_topic {
        (format!("New topic: {}", subject), "A new topic has been started in a board you are watching.")
    } else {
        (format!("Topic reply: {}", subject), "A reply has been posted to a topic you are watching.")
    };

    let body = format!(
        "{}\n\n{}\n\n{}\n\nTo stop receiving these emails, visit:\n{}\n",
        intro, subject, topic_url, unsubscribe_url
    );
    (mail_subject, body)
}
