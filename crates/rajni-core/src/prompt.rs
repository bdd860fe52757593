//! System prompt assembly for the assistant.

use crate::prefs::UserPreferences;

/// Literal used for any personalization line whose field is empty or absent.
pub const NOT_SET: &str = "Not set";

/// Base instruction block sent with every completion request.
pub const BASE_INSTRUCTIONS: &str = "\
You are RajniAI, a helpful and friendly personal AI assistant. You help users with:
- Scheduling and calendar management
- Booking cabs, restaurants, and services
- Drafting emails and messages
- Planning activities and trips
- Task management and reminders
- General questions and assistance

Be conversational, helpful, and proactive. Keep responses concise but informative.
If you can't do something, suggest alternatives or ask for more details.

IMPORTANT CONTEXTUAL AWARENESS: You have access to the last 5 messages in the \
conversation. Always reference and build upon previous messages. If the user is \
following up on a previous request, acknowledge what was discussed before and \
continue from there. For example:
- If they mentioned booking a cab and now provide details, acknowledge the booking request
- If they asked for an email draft and now provide the subject, reference the email request
- If they're clarifying details from a previous message, show you remember the context

This ensures natural, contextual conversations.";

fn line(value: &str) -> &str {
    if value.is_empty() {
        NOT_SET
    } else {
        value
    }
}

fn joined(values: &[String]) -> String {
    if values.is_empty() {
        NOT_SET.to_string()
    } else {
        values.join(", ")
    }
}

/// Build the system prompt, appending a personalization section when a
/// preference record is available.
///
/// The field order is fixed; tests assert on the rendered content.
pub fn build_system_prompt(base: &str, preferences: Option<&UserPreferences>) -> String {
    let mut prompt = base.to_string();

    if let Some(p) = preferences {
        prompt.push_str(&format!(
            "\n\nUser Profile:\n\
             - Home: {}\n\
             - Work: {}\n\
             - Preferred Cab Services: {}\n\
             - Preferred Flight Booking Sites: {}\n\
             - Preferred Grocery Apps: {}\n\
             - Preferred Food Apps: {}\n\
             - Preferred Cuisines: {}\n\
             - Payment Methods: {}\n\
             - Budget Level: {}\n\n\
             Use this information to provide personalized responses. If the user \
             mentions booking a cab, suggest their preferred services. If they \
             mention food delivery, suggest their preferred apps. If they mention \
             flight booking, suggest their preferred sites.",
            line(&p.home_location),
            line(&p.work_location),
            joined(&p.cab_services),
            joined(&p.flight_booking_sites),
            joined(&p.grocery_apps),
            joined(&p.food_apps),
            joined(&p.preferred_cuisines),
            joined(&p.payment_methods),
            line(&p.monthly_shopping_budget),
        ));
    }

    prompt
}
