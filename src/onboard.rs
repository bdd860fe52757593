//! Interactive onboarding: profile questions first, then the four-step
//! preferences wizard. Existing records are pre-filled so re-running edits in
//! place instead of starting over.

use console::style;
use rajni_core::{
    config::StoreConfig,
    prefs::UserPreferences,
    profile::{AiPersonality, BudgetLevel, ResponseLength, UserProfile},
    traits::KeyedStore,
};
use serde_json::Value;

use crate::wizard::{PreferencesWizard, WizardStep};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Nav {
    Next,
    Back,
    Save,
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn text_input(prompt: &str, current: &str) -> std::io::Result<String> {
    cliclack::input(prompt)
        .default_input(current)
        .required(false)
        .interact()
}

fn list_input(prompt: &str, current: &[String]) -> std::io::Result<Vec<String>> {
    let raw: String = cliclack::input(prompt)
        .default_input(&current.join(", "))
        .required(false)
        .interact()?;
    Ok(split_csv(&raw))
}

async fn fetch_record(
    store: &dyn KeyedStore,
    table: &str,
    user_key: &str,
    what: &str,
) -> Option<Value> {
    let sp = cliclack::spinner();
    sp.start(format!("Looking up your {what}..."));
    match store.fetch(table, user_key).await {
        Ok(Some(record)) => {
            sp.stop(format!("Found an existing {what} — answers are pre-filled"));
            Some(record)
        }
        Ok(None) => {
            sp.stop(format!("No {what} yet — starting fresh"));
            None
        }
        Err(e) => {
            sp.stop(format!("Could not load your {what} ({e}) — starting fresh"));
            None
        }
    }
}

pub async fn run(store: &dyn KeyedStore, tables: &StoreConfig, user_key: &str) -> anyhow::Result<()> {
    cliclack::intro(style(" RajniAI onboarding ").on_cyan().black().to_string())?;

    onboard_profile(store, tables, user_key).await?;
    onboard_preferences(store, tables, user_key).await?;

    cliclack::outro("All set. Rajni now knows you — try `rajni ask`.")?;
    Ok(())
}

async fn onboard_profile(
    store: &dyn KeyedStore,
    tables: &StoreConfig,
    user_key: &str,
) -> anyhow::Result<()> {
    let existing = fetch_record(store, &tables.profiles_table, user_key, "profile").await;
    let mut profile = existing
        .map(|r| UserProfile::from_record(&r))
        .unwrap_or_default();

    cliclack::log::step("About you")?;
    profile.full_name = text_input("What is your full name?", &profile.full_name)?;
    profile.nickname = text_input("What should Rajni call you?", &profile.nickname)?;
    profile.email = text_input("Email address?", &profile.email)?;
    profile.home_address = text_input("Home address?", &profile.home_address)?;
    profile.work_address = text_input("Work address?", &profile.work_address)?;

    cliclack::log::step("How Rajni should behave")?;
    profile.ai_personality = cliclack::select("Pick a personality")
        .item(AiPersonality::Friendly, "Friendly", "warm and casual")
        .item(AiPersonality::Professional, "Professional", "to the point")
        .item(AiPersonality::Casual, "Casual", "relaxed")
        .item(AiPersonality::Enthusiastic, "Enthusiastic", "high energy")
        .initial_value(profile.ai_personality)
        .interact()?;
    profile.response_length = cliclack::select("How detailed should answers be?")
        .item(ResponseLength::Short, "Short", "just the essentials")
        .item(ResponseLength::Medium, "Medium", "")
        .item(ResponseLength::Detailed, "Detailed", "full explanations")
        .initial_value(profile.response_length)
        .interact()?;
    profile.budget_level = cliclack::select("Default spending posture for suggestions?")
        .item(BudgetLevel::Low, "Low", "value first")
        .item(BudgetLevel::Medium, "Medium", "")
        .item(BudgetLevel::High, "High", "comfort first")
        .initial_value(profile.budget_level)
        .interact()?;
    profile.nudge_permission = cliclack::confirm("May Rajni send proactive reminders?")
        .initial_value(profile.nudge_permission)
        .interact()?;

    let sp = cliclack::spinner();
    sp.start("Saving profile...");
    match store
        .upsert(
            &tables.profiles_table,
            user_key,
            serde_json::to_value(&profile)?,
        )
        .await
    {
        Ok(_) => sp.stop("Profile saved"),
        Err(e) => {
            sp.stop("Profile save failed");
            return Err(e.into());
        }
    }
    Ok(())
}

async fn onboard_preferences(
    store: &dyn KeyedStore,
    tables: &StoreConfig,
    user_key: &str,
) -> anyhow::Result<()> {
    let existing = fetch_record(store, &tables.preferences_table, user_key, "preferences").await;
    let prefs = existing
        .map(|r| UserPreferences::from_record(&r))
        .unwrap_or_default();
    let mut wizard = PreferencesWizard::new(prefs);

    loop {
        let step = wizard.step();
        cliclack::log::step(format!("Step {} of 4 — {}", step.position(), step.title()))?;

        match step {
            WizardStep::FoodAndDining => {
                let p = &mut wizard.prefs;
                p.grocery_apps = list_input("Grocery apps you use (comma-separated)?", &p.grocery_apps)?;
                p.food_apps = list_input("Food delivery apps?", &p.food_apps)?;
                p.preferred_cuisines = list_input("Favorite cuisines?", &p.preferred_cuisines)?;
                p.go_to_restaurants = list_input("Go-to restaurants?", &p.go_to_restaurants)?;
                p.is_vegetarian = cliclack::confirm("Are you vegetarian?")
                    .initial_value(p.is_vegetarian)
                    .interact()?;
                p.spice_tolerance_level =
                    text_input("Spice tolerance (mild / medium / hot)?", &p.spice_tolerance_level)?;
            }
            WizardStep::Travel => {
                let p = &mut wizard.prefs;
                p.flight_booking_sites =
                    list_input("Flight booking sites?", &p.flight_booking_sites)?;
                p.frequent_flight_routes =
                    list_input("Frequent flight routes (e.g. BLR-DEL)?", &p.frequent_flight_routes)?;
                p.cab_services = list_input("Cab services?", &p.cab_services)?;
                p.cab_type_preference =
                    text_input("Preferred cab type?", &p.cab_type_preference)?;
                p.flight_preferences.cabin_class =
                    text_input("Preferred cabin class?", &p.flight_preferences.cabin_class)?;
                p.flight_preferences.seat =
                    text_input("Seat preference (window / aisle / middle)?", &p.flight_preferences.seat)?;
            }
            WizardStep::Shopping => {
                let p = &mut wizard.prefs;
                p.ecommerce_sites = list_input("Shopping sites?", &p.ecommerce_sites)?;
                p.favorite_brands = list_input("Favorite brands?", &p.favorite_brands)?;
                p.payment_methods = list_input("Payment methods?", &p.payment_methods)?;
                p.preferred_payment_method =
                    text_input("Which of those is your default?", &p.preferred_payment_method)?;
                p.monthly_shopping_budget =
                    text_input("Monthly shopping budget?", &p.monthly_shopping_budget)?;
            }
            WizardStep::LocationAndWork => {
                let p = &mut wizard.prefs;
                p.home_location = text_input("Home location?", &p.home_location)?;
                p.work_location = text_input("Work location?", &p.work_location)?;
                p.calendar_app = text_input("Calendar app?", &p.calendar_app)?;
                p.working_hours.start =
                    text_input("Workday starts at?", &p.working_hours.start)?;
                p.working_hours.end = text_input("Workday ends at?", &p.working_hours.end)?;
            }
        }

        let action = if step.is_last() {
            cliclack::select("Done with the last step")
                .item(Nav::Save, "Save", "write your preferences")
                .item(Nav::Back, "Back", "revisit a step")
                .interact()?
        } else {
            cliclack::select("Continue")
                .item(Nav::Next, "Next", "")
                .item(Nav::Back, "Back", "")
                .interact()?
        };

        match action {
            Nav::Next => wizard.next(),
            Nav::Back => wizard.previous(),
            Nav::Save => {
                let sp = cliclack::spinner();
                sp.start("Saving preferences...");
                match wizard
                    .submit(store, &tables.preferences_table, user_key)
                    .await
                {
                    Ok(_) => {
                        sp.stop("Preferences saved");
                        break;
                    }
                    Err(e) => {
                        // Stay on the last step with everything filled in.
                        sp.stop("Save failed");
                        cliclack::log::error(format!("{e} — nothing was lost, try again"))?;
                    }
                }
            }
        }
    }

    Ok(())
}
