use sys_locale::get_locale;

use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Id,
}

/// Notification strings for one language.
pub struct NotificationLabels {
    pub reminder_fallback_body: &'static str,
    pub summary_plain: fn(usize) -> String,
    pub summary_urgent: fn(usize, usize) -> String,
    pub summary_high: fn(usize, usize) -> String,
}

/// `"en"`/`"id"` pick a language explicitly; anything else follows the system locale.
pub fn resolve_language(setting: &str) -> Language {
    let normalized = setting.trim().to_lowercase();
    match normalized.as_str() {
        "en" => Language::En,
        "id" => Language::Id,
        _ => detect_system_language(),
    }
}

fn detect_system_language() -> Language {
    language_for_locale(&get_locale().unwrap_or_default())
}

fn language_for_locale(locale: &str) -> Language {
    let locale = locale.to_lowercase();
    if locale.starts_with("id") || locale.starts_with("in") {
        Language::Id
    } else {
        Language::En
    }
}

pub fn notification_labels(lang: Language) -> NotificationLabels {
    match lang {
        Language::En => NotificationLabels {
            reminder_fallback_body: "Task not finished yet!",
            summary_plain: |total| format!("📋 {total} active task(s)"),
            summary_urgent: |urgent, rest| format!("🔴 {urgent} urgent, {rest} other(s)"),
            summary_high: |high, rest| format!("🟠 {high} high priority, {rest} other(s)"),
        },
        Language::Id => NotificationLabels {
            reminder_fallback_body: "Task belum selesai!",
            summary_plain: |total| format!("📋 {total} task aktif"),
            summary_urgent: |urgent, rest| format!("🔴 {urgent} urgent, {rest} lainnya"),
            summary_high: |high, rest| format!("🟠 {high} high priority, {rest} lainnya"),
        },
    }
}

pub fn reminder_title(task: &Task) -> String {
    format!("⏰ {}", task.title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_language_settings_win_over_locale() {
        assert_eq!(resolve_language("en"), Language::En);
        assert_eq!(resolve_language(" ID "), Language::Id);
    }

    #[test]
    fn locale_detection_maps_indonesian_variants() {
        assert_eq!(language_for_locale("id-ID"), Language::Id);
        assert_eq!(language_for_locale("in_ID"), Language::Id);
        assert_eq!(language_for_locale("en-US"), Language::En);
        assert_eq!(language_for_locale(""), Language::En);
    }

    #[test]
    fn summary_titles_per_language() {
        let en = notification_labels(Language::En);
        assert_eq!((en.summary_plain)(2), "📋 2 active task(s)");
        assert_eq!((en.summary_urgent)(1, 3), "🔴 1 urgent, 3 other(s)");
        let id = notification_labels(Language::Id);
        assert_eq!((id.summary_high)(2, 0), "🟠 2 high priority, 0 lainnya");
        assert_eq!(id.reminder_fallback_body, "Task belum selesai!");
    }
}
