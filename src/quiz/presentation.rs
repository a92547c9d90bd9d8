use async_trait::async_trait;
use teloxide::utils::html;

use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::locale::Translations;
use crate::quiz::questions::Question;
use crate::quiz::transport::Decoded;
use crate::quiz::{PersonalityProfile, LIKERT_MAX, LIKERT_MIN};

/// The four groups of the type model, plus a fallback for codes we don't know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalityFamily {
    Analysts,
    Diplomats,
    Sentinels,
    Explorers,
    Default,
}

impl PersonalityFamily {
    pub fn of(code: &str) -> Self {
        match code {
            "INTJ" | "INTP" | "ENTJ" | "ENTP" => PersonalityFamily::Analysts,
            "INFJ" | "INFP" | "ENFJ" | "ENFP" => PersonalityFamily::Diplomats,
            "ISTJ" | "ISFJ" | "ESTJ" | "ESFJ" => PersonalityFamily::Sentinels,
            "ISTP" | "ISFP" | "ESTP" | "ESFP" => PersonalityFamily::Explorers,
            _ => PersonalityFamily::Default,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PersonalityFamily::Analysts => "Analysts",
            PersonalityFamily::Diplomats => "Diplomats",
            PersonalityFamily::Sentinels => "Sentinels",
            PersonalityFamily::Explorers => "Explorers",
            PersonalityFamily::Default => "Default",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PersonalityFamily::Analysts => "🧠",
            PersonalityFamily::Diplomats => "🤝",
            PersonalityFamily::Sentinels => "💼",
            PersonalityFamily::Explorers => "📊",
            PersonalityFamily::Default => "🏅",
        }
    }
}

pub fn render_welcome(t: &Translations) -> String {
    format!(
        "<b>{}</b>\n\n{}",
        html::escape(&t.welcome_title),
        html::escape(&t.welcome_description)
    )
}

/// One question card: progress line, bar, statement and the labelled scale.
pub fn render_question(
    t: &Translations,
    question: &Question,
    index: usize,
    total: usize,
    progress_percent: u8,
) -> String {
    const BAR_WIDTH: usize = 10;
    let filled = (usize::from(progress_percent) * BAR_WIDTH / 100).min(BAR_WIDTH);
    let bar = format!("{}{}", "▰".repeat(filled), "▱".repeat(BAR_WIDTH - filled));

    let mut out = format!(
        "{} {} {} {}\n{} {}%\n\n<b>{}</b>\n",
        html::escape(&t.question),
        index + 1,
        html::escape(&t.of),
        total,
        bar,
        progress_percent.min(100),
        html::escape(&question.text),
    );
    for value in LIKERT_MIN..=LIKERT_MAX {
        out.push_str(&format!(
            "\n{} · {}",
            value,
            html::escape(&t.response_label(value))
        ));
    }
    out
}

fn render_list(out: &mut String, title: &str, icon: &str, items: &[String]) {
    out.push_str(&format!("\n\n{} <b>{}</b>", icon, html::escape(title)));
    for item in items {
        out.push_str(&format!("\n• {}", html::escape(item)));
    }
}

fn render_profile(profile: &PersonalityProfile, t: &Translations) -> String {
    let family = PersonalityFamily::of(&profile.personality_type);
    let mut out = format!(
        "{} {}\n<b>{}</b>  <i>{}</i>\n\n{}",
        family.icon(),
        html::escape(&t.result_title),
        html::escape(&profile.personality_type),
        family.name(),
        html::escape(&profile.description),
    );

    out.push_str(&format!("\n\n<b>{}</b>", html::escape(&t.detailed_insights)));
    render_list(&mut out, &t.strengths, "✨", &profile.strengths);
    render_list(&mut out, &t.weaknesses, "⚠️", &profile.weaknesses);
    out.push_str(&format!(
        "\n\n💞 <b>{}</b>\n{}",
        html::escape(&t.relationships),
        html::escape(&profile.relationships)
    ));
    render_list(&mut out, &t.career_paths, "💼", &profile.career_paths);
    out
}

/// Placeholder shown while (or instead of) a result that hasn't arrived.
pub fn render_loading(t: &Translations) -> String {
    format!(
        "⏳ {}\n\n▒▒▒▒▒▒▒▒▒▒▒▒\n▒▒▒▒▒▒▒▒\n▒▒▒▒▒▒▒▒▒▒",
        html::escape(&t.loading_analysis)
    )
}

pub fn render_results(decoded: &Decoded, t: &Translations) -> String {
    match decoded {
        Decoded::Profile { profile, .. } => render_profile(profile, t),
        Decoded::Incomplete => render_loading(t),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareData {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl ShareData {
    pub fn new(profile: &PersonalityProfile, t: &Translations, url: String) -> Self {
        Self {
            title: format!("{}: {}", t.share_title, profile.personality_type),
            text: profile.description.clone(),
            url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    LinkCopied,
}

/// Where a result can be shared: a native share sheet if there is one, and a
/// plain "copy the link" path otherwise.
#[async_trait]
pub trait ShareChannel: Send + Sync {
    fn supports_native_share(&self) -> bool;

    async fn share(&self, data: &ShareData) -> QuizResult<()>;

    async fn copy_link(&self, url: &str) -> QuizResult<()>;
}

/// Best effort: every failure comes back as `ShareAction` for a dismissible notice.
pub async fn share_result(channel: &dyn ShareChannel, data: &ShareData) -> QuizResult<ShareOutcome> {
    let attempt = if channel.supports_native_share() {
        channel.share(data).await.map(|_| ShareOutcome::Shared)
    } else {
        channel.copy_link(&data.url).await.map(|_| ShareOutcome::LinkCopied)
    };

    attempt.map_err(|e| {
        log::warn!("Share failed: {}", e);
        match e {
            QuizError::ShareAction(_) => e,
            other => QuizError::ShareAction(other.to_string()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::locale::{Language, Localization};
    use std::sync::Mutex;

    fn profile(code: &str) -> PersonalityProfile {
        PersonalityProfile {
            personality_type: code.to_string(),
            description: "Bold <and> direct".to_string(),
            strengths: vec!["A".into(), "B".into(), "C".into()],
            weaknesses: vec!["D".into(), "E".into(), "F".into()],
            career_paths: vec!["G".into(), "H".into(), "I".into()],
            relationships: "Honest & loyal".to_string(),
        }
    }

    #[test]
    fn test_family_lookup() {
        assert_eq!(PersonalityFamily::of("INTJ"), PersonalityFamily::Analysts);
        assert_eq!(PersonalityFamily::of("ENFP"), PersonalityFamily::Diplomats);
        assert_eq!(PersonalityFamily::of("ESFJ"), PersonalityFamily::Sentinels);
        assert_eq!(PersonalityFamily::of("ISTP"), PersonalityFamily::Explorers);
        assert_eq!(PersonalityFamily::of("ZZZZ"), PersonalityFamily::Default);
        assert_eq!(PersonalityFamily::of(""), PersonalityFamily::Default);
    }

    #[test]
    fn test_unknown_type_renders_with_default_family() {
        let l10n = Localization::builtin().unwrap();
        let t = l10n.translations(Language::En);
        let decoded = Decoded::Profile {
            language: Language::En,
            profile: profile("ZZZZ"),
        };

        let out = render_results(&decoded, t);
        assert!(out.starts_with("🏅"));
        assert!(out.contains("<b>ZZZZ</b>"));
        assert!(out.contains("Default"));
    }

    #[test]
    fn test_render_escapes_free_text() {
        let l10n = Localization::builtin().unwrap();
        let t = l10n.translations(Language::En);
        let out = render_results(
            &Decoded::Profile {
                language: Language::En,
                profile: profile("ESTJ"),
            },
            t,
        );
        assert!(out.starts_with("💼"));
        assert!(out.contains("Bold &lt;and&gt; direct"));
        assert!(out.contains("Honest &amp; loyal"));
        assert!(out.contains("• G"));
    }

    #[test]
    fn test_incomplete_renders_loading() {
        let l10n = Localization::builtin().unwrap();
        let t = l10n.translations(Language::Ko);
        let out = render_results(&Decoded::Incomplete, t);
        assert!(out.contains(&t.loading_analysis));
    }

    #[test]
    fn test_render_question_progress() {
        let l10n = Localization::builtin().unwrap();
        let t = l10n.translations(Language::En);
        let question = Question {
            id: 1,
            text: "I enjoy parties".to_string(),
        };
        let out = render_question(t, &question, 29, 60, 48);
        assert!(out.starts_with(&format!("{} 30 {} 60", t.question, t.of)));
        assert!(out.contains("▰▰▰▰▱▱▱▱▱▱ 48%"));
        assert!(out.contains("<b>I enjoy parties</b>"));
    }

    #[test]
    fn test_render_question_lists_every_answer_label() {
        let l10n = Localization::builtin().unwrap();
        for language in Language::ALL {
            let t = l10n.translations(language);
            let question = Question {
                id: 1,
                text: "Statement".to_string(),
            };
            let out = render_question(t, &question, 0, 60, 0);
            for (i, label) in t.response_options.iter().enumerate() {
                assert!(out.contains(&format!("{} · {}", i + 1, html::escape(label))));
            }
        }
    }

    #[test]
    fn test_render_question_clamps_progress() {
        let l10n = Localization::builtin().unwrap();
        let t = l10n.translations(Language::En);
        let question = Question {
            id: 1,
            text: "Statement".to_string(),
        };
        let out = render_question(t, &question, 7, 3, 250);
        assert!(out.contains("▰▰▰▰▰▰▰▰▰▰ 100%"));
    }

    struct FakeChannel {
        native: bool,
        fail: bool,
        log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ShareChannel for FakeChannel {
        fn supports_native_share(&self) -> bool {
            self.native
        }

        async fn share(&self, data: &ShareData) -> QuizResult<()> {
            self.log.lock().unwrap().push(format!("share {}", data.title));
            if self.fail {
                return Err(QuizError::ShareAction("sheet dismissed".into()));
            }
            Ok(())
        }

        async fn copy_link(&self, url: &str) -> QuizResult<()> {
            self.log.lock().unwrap().push(format!("copy {}", url));
            if self.fail {
                return Err(QuizError::Config("clipboard unavailable".into()));
            }
            Ok(())
        }
    }

    fn data() -> ShareData {
        let l10n = Localization::builtin().unwrap();
        ShareData::new(
            &profile("INFJ"),
            l10n.translations(Language::En),
            "https://quiz.example/results?type=INFJ".to_string(),
        )
    }

    #[tokio::test]
    async fn test_native_share() {
        let channel = FakeChannel {
            native: true,
            fail: false,
            log: Mutex::new(Vec::new()),
        };
        let outcome = share_result(&channel, &data()).await.unwrap();
        assert_eq!(outcome, ShareOutcome::Shared);
        assert!(channel.log.lock().unwrap()[0].ends_with(": INFJ"));
    }

    #[tokio::test]
    async fn test_falls_back_to_copying_link() {
        let channel = FakeChannel {
            native: false,
            fail: false,
            log: Mutex::new(Vec::new()),
        };
        let outcome = share_result(&channel, &data()).await.unwrap();
        assert_eq!(outcome, ShareOutcome::LinkCopied);
        assert_eq!(
            *channel.log.lock().unwrap(),
            vec!["copy https://quiz.example/results?type=INFJ".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failures_become_share_errors() {
        for native in [true, false] {
            let channel = FakeChannel {
                native,
                fail: true,
                log: Mutex::new(Vec::new()),
            };
            let err = share_result(&channel, &data()).await.unwrap_err();
            assert!(matches!(err, QuizError::ShareAction(_)));
        }
    }
}
