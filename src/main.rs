use std::{error::Error, sync::Arc, time::Instant};

use async_trait::async_trait;
use chatgpt::client::ChatGPT;
use dotenv::dotenv;
use personality_quiz::{
    config::BotConfig,
    quiz::{
        analyzer::{Classifier, PersonalityAnalyzer},
        error::{QuizError, QuizResult},
        locale::{Language, Localization, Translations},
        presentation::{self, ShareChannel, ShareData, ShareOutcome},
        questions::QuestionBank,
        session::{QuizSession, Submission},
        transport::{self, Decoded},
        LIKERT_MAX, LIKERT_MIN,
    },
};
use teloxide::{
    dispatching::{
        dialogue::{ErasedStorage, InMemStorage, Storage},
        UpdateHandler,
    },
    prelude::*,
    types::{
        ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
        KeyboardRemove, ParseMode,
    },
    utils::html,
};
use url::{Host, Url};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;
type QuizStorage = Arc<ErasedStorage<State>>;

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    ReceiveLanguage,
    Ready {
        language: Language,
    },
    Answering {
        language: Language,
        session: QuizSession,
    },
    Finished {
        language: Language,
        session: QuizSession,
        share: Option<ShareData>,
    },
}

/// Shared, read-only pieces every handler needs.
struct Quiz {
    config: BotConfig,
    bank: QuestionBank,
    localization: Localization,
    classifier: Box<dyn Classifier>,
}

const START: &str = "start";
const RESTART: &str = "restart";
const SHARE: &str = "share";
const ANSWER_PREFIX: &str = "answer:";

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting personality quiz bot...");

    if let Err(e) = run().await {
        log::error!("Bot stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = BotConfig::from_env()?;

    let localization = match &config.locales_dir {
        Some(dir) => Localization::from_dir(dir)?,
        None => Localization::builtin()?,
    };
    let bank = QuestionBank::standard();
    localization.check_complete(&bank)?;
    log::info!(
        "Loaded {} questions in {} languages",
        bank.len(),
        Language::ALL.len()
    );

    let gpt = {
        let mut gpt = ChatGPT::new(config.chatgpt_api_key.clone())?;

        gpt.config.engine = config.engine();
        gpt.config.timeout = config.request_timeout;

        gpt
    };

    let classifier = PersonalityAnalyzer::new(gpt, &bank, &localization);
    let quiz = Arc::new(Quiz {
        config,
        bank,
        localization,
        classifier: Box::new(classifier),
    });

    let bot = Bot::from_env();
    let storage: QuizStorage = InMemStorage::<State>::new().erase();

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![storage, quiz])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}

fn schema() -> UpdateHandler<Box<dyn Error + Send + Sync + 'static>> {
    let messages = Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(
            dptree::filter(|msg: Message| msg.text().map_or(false, |t| t.starts_with("/start")))
                .endpoint(start),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().map_or(false, looks_like_results_link))
                .endpoint(show_shared_results),
        )
        .branch(dptree::case![State::Start].endpoint(start))
        .branch(dptree::case![State::ReceiveLanguage].endpoint(receive_language))
        .branch(dptree::endpoint(repeat_prompt));

    let callbacks = Update::filter_callback_query()
        .enter_dialogue::<CallbackQuery, ErasedStorage<State>, State>()
        .branch(dptree::case![State::Ready { language }].endpoint(start_quiz))
        .branch(dptree::case![State::Answering { language, session }].endpoint(receive_answer))
        .branch(
            dptree::case![State::Finished {
                language,
                session,
                share
            }]
            .endpoint(finished_action),
        )
        .branch(dptree::endpoint(stale_button));

    dptree::entry().branch(messages).branch(callbacks)
}

fn language_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(
        Language::ALL
            .chunks(3)
            .map(|row| row.iter().map(|l| KeyboardButton::new(l.label())).collect())
            .collect::<Vec<Vec<_>>>(),
    )
}

fn language_prompt(localization: &Localization) -> String {
    Language::ALL
        .iter()
        .map(|l| localization.translations(*l).choose_language.as_str())
        .collect::<Vec<_>>()
        .join(" · ")
}

fn answer_keyboard(question_index: usize) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![(LIKERT_MIN..=LIKERT_MAX)
        .map(|value| {
            InlineKeyboardButton::callback(
                value.to_string(),
                format!("{}{}:{}", ANSWER_PREFIX, question_index, value),
            )
        })
        .collect::<Vec<_>>()])
}

fn restart_keyboard(t: &Translations) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t.take_again.clone(),
        RESTART,
    )]])
}

fn results_keyboard(t: &Translations) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(t.share_results.clone(), SHARE)],
        vec![InlineKeyboardButton::callback(t.take_again.clone(), RESTART)],
    ])
}

fn parse_answer(data: &str) -> Option<(usize, i64)> {
    let mut parts = data.strip_prefix(ANSWER_PREFIX)?.split(':');
    let index = parts.next()?.parse().ok()?;
    let value = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((index, value))
}

fn looks_like_results_link(text: &str) -> bool {
    text.split_once('?')
        .map_or(false, |(_, query)| query.contains("type=") || query.contains("desc="))
}

/// Telegram refuses share links that point at a private host.
fn is_public_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host() {
        Some(Host::Domain(domain)) => {
            domain != "localhost" && !domain.ends_with(".localhost") && !domain.ends_with(".local")
        }
        Some(Host::Ipv4(ip)) => {
            !(ip.is_private() || ip.is_loopback() || ip.is_unspecified() || ip.is_link_local())
        }
        Some(Host::Ipv6(ip)) => !(ip.is_loopback() || ip.is_unspecified()),
        None => false,
    }
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message, quiz: Arc<Quiz>) -> HandlerResult {
    let t = quiz.localization.translations(quiz.config.default_language);
    bot.send_message(msg.chat.id, presentation::render_welcome(t))
        .parse_mode(ParseMode::Html)
        .await?;
    bot.send_message(msg.chat.id, language_prompt(&quiz.localization))
        .reply_markup(language_keyboard())
        .await?;

    dialogue.update(State::ReceiveLanguage).await?;
    Ok(())
}

async fn receive_language(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    quiz: Arc<Quiz>,
) -> HandlerResult {
    let language = msg
        .text()
        .and_then(|text| Language::from_label(text).or_else(|| Language::from_code(text)));

    let Some(language) = language else {
        bot.send_message(msg.chat.id, language_prompt(&quiz.localization))
            .reply_markup(language_keyboard())
            .await?;
        return Ok(());
    };
    log::debug!("Chat {} picked {}", msg.chat.id, language.code());

    bot.send_message(msg.chat.id, format!("✅ {}", language.label()))
        .reply_markup(KeyboardRemove::new())
        .await?;
    send_start_button(&bot, msg.chat.id, &quiz, language).await?;

    dialogue.update(State::Ready { language }).await?;
    Ok(())
}

async fn send_start_button(
    bot: &Bot,
    chat_id: ChatId,
    quiz: &Quiz,
    language: Language,
) -> HandlerResult {
    let t = quiz.localization.translations(language);
    bot.send_message(chat_id, presentation::render_welcome(t))
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback(t.start_test.clone(), START),
        ]]))
        .await?;
    Ok(())
}

async fn send_question(
    bot: &Bot,
    chat_id: ChatId,
    quiz: &Quiz,
    language: Language,
    session: &QuizSession,
) -> HandlerResult {
    let Some(index) = session.current_index() else {
        return Ok(());
    };
    let t = quiz.localization.translations(language);
    let question = quiz.bank.question(index, t).ok_or_else(|| {
        QuizError::Localization(format!("no {} text for question {}", language.code(), index + 1))
    })?;

    bot.send_message(
        chat_id,
        presentation::render_question(
            t,
            &question,
            index,
            quiz.bank.len(),
            session.progress_percent(),
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(answer_keyboard(index))
    .await?;
    Ok(())
}

async fn start_quiz(
    bot: Bot,
    dialogue: QuizDialogue,
    q: CallbackQuery,
    language: Language,
    quiz: Arc<Quiz>,
) -> HandlerResult {
    bot.answer_callback_query(q.id).await?;
    if q.data.as_deref() != Some(START) {
        return Ok(());
    }

    let session = QuizSession::new(quiz.bank.len(), quiz.config.settle);
    send_question(&bot, dialogue.chat_id(), &quiz, language, &session).await?;

    dialogue.update(State::Answering { language, session }).await?;
    Ok(())
}

async fn receive_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    q: CallbackQuery,
    (language, mut session): (Language, QuizSession),
    quiz: Arc<Quiz>,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    let Some((index, value)) = q.data.as_deref().and_then(parse_answer) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let outcome = session.submit_answer(index, value, Instant::now());
    bot.answer_callback_query(q.id).await?;

    match outcome {
        Err(e) => {
            log::warn!("Rejected answer in chat {}: {}", chat_id, e);
        }
        Ok(Submission::Ignored) => {}
        Ok(Submission::Accepted { .. }) => {
            // Drop the keyboard from the card that was just answered.
            if let Some(message) = &q.message {
                let _ = bot.edit_message_reply_markup(chat_id, message.id).await;
            }
            send_question(&bot, chat_id, &quiz, language, &session).await?;
            dialogue.update(State::Answering { language, session }).await?;
        }
        Ok(Submission::Submitting) => {
            if let Some(message) = &q.message {
                let _ = bot.edit_message_reply_markup(chat_id, message.id).await;
            }
            dialogue
                .update(State::Answering {
                    language,
                    session: session.clone(),
                })
                .await?;
            finish_quiz(&bot, &dialogue, &quiz, language, session).await?;
        }
    }
    Ok(())
}

/// What the chat is shown once an attempt is over.
struct Conclusion {
    text: String,
    keyboard: InlineKeyboardMarkup,
    share: Option<ShareData>,
}

/// Runs the single classification of an attempt and renders its outcome.
/// Every error ends in the failure view, so the chat always gets a way forward.
async fn conclude(quiz: &Quiz, language: Language, session: &mut QuizSession) -> Conclusion {
    let t = quiz.localization.translations(language);

    match session.classify(&*quiz.classifier, language).await {
        Ok(profile) => {
            let url = transport::results_url(&quiz.config.results_url, &profile, language);
            // Render from the link itself, exactly what a shared link shows.
            let decoded = transport::decode(&url);
            Conclusion {
                text: presentation::render_results(&decoded, t),
                keyboard: results_keyboard(t),
                share: Some(ShareData::new(&profile, t, url)),
            }
        }
        Err(e) => {
            if e.is_classification_failure() {
                log::warn!("Analysis failed: {}", e);
            } else {
                log::error!("Quiz could not be concluded: {}", e);
            }
            Conclusion {
                text: format!("⚠️ {}", html::escape(&t.analysis_error)),
                keyboard: restart_keyboard(t),
                share: None,
            }
        }
    }
}

async fn finish_quiz(
    bot: &Bot,
    dialogue: &QuizDialogue,
    quiz: &Quiz,
    language: Language,
    mut session: QuizSession,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    let t = quiz.localization.translations(language);

    // Both are cosmetic; the classification runs either way.
    if let Err(e) = bot
        .send_message(chat_id, format!("⏳ {}", t.loading_analysis))
        .await
    {
        log::warn!("Could not send loading notice to chat {}: {}", chat_id, e);
    }
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let Conclusion {
        text,
        keyboard,
        share,
    } = conclude(quiz, language, &mut session).await;

    dialogue
        .update(State::Finished {
            language,
            session,
            share,
        })
        .await?;
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn finished_action(
    bot: Bot,
    dialogue: QuizDialogue,
    q: CallbackQuery,
    (language, mut session, share): (Language, QuizSession, Option<ShareData>),
    quiz: Arc<Quiz>,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    let t = quiz.localization.translations(language);

    match q.data.as_deref() {
        Some(RESTART) => {
            bot.answer_callback_query(q.id).await?;
            session.restart();
            send_question(&bot, chat_id, &quiz, language, &session).await?;
            dialogue.update(State::Answering { language, session }).await?;
        }
        Some(SHARE) => {
            let notice = match &share {
                Some(data) => {
                    let channel = TelegramShare {
                        bot: bot.clone(),
                        chat_id,
                        native: is_public_url(&data.url),
                        button_label: t.share_results.clone(),
                    };
                    match presentation::share_result(&channel, data).await {
                        Ok(ShareOutcome::Shared) => None,
                        Ok(ShareOutcome::LinkCopied) => Some(t.link_copied.clone()),
                        Err(e) => Some(format!("{} {}", t.link_copy_error, e)),
                    }
                }
                None => None,
            };
            let answer = bot.answer_callback_query(q.id);
            match notice {
                Some(text) => answer.text(text).await?,
                None => answer.await?,
            };
        }
        _ => {
            bot.answer_callback_query(q.id).await?;
        }
    }
    Ok(())
}

async fn stale_button(bot: Bot, q: CallbackQuery) -> HandlerResult {
    log::debug!("Ignoring stale button {:?}", q.data);
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

/// Free text while the bot expects a button press.
async fn repeat_prompt(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    quiz: Arc<Quiz>,
) -> HandlerResult {
    match dialogue.get().await? {
        Some(State::Ready { language }) => {
            send_start_button(&bot, msg.chat.id, &quiz, language).await?;
        }
        Some(State::Answering { language, session }) => {
            send_question(&bot, msg.chat.id, &quiz, language, &session).await?;
        }
        Some(State::Finished {
            language, share, ..
        }) => {
            let t = quiz.localization.translations(language);
            let (text, keyboard) = match share {
                Some(data) => (data.title, results_keyboard(t)),
                None => (t.analysis_error.clone(), restart_keyboard(t)),
            };
            bot.send_message(msg.chat.id, text)
                .reply_markup(keyboard)
                .await?;
        }
        _ => log::debug!("Ignoring message in chat {}", msg.chat.id),
    }
    Ok(())
}

/// A results link pasted into the chat, rendered the way the results page would.
async fn show_shared_results(bot: Bot, msg: Message, quiz: Arc<Quiz>) -> HandlerResult {
    let decoded = transport::decode(msg.text().unwrap_or_default());
    let language = match &decoded {
        Decoded::Profile { language, .. } => *language,
        Decoded::Incomplete => quiz.config.default_language,
    };
    let t = quiz.localization.translations(language);

    bot.send_message(msg.chat.id, presentation::render_results(&decoded, t))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Sharing inside Telegram: a `t.me/share` button when the results page is
/// reachable from outside, otherwise the bare link to copy.
struct TelegramShare {
    bot: Bot,
    chat_id: ChatId,
    native: bool,
    button_label: String,
}

#[async_trait]
impl ShareChannel for TelegramShare {
    fn supports_native_share(&self) -> bool {
        self.native
    }

    async fn share(&self, data: &ShareData) -> QuizResult<()> {
        let mut link = Url::parse("https://t.me/share/url")
            .map_err(|e| QuizError::ShareAction(e.to_string()))?;
        link.query_pairs_mut()
            .append_pair("url", &data.url)
            .append_pair("text", &format!("{}\n{}", data.title, data.text));

        self.bot
            .send_message(self.chat_id, data.title.clone())
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::url(self.button_label.clone(), link),
            ]]))
            .await
            .map_err(|e| QuizError::ShareAction(e.to_string()))?;
        Ok(())
    }

    async fn copy_link(&self, url: &str) -> QuizResult<()> {
        self.bot
            .send_message(self.chat_id, format!("<code>{}</code>", html::escape(url)))
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| QuizError::ShareAction(e.to_string()))?;
        Ok(())
    }
}
