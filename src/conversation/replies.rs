//! Fixed reply texts

/// Affirmative button label
pub const YES: &str = "Так";
/// Negative button label
pub const NO: &str = "Ні";

pub const GREETING: &str =
    "Привіт! Я вмію створювати фотографії. Хочеш використати референсне зображення?";
pub const ASK_IMAGE: &str = "Надішли, будь ласка, зображення.";
pub const ASK_PROMPT: &str = "Добре. Тоді введи текстовий опис.";
pub const CHOOSE_YES_NO: &str = "Будь ласка, виберіть 'Так' або 'Ні'.";
pub const REFERENCE_RECEIVED: &str = "Отримано! Тепер введи опис зображення, яке хочеш отримати.";
pub const GENERATING: &str = "Генерую зображення... Це займе кілька секунд.";
pub const DONE: &str = "Готово! Щоб згенерувати ще — надішли /start.";
pub const CANCELLED: &str = "Генерацію скасовано. Надішли /start, щоб почати знову.";
pub const FAILED: &str = "Не вдалося згенерувати зображення. Надішли /start, щоб спробувати ще раз.";
