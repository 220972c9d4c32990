use super::*;
use async_trait::async_trait;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref JA_EN: HashMap<&'static str, &'static str> = [
        ("こんにちは", "Hello"),
        ("こんばんは", "Good evening"),
        ("おはよう", "Good morning"),
        ("おはようございます", "Good morning (polite)"),
        ("ありがとう", "Thank you"),
        ("ありがとうございます", "Thank you very much"),
        ("すみません", "Excuse me / I'm sorry"),
        ("はい", "Yes"),
        ("いいえ", "No"),
        ("さようなら", "Goodbye"),
        ("また明日", "See you tomorrow"),
        ("お疲れ様", "Good work / Thank you for your hard work"),
        ("私", "I / me"),
        ("あなた", "You"),
        ("彼", "He"),
        ("彼女", "She"),
        ("学生", "student"),
        ("先生", "teacher"),
        ("友達", "friend"),
        ("家族", "family"),
        ("食べる", "to eat"),
        ("飲む", "to drink"),
        ("行く", "to go"),
        ("来る", "to come"),
        ("見る", "to see/watch"),
        ("読む", "to read"),
        ("書く", "to write"),
        ("話す", "to speak"),
        ("聞く", "to listen/hear"),
        ("わかる", "to understand"),
        ("好き", "like"),
        ("嫌い", "dislike"),
        ("大きい", "big"),
        ("小さい", "small"),
        ("新しい", "new"),
        ("古い", "old"),
        ("美しい", "beautiful"),
        ("今日", "today"),
        ("昨日", "yesterday"),
        ("明日", "tomorrow"),
        ("朝", "morning"),
        ("昼", "noon/lunch"),
        ("夜", "night"),
        ("時間", "time"),
        ("お金", "money"),
        ("仕事", "work/job"),
        ("学校", "school"),
        ("家", "house/home"),
        ("駅", "station"),
        ("病院", "hospital"),
        ("レストラン", "restaurant"),
        ("コンビニ", "convenience store"),
        ("映画", "movie"),
        ("音楽", "music"),
        ("本", "book"),
        ("車", "car"),
        ("電車", "train"),
        ("バス", "bus"),
        ("飛行機", "airplane"),
    ]
    .into_iter()
    .collect();

    static ref EN_JA: HashMap<&'static str, &'static str> = [
        ("hello", "こんにちは"),
        ("good morning", "おはようございます"),
        ("good evening", "こんばんは"),
        ("thank you", "ありがとうございます"),
        ("excuse me", "すみません"),
        ("sorry", "すみません"),
        ("yes", "はい"),
        ("no", "いいえ"),
        ("goodbye", "さようなら"),
        ("see you tomorrow", "また明日"),
        ("i", "私"),
        ("you", "あなた"),
        ("he", "彼"),
        ("she", "彼女"),
        ("student", "学生"),
        ("teacher", "先生"),
        ("friend", "友達"),
        ("family", "家族"),
        ("eat", "食べる"),
        ("drink", "飲む"),
        ("go", "行く"),
        ("come", "来る"),
        ("see", "見る"),
        ("watch", "見る"),
        ("read", "読む"),
        ("write", "書く"),
        ("speak", "話す"),
        ("listen", "聞く"),
        ("understand", "わかる"),
        ("like", "好き"),
        ("dislike", "嫌い"),
        ("big", "大きい"),
        ("small", "小さい"),
        ("new", "新しい"),
        ("old", "古い"),
        ("beautiful", "美しい"),
        ("today", "今日"),
        ("yesterday", "昨日"),
        ("tomorrow", "明日"),
        ("morning", "朝"),
        ("noon", "昼"),
        ("night", "夜"),
        ("time", "時間"),
        ("money", "お金"),
        ("work", "仕事"),
        ("job", "仕事"),
        ("school", "学校"),
        ("house", "家"),
        ("home", "家"),
        ("station", "駅"),
        ("hospital", "病院"),
        ("restaurant", "レストラン"),
        ("movie", "映画"),
        ("music", "音楽"),
        ("book", "本"),
        ("car", "車"),
        ("train", "電車"),
        ("bus", "バス"),
        ("airplane", "飛行機"),
    ]
    .into_iter()
    .collect();
}

fn table_for(source: &str, target: &str) -> Option<&'static HashMap<&'static str, &'static str>> {
    match (source, target) {
        ("ja", "en") => Some(&*JA_EN),
        ("en", "ja") => Some(&*EN_JA),
        _ => None,
    }
}

/// Static phrase-table translator. Never fails, so it closes every chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DictionaryTranslator;

impl DictionaryTranslator {
    pub fn new() -> Self {
        Self
    }

    pub fn lookup(&self, text: &str, source: &str, target: &str) -> TranslationResult {
        let empty = HashMap::new();
        let table = table_for(source, target).unwrap_or(&empty);
        let result = |translated: String, confidence: f32, method: &str| {
            TranslationResult::new(translated, source, target, confidence, "simple", method)
        };

        let original = text.trim();
        let lowered = original.to_lowercase();

        if source == "ja" || target == "ja" {
            if let Some(hit) = table.get(original) {
                return result(hit.to_string(), EXACT_MATCH_CONFIDENCE, "exact_match");
            }
        }
        if let Some(hit) = table.get(lowered.as_str()) {
            return result(hit.to_string(), EXACT_MATCH_CONFIDENCE, "exact_match");
        }

        let words: Vec<&str> = lowered.split_whitespace().collect();
        if words.len() > 1 {
            let mut found_any = false;
            let translated: Vec<String> = words
                .iter()
                .map(|word| match table.get(word) {
                    Some(hit) => {
                        found_any = true;
                        hit.to_string()
                    }
                    None => format!("[{}]", word),
                })
                .collect();

            if found_any {
                return result(translated.join(" "), WORD_BY_WORD_CONFIDENCE, "word_by_word")
                    .with_note("Some words marked with [] could not be translated");
            }
        }

        result(
            format!("[Translation not available for '{}']", text),
            0.0,
            "not_found",
        )
        .with_note("Consider using a more advanced translation provider for better results")
    }
}

#[async_trait]
impl TranslationProvider for DictionaryTranslator {
    fn name(&self) -> &str {
        "simple"
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["ja".to_string(), "en".to_string()]
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        _context: Option<&TaskContext>,
    ) -> ProviderResult<TranslationResult> {
        Ok(self.lookup(text, source, target))
    }
}
