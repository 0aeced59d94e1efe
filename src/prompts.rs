//! Prompt template pools for the generation calls.
//!
//! The pool texts are Russian and fixed; placeholders use `{name}` and are
//! filled with [`crate::util::fill_template`]. Material and summary prompts
//! come in several phrasings with the same meaning, picked uniformly at
//! random. The RNG comes from the caller so tests can seed it.

use rand::{seq::SliceRandom, Rng};

use crate::util::fill_template;

/// Ten phrasings of the day-material request. All of them forbid the model
/// from echoing the day number or appending a conclusion.
pub const MATERIAL_TEMPLATES: &[&str] = &[
  "Ты опытный преподаватель программирования. Создай подробный обучающий материал по синтаксису языка {language} для дня {day}. Ответ должен содержать только текст обучающего материала без лишних комментариев. Заключение писать не надо. Писать, какой день тоже не надо.",
  "Будучи экспертом в программировании, составь детальный материал по синтаксису языка {language} для дня {day}. Выдай только необходимый текст без излишеств, без упоминания дня и заключения.",
  "Ты профессиональный преподаватель по программированию. Сформируй подробный обучающий материал по синтаксису {language} для дня {day}. Твой ответ должен состоять исключительно из текста материала, без лишних комментариев и без указания дня.",
  "Составь, как опытный преподаватель, детальный обучающий материал по синтаксису языка {language} для дня {day}. Ответ должен быть только текстом материала без дополнительных пояснений, без заключения и без указания дня.",
  "Ты отлично разбираешься в синтаксисе языка {language}. Подготовь подробный обучающий материал для дня {day}. Текст должен быть информативным и лаконичным, без излишеств, без заключения и без упоминания дня.",
  "Как опытный преподаватель программирования, создай детальный обучающий материал по синтаксису языка {language} для дня {day}. Не добавляй лишних комментариев и заключения, ответ должен содержать только основной текст материала.",
  "Ты опытный учитель программирования. Составь подробный материал по синтаксису языка {language} для дня {day}. Ответ должен включать только текст обучающего материала без лишних пояснений, без заключения и без указания дня.",
  "В роли эксперта по программированию сформируй детальный обучающий материал по синтаксису {language} для дня {day}. Твой ответ должен быть лаконичным и содержать только текст материала, без упоминания дня и без заключения.",
  "Как опытный преподаватель, напиши подробный обучающий материал по синтаксису языка {language} для дня {day}. Ответ должен быть исключительно текстом материала, без дополнительных комментариев, заключения и указания дня.",
  "Будучи профессионалом в программировании, составь детальный материал по синтаксису {language} для дня {day}. Твой ответ должен содержать только текст обучающего материала, без излишеств, без заключения и без упоминания номера дня.",
];

/// Quiz request: 15 questions over the given material, first 10 multiple
/// choice (A-D), last 5 small coding tasks.
pub const QUIZ_TEMPLATE: &str = "Ты опытный преподаватель программирования. Составь тест из 15 вопросов для изучения синтаксиса языка {language} на основе материала {material} для дня {day}. Первые 10 вопросов должны быть с 4 вариантами ответа (A, B, C, D) в формате:\n1. Вопрос\n   A) Вариант A\n   B) Вариант B\n   C) Вариант C\n   D) Вариант D\n\nПоследние 5 вопросов с 11 по 15 должны быть практическими заданиями без вариантов ответа, где требуется написать небольшой фрагмент кода. Ответ должен содержать только текст теста без дополнительных комментариев.";

/// Grading request. The strict output format is what `postprocess::parse_grade`
/// expects back.
pub const GRADING_TEMPLATE: &str = "Ты опытный преподаватель {language}. Проанализируй следующие ответы пользователя по тесту:\n\n{transcript}\n\nВерни ответ строго в следующем формате (без лишних слов или комментариев):\n\nКоличество правильных: <число> из 15\nРекомендации: <текст рекомендаций>\n\nГде <число> – это целое число, отражающее количество правильных ответов, а <текст рекомендаций> – подробные рекомендации по вопросам, вежливо напиши и подбодри от первого лица, которые стоит доучить на основе неверных ответов.";

/// Five phrasings of the course-completion summary request.
pub const SUMMARY_TEMPLATES: &[&str] = &[
  "Ты опытный преподаватель {language}. Пользователь завершил тест по изучению синтаксиса {language} с результатом: {correct_pct}% правильных ответов и {incorrect_pct}% неправильных ответов. Поздравь его с завершением обучения, похвали за проделанную работу, даже если результат не идеален, и подбодри его. Дай подробные рекомендации по улучшению знаний. Верни ответ строго в следующем формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
  "Выполняй роль опытного преподавателя {language}. Пользователь завершил тест по синтаксису {language} и получил {correct_pct}% правильных и {incorrect_pct}% неправильных ответов. Пожалуйста, поздравь его, похвали за усилия, подбодри для дальнейшего обучения и дай рекомендации по темам, которые нужно доработать. Выведи ответ строго в следующем формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
  "Ты эксперт в преподавании {language}. Пользователь прошёл тест по синтаксису {language} с результатом: {correct_pct}% правильных ответов и {incorrect_pct}% неправильных ответов. Поздравь его с окончанием теста, похвали за проделанную работу даже если результат не идеален, и подбодри для дальнейшего изучения, предоставив рекомендации по улучшению знаний. Ответ должен быть выдан в формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
  "Представь, что ты опытный преподаватель {language}. Пользователь завершил тест по синтаксису {language} с результатом {correct_pct}% правильных ответов и {incorrect_pct}% ошибок. Поздравь его с окончанием теста, похвали за проделанную работу и подбодри для дальнейшего обучения, указав рекомендации по темам, требующим доработки. Верни ответ в следующем формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
  "Как опытный преподаватель {language}, проанализируй результаты теста пользователя по синтаксису {language}: {correct_pct}% правильных ответов и {incorrect_pct}% неправильных.Округли все значения до двух знаков после запятой. Поздравь его с завершением обучения, отметь его усилия, даже если результат не совершенен, и предложи рекомендации по улучшению знаний. Ответ должен быть строго в формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
];

fn pick<'a>(rng: &mut impl Rng, pool: &'a [&'a str]) -> &'a str {
  pool.choose(rng).copied().unwrap_or(pool[0])
}

pub fn material_prompt(rng: &mut impl Rng, language: &str, day: i64) -> String {
  let day = day.to_string();
  fill_template(pick(rng, MATERIAL_TEMPLATES), &[("language", language), ("day", &day)])
}

pub fn quiz_prompt(language: &str, material: &str, day: i64) -> String {
  let day = day.to_string();
  fill_template(
    QUIZ_TEMPLATE,
    &[("language", language), ("material", material), ("day", &day)],
  )
}

pub fn grading_prompt(language: &str, transcript: &str) -> String {
  fill_template(
    GRADING_TEMPLATE,
    &[("language", language), ("transcript", transcript)],
  )
}

pub fn summary_prompt(
  rng: &mut impl Rng,
  language: &str,
  correct_pct: f64,
  incorrect_pct: f64,
) -> String {
  let correct = format!("{:.2}", correct_pct);
  let incorrect = format!("{:.2}", incorrect_pct);
  fill_template(
    pick(rng, SUMMARY_TEMPLATES),
    &[
      ("language", language),
      ("correct_pct", &correct),
      ("incorrect_pct", &incorrect),
    ],
  )
}
