//! Rule-based chatbot responder.
//!
//! A pure function of `(query, language)`: the lower-cased query is tested
//! for substring membership against an ordered list of keyword groups, each
//! carrying English and Arabic synonyms and one canned answer per language.
//! The first matching group wins; anything else gets the generic fallback.
//! There is no state and no inference here, just a lookup table.

use crate::model::ChatLanguage;

struct KeywordGroup {
    keywords: &'static [&'static str],
    answer_en: &'static str,
    answer_ar: &'static str,
}

// Order matters: the first group whose keyword appears in the query answers.
const KEYWORD_GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        keywords: &["project", "proposal", "مشروع", "مقترح"],
        answer_en: "You can create a new project from your dashboard. Choose a supervisor, \
                    add a title and a milestone timeline, then submit it for review.",
        answer_ar: "يمكنك إنشاء مشروع جديد من لوحة التحكم. اختر مشرفًا وأضف عنوانًا وجدولًا \
                    زمنيًا للمراحل ثم أرسله للمراجعة.",
    },
    KeywordGroup {
        keywords: &["supervisor", "advisor", "مشرف"],
        answer_en: "Your supervisor is assigned when the project is created. You can message \
                    them directly from the project page.",
        answer_ar: "يتم تعيين المشرف عند إنشاء المشروع. يمكنك مراسلته مباشرة من صفحة المشروع.",
    },
    KeywordGroup {
        keywords: &["milestone", "deadline", "progress", "مرحلة", "موعد", "تقدم"],
        answer_en: "Milestones live on your project timeline. Updating a milestone's progress \
                    automatically recomputes the overall project progress.",
        answer_ar: "المراحل موجودة في الجدول الزمني لمشروعك. تحديث تقدم أي مرحلة يعيد حساب \
                    التقدم الكلي للمشروع تلقائيًا.",
    },
    KeywordGroup {
        keywords: &["message", "chat", "contact", "رسالة", "تواصل"],
        answer_en: "Project messages are shared between you and your supervisor. Open the \
                    project and use the messages tab to start a conversation.",
        answer_ar: "رسائل المشروع مشتركة بينك وبين مشرفك. افتح المشروع واستخدم تبويب الرسائل \
                    لبدء محادثة.",
    },
];

const FALLBACK_EN: &str =
    "I'm not sure about that. Try asking about projects, supervisors, milestones or messages.";
const FALLBACK_AR: &str =
    "لست متأكدًا من ذلك. جرّب السؤال عن المشاريع أو المشرفين أو المراحل أو الرسائل.";

/// Answer a query in the requested language.
pub fn respond(query: &str, language: ChatLanguage) -> &'static str {
    let query = query.to_lowercase();

    for group in KEYWORD_GROUPS {
        if group.keywords.iter().any(|k| query.contains(k)) {
            return match language {
                ChatLanguage::En => group.answer_en,
                ChatLanguage::Ar => group.answer_ar,
            };
        }
    }

    match language {
        ChatLanguage::En => FALLBACK_EN,
        ChatLanguage::Ar => FALLBACK_AR,
    }
}
